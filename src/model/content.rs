use super::{Fragment, Node, NodeType, NodeTypeRef, Schema};
use displaydoc::Display;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors when compiling a content expression
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ContentExprError {
    /// no node type or group `{0}` found
    UnknownReference(String),
    /// {0}
    Syntax(String),
}

#[derive(Debug, Clone)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(String),
}

struct TokenStream<'a> {
    expr: &'a str,
    tokens: Vec<String>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<Vec<String>>,
}

impl<'a> TokenStream<'a> {
    fn new(expr: &'a str, resolve: &'a dyn Fn(&str) -> Option<Vec<String>>) -> Self {
        let mut tokens = Vec::new();
        let mut word = String::new();
        for c in expr.chars() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                word.push(c);
                continue;
            }
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        Self {
            expr,
            tokens,
            pos: 0,
            resolve,
        }
    }

    fn next(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.next() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err<T>(&self, msg: &str) -> Result<T, ContentExprError> {
        Err(ContentExprError::Syntax(format!(
            "{} (in content expression `{}`)",
            msg, self.expr
        )))
    }
}

fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ContentExprError> {
    let mut exprs = vec![parse_expr_seq(stream)?];
    while stream.eat("|") {
        exprs.push(parse_expr_seq(stream)?);
    }
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        Expr::Choice(exprs)
    })
}

fn parse_expr_seq(stream: &mut TokenStream) -> Result<Expr, ContentExprError> {
    let mut exprs = Vec::new();
    while let Some(next) = stream.next() {
        if next == ")" || next == "|" {
            break;
        }
        exprs.push(parse_expr_subscript(stream)?);
    }
    match exprs.len() {
        0 => stream.err("expected an expression"),
        1 => Ok(exprs.remove(0)),
        _ => Ok(Expr::Seq(exprs)),
    }
}

fn parse_expr_subscript(stream: &mut TokenStream) -> Result<Expr, ContentExprError> {
    let mut expr = parse_expr_atom(stream)?;
    loop {
        if stream.eat("+") {
            expr = Expr::Plus(Box::new(expr));
        } else if stream.eat("*") {
            expr = Expr::Star(Box::new(expr));
        } else if stream.eat("?") {
            expr = Expr::Opt(Box::new(expr));
        } else if stream.eat("{") {
            expr = parse_expr_range(stream, expr)?;
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_num(stream: &mut TokenStream) -> Result<usize, ContentExprError> {
    match stream.next().and_then(|t| t.parse::<usize>().ok()) {
        Some(n) => {
            stream.pos += 1;
            Ok(n)
        }
        None => stream.err("expected a number"),
    }
}

fn parse_expr_range(stream: &mut TokenStream, expr: Expr) -> Result<Expr, ContentExprError> {
    let min = parse_num(stream)?;
    let mut max = Some(min);
    if stream.eat(",") {
        max = if stream.next() != Some("}") {
            Some(parse_num(stream)?)
        } else {
            None
        };
    }
    if !stream.eat("}") {
        return stream.err("unclosed braced range");
    }
    Ok(Expr::Range {
        min,
        max,
        expr: Box::new(expr),
    })
}

fn parse_expr_atom(stream: &mut TokenStream) -> Result<Expr, ContentExprError> {
    if stream.eat("(") {
        let expr = parse_expr(stream)?;
        if !stream.eat(")") {
            return stream.err("missing closing paren");
        }
        return Ok(expr);
    }
    let name = match stream.next() {
        Some(name) if name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') => {
            name.to_owned()
        }
        Some(tok) => {
            let tok = tok.to_owned();
            return stream.err(&format!("unexpected token `{}`", tok));
        }
        None => return stream.err("unexpected end"),
    };
    let types = (stream.resolve)(&name).ok_or(ContentExprError::UnknownReference(name))?;
    stream.pos += 1;
    let mut exprs: Vec<Expr> = types.into_iter().map(Expr::Name).collect();
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        Expr::Choice(exprs)
    })
}

struct NfaEdge {
    term: Option<String>,
    to: Option<usize>,
}

type Dangling = Vec<(usize, usize)>;

struct Nfa {
    nodes: Vec<Vec<NfaEdge>>,
}

impl Nfa {
    fn build(expr: &Expr) -> Self {
        let mut nfa = Nfa {
            nodes: vec![Vec::new()],
        };
        let out = nfa.compile(expr, 0);
        let end = nfa.node();
        nfa.connect(&out, end);
        nfa
    }

    fn node(&mut self) -> usize {
        self.nodes.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<String>) -> (usize, usize) {
        self.nodes[from].push(NfaEdge { term, to });
        (from, self.nodes[from].len() - 1)
    }

    fn connect(&mut self, edges: &Dangling, to: usize) {
        for (from, i) in edges {
            self.nodes[*from][*i].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Dangling {
        match expr {
            Expr::Choice(exprs) => exprs
                .iter()
                .flat_map(|e| self.compile(e, from))
                .collect(),
            Expr::Seq(exprs) => {
                let mut from = from;
                let mut out = Vec::new();
                for (i, e) in exprs.iter().enumerate() {
                    out = self.compile(e, from);
                    if i + 1 < exprs.len() {
                        from = self.node();
                        self.connect(&out, from);
                    }
                }
                out
            }
            Expr::Star(e) => {
                let lp = self.node();
                self.edge(from, Some(lp), None);
                let inner = self.compile(e, lp);
                self.connect(&inner, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Plus(e) => {
                let lp = self.node();
                let first = self.compile(e, from);
                self.connect(&first, lp);
                let inner = self.compile(e, lp);
                self.connect(&inner, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Opt(e) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(e, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let inner = self.compile(expr, cur);
                    self.connect(&inner, next);
                    cur = next;
                }
                match max {
                    None => {
                        let inner = self.compile(expr, cur);
                        self.connect(&inner, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let inner = self.compile(expr, cur);
                            self.connect(&inner, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(name) => vec![self.edge(from, None, Some(name.clone()))],
        }
    }

    fn null_from(&self, node: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if result.contains(&n) {
                continue;
            }
            result.push(n);
            for edge in &self.nodes[n] {
                if let (None, Some(to)) = (&edge.term, edge.to) {
                    stack.push(to);
                }
            }
        }
        result.sort_unstable();
        result
    }
}

#[derive(Debug)]
struct DfaState {
    valid_end: bool,
    next: Vec<(String, usize)>,
}

/// The deterministic automaton compiled from a content expression
#[derive(Debug)]
pub struct ContentDfa {
    states: Vec<DfaState>,
}

impl ContentDfa {
    fn from_nfa(nfa: &Nfa) -> Self {
        let final_node = nfa.nodes.len() - 1;
        let mut labeled: BTreeMap<Vec<usize>, usize> = BTreeMap::new();
        let mut states: Vec<DfaState> = Vec::new();
        let mut queue: VecDeque<Vec<usize>> = VecDeque::new();

        let start = nfa.null_from(0);
        labeled.insert(start.clone(), 0);
        states.push(DfaState {
            valid_end: start.contains(&final_node),
            next: Vec::new(),
        });
        queue.push_back(start);

        while let Some(set) = queue.pop_front() {
            let id = labeled[&set];
            let mut out: Vec<(String, Vec<usize>)> = Vec::new();
            for node in &set {
                for edge in &nfa.nodes[*node] {
                    if let (Some(term), Some(to)) = (&edge.term, edge.to) {
                        let idx = match out.iter().position(|(t, _)| t == term) {
                            Some(idx) => idx,
                            None => {
                                out.push((term.clone(), Vec::new()));
                                out.len() - 1
                            }
                        };
                        for n in nfa.null_from(to) {
                            if !out[idx].1.contains(&n) {
                                out[idx].1.push(n);
                            }
                        }
                    }
                }
            }
            for (term, mut target) in out {
                target.sort_unstable();
                let target_id = match labeled.get(&target) {
                    Some(id) => *id,
                    None => {
                        let new_id = states.len();
                        states.push(DfaState {
                            valid_end: target.contains(&final_node),
                            next: Vec::new(),
                        });
                        labeled.insert(target.clone(), new_id);
                        queue.push_back(target);
                        new_id
                    }
                };
                states[id].next.push((term, target_id));
            }
        }
        ContentDfa { states }
    }
}

/// Compile a content expression into its start match.
///
/// `resolve` maps a name to the node types it stands for: the type itself, or the
/// members of a group. It returns `None` for unknown names.
pub fn compile_content(
    expr: &str,
    resolve: &dyn Fn(&str) -> Option<Vec<String>>,
) -> Result<ContentMatch, ContentExprError> {
    if expr.trim().is_empty() {
        return Ok(ContentMatch::empty());
    }
    let mut stream = TokenStream::new(expr, resolve);
    let parsed = parse_expr(&mut stream)?;
    if stream.next().is_some() {
        return stream.err("unexpected trailing input");
    }
    let nfa = Nfa::build(&parsed);
    Ok(ContentMatch {
        dfa: Arc::new(ContentDfa::from_nfa(&nfa)),
        state: 0,
    })
}

/// Instances of this type represent a match state of a node type's content expression,
/// and can be used to find out whether further content matches here, and whether a given
/// position is a valid end of the node.
#[derive(Clone)]
pub struct ContentMatch {
    dfa: Arc<ContentDfa>,
    state: usize,
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.dfa, &other.dfa) && self.state == other.state
    }
}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next: Vec<&str> = self.current().next.iter().map(|(t, _)| t.as_str()).collect();
        f.debug_struct("ContentMatch")
            .field("state", &self.state)
            .field("valid_end", &self.valid_end())
            .field("next", &next)
            .finish()
    }
}

impl ContentMatch {
    /// The match of a node without content
    pub fn empty() -> Self {
        ContentMatch {
            dfa: Arc::new(ContentDfa {
                states: vec![DfaState {
                    valid_end: true,
                    next: Vec::new(),
                }],
            }),
            state: 0,
        }
    }

    fn current(&self) -> &DfaState {
        &self.dfa.states[self.state]
    }

    fn at(&self, state: usize) -> ContentMatch {
        ContentMatch {
            dfa: self.dfa.clone(),
            state,
        }
    }

    /// True when this match state represents a valid end of the node.
    pub fn valid_end(&self) -> bool {
        self.current().valid_end
    }

    /// Match a node type, returning a match after that node if successful.
    pub fn match_type(&self, name: &str) -> Option<ContentMatch> {
        self.current()
            .next
            .iter()
            .find(|(t, _)| t == name)
            .map(|(_, s)| self.at(*s))
    }

    /// Try to match a sequence of nodes. Returns the resulting match when successful.
    pub fn match_nodes(&self, nodes: &[Node]) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for node in nodes {
            cur = cur.match_type(node.type_name())?;
        }
        Some(cur)
    }

    /// Try to match a fragment. Returns the resulting match when successful.
    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_nodes(fragment.children())
    }

    /// The number of outgoing edges this node has in the finite automaton that
    /// describes the content expression.
    pub fn edge_count(&self) -> usize {
        self.current().next.len()
    }

    /// The type names of the outgoing edges, in declaration order
    pub fn edges(&self) -> impl Iterator<Item = (&str, ContentMatch)> + '_ {
        self.current()
            .next
            .iter()
            .map(move |(t, s)| (t.as_str(), self.at(*s)))
    }

    /// True if there is no content allowed at all
    pub fn is_empty(&self) -> bool {
        self.dfa.states.len() == 1 && self.edge_count() == 0
    }

    /// Get the first matching node type at this match position that can be generated.
    pub fn default_type(&self, schema: &Schema) -> Option<NodeTypeRef> {
        self.edges()
            .filter_map(|(t, _)| schema.node_type(t))
            .find(|t| !(t.is_text() || t.has_required_attrs()))
            .cloned()
    }

    /// Try to match the given fragment, and if that fails, see if it can be made to
    /// match by inserting nodes in front of it. When successful, return a fragment of
    /// inserted nodes (which may be empty if nothing had to be inserted). When `to_end`
    /// is true, only return a fragment if the resulting match goes to the end of the
    /// content expression.
    pub fn fill_before(&self, schema: &Schema, after: &Fragment, to_end: bool) -> Option<Fragment> {
        self.fill_before_depth(schema, after, to_end, 0)
    }

    pub(crate) fn fill_before_depth(
        &self,
        schema: &Schema,
        after: &Fragment,
        to_end: bool,
        depth: usize,
    ) -> Option<Fragment> {
        let mut seen = vec![self.clone()];
        self.fill_search(schema, after, to_end, &mut seen, Vec::new(), depth)
    }

    fn fill_search(
        &self,
        schema: &Schema,
        after: &Fragment,
        to_end: bool,
        seen: &mut Vec<ContentMatch>,
        types: Vec<NodeTypeRef>,
        depth: usize,
    ) -> Option<Fragment> {
        if let Some(finished) = self.match_fragment(after) {
            if !to_end || finished.valid_end() {
                let nodes: Option<Vec<Node>> = types
                    .iter()
                    .map(|t| t.create_and_fill_depth(schema, depth + 1))
                    .collect();
                if let Some(nodes) = nodes {
                    return Some(Fragment::from(nodes));
                }
            }
        }
        for (name, next) in self.edges() {
            let ty = match schema.node_type(name) {
                Some(ty) => ty,
                None => continue,
            };
            if !(ty.is_text() || ty.has_required_attrs()) && !seen.contains(&next) {
                seen.push(next.clone());
                let mut path = types.clone();
                path.push(ty.clone());
                if let Some(found) = next.fill_search(schema, after, to_end, seen, path, depth) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Find a set of wrapping node types that would allow a node of the given type to
    /// appear at this position. The result may be empty (when it fits directly) and will
    /// be `None` when no such wrapping exists.
    pub fn find_wrapping(&self, schema: &Schema, target: &NodeType) -> Option<Vec<NodeTypeRef>> {
        struct Active {
            cur: ContentMatch,
            ty: Option<NodeTypeRef>,
            via: Option<usize>,
        }

        let mut seen: Vec<String> = Vec::new();
        let mut active = vec![Active {
            cur: self.clone(),
            ty: None,
            via: None,
        }];
        let mut i = 0;
        while i < active.len() {
            if active[i].cur.match_type(target.name()).is_some() {
                let mut result = Vec::new();
                let mut obj = Some(i);
                while let Some(idx) = obj {
                    if let Some(ty) = &active[idx].ty {
                        result.push(ty.clone());
                    }
                    obj = active[idx].via;
                }
                result.reverse();
                return Some(result);
            }
            let candidates: Vec<(NodeTypeRef, bool)> = active[i]
                .cur
                .edges()
                .filter_map(|(name, next)| schema.node_type(name).map(|t| (t.clone(), next.valid_end())))
                .collect();
            for (ty, next_valid_end) in candidates {
                if !ty.is_leaf()
                    && !ty.has_required_attrs()
                    && !seen.iter().any(|s| s == ty.name())
                    && (active[i].ty.is_none() || next_valid_end)
                {
                    seen.push(ty.name().to_owned());
                    active.push(Active {
                        cur: ty.content_match().clone(),
                        ty: Some(ty),
                        via: Some(i),
                    });
                }
            }
            i += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(name: &str) -> Option<Vec<String>> {
        match name {
            "block" => Some(vec!["paragraph".into(), "heading".into()]),
            "paragraph" | "heading" | "th" | "td" | "text" | "image" => Some(vec![name.into()]),
            _ => None,
        }
    }

    fn walk(m: &ContentMatch, names: &[&str]) -> Option<ContentMatch> {
        let mut cur = m.clone();
        for n in names {
            cur = cur.match_type(n)?;
        }
        Some(cur)
    }

    #[test]
    fn test_plus() {
        let m = compile_content("block+", &resolver).unwrap();
        assert!(!m.valid_end());
        assert!(walk(&m, &["paragraph"]).unwrap().valid_end());
        assert!(walk(&m, &["paragraph", "heading", "paragraph"]).unwrap().valid_end());
        assert!(walk(&m, &["text"]).is_none());
    }

    #[test]
    fn test_sequence_and_choice() {
        let m = compile_content("paragraph (th | td)*", &resolver).unwrap();
        assert!(!m.valid_end());
        assert!(walk(&m, &["paragraph"]).unwrap().valid_end());
        assert!(walk(&m, &["paragraph", "td", "th"]).unwrap().valid_end());
        assert!(walk(&m, &["td"]).is_none());
    }

    #[test]
    fn test_range_and_opt() {
        let m = compile_content("heading? paragraph{2,3}", &resolver).unwrap();
        assert!(walk(&m, &["paragraph"]).map(|m| m.valid_end()) == Some(false));
        assert!(walk(&m, &["paragraph", "paragraph"]).unwrap().valid_end());
        assert!(walk(&m, &["heading", "paragraph", "paragraph", "paragraph"])
            .unwrap()
            .valid_end());
        assert!(walk(&m, &["paragraph", "paragraph", "paragraph", "paragraph"]).is_none());
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            compile_content("bogus+", &resolver).unwrap_err(),
            ContentExprError::UnknownReference("bogus".into())
        );
        assert!(matches!(
            compile_content("(paragraph", &resolver),
            Err(ContentExprError::Syntax(_))
        ));
    }

    #[test]
    fn test_empty() {
        let m = compile_content("", &resolver).unwrap();
        assert!(m.is_empty());
        assert!(m.valid_end());
    }
}
