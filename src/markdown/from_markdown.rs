//! Building a document tree from the token stream.
use super::block::{split_lines, BlockState, ParseContext};
use super::inline::expand_inline;
use super::{HandlerTarget, Nesting, Token, INLINE, TEXT};
use crate::model::{coerce_attrs, Attrs, Fragment, MarkSet, Node, NodeTypeRef, Schema};
use displaydoc::Display;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// The kind of a parse diagnostic
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum DegradedKind {
    /// content repaired
    ContentRepaired,
    /// node dropped
    NodeDropped,
    /// unknown token
    UnknownToken,
    /// unclosed directive
    UnclosedDirective,
    /// nesting too deep
    NestingTooDeep,
}

/// A problem the parser worked around
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParseDegraded {
    /// What happened
    pub kind: DegradedKind,
    /// Details
    pub message: String,
}

/// A parsed document with the problems found on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    /// The document
    pub doc: Node,
    /// The diagnostics, in source order
    pub diagnostics: Vec<ParseDegraded>,
}

/// Tokenize markdown text with the grammar of the schema.
pub fn tokenize(schema: &Schema, text: &str) -> Vec<Token> {
    let ctx = ParseContext::new(schema.grammar(), schema.options());
    tokenize_with(&ctx, text)
}

fn tokenize_with(ctx: &ParseContext, text: &str) -> Vec<Token> {
    let nested = BlockState::new(split_lines(text), 0, ctx).tokenize();
    let mut tokens = nested.tokens;
    expand_inline(ctx.grammar, &mut tokens);
    tokens
}

/// Parse markdown text into a document. Never fails: invalid input is repaired.
pub fn parse(schema: &Schema, text: &str) -> Node {
    parse_with_diagnostics(schema, text).doc
}

/// Parse markdown text into a document and report what had to be repaired.
pub fn parse_with_diagnostics(schema: &Schema, text: &str) -> Parsed {
    let ctx = ParseContext::new(schema.grammar(), schema.options());
    let tokens = tokenize_with(&ctx, text);
    let mut builder = TreeBuilder::new(schema, &ctx);
    builder.process(&tokens);
    let doc = builder.finish();
    Parsed {
        doc,
        diagnostics: ctx.diagnostics.into_inner(),
    }
}

struct Frame {
    ty: NodeTypeRef,
    attrs: Attrs,
    content: Fragment,
    marks: MarkSet,
}

struct TreeBuilder<'a> {
    schema: &'a Schema,
    ctx: &'a ParseContext<'a>,
    stack: Vec<Frame>,
    opened: Vec<bool>,
}

fn fit_marks(node: Node, parent: &NodeTypeRef) -> Node {
    if node.marks().iter().all(|m| parent.allows_mark_type(m.type_name())) {
        return node;
    }
    let marks = MarkSet::from_marks(
        node.marks()
            .iter()
            .filter(|m| parent.allows_mark_type(m.type_name()))
            .cloned(),
    );
    node.mark(marks)
}

impl<'a> TreeBuilder<'a> {
    fn new(schema: &'a Schema, ctx: &'a ParseContext<'a>) -> Self {
        let root = Frame {
            ty: schema.top_node_type().clone(),
            attrs: Attrs::new(),
            content: Fragment::new(),
            marks: MarkSet::new(),
        };
        Self {
            schema,
            ctx,
            stack: vec![root],
            opened: Vec::new(),
        }
    }

    fn repaired(&self, kind: DegradedKind, message: String) {
        debug!("{}: {}", kind, message);
        self.ctx.report(kind, message);
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn marks(&self) -> MarkSet {
        self.stack
            .last()
            .map(|f| f.marks.clone())
            .unwrap_or_default()
    }

    fn process(&mut self, tokens: &[Token]) {
        for token in tokens {
            match token.kind.as_str() {
                INLINE => self.process(&token.children),
                TEXT => self.add_text(&token.content),
                kind => match self.schema.grammar().handlers.get(kind).cloned() {
                    Some(handler) => {
                        let attrs = match &handler.attrs {
                            Some(f) => f(token),
                            None => token.attrs.clone(),
                        };
                        match &handler.target {
                            HandlerTarget::Node(name) => self.handle_node(name, attrs, token),
                            HandlerTarget::Mark(name) => self.handle_mark(name, attrs, token),
                        }
                    }
                    None => self.handle_unknown(token),
                },
            }
        }
    }

    fn handle_unknown(&mut self, token: &Token) {
        self.repaired(
            DegradedKind::UnknownToken,
            format!("no handler for token `{}`", token.kind),
        );
        match token.nesting {
            Nesting::Open => self.opened.push(false),
            Nesting::Close => {
                self.close_token();
            }
            Nesting::SelfContained => {
                self.add_text(&token.content);
                self.process(&token.children);
            }
        }
    }

    fn handle_node(&mut self, name: &str, attrs: Attrs, token: &Token) {
        let ty = match self.schema.node_type(name) {
            Some(ty) => ty.clone(),
            None => return self.handle_unknown(token),
        };
        if token.nesting == Nesting::Close {
            return self.close_token();
        }
        let attrs = match coerce_attrs(ty.attr_specs(), &attrs) {
            Ok(attrs) => attrs,
            Err(err) => {
                self.repaired(
                    DegradedKind::NodeDropped,
                    format!("`{}` dropped: {}", name, err),
                );
                if token.nesting == Nesting::Open {
                    self.opened.push(false);
                } else {
                    self.add_text(&token.content);
                }
                return;
            }
        };
        match token.nesting {
            Nesting::Open => {
                self.stack.push(Frame {
                    ty,
                    attrs,
                    content: Fragment::new(),
                    marks: MarkSet::new(),
                });
                self.opened.push(true);
            }
            _ => {
                let mut content = Fragment::new();
                if !token.content.is_empty() && ty.content_match().match_type(TEXT).is_some() {
                    if let Ok(text) = self.schema.text(&token.content, MarkSet::new()) {
                        content = Fragment::from(text);
                    }
                }
                let marks = if ty.is_inline() {
                    self.marks()
                } else {
                    MarkSet::new()
                };
                let node = if ty.valid_content(&content) {
                    ty.create(&attrs, content, marks).ok()
                } else {
                    ty.create_and_fill(self.schema, &attrs, content, marks)
                };
                match node {
                    Some(node) => self.add_content(node),
                    None => self.repaired(
                        DegradedKind::NodeDropped,
                        format!("`{}` could not be created", name),
                    ),
                }
            }
        }
    }

    fn handle_mark(&mut self, name: &str, attrs: Attrs, token: &Token) {
        let ty = match self.schema.mark_type(name) {
            Some(ty) => ty.clone(),
            None => return self.handle_unknown(token),
        };
        match token.nesting {
            Nesting::Open => match coerce_attrs(ty.attr_specs(), &attrs)
                .and_then(|attrs| ty.create(&attrs))
            {
                Ok(mark) => {
                    let top = self.top();
                    top.marks = mark.add_to_set(&top.marks);
                }
                Err(err) => self.repaired(
                    DegradedKind::NodeDropped,
                    format!("mark `{}` dropped: {}", name, err),
                ),
            },
            Nesting::Close => {
                let top = self.top();
                top.marks = top.marks.without_type(name);
            }
            Nesting::SelfContained => self.handle_unknown(token),
        }
    }

    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Ok(node) = self.schema.text(text, self.marks()) {
            self.add_content(node);
        }
    }

    fn close_token(&mut self) {
        match self.opened.pop() {
            Some(true) if self.stack.len() > 1 => {
                if let Some(node) = self.close_frame() {
                    self.add_content(node);
                }
            }
            _ => {}
        }
    }

    fn close_frame(&mut self) -> Option<Node> {
        let frame = self.stack.pop()?;
        let name = frame.ty.name().to_owned();
        let content = match frame.ty.content_match().match_fragment(&frame.content) {
            Some(m) if m.valid_end() => frame.content,
            Some(m) => match m.fill_before(self.schema, &Fragment::new(), true) {
                Some(fill) => {
                    self.repaired(
                        DegradedKind::ContentRepaired,
                        format!("filled the end of `{}`", name),
                    );
                    frame.content.append(fill)
                }
                None => {
                    self.repaired(
                        DegradedKind::NodeDropped,
                        format!("`{}` cannot be completed", name),
                    );
                    return None;
                }
            },
            None => {
                self.repaired(
                    DegradedKind::NodeDropped,
                    format!("`{}` has invalid content", name),
                );
                return None;
            }
        };
        frame
            .ty
            .create(&frame.attrs, content, MarkSet::new())
            .map_err(|err| {
                self.repaired(
                    DegradedKind::NodeDropped,
                    format!("`{}` dropped: {}", name, err),
                )
            })
            .ok()
    }

    fn add_content(&mut self, node: Node) {
        let schema = self.schema;
        let top = self.top();
        let matched = match top.ty.content_match().match_fragment(&top.content) {
            Some(matched) => matched,
            None => return,
        };
        if matched.match_type(node.type_name()).is_some() {
            let node = if node.is_inline() {
                fit_marks(node, &top.ty)
            } else {
                node
            };
            let content = std::mem::take(&mut top.content);
            top.content = content.append(Fragment::from(node));
            return;
        }

        // a trailing wrapper that still accepts the node
        if let Some(last) = top.content.last_child() {
            let accepts = !last.is_leaf()
                && last
                    .node_type()
                    .content_match()
                    .match_fragment(last.content())
                    .and_then(|m| m.match_type(node.type_name()))
                    .is_some();
            if accepts {
                let inner = fit_marks(node, last.node_type());
                let wrapper = last.copy(last.content().clone().append(Fragment::from(inner)));
                let index = top.content.child_count() - 1;
                top.content = top.content.splice(index, index + 1, vec![wrapper]);
                return;
            }
        }

        let name = node.type_name().to_owned();
        let parent = top.ty.name().to_owned();
        if let Some(fill) = matched.fill_before(schema, &Fragment::from(node.clone()), false) {
            let node = if node.is_inline() {
                fit_marks(node, &top.ty)
            } else {
                node
            };
            let content = std::mem::take(&mut top.content);
            top.content = content.append(fill).append(Fragment::from(node));
            self.repaired(
                DegradedKind::ContentRepaired,
                format!("filled in before `{}` in `{}`", name, parent),
            );
            return;
        }

        if let Some(wrapped) = self.wrap(&matched, &node) {
            let top = self.top();
            let content = std::mem::take(&mut top.content);
            top.content = content.append(Fragment::from(wrapped));
            self.repaired(
                DegradedKind::ContentRepaired,
                format!("wrapped `{}` to fit in `{}`", name, parent),
            );
            return;
        }

        if !node.is_text() && node.child_count() > 0 {
            self.repaired(
                DegradedKind::ContentRepaired,
                format!("unwrapped `{}` in `{}`", name, parent),
            );
            let children: Vec<Node> = node.content().clone().into();
            for child in children {
                self.add_content(child);
            }
            return;
        }

        self.repaired(
            DegradedKind::NodeDropped,
            format!("`{}` is not allowed in `{}`", name, parent),
        );
    }

    fn wrap(&self, matched: &crate::model::ContentMatch, node: &Node) -> Option<Node> {
        let wrapping = matched.find_wrapping(self.schema, node.node_type())?;
        let mut wrapped = node.clone();
        for ty in wrapping.iter().rev() {
            let inner = if wrapped.is_inline() {
                fit_marks(wrapped, ty)
            } else {
                wrapped
            };
            wrapped =
                ty.create_and_fill(self.schema, &Attrs::new(), Fragment::from(inner), MarkSet::new())?;
        }
        Some(wrapped)
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            if let Some(node) = self.close_frame() {
                self.add_content(node);
            }
        }
        match self.close_frame() {
            Some(doc) => doc,
            None => {
                debug_assert!(false, "the document node could not be completed");
                warn!("the document node could not be completed, returning an empty document");
                let ty = self.schema.top_node_type();
                ty.create_and_fill(self.schema, &Attrs::new(), Fragment::new(), MarkSet::new())
                    .unwrap_or_else(|| {
                        Node::new_unchecked(ty.clone(), Attrs::new(), Fragment::new(), MarkSet::new())
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{compose_schema, Extension};
    use crate::extensions::{default_extensions, default_schema};
    use crate::markdown::helper::Builder;
    use crate::markdown::{BlockRule, Placement};
    use crate::model::NodeSpec;

    fn build(schema: &Schema, tokens: &[Token]) -> Parsed {
        let ctx = ParseContext::new(schema.grammar(), schema.options());
        let mut builder = TreeBuilder::new(schema, &ctx);
        builder.process(tokens);
        let doc = builder.finish();
        Parsed {
            doc,
            diagnostics: ctx.diagnostics.into_inner(),
        }
    }

    fn kinds(parsed: &Parsed) -> Vec<DegradedKind> {
        parsed.diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_text_is_wrapped() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let parsed = build(&schema, &[Token::text("loose")]);
        assert_eq!(parsed.doc, b.doc(b.p("loose")));
        assert_eq!(kinds(&parsed), vec![DegradedKind::ContentRepaired]);
        assert!(parsed.diagnostics[0].message.contains("wrapped"));
    }

    #[test]
    fn test_missing_content_is_filled() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let parsed = build(&schema, &[Token::open("blockquote"), Token::close("blockquote")]);
        assert_eq!(parsed.doc, b.doc(b.blockquote(b.p(()))));
        assert_eq!(kinds(&parsed), vec![DegradedKind::ContentRepaired]);
        assert!(parsed.diagnostics[0].message.contains("filled"));
    }

    #[test]
    fn test_misplaced_wrapper_is_unwrapped() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let tokens = [
            Token::open("table"),
            Token::open("tr"),
            Token::open("td"),
            Token::open("blockquote"),
            Token::open("paragraph"),
            Token::text("x"),
            Token::close("paragraph"),
            Token::close("blockquote"),
            Token::close("td"),
            Token::close("tr"),
            Token::close("table"),
        ];
        let parsed = build(&schema, &tokens);
        assert_eq!(parsed.doc, b.doc(b.table(b.tr(b.td(None, "x")))));
        assert_eq!(kinds(&parsed), vec![DegradedKind::ContentRepaired]);
        assert!(parsed.diagnostics[0].message.contains("unwrapped"));
    }

    #[test]
    fn test_unknown_tokens_keep_their_text() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let tokens = [
            Token::open("paragraph"),
            Token::leaf("sparkle").content("shiny"),
            Token::close("paragraph"),
        ];
        let parsed = build(&schema, &tokens);
        assert_eq!(parsed.doc, b.doc(b.p("shiny")));
        assert_eq!(kinds(&parsed), vec![DegradedKind::UnknownToken]);
    }

    /// `%%` opens and closes an empty aside, `%% text` leaves inline text at the top level
    struct AsideRule;

    impl BlockRule for AsideRule {
        fn name(&self) -> &str {
            "aside"
        }

        fn run(&self, state: &mut BlockState) -> bool {
            let line = match state.line() {
                Some(line) => line.to_owned(),
                None => return false,
            };
            if line == "%%" {
                state.push(Token::open("aside"));
                state.push(Token::close("aside"));
            } else if let Some(rest) = line.strip_prefix("%% ") {
                state.push(Token::inline(rest));
            } else {
                return false;
            }
            state.advance(1);
            true
        }
    }

    #[test]
    fn test_extension_tokens_are_repaired() {
        let mut exts = default_extensions();
        exts.push(
            Extension::node("aside", NodeSpec::with_content("paragraph+").group("block"))
                .block_rule(Placement::Default, AsideRule),
        );
        let schema = compose_schema(&exts).unwrap();
        let b = Builder::new(&schema);
        let parsed = parse_with_diagnostics(&schema, "%%\n\n%% loose *text*");
        let aside = b.node("aside", Attrs::new(), b.p(()));
        assert_eq!(
            parsed.doc,
            b.doc((aside, b.p(("loose ", b.em("text")))))
        );
        assert_eq!(
            kinds(&parsed),
            vec![DegradedKind::ContentRepaired, DegradedKind::ContentRepaired]
        );
    }
}
