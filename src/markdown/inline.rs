//! The inline tokenizer.
use super::delimiter::{balance, Delimiter};
use super::{Grammar, Token, INLINE};

/// A rule of the inline tokenizer. A rule is only tried at one of its marker characters.
pub trait InlineRule: Send + Sync {
    /// The name other rules use as placement anchor
    fn name(&self) -> &str;

    /// The characters this rule can start at
    fn markers(&self) -> Vec<char>;

    /// Try to match at the current position. A rule that returns `true` must have consumed
    /// input.
    fn run(&self, state: &mut InlineState) -> bool;
}

/// The state of the inline tokenizer
pub struct InlineState<'a> {
    src: &'a str,
    pos: usize,
    pending: String,
    tokens: Vec<Token>,
    pub(crate) delimiters: Vec<Delimiter>,
    depth: usize,
    grammar: &'a Grammar,
}

const MAX_INLINE_DEPTH: usize = 16;

impl<'a> InlineState<'a> {
    fn new(src: &'a str, depth: usize, grammar: &'a Grammar) -> Self {
        Self {
            src,
            pos: 0,
            pending: String::new(),
            tokens: Vec::new(),
            delimiters: Vec::new(),
            depth,
            grammar,
        }
    }

    /// The whole source
    pub fn src(&self) -> &'a str {
        self.src
    }

    /// The current byte offset
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The source from the current position
    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// The character at the current position
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character before the current position
    pub fn char_before(&self) -> Option<char> {
        self.src[..self.pos].chars().next_back()
    }

    /// Consume `bytes` bytes of source
    pub fn advance(&mut self, bytes: usize) {
        self.pos = usize::min(self.pos + bytes, self.src.len());
    }

    /// Add literal text
    pub fn push_pending(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.tokens.push(Token::text(&text));
        }
    }

    /// Push a token after the pending text
    pub fn push(&mut self, token: Token) {
        self.flush_pending();
        self.tokens.push(token);
    }

    /// Push a sequence of tokens after the pending text
    pub fn push_all(&mut self, tokens: Vec<Token>) {
        self.flush_pending();
        self.tokens.extend(tokens);
    }

    pub(crate) fn push_delimiter_text(&mut self, run: &str) -> usize {
        self.push(Token::text(run));
        self.tokens.len() - 1
    }

    /// Whether some extension handles tokens of this kind
    pub fn handles(&self, kind: &str) -> bool {
        self.grammar.handlers.contains_key(kind)
    }

    /// Tokenize a nested span, like a link label, with the same rules. Returns `None` when
    /// spans are nested too deeply.
    pub fn tokenize_nested(&self, src: &str) -> Option<Vec<Token>> {
        if self.depth + 1 >= MAX_INLINE_DEPTH {
            return None;
        }
        Some(tokenize_inline(self.grammar, src, self.depth + 1))
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_pending();
        balance(self.tokens, &mut self.delimiters, &self.grammar.delimiters)
    }
}

/// Tokenize inline source
pub(crate) fn tokenize_inline(grammar: &Grammar, src: &str, depth: usize) -> Vec<Token> {
    let mut state = InlineState::new(src, depth, grammar);
    while let Some(c) = state.peek() {
        let start = state.pos;
        if let Some(rules) = grammar.inline_markers.get(&c) {
            let matched = rules
                .iter()
                .any(|i| grammar.inline_rules[*i].run(&mut state));
            if matched && state.pos > start {
                continue;
            }
            state.pos = start;
        }
        state.pending.push(c);
        state.pos += c.len_utf8();
    }
    state.finish()
}

/// Fill the children of all `inline` tokens
pub(crate) fn expand_inline(grammar: &Grammar, tokens: &mut [Token]) {
    for token in tokens.iter_mut().filter(|t| t.kind == INLINE) {
        token.children = tokenize_inline(grammar, &token.content, 0);
    }
}

/// The `newline` rule: soft breaks stay as newlines, two trailing spaces make a hard break.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NewlineRule;

impl InlineRule for NewlineRule {
    fn name(&self) -> &str {
        "newline"
    }

    fn markers(&self) -> Vec<char> {
        vec!['\n']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let trimmed = state.pending.trim_end_matches(' ').len();
        let trailing = state.pending.len() - trimmed;
        state.pending.truncate(trimmed);
        if trailing >= 2 && state.handles("hard_break") {
            state.push(Token::leaf("hard_break"));
        } else {
            state.push_pending("\n");
        }
        state.advance(1);
        skip_spaces(state);
        true
    }
}

/// The `escape` rule: backslash escapes and backslash hard breaks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EscapeRule;

impl InlineRule for EscapeRule {
    fn name(&self) -> &str {
        "escape"
    }

    fn markers(&self) -> Vec<char> {
        vec!['\\']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let next = state.rest().chars().nth(1);
        match next {
            Some(c) if c.is_ascii_punctuation() => {
                state.pending.push(c);
                state.advance(1 + c.len_utf8());
            }
            Some('\n') if state.handles("hard_break") => {
                state.push(Token::leaf("hard_break"));
                state.advance(2);
                skip_spaces(state);
            }
            _ => {
                state.pending.push('\\');
                state.advance(1);
            }
        }
        true
    }
}

fn skip_spaces(state: &mut InlineState) {
    let spaces = state.rest().len() - state.rest().trim_start_matches(' ').len();
    state.advance(spaces);
}

/// Remove backslash escapes in front of ASCII punctuation
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_punctuation) {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Given source starting with `[`, find the byte offset of the matching `]`. Brackets nest,
/// escaped brackets and brackets in code spans do not count.
pub fn label_end(src: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut iter = src.char_indices();
    while let Some((i, c)) = iter.next() {
        match c {
            '\\' => {
                iter.next();
            }
            '`' => {
                let run = src[i..].chars().take_while(|c| *c == '`').count();
                let fence = &src[i..i + run];
                if let Some(close) = src[i + run..].find(fence) {
                    let skip_to = i + run + close + run;
                    while iter.as_str().len() > src.len() - skip_to {
                        iter.next();
                    }
                } else {
                    for _ in 1..run {
                        iter.next();
                    }
                }
            }
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// A link destination with an optional title
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    /// The destination
    pub href: String,
    /// The title
    pub title: Option<String>,
    /// The number of bytes consumed, including the parentheses
    pub len: usize,
}

/// Parse `(destination "title")` at the start of `src`
pub fn link_target(src: &str) -> Option<LinkTarget> {
    let inner = src.strip_prefix('(')?;
    let mut rest = inner.trim_start();
    let href = if let Some(angle) = rest.strip_prefix('<') {
        let end = angle.find(|c| c == '>' || c == '\n')?;
        if !angle[end..].starts_with('>') {
            return None;
        }
        rest = &angle[end + 1..];
        unescape(&angle[..end])
    } else {
        let mut parens = 0usize;
        let mut end = rest.len();
        let mut iter = rest.char_indices();
        while let Some((i, c)) = iter.next() {
            match c {
                '\\' => {
                    iter.next();
                }
                '(' => parens += 1,
                ')' if parens == 0 => {
                    end = i;
                    break;
                }
                ')' => parens -= 1,
                c if c.is_whitespace() => {
                    end = i;
                    break;
                }
                _ => {}
            }
        }
        let href = unescape(&rest[..end]);
        rest = &rest[end..];
        href
    };
    let trimmed = rest.trim_start();
    let (title, after) = match trimmed.chars().next() {
        Some(open @ '"') | Some(open @ '\'') | Some(open @ '(') => {
            if trimmed.len() == rest.len() && !href.is_empty() {
                return None;
            }
            let close = if open == '(' { ')' } else { open };
            let body = &trimmed[1..];
            let mut end = None;
            let mut iter = body.char_indices();
            while let Some((i, c)) = iter.next() {
                if c == '\\' {
                    iter.next();
                } else if c == close {
                    end = Some(i);
                    break;
                }
            }
            let end = end?;
            (Some(unescape(&body[..end])), body[end + 1..].trim_start())
        }
        _ => (None, trimmed),
    };
    let after = after.strip_prefix(')')?;
    Some(LinkTarget {
        href,
        title,
        len: src.len() - after.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\*b\\c\d"), r"a*b\c\d");
    }

    #[test]
    fn test_label_end() {
        assert_eq!(label_end("[a]"), Some(2));
        assert_eq!(label_end("[a [b] c](x)"), Some(8));
        assert_eq!(label_end(r"[a \] b]"), Some(7));
        assert_eq!(label_end("[`]` x]"), Some(6));
        assert_eq!(label_end("[open"), None);
    }

    #[test]
    fn test_link_target() {
        let target = link_target(r#"(http://a.b "T \"q\"") rest"#).unwrap();
        assert_eq!(target.href, "http://a.b");
        assert_eq!(target.title.as_deref(), Some(r#"T "q""#));
        assert_eq!(target.len, 22);

        let target = link_target("(a\\(b\\))").unwrap();
        assert_eq!(target.href, "a(b)");
        assert_eq!(target.title, None);

        let target = link_target("(<a b>)").unwrap();
        assert_eq!(target.href, "a b");
        assert!(link_target("(a b c)").is_none());
        assert!(link_target("(a").is_none());
    }
}
