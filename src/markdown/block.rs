//! The block-level tokenizer.
use super::{DegradedKind, Grammar, MarkdownOptions, ParseDegraded, Token};
use log::warn;
use std::cell::RefCell;

/// A rule of the block tokenizer. Rules are tried in order at the start of every block; the
/// first one that returns `true` has consumed lines and pushed tokens.
pub trait BlockRule: Send + Sync {
    /// The name other rules use as placement anchor
    fn name(&self) -> &str;

    /// Try to match at the current line
    fn run(&self, state: &mut BlockState) -> bool;

    /// Whether `line` starts a block of this rule in the middle of a paragraph
    fn interrupts_paragraph(&self, _state: &BlockState, _line: &str) -> bool {
        false
    }
}

pub(crate) struct ParseContext<'a> {
    pub(crate) grammar: &'a Grammar,
    pub(crate) options: &'a MarkdownOptions,
    pub(crate) diagnostics: RefCell<Vec<ParseDegraded>>,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(grammar: &'a Grammar, options: &'a MarkdownOptions) -> Self {
        Self {
            grammar,
            options,
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn report(&self, kind: DegradedKind, message: String) {
        self.diagnostics
            .borrow_mut()
            .push(ParseDegraded { kind, message });
    }
}

/// The state of the block tokenizer for one container level
pub struct BlockState<'a> {
    lines: Vec<String>,
    line: usize,
    tokens: Vec<Token>,
    depth: usize,
    blank_between: bool,
    ctx: &'a ParseContext<'a>,
}

/// The result of tokenizing the lines of a container
#[derive(Debug, Clone, PartialEq)]
pub struct Nested {
    /// The block tokens
    pub tokens: Vec<Token>,
    /// Whether a blank line separated two of the blocks
    pub blank_between: bool,
}

impl<'a> BlockState<'a> {
    pub(crate) fn new(lines: Vec<String>, depth: usize, ctx: &'a ParseContext<'a>) -> Self {
        Self {
            lines,
            line: 0,
            tokens: Vec::new(),
            depth,
            blank_between: false,
            ctx,
        }
    }

    /// The current line
    pub fn line(&self) -> Option<&str> {
        self.line_at(self.line)
    }

    /// The line at the given index
    pub fn line_at(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// The index of the current line
    pub fn line_index(&self) -> usize {
        self.line
    }

    /// The number of lines at this level
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Consume lines
    pub fn advance(&mut self, lines: usize) {
        self.line = usize::min(self.line + lines, self.lines.len());
    }

    /// Push a token
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Push the tokens of a paragraph with the given inline source
    pub fn push_paragraph(&mut self, text: &str) {
        self.tokens.extend(paragraph_tokens(text));
    }

    /// The container nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The markdown options
    pub fn options(&self) -> &MarkdownOptions {
        self.ctx.options
    }

    pub(crate) fn grammar(&self) -> &Grammar {
        self.ctx.grammar
    }

    /// Whether some extension handles tokens of this kind
    pub fn handles(&self, kind: &str) -> bool {
        self.ctx.grammar.handlers.contains_key(kind)
    }

    /// Record a diagnostic
    pub fn report(&self, kind: DegradedKind, message: String) {
        self.ctx.report(kind, message)
    }

    /// Whether any rule can interrupt a paragraph with this line
    pub fn interrupts_paragraph(&self, line: &str) -> bool {
        self.ctx
            .grammar
            .block_rules
            .iter()
            .any(|rule| rule.interrupts_paragraph(self, line))
    }

    /// Tokenize the lines of a container with the same grammar, one level deeper.
    pub fn tokenize_nested(&self, lines: Vec<String>) -> Nested {
        if self.depth + 1 >= self.ctx.options.max_nesting {
            self.report(
                DegradedKind::NestingTooDeep,
                format!("containers nested deeper than {}", self.ctx.options.max_nesting),
            );
            let text = lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            let tokens = if text.is_empty() {
                Vec::new()
            } else {
                paragraph_tokens(&text)
            };
            return Nested {
                tokens,
                blank_between: false,
            };
        }
        BlockState::new(lines, self.depth + 1, self.ctx).tokenize()
    }

    pub(crate) fn tokenize(mut self) -> Nested {
        let grammar = self.ctx.grammar;
        let mut seen_blank = false;
        while self.line < self.lines.len() {
            if is_blank(&self.lines[self.line]) {
                seen_blank = true;
                self.line += 1;
                continue;
            }
            if seen_blank && !self.tokens.is_empty() {
                self.blank_between = true;
            }
            seen_blank = false;

            let start = self.line;
            let matched = grammar.block_rules.iter().any(|rule| rule.run(&mut self));
            if !matched || self.line == start {
                if matched {
                    warn!("block rule matched without consuming line {}", start);
                }
                let text = self.lines[start].trim().to_owned();
                self.tokens.push(Token::inline(&text));
                self.line = start + 1;
            }
        }
        Nested {
            tokens: self.tokens,
            blank_between: self.blank_between,
        }
    }
}

/// The tokens of a paragraph
pub(crate) fn paragraph_tokens(text: &str) -> Vec<Token> {
    vec![
        Token::open("paragraph"),
        Token::inline(text),
        Token::close("paragraph"),
    ]
}

/// True for lines with only whitespace
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// The number of leading spaces
pub fn indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Remove up to `n` leading spaces
pub fn strip_indent(line: &str, n: usize) -> String {
    let remove = usize::min(indent(line), n);
    line[remove..].to_owned()
}

/// An opening fence: the fence character, its length, the indent and the info string
pub fn fence_open(line: &str) -> Option<(char, usize, usize, &str)> {
    let base = indent(line);
    if base > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    Some((ch, len, base, info))
}

/// Whether `line` closes a fence opened with `len` times `ch`
pub fn is_fence_close(line: &str, ch: char, len: usize) -> bool {
    let trimmed = line.trim();
    indent(line) <= 3
        && trimmed.len() >= len
        && trimmed.chars().all(|c| c == ch)
}

/// Expand tabs in the leading whitespace of a line to 4-column stops
pub fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    let mut rest = line;
    for (i, c) in line.char_indices() {
        match c {
            ' ' => {
                out.push(' ');
                col += 1;
            }
            '\t' => {
                let width = 4 - col % 4;
                out.extend(std::iter::repeat(' ').take(width));
                col += width;
            }
            _ => {
                rest = &line[i..];
                break;
            }
        }
        rest = &line[i + c.len_utf8()..];
    }
    out.push_str(rest);
    out
}

/// Split a document into lines, expanding leading tabs
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(expand_tabs).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_open() {
        assert_eq!(fence_open("```rust"), Some(('`', 3, 0, "rust")));
        assert_eq!(fence_open("  ~~~~ a b"), Some(('~', 4, 2, "a b")));
        assert_eq!(fence_open("``"), None);
        assert_eq!(fence_open("``` a`b"), None);
        assert!(is_fence_close("````", '`', 3));
        assert!(!is_fence_close("``", '`', 3));
        assert!(!is_fence_close("~~~", '`', 3));
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("\tfoo"), "    foo");
        assert_eq!(expand_tabs("  \tfoo\tbar"), "    foo\tbar");
        assert_eq!(expand_tabs("foo"), "foo");
        assert_eq!(expand_tabs("  "), "  ");
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("    code", 4), "code");
        assert_eq!(strip_indent("  x", 4), "x");
        assert_eq!(indent("   - a"), 3);
    }
}
