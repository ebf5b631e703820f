//! The generic delimiter engine behind emphasis-like marks.
use super::{InlineRule, InlineState, Token};
use std::collections::BTreeMap;

/// The registered delimiters: character, then run length, then mark name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DelimiterTable {
    by_char: BTreeMap<char, BTreeMap<usize, String>>,
}

impl DelimiterTable {
    /// Register a delimiter string. Fails when it is malformed or already claimed.
    pub(crate) fn insert(&mut self, delim: &str, mark: &str) -> Result<(), String> {
        let mut chars = delim.chars();
        let ch = match chars.next() {
            Some(ch) if chars.all(|c| c == ch) => ch,
            _ => return Err(format!("delimiter `{}` must repeat a single character", delim)),
        };
        let len = delim.chars().count();
        let lengths = self.by_char.entry(ch).or_default();
        match lengths.get(&len) {
            Some(other) => Err(format!(
                "delimiter `{}` claimed by `{}` and `{}`",
                delim, other, mark
            )),
            None => {
                lengths.insert(len, mark.to_owned());
                Ok(())
            }
        }
    }

    pub(crate) fn chars(&self) -> Vec<char> {
        self.by_char.keys().copied().collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_char.is_empty()
    }

    fn longest_fit(&self, ch: char, max: usize) -> Option<(usize, &str)> {
        self.by_char
            .get(&ch)?
            .range(..=max)
            .next_back()
            .map(|(len, mark)| (*len, mark.as_str()))
    }
}

/// A run of delimiter characters in the inline token stream
#[derive(Debug, Clone)]
pub(crate) struct Delimiter {
    token: usize,
    ch: char,
    length: usize,
    remaining: usize,
    can_open: bool,
    can_close: bool,
    active: bool,
    opens: Vec<(usize, String)>,
    closes: Vec<(usize, String)>,
}

fn is_punct(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace() && !c.is_control())
}

/// Compute whether a run can open and close from its neighbouring characters
fn flanking(ch: char, before: Option<char>, after: Option<char>) -> (bool, bool) {
    let prev = before.unwrap_or(' ');
    let next = after.unwrap_or(' ');
    let left = !next.is_whitespace()
        && (!is_punct(next) || prev.is_whitespace() || is_punct(prev));
    let right = !prev.is_whitespace()
        && (!is_punct(prev) || next.is_whitespace() || is_punct(next));
    if ch == '_' {
        (left && (!right || is_punct(prev)), right && (!left || is_punct(next)))
    } else {
        (left, right)
    }
}

/// The `emphasis` rule: scans delimiter runs for every registered delimiter character.
#[derive(Debug, Clone, new)]
pub(crate) struct EmphasisRule {
    chars: Vec<char>,
}

impl InlineRule for EmphasisRule {
    fn name(&self) -> &str {
        "emphasis"
    }

    fn markers(&self) -> Vec<char> {
        self.chars.clone()
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let ch = match state.peek() {
            Some(ch) if self.chars.contains(&ch) => ch,
            _ => return false,
        };
        let before = state.char_before();
        let length = state.rest().chars().take_while(|c| *c == ch).count();
        let after = state.rest().chars().nth(length);
        let (can_open, can_close) = flanking(ch, before, after);

        let run: String = std::iter::repeat(ch).take(length).collect();
        let token = state.push_delimiter_text(&run);
        state.advance(run.len());
        state.delimiters.push(Delimiter {
            token,
            ch,
            length,
            remaining: length,
            can_open,
            can_close,
            active: true,
            opens: Vec::new(),
            closes: Vec::new(),
        });
        true
    }
}

/// Match closers to openers and turn the runs into mark tokens. Unmatched characters stay
/// literal text.
pub(crate) fn balance(
    tokens: Vec<Token>,
    delimiters: &mut [Delimiter],
    table: &DelimiterTable,
) -> Vec<Token> {
    for closer in 0..delimiters.len() {
        if !delimiters[closer].can_close {
            continue;
        }
        while delimiters[closer].remaining > 0 {
            let found = find_opener(delimiters, closer, table);
            let (opener, len, mark) = match found {
                Some(found) => found,
                None => break,
            };
            delimiters[opener].opens.push((len, mark.clone()));
            delimiters[opener].remaining -= len;
            delimiters[closer].closes.push((len, mark));
            delimiters[closer].remaining -= len;
            for between in &mut delimiters[opener + 1..closer] {
                between.active = false;
            }
        }
    }
    expand(tokens, delimiters)
}

fn find_opener(
    delimiters: &[Delimiter],
    closer: usize,
    table: &DelimiterTable,
) -> Option<(usize, usize, String)> {
    let c = &delimiters[closer];
    for o in (0..closer).rev() {
        let d = &delimiters[o];
        if !d.active || d.ch != c.ch || !d.can_open || d.remaining == 0 {
            continue;
        }
        // rule of 3
        if (d.can_close || c.can_open)
            && (d.length + c.length) % 3 == 0
            && !(d.length % 3 == 0 && c.length % 3 == 0)
            && (c.ch == '*' || c.ch == '_')
        {
            continue;
        }
        let max = usize::min(d.remaining, c.remaining);
        if let Some((len, mark)) = table.longest_fit(c.ch, max) {
            return Some((o, len, mark.to_owned()));
        }
    }
    None
}

fn expand(tokens: Vec<Token>, delimiters: &[Delimiter]) -> Vec<Token> {
    let by_token: BTreeMap<usize, &Delimiter> =
        delimiters.iter().map(|d| (d.token, d)).collect();
    let mut out = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.into_iter().enumerate() {
        let d = match by_token.get(&i) {
            Some(d) => d,
            None => {
                out.push(token);
                continue;
            }
        };
        for (len, mark) in &d.closes {
            out.push(Token::close(mark).markup(&repeat(d.ch, *len)));
        }
        if d.remaining > 0 {
            out.push(Token::text(&repeat(d.ch, d.remaining)));
        }
        for (len, mark) in d.opens.iter().rev() {
            out.push(Token::open(mark).markup(&repeat(d.ch, *len)));
        }
    }
    out
}

fn repeat(ch: char, n: usize) -> String {
    std::iter::repeat(ch).take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flanking() {
        assert_eq!(flanking('*', Some('a'), Some('b')), (true, true));
        assert_eq!(flanking('*', Some(' '), Some(' ')), (false, false));
        assert_eq!(flanking('*', None, Some('a')), (true, false));
        assert_eq!(flanking('*', Some('a'), None), (false, true));
        assert_eq!(flanking('_', Some('a'), Some('b')), (false, false));
        assert_eq!(flanking('_', Some('('), Some('a')), (true, false));
    }

    #[test]
    fn test_table() {
        let mut table = DelimiterTable::default();
        table.insert("*", "em").unwrap();
        table.insert("**", "strong").unwrap();
        assert!(table.insert("**", "bold").is_err());
        assert!(table.insert("*=", "bad").is_err());
        assert_eq!(table.longest_fit('*', 3), Some((2, "strong")));
        assert_eq!(table.longest_fit('*', 1), Some((1, "em")));
        assert_eq!(table.longest_fit('=', 2), None);
        assert_eq!(table.chars(), vec!['*']);
    }
}
