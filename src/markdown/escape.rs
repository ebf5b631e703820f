use derivative::Derivative;
use std::sync::Arc;

/// Decides whether the character at a byte offset of a text needs escaping
pub type EscapePredicate = Arc<dyn Fn(&str, usize) -> bool + Send + Sync>;

/// A character that needs a backslash when it appears in text
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Escape {
    /// The character
    pub ch: char,
    /// Escape only where this holds
    #[derivative(Debug = "ignore")]
    pub when: Option<EscapePredicate>,
}

impl Escape {
    /// Always escape `ch`
    pub fn always(ch: char) -> Self {
        Self { ch, when: None }
    }

    /// Escape `ch` where the predicate holds
    pub fn when<F>(ch: char, predicate: F) -> Self
    where
        F: Fn(&str, usize) -> bool + Send + Sync + 'static,
    {
        Self {
            ch,
            when: Some(Arc::new(predicate)),
        }
    }

    fn applies(&self, text: &str, at: usize) -> bool {
        self.when.as_ref().map(|f| f(text, at)).unwrap_or(true)
    }
}

fn is_word(c: Option<char>) -> bool {
    c.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false)
}

/// Escape markdown syntax in a line of text
pub(crate) fn escape_text(text: &str, start_of_line: bool, extra: &[Escape]) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for (i, c) in text.char_indices() {
        let needs = match c {
            '\\' | '`' | '*' | '~' | '[' | ']' => true,
            '_' => !(is_word(text[..i].chars().next_back()) && is_word(text[i + 1..].chars().next())),
            _ => extra.iter().any(|e| e.ch == c && e.applies(text, i)),
        };
        if needs {
            out.push('\\');
        }
        out.push(c);
    }
    if start_of_line {
        escape_line_start(out)
    } else {
        out
    }
}

fn escape_line_start(text: String) -> String {
    let lead = text.len() - text.trim_start().len();
    let (space, body) = text.split_at(lead);
    let mut chars = body.chars();
    let first = chars.next();
    let second = chars.next();
    let escaped = match first {
        Some('>') | Some('-') | Some('|') => Some(1),
        Some('+') if second.map(char::is_whitespace).unwrap_or(true) => Some(1),
        Some('#') => {
            let hashes = body.chars().take_while(|c| *c == '#').count();
            let after = body[hashes..].chars().next();
            if hashes <= 6 && after.map(char::is_whitespace).unwrap_or(true) {
                Some(1)
            } else {
                None
            }
        }
        Some(':') if second == Some(':') => Some(1),
        Some('=') if body.trim_end().chars().all(|c| c == '=') => Some(1),
        Some(d) if d.is_ascii_digit() => {
            let digits = body.chars().take_while(char::is_ascii_digit).count();
            let mut rest = body[digits..].chars();
            match (rest.next(), rest.next()) {
                (Some('.'), next) | (Some(')'), next)
                    if digits <= 9 && next.map(char::is_whitespace).unwrap_or(true) =>
                {
                    return format!("{}{}\\{}", space, &body[..digits], &body[digits..]);
                }
                _ => None,
            }
        }
        _ => None,
    };
    match escaped {
        Some(_) => format!("{}\\{}", space, body),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_escapes() {
        assert_eq!(escape_text("a*b*", false, &[]), r"a\*b\*");
        assert_eq!(escape_text("snake_case", false, &[]), "snake_case");
        assert_eq!(escape_text("_lead", false, &[]), r"\_lead");
        assert_eq!(escape_text("[x]", false, &[]), r"\[x\]");
    }

    #[test]
    fn test_line_start() {
        assert_eq!(escape_text("# no heading", true, &[]), r"\# no heading");
        assert_eq!(escape_text("#hashtag", true, &[]), "#hashtag");
        assert_eq!(escape_text("- item", true, &[]), r"\- item");
        assert_eq!(escape_text("+ item", true, &[]), r"\+ item");
        assert_eq!(escape_text("+1", true, &[]), "+1");
        assert_eq!(escape_text("3. point", true, &[]), r"3\. point");
        assert_eq!(escape_text("2021", true, &[]), "2021");
        assert_eq!(escape_text("::video", true, &[]), r"\::video");
        assert_eq!(escape_text("> quote", false, &[]), "> quote");
    }

    #[test]
    fn test_extra_escapes() {
        let extra = [
            Escape::always('$'),
            Escape::when('=', |text, i| {
                text[..i].ends_with('=') || text[i + 1..].starts_with('=')
            }),
        ];
        assert_eq!(escape_text("$5 == 5", false, &extra), r"\$5 \=\= 5");
        assert_eq!(escape_text("a = b", false, &extra), "a = b");
    }
}
