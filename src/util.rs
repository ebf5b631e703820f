//! # Generic utilities

/// Convert a snake case name to upper camel case: `bullet_list` becomes `BulletList`.
pub fn camel_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// The length of the longest run of `ch` in `text`
pub fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Whether `text` starts with a URL scheme such as `https:` or `mailto:`
pub fn has_scheme(text: &str) -> bool {
    match text.find(':') {
        Some(end) if end >= 2 && end <= 32 => {
            let scheme = &text[..end];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("bullet_list"), "BulletList");
        assert_eq!(camel_case("em"), "Em");
        assert_eq!(camel_case("code_inline"), "CodeInline");
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run("a ``b` c", '`'), 2);
        assert_eq!(longest_run("none", '`'), 0);
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("mailto:a@b.c"));
        assert!(!has_scheme("C:/"));
        assert!(!has_scheme("no scheme"));
        assert!(!has_scheme("1ab:x"));
    }
}
