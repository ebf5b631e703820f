use std::ops::{Bound, RangeBounds};

pub fn from<R: RangeBounds<usize>>(range: &R) -> usize {
    match range.start_bound() {
        Bound::Unbounded => 0,
        Bound::Included(x) => *x,
        Bound::Excluded(x) => x + 1,
    }
}

pub fn to<R: RangeBounds<usize>>(range: &R, max: usize) -> usize {
    match range.end_bound() {
        Bound::Unbounded => max,
        Bound::Included(x) => x + 1,
        Bound::Excluded(x) => *x,
    }
}

/// Split a string at an offset counted in UTF-16 code units.
///
/// An offset in the middle of a surrogate pair is rounded down to the start of the
/// character.
pub fn split_at_utf16(text: &str, mut index: usize) -> (&str, &str) {
    let mut iter = text.chars();
    while index > 0 {
        let rest = iter.as_str();
        if let Some(c) = iter.next() {
            let l = c.len_utf16();
            if l > index {
                let mid = text.len() - rest.len();
                return text.split_at(mid);
            }
            index -= l;
        } else {
            return (text, "");
        }
    }
    let mid = text.len() - iter.as_str().len();
    text.split_at(mid)
}

#[cfg(test)]
mod tests {
    use super::split_at_utf16;

    #[test]
    fn test_split_at_utf16() {
        assert_eq!(split_at_utf16("Hello", 2), ("He", "llo"));
        assert_eq!(split_at_utf16("a\u{1F60A}b", 3), ("a\u{1F60A}", "b"));
        assert_eq!(split_at_utf16("a\u{1F60A}b", 2), ("a", "\u{1F60A}b"));
        assert_eq!(split_at_utf16("ab", 7), ("ab", ""));
    }
}
