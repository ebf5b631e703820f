use serde::{Deserialize, Serialize};

/// How hard breaks are written
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardBreakStyle {
    /// A backslash at the end of the line
    Backslash,
    /// Two spaces at the end of the line
    Spaces,
}

/// Options for reading and writing markdown, attached to a schema at composition.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// The bullet for unordered and checkbox lists
    pub bullet: char,
    /// The bullet for a list that directly follows a list of the same type
    pub alternate_bullet: char,
    /// The delimiter after ordered list numbers
    pub ordered_delimiter: char,
    /// How hard breaks are written
    pub hard_break: HardBreakStyle,
    /// Whether table cells are padded to the column width
    pub pad_tables: bool,
    /// The maximum nesting of block containers
    pub max_nesting: usize,
    /// Whether lists created by commands are tight
    pub tight_lists: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            bullet: '-',
            alternate_bullet: '*',
            ordered_delimiter: '.',
            hard_break: HardBreakStyle::Backslash,
            pad_tables: true,
            max_nesting: 32,
            tight_lists: true,
        }
    }
}

impl MarkdownOptions {
    /// The delimiter for an ordered list directly following another one
    pub fn alternate_delimiter(&self) -> char {
        if self.ordered_delimiter == '.' {
            ')'
        } else {
            '.'
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options() {
        let opts: MarkdownOptions =
            serde_json::from_str(r#"{"bullet": "*", "hard_break": "spaces"}"#).unwrap();
        assert_eq!(opts.bullet, '*');
        assert_eq!(opts.hard_break, HardBreakStyle::Spaces);
        assert_eq!(opts.max_nesting, 32);
        assert_eq!(opts.alternate_delimiter(), ')');
    }
}
