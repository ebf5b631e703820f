use crate::model::Attrs;
use serde::{Deserialize, Serialize};

/// Whether a token opens, closes or stands for a whole node or mark
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    /// Starts a node or mark
    Open,
    /// Ends a node or mark
    Close,
    /// A complete leaf
    SelfContained,
}

/// A flat unit of tokenizer output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Token {
    /// The kind, usually the name of the node or mark it maps to
    pub kind: String,
    /// Open, close or self-contained
    pub nesting: Nesting,
    /// Text content: the raw inline source for `inline` tokens, the literal text otherwise
    #[serde(default)]
    pub content: String,
    /// Attributes collected by the tokenizer rule
    #[serde(default)]
    pub attrs: Attrs,
    /// The markup characters that produced the token
    #[serde(default)]
    pub markup: String,
    /// The info string of fences and directives
    #[serde(default)]
    pub info: String,
    /// The inline token stream of an `inline` token
    #[serde(default)]
    pub children: Vec<Token>,
}

/// The kind of tokens that carry inline source
pub const INLINE: &str = "inline";
/// The kind of plain text tokens
pub const TEXT: &str = "text";

impl Token {
    fn with_nesting(kind: &str, nesting: Nesting) -> Self {
        Token {
            kind: kind.to_owned(),
            nesting,
            content: String::new(),
            attrs: Attrs::new(),
            markup: String::new(),
            info: String::new(),
            children: Vec::new(),
        }
    }

    /// An opening token
    pub fn open(kind: &str) -> Self {
        Self::with_nesting(kind, Nesting::Open)
    }

    /// A closing token
    pub fn close(kind: &str) -> Self {
        Self::with_nesting(kind, Nesting::Close)
    }

    /// A self-contained token
    pub fn leaf(kind: &str) -> Self {
        Self::with_nesting(kind, Nesting::SelfContained)
    }

    /// A text token
    pub fn text(content: &str) -> Self {
        Self::leaf(TEXT).content(content)
    }

    /// A token holding inline source for the inline tokenizer
    pub fn inline(content: &str) -> Self {
        Self::leaf(INLINE).content(content)
    }

    /// Set the content
    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_owned();
        self
    }

    /// Set the markup
    pub fn markup(mut self, markup: &str) -> Self {
        self.markup = markup.to_owned();
        self
    }

    /// Set the info string
    pub fn info(mut self, info: &str) -> Self {
        self.info = info.to_owned();
        self
    }

    /// Set the attributes
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}
