use displaydoc::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The value of a node or mark attribute
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// No value
    Null,
    /// A boolean
    Bool(bool),
    /// An integer
    Int(i64),
    /// A floating point number
    Float(f64),
    /// A string
    String(String),
    /// A list of values
    List(Vec<AttrValue>),
    /// A nested record
    Record(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Get the string, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer, if this is a whole number
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn kind_matches(&self, kind: AttrKind) -> bool {
        match (kind, self) {
            (AttrKind::Any, _) => true,
            (AttrKind::Bool, Self::Bool(_)) => true,
            (AttrKind::Number, Self::Int(_)) | (AttrKind::Number, Self::Float(_)) => true,
            (AttrKind::String, Self::String(_)) => true,
            (AttrKind::List, Self::List(_)) => true,
            (AttrKind::Record, Self::Record(_)) => true,
            _ => false,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for AttrValue {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// The attributes of a node or mark, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<String, AttrValue>);

impl Attrs {
    /// An empty attribute map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, builder style
    pub fn with<V: Into<AttrValue>>(mut self, name: &str, value: V) -> Self {
        self.0.insert(name.to_owned(), value.into());
        self
    }

    /// Set an attribute
    pub fn insert<V: Into<AttrValue>>(&mut self, name: &str, value: V) {
        self.0.insert(name.to_owned(), value.into());
    }

    /// Get an attribute
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    /// Get a string attribute, treating `Null` and missing values as absent
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    /// Get a boolean attribute
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttrValue::as_bool)
    }

    /// Get an integer attribute
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    /// True if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the attributes in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    /// Merge another set of attributes into this one, the other side wins.
    pub fn merged(&self, other: &Attrs) -> Attrs {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }
}

impl FromIterator<(String, AttrValue)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The kind of value an attribute accepts
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum AttrKind {
    /// any
    Any,
    /// boolean
    Bool,
    /// number
    Number,
    /// string
    String,
    /// list
    List,
    /// record
    Record,
}

/// The declaration of one attribute
#[derive(Debug, Clone, PartialEq, new)]
pub struct AttrSpec {
    /// The accepted kind of value
    pub kind: AttrKind,
    /// The default value. Attributes without a default are required.
    pub default: Option<AttrValue>,
}

impl AttrSpec {
    /// A required attribute
    pub fn required(kind: AttrKind) -> Self {
        Self::new(kind, None)
    }

    /// A string attribute with a default
    pub fn string(default: &str) -> Self {
        Self::new(AttrKind::String, Some(default.into()))
    }

    /// A string attribute that defaults to `Null`
    pub fn optional_string() -> Self {
        Self::new(AttrKind::String, Some(AttrValue::Null))
    }

    /// A boolean attribute with a default
    pub fn bool(default: bool) -> Self {
        Self::new(AttrKind::Bool, Some(default.into()))
    }

    /// A number attribute with a default
    pub fn int(default: i64) -> Self {
        Self::new(AttrKind::Number, Some(default.into()))
    }

    /// True if the attribute has no default
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Check whether the value is acceptable for this attribute
    pub fn accepts(&self, value: &AttrValue) -> bool {
        value.kind_matches(self.kind)
            || (value.is_null() && matches!(self.default, Some(AttrValue::Null)))
    }
}

/// Errors when computing attributes
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum AttrError {
    /// unknown attribute `{0}`
    Unknown(String),
    /// missing required attribute `{0}`
    Missing(String),
    /// attribute `{name}` expects a {expected} value
    WrongKind {
        /// The attribute
        name: String,
        /// The declared kind
        expected: AttrKind,
    },
}

/// Build the complete attribute map for a type from the given values, filling in
/// defaults and validating kinds.
pub fn compute_attrs(specs: &[(String, AttrSpec)], given: &Attrs) -> Result<Attrs, AttrError> {
    if let Some((name, _)) = given
        .iter()
        .find(|(name, _)| !specs.iter().any(|(n, _)| n == *name))
    {
        return Err(AttrError::Unknown(name.clone()));
    }
    let mut out = Attrs::new();
    for (name, spec) in specs {
        let value = match (given.get(name), &spec.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => return Err(AttrError::Missing(name.clone())),
        };
        if !spec.accepts(&value) {
            return Err(AttrError::WrongKind {
                name: name.clone(),
                expected: spec.kind,
            });
        }
        out.0.insert(name.clone(), value);
    }
    Ok(out)
}

/// Like [`compute_attrs`], but drops unknown attributes and replaces values of the
/// wrong kind with the default instead of failing. Used where input must never fail.
pub fn coerce_attrs(specs: &[(String, AttrSpec)], given: &Attrs) -> Result<Attrs, AttrError> {
    let mut out = Attrs::new();
    for (name, spec) in specs {
        let value = match (given.get(name), &spec.default) {
            (Some(value), _) if spec.accepts(value) => value.clone(),
            (_, Some(default)) => default.clone(),
            (Some(_), None) => {
                return Err(AttrError::WrongKind {
                    name: name.clone(),
                    expected: spec.kind,
                })
            }
            (None, None) => return Err(AttrError::Missing(name.clone())),
        };
        out.0.insert(name.clone(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<(String, AttrSpec)> {
        vec![
            ("level".to_owned(), AttrSpec::int(1)),
            ("title".to_owned(), AttrSpec::optional_string()),
            ("src".to_owned(), AttrSpec::required(AttrKind::String)),
        ]
    }

    #[test]
    fn test_defaults() {
        let attrs = compute_attrs(&specs(), &Attrs::new().with("src", "a.png")).unwrap();
        assert_eq!(attrs.get_int("level"), Some(1));
        assert_eq!(attrs.get("title"), Some(&AttrValue::Null));
        assert_eq!(attrs.get_str("src"), Some("a.png"));
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            compute_attrs(&specs(), &Attrs::new()),
            Err(AttrError::Missing("src".to_owned()))
        );
        assert_eq!(
            compute_attrs(&specs(), &Attrs::new().with("src", "a").with("level", "x")),
            Err(AttrError::WrongKind {
                name: "level".to_owned(),
                expected: AttrKind::Number
            })
        );
        assert_eq!(
            compute_attrs(&specs(), &Attrs::new().with("src", "a").with("width", 3i64)),
            Err(AttrError::Unknown("width".to_owned()))
        );
    }

    #[test]
    fn test_coerce() {
        let attrs = coerce_attrs(
            &specs(),
            &Attrs::new().with("src", "a").with("level", "x").with("w", 1i64),
        )
        .unwrap();
        assert_eq!(attrs.get_int("level"), Some(1));
        assert!(attrs.get("w").is_none());
    }

    #[test]
    fn test_deserialize_values() {
        let attrs: Attrs =
            serde_json::from_str(r#"{"a": null, "b": true, "c": 3, "d": 1.5, "e": "x"}"#).unwrap();
        assert_eq!(attrs.get("a"), Some(&AttrValue::Null));
        assert_eq!(attrs.get("b"), Some(&AttrValue::Bool(true)));
        assert_eq!(attrs.get("c"), Some(&AttrValue::Int(3)));
        assert_eq!(attrs.get("d"), Some(&AttrValue::Float(1.5)));
        assert_eq!(attrs.get_str("e"), Some("x"));
    }
}
