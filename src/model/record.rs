//! The lossless record form of a tree, as plain serializable data.
use super::{AttrError, Attrs, Fragment, MarkSet, Node, Schema, Text};
use crate::de::deserialize_or_default;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors when converting a record into a tree
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum RecordError {
    /// unknown node type `{0}`
    UnknownNodeType(String),
    /// unknown mark type `{0}`
    UnknownMarkType(String),
    /// invalid attributes on `{name}`: {source}
    InvalidAttrs {
        /// The node or mark type
        name: String,
        /// The cause
        source: AttrError,
    },
    /// invalid content for node `{0}`
    InvalidContent(String),
    /// text node without text
    MissingText,
}

/// The record form of a mark
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarkRecord {
    /// The name of the mark type
    #[serde(rename = "type")]
    pub ty: String,
    /// The attributes
    #[serde(
        default,
        deserialize_with = "deserialize_or_default",
        skip_serializing_if = "Attrs::is_empty"
    )]
    pub attrs: Attrs,
}

/// The record form of a node
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeRecord {
    /// The name of the node type
    #[serde(rename = "type")]
    pub ty: String,
    /// The attributes
    #[serde(
        default,
        deserialize_with = "deserialize_or_default",
        skip_serializing_if = "Attrs::is_empty"
    )]
    pub attrs: Attrs,
    /// The children
    #[serde(
        default,
        deserialize_with = "deserialize_or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<NodeRecord>,
    /// The marks
    #[serde(
        default,
        deserialize_with = "deserialize_or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub marks: Vec<MarkRecord>,
    /// The text of a text node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Convert a tree to its record form. Every attribute is written, nothing is merged.
pub fn tree_to_record(node: &Node) -> NodeRecord {
    NodeRecord {
        ty: node.type_name().to_owned(),
        attrs: node.attrs().clone(),
        content: node.content().children().iter().map(tree_to_record).collect(),
        marks: node
            .marks()
            .iter()
            .map(|m| MarkRecord {
                ty: m.type_name().to_owned(),
                attrs: m.attrs().clone(),
            })
            .collect(),
        text: node.text().map(str::to_owned),
    }
}

/// Convert a record back into a tree, validating it against the schema.
pub fn record_to_tree(schema: &Schema, record: &NodeRecord) -> Result<Node, RecordError> {
    let mut marks = MarkSet::new();
    for m in &record.marks {
        let ty = schema
            .mark_type(&m.ty)
            .ok_or_else(|| RecordError::UnknownMarkType(m.ty.clone()))?;
        let mark = ty.create(&m.attrs).map_err(|source| RecordError::InvalidAttrs {
            name: m.ty.clone(),
            source,
        })?;
        marks = mark.add_to_set(&marks);
    }

    let ty = schema
        .node_type(&record.ty)
        .ok_or_else(|| RecordError::UnknownNodeType(record.ty.clone()))?;

    if ty.is_text() {
        return match &record.text {
            Some(text) if !text.is_empty() => {
                Ok(Node::new_text(ty.clone(), Text::from(text.clone()), marks))
            }
            _ => Err(RecordError::MissingText),
        };
    }

    let content = record
        .content
        .iter()
        .map(|c| record_to_tree(schema, c))
        .collect::<Result<Vec<_>, _>>()?;
    let content = Fragment::from(content);
    if !ty.valid_content(&content) {
        return Err(RecordError::InvalidContent(record.ty.clone()));
    }
    ty.create(&record.attrs, content, marks)
        .map_err(|source| RecordError::InvalidAttrs {
            name: record.ty.clone(),
            source,
        })
}
