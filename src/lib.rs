#![warn(missing_docs)]
//! # prosemark
//!
//! A structured document engine with a round-tripping markdown dialect. The document model
//! follows the [ProseMirror](https://prosemirror.net) API. Node and mark types are not fixed:
//! they are declared by [extensions](extension::Extension) and composed into a
//! [`Schema`](model::Schema) at runtime, together with the markdown grammar, the writers and
//! the commands of every type.
//!
//! ```
//! use prosemark::{extensions::default_schema, parse, serialize};
//!
//! let schema = default_schema();
//! let doc = parse(&schema, "# Hello\n\nSome ==highlighted== text :smile:");
//! assert_eq!(serialize(&schema, &doc), "# Hello\n\nSome ==highlighted== text :smile:");
//! ```

#[macro_use]
extern crate derive_new;

pub mod commands;
pub(crate) mod de;
pub mod extension;
pub mod extensions;
pub mod markdown;
pub mod model;
pub mod transform;
pub mod util;

pub use commands::{apply_command, list_commands, Command, CommandFactory, Selection};
pub use extension::{compose_schema, compose_schema_with, Extension, SchemaError};
pub use markdown::{parse, parse_with_diagnostics, serialize, MarkdownOptions, Parsed};
pub use model::{record_to_tree, tree_to_record, Node, NodeRecord, Schema};
