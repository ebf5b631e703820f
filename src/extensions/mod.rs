//! # The built-in extensions
//!
//! Every function returns the descriptor of one node or mark type. [`default_extensions`]
//! lists all of them in the order that gives the marks their rank.
pub mod basic;
pub mod code;
pub mod lists;
pub mod marks;
pub mod media;
pub mod table;

use crate::extension::{compose_schema, Extension};
use crate::model::Schema;

/// All built-in extensions: the nodes first, then the marks from lowest to highest rank.
pub fn default_extensions() -> Vec<Extension> {
    vec![
        basic::doc(),
        basic::paragraph(),
        basic::text(),
        basic::heading(),
        basic::blockquote(),
        code::code_block(),
        code::math_block(),
        basic::horizontal_rule(),
        lists::bullet_list(),
        lists::ordered_list(),
        lists::list_item(),
        lists::checkbox_list(),
        lists::checkbox_item(),
        table::table(),
        table::tr(),
        table::th(),
        table::td(),
        media::notice(),
        media::embed(),
        media::video(),
        media::attachment(),
        media::image(),
        media::emoji(),
        code::math_inline(),
        basic::hard_break(),
        marks::strong(),
        marks::em(),
        marks::underline(),
        marks::strikethrough(),
        marks::highlight(),
        marks::subscript(),
        marks::superscript(),
        marks::link(),
        code::code_inline(),
    ]
}

/// The schema composed from [`default_extensions`].
///
/// # Panics
///
/// Panics if the built-in extensions do not compose, which the tests of this module rule out.
pub fn default_schema() -> Schema {
    compose_schema(&default_extensions())
        .unwrap_or_else(|e| panic!("the built-in extensions do not compose: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions_compose() {
        let schema = compose_schema(&default_extensions()).unwrap();
        assert_eq!(schema.mark_type("strong").unwrap().rank(), 0);
        assert_eq!(schema.mark_type("code_inline").unwrap().rank(), 8);
        for name in &["heading", "notice", "createTable", "createEmoji", "createLink"] {
            assert!(schema.command(name).is_some(), "missing command {}", name);
        }
    }

    #[test]
    fn test_schema_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
