use super::{Extension, ExtensionKind, ToMarkdown};
use crate::commands::{insert_node, toggle_mark, CommandFactory};
use crate::markdown::{
    order_rules, BlockRule, ContainerDirectiveRule, DelimiterTable, DirectiveTable, EmphasisRule,
    EscapeRule, Grammar, HandlerTarget, InlineRule, LeafDirectiveRule, MarkdownOptions,
    NewlineRule, OrderError, Placement, TokenHandler,
};
use crate::model::{
    compile_content, AttrSpec, ContentExprError, Fragment, MarkSpec, MarkType, NodeSpec,
    NodeType, Schema, TOP_NODE,
};
use crate::util::camel_case;
use displaydoc::Display;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors when composing a schema from extensions
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// conflicting declarations: {0}
    SchemaConflict(String),
    /// the content of `{node}` references the unknown type or group `{name}`
    SchemaUnsatisfiable {
        /// The node with the content expression
        node: String,
        /// The unknown name
        name: String,
    },
    /// invalid content expression for `{node}`: {message}
    InvalidContentExpression {
        /// The node with the content expression
        node: String,
        /// The syntax error
        message: String,
    },
    /// the required content of `{0}` cannot be generated
    NotGeneratable(String),
    /// there is no `doc` node type
    MissingTopNode,
    /// `{by}` references the unknown mark or group `{mark}`
    UnknownMark {
        /// The type with the reference
        by: String,
        /// The unknown name
        mark: String,
    },
    /// the rule `{rule}` is placed relative to the unknown rule `{anchor}`
    UnknownRuleAnchor {
        /// The placed rule
        rule: String,
        /// The missing anchor
        anchor: String,
    },
    /// the placement of these rules is cyclic: {0:?}
    RuleCycle(Vec<String>),
    /// the default of attribute `{attr}` of `{name}` does not match its kind
    InvalidAttrDefault {
        /// The node or mark
        name: String,
        /// The attribute
        attr: String,
    },
}

impl From<OrderError> for SchemaError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UnknownAnchor { rule, anchor } => {
                SchemaError::UnknownRuleAnchor { rule, anchor }
            }
            OrderError::Cycle(rules) => SchemaError::RuleCycle(rules),
        }
    }
}

/// Compose a schema with the default markdown options
pub fn compose_schema(extensions: &[Extension]) -> Result<Schema, SchemaError> {
    compose_schema_with(extensions, MarkdownOptions::default())
}

/// Compose a schema from a list of extensions.
///
/// The order of the extensions defines the rank of the marks, breaks ties between
/// tokenizer rules and gives explicit commands priority.
pub fn compose_schema_with(
    extensions: &[Extension],
    options: MarkdownOptions,
) -> Result<Schema, SchemaError> {
    check_names(extensions)?;

    let node_specs: Vec<(&str, &NodeSpec)> = extensions
        .iter()
        .filter_map(|ext| match &ext.kind {
            ExtensionKind::Node(spec) => Some((ext.name.as_str(), spec)),
            ExtensionKind::Mark(_) => None,
        })
        .collect();
    let mark_specs: Vec<(&str, &MarkSpec)> = extensions
        .iter()
        .filter_map(|ext| match &ext.kind {
            ExtensionKind::Mark(spec) => Some((ext.name.as_str(), spec)),
            ExtensionKind::Node(_) => None,
        })
        .collect();

    if !node_specs.iter().any(|(name, _)| *name == TOP_NODE) {
        return Err(SchemaError::MissingTopNode);
    }
    for (name, attrs) in node_specs
        .iter()
        .map(|(n, s)| (*n, &s.attrs))
        .chain(mark_specs.iter().map(|(n, s)| (*n, &s.attrs)))
    {
        check_attr_defaults(name, attrs)?;
    }

    let nodes = build_node_types(&node_specs, &mark_specs)?;
    let marks = build_mark_types(&mark_specs)?;

    let mut schema = Schema {
        node_index: index_by_name(nodes.iter().map(|n| n.name())),
        mark_index: index_by_name(marks.iter().map(|m| m.name())),
        nodes,
        marks,
        grammar: Grammar::default(),
        commands: BTreeMap::new(),
        options,
    };

    for ty in &schema.nodes {
        if ty
            .content_match()
            .fill_before(&schema, &Fragment::new(), true)
            .is_none()
        {
            return Err(SchemaError::NotGeneratable(ty.name().to_owned()));
        }
    }

    schema.grammar = build_grammar(extensions)?;
    schema.commands = build_commands(extensions);
    debug!(
        "composed schema with {} node types and {} mark types",
        schema.nodes.len(),
        schema.marks.len()
    );
    Ok(schema)
}

fn check_names(extensions: &[Extension]) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();
    for ext in extensions {
        if !seen.insert(ext.name.as_str()) {
            return Err(SchemaError::SchemaConflict(format!(
                "`{}` is declared more than once",
                ext.name
            )));
        }
    }
    Ok(())
}

fn check_attr_defaults(name: &str, attrs: &[(String, AttrSpec)]) -> Result<(), SchemaError> {
    for (attr, spec) in attrs {
        if let Some(default) = &spec.default {
            if !spec.accepts(default) {
                return Err(SchemaError::InvalidAttrDefault {
                    name: name.to_owned(),
                    attr: attr.clone(),
                });
            }
        }
    }
    Ok(())
}

fn index_by_name<'a>(names: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    names
        .enumerate()
        .map(|(i, name)| (name.to_owned(), i))
        .collect()
}

fn split_names(list: &str) -> impl Iterator<Item = &str> {
    list.split_whitespace()
}

/// Members of each group, in declaration order
fn groups<'a, I>(items: I) -> BTreeMap<String, Vec<String>>
where
    I: Iterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, group) in items {
        for g in split_names(group.unwrap_or("")) {
            groups.entry(g.to_owned()).or_default().push(name.to_owned());
        }
    }
    groups
}

/// Resolve a list of mark names and groups
fn resolve_marks(
    by: &str,
    list: &str,
    mark_names: &[&str],
    mark_groups: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<String>, SchemaError> {
    let mut out = Vec::new();
    for name in split_names(list) {
        if mark_names.contains(&name) {
            out.push(name.to_owned());
        } else if let Some(members) = mark_groups.get(name) {
            out.extend(members.iter().cloned());
        } else {
            return Err(SchemaError::UnknownMark {
                by: by.to_owned(),
                mark: name.to_owned(),
            });
        }
    }
    Ok(out)
}

fn build_node_types(
    node_specs: &[(&str, &NodeSpec)],
    mark_specs: &[(&str, &MarkSpec)],
) -> Result<Vec<Arc<NodeType>>, SchemaError> {
    let node_groups = groups(node_specs.iter().map(|(n, s)| (*n, s.group.as_deref())));
    let mark_groups = groups(mark_specs.iter().map(|(n, s)| (*n, s.group.as_deref())));
    let mark_names: Vec<&str> = mark_specs.iter().map(|(n, _)| *n).collect();
    let is_inline = |name: &str| {
        name == "text"
            || node_specs
                .iter()
                .any(|(n, s)| *n == name && s.inline)
    };
    let resolve = |name: &str| -> Option<Vec<String>> {
        if node_specs.iter().any(|(n, _)| *n == name) {
            Some(vec![name.to_owned()])
        } else {
            node_groups.get(name).cloned()
        }
    };

    let mut types = Vec::with_capacity(node_specs.len());
    for (name, spec) in node_specs {
        let content_match = compile_content(spec.content.as_deref().unwrap_or(""), &resolve)
            .map_err(|e| match e {
                ContentExprError::UnknownReference(reference) => SchemaError::SchemaUnsatisfiable {
                    node: (*name).to_owned(),
                    name: reference,
                },
                ContentExprError::Syntax(message) => SchemaError::InvalidContentExpression {
                    node: (*name).to_owned(),
                    message,
                },
            })?;
        let inline_content = content_match
            .edges()
            .next()
            .map(|(ty, _)| is_inline(ty))
            .unwrap_or(false);
        let mark_set = match spec.marks.as_deref() {
            Some("_") => None,
            Some(list) => Some(resolve_marks(name, list, &mark_names, &mark_groups)?),
            None if inline_content => None,
            None => Some(Vec::new()),
        };
        trace!("node type `{}`: inline content {}", name, inline_content);
        types.push(Arc::new(NodeType {
            name: (*name).to_owned(),
            spec: (*spec).clone(),
            groups: split_names(spec.group.as_deref().unwrap_or(""))
                .map(str::to_owned)
                .collect(),
            content_match,
            inline_content,
            mark_set,
        }));
    }
    Ok(types)
}

fn build_mark_types(mark_specs: &[(&str, &MarkSpec)]) -> Result<Vec<Arc<MarkType>>, SchemaError> {
    let mark_groups = groups(mark_specs.iter().map(|(n, s)| (*n, s.group.as_deref())));
    let mark_names: Vec<&str> = mark_specs.iter().map(|(n, _)| *n).collect();
    mark_specs
        .iter()
        .enumerate()
        .map(|(rank, (name, spec))| {
            let excluded = match spec.excludes.as_deref() {
                None => vec![(*name).to_owned()],
                Some("_") => mark_names.iter().map(|n| (*n).to_owned()).collect(),
                Some(list) => resolve_marks(name, list, &mark_names, &mark_groups)?,
            };
            Ok(Arc::new(MarkType {
                name: (*name).to_owned(),
                rank,
                spec: (*spec).clone(),
                excluded,
            }))
        })
        .collect()
}

fn build_grammar(extensions: &[Extension]) -> Result<Grammar, SchemaError> {
    let mut grammar = Grammar::default();

    let mut delimiters = DelimiterTable::default();
    let mut directives = DirectiveTable::default();
    for ext in extensions {
        if !ext.delimiters.is_empty() && ext.is_node() {
            return Err(SchemaError::SchemaConflict(format!(
                "the node `{}` declares delimiters",
                ext.name
            )));
        }
        for delim in &ext.delimiters {
            delimiters
                .insert(delim, &ext.name)
                .map_err(SchemaError::SchemaConflict)?;
        }
        for (names, table) in [
            (&ext.container_directives, &mut directives.containers),
            (&ext.leaf_directives, &mut directives.leaves),
        ] {
            for name in names {
                if let Some(other) = table.insert(name.clone(), ext.name.clone()) {
                    return Err(SchemaError::SchemaConflict(format!(
                        "directive `{}` claimed by `{}` and `{}`",
                        name, other, ext.name
                    )));
                }
            }
        }
    }

    let mut block_rules: Vec<(String, Placement, Arc<dyn BlockRule>)> = vec![
        named(Arc::new(ContainerDirectiveRule), Placement::Default),
        named(Arc::new(LeafDirectiveRule), Placement::Default),
    ];
    let mut inline_rules: Vec<(String, Placement, Arc<dyn InlineRule>)> = vec![
        named_inline(Arc::new(NewlineRule), Placement::Default),
        named_inline(Arc::new(EscapeRule), Placement::Default),
        named_inline(Arc::new(EmphasisRule::new(delimiters.chars())), Placement::Default),
    ];
    for ext in extensions {
        for (placement, rule) in &ext.block_rules {
            block_rules.push(named(rule.clone(), placement.clone()));
        }
        for (placement, rule) in &ext.inline_rules {
            inline_rules.push(named_inline(rule.clone(), placement.clone()));
        }
    }
    grammar.block_rules = order_rules(block_rules)?;
    grammar.inline_rules = order_rules(inline_rules)?;
    grammar.delimiters = delimiters;
    grammar.directives = directives;

    for ext in extensions {
        let target = if ext.is_node() {
            HandlerTarget::Node(ext.name.clone())
        } else {
            HandlerTarget::Mark(ext.name.clone())
        };
        for kind in ext.handled_tokens() {
            let handler = TokenHandler {
                target: target.clone(),
                attrs: ext.token_to_tree.clone(),
            };
            if grammar.handlers.insert(kind.clone(), handler).is_some() {
                return Err(SchemaError::SchemaConflict(format!(
                    "token `{}` is handled twice",
                    kind
                )));
            }
        }
        match &ext.to_markdown {
            Some(ToMarkdown::Node(writer)) if ext.is_node() => {
                grammar.node_writers.insert(ext.name.clone(), writer.clone());
            }
            Some(ToMarkdown::Mark(writer)) if !ext.is_node() => {
                grammar.mark_writers.insert(ext.name.clone(), writer.clone());
            }
            Some(_) => {
                return Err(SchemaError::SchemaConflict(format!(
                    "the writer of `{}` does not match its kind",
                    ext.name
                )))
            }
            None => {}
        }
        grammar.escapes.extend(ext.escapes.iter().cloned());
    }
    grammar.index_markers();
    Ok(grammar)
}

fn named(rule: Arc<dyn BlockRule>, placement: Placement) -> (String, Placement, Arc<dyn BlockRule>) {
    (rule.name().to_owned(), placement, rule)
}

fn named_inline(
    rule: Arc<dyn InlineRule>,
    placement: Placement,
) -> (String, Placement, Arc<dyn InlineRule>) {
    (rule.name().to_owned(), placement, rule)
}

fn build_commands(extensions: &[Extension]) -> BTreeMap<String, CommandFactory> {
    let mut commands = BTreeMap::new();
    for ext in extensions {
        for (name, factory) in &ext.commands {
            commands
                .entry(name.clone())
                .or_insert_with(|| factory.clone());
        }
    }
    for ext in extensions.iter().filter(|ext| ext.commands.is_empty()) {
        let name = format!("create{}", camel_case(&ext.name));
        let factory = if ext.is_node() {
            insert_node(&ext.name)
        } else {
            toggle_mark(&ext.name)
        };
        commands.entry(name).or_insert(factory);
    }
    commands
}
