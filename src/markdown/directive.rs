//! Container directives (`:::name`) and leaf media directives (`::name[label](href)`).
use super::block::{fence_open, indent, is_fence_close, strip_indent};
use super::inline::{label_end, link_target, unescape};
use super::{BlockRule, BlockState, DegradedKind, Token};
use crate::model::Attrs;
use log::debug;
use std::collections::BTreeMap;

/// Directive names and the node types they map to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DirectiveTable {
    pub(crate) containers: BTreeMap<String, String>,
    pub(crate) leaves: BTreeMap<String, String>,
}

/// The parsed info string of a directive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveInfo {
    /// The title text
    pub title: Option<String>,
    /// The destination
    pub href: Option<String>,
    /// The title of the destination
    pub href_title: Option<String>,
}

impl DirectiveInfo {
    /// The info as token attributes `title`, `href` and `href_title`
    pub fn to_attrs(&self) -> Attrs {
        let mut attrs = Attrs::new();
        if let Some(title) = &self.title {
            attrs.insert("title", title.as_str());
        }
        if let Some(href) = &self.href {
            attrs.insert("href", href.as_str());
        }
        if let Some(href_title) = &self.href_title {
            attrs.insert("href_title", href_title.as_str());
        }
        attrs
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse the text after a directive name: `[title](destination "title")`,
/// `title text "destination"` or plain title text.
pub fn parse_directive_info(info: &str) -> DirectiveInfo {
    let info = info.trim();
    if info.starts_with('[') {
        if let Some(end) = label_end(info) {
            let title = non_empty(unescape(&info[1..end]));
            let rest = &info[end + 1..];
            if rest.is_empty() {
                return DirectiveInfo {
                    title,
                    ..DirectiveInfo::default()
                };
            }
            if let Some(target) = link_target(rest) {
                if rest[target.len..].trim().is_empty() {
                    return DirectiveInfo {
                        title,
                        href: non_empty(target.href),
                        href_title: target.title,
                    };
                }
            }
        }
    }
    if info.ends_with('"') && info.len() > 1 {
        let body = &info[..info.len() - 1];
        if let Some(open) = body.rfind(" \"") {
            return DirectiveInfo {
                title: non_empty(info[..open].trim().to_owned()),
                href: non_empty(body[open + 2..].to_owned()),
                href_title: None,
            };
        }
        if let Some(dest) = body.strip_prefix('"') {
            return DirectiveInfo {
                href: non_empty(dest.to_owned()),
                ..DirectiveInfo::default()
            };
        }
    }
    DirectiveInfo {
        title: non_empty(info.to_owned()),
        ..DirectiveInfo::default()
    }
}

/// Split `:::name rest` into name and rest
fn container_head(line: &str) -> Option<(&str, &str)> {
    if indent(line) > 3 {
        return None;
    }
    let after = line.trim_start().strip_prefix(":::")?;
    let after = after.trim_start_matches(':');
    let name_len = after
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after.len());
    if name_len == 0 {
        return None;
    }
    Some((&after[..name_len], &after[name_len..]))
}

fn is_container_close(line: &str) -> bool {
    let trimmed = line.trim();
    indent(line) <= 3 && trimmed.len() >= 3 && trimmed.chars().all(|c| c == ':')
}

/// The core `container_directive` block rule
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContainerDirectiveRule;

impl ContainerDirectiveRule {
    fn known<'l>(state: &BlockState, line: &'l str) -> Option<(&'l str, &'l str)> {
        container_head(line)
            .filter(|(name, _)| state.grammar().directives.containers.contains_key(*name))
    }

    /// The line closing a directive whose content starts at `start`. Directive lines inside
    /// fenced code are skipped when `skip_fences` is set.
    fn find_close(state: &BlockState, start: usize, skip_fences: bool) -> Option<usize> {
        let mut depth = 1;
        let mut fence: Option<(char, usize)> = None;
        for i in start..state.line_count() {
            let line = state.line_at(i).unwrap_or_default();
            if let Some((ch, len)) = fence {
                if is_fence_close(line, ch, len) {
                    fence = None;
                }
                continue;
            }
            if is_container_close(line) {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            } else if Self::known(state, line).is_some() {
                depth += 1;
            } else if skip_fences {
                fence = fence_open(line).map(|(ch, len, _, _)| (ch, len));
            }
        }
        None
    }
}

impl BlockRule for ContainerDirectiveRule {
    fn name(&self) -> &str {
        "container_directive"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let line = match state.line() {
            Some(line) => line.to_owned(),
            None => return false,
        };
        let (name, rest) = match Self::known(state, &line) {
            Some(head) => head,
            None => return false,
        };
        let node = state.grammar().directives.containers[name].clone();
        let base = indent(&line);

        let start = state.line_index() + 1;
        let close = Self::find_close(state, start, true)
            .or_else(|| Self::find_close(state, start, false));
        let end = close.unwrap_or_else(|| state.line_count());
        if close.is_none() {
            debug!("closing unterminated directive `{}`", name);
            state.report(
                DegradedKind::UnclosedDirective,
                format!("directive `{}` is not closed", name),
            );
        }
        let inner = (start..end)
            .filter_map(|i| state.line_at(i))
            .map(|l| strip_indent(l, base))
            .collect();
        let nested = state.tokenize_nested(inner);

        let info = parse_directive_info(rest);
        state.push(Token::open(&node).info(name).attrs(info.to_attrs()));
        for token in nested.tokens {
            state.push(token);
        }
        state.push(Token::close(&node).info(name));
        state.advance(end + 1 - state.line_index());
        true
    }

    fn interrupts_paragraph(&self, state: &BlockState, line: &str) -> bool {
        Self::known(state, line).is_some()
    }
}

/// Parse `::name[label](destination "title")`
fn leaf_directive(line: &str) -> Option<(&str, DirectiveInfo)> {
    if indent(line) > 3 {
        return None;
    }
    let after = line.trim().strip_prefix("::")?;
    let name_len = after
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after.len());
    if name_len == 0 {
        return None;
    }
    let (name, rest) = after.split_at(name_len);
    if !rest.starts_with('[') {
        return None;
    }
    let end = label_end(rest)?;
    let title = non_empty(unescape(&rest[1..end]));
    let tail = &rest[end + 1..];
    if tail.is_empty() {
        return Some((
            name,
            DirectiveInfo {
                title,
                ..DirectiveInfo::default()
            },
        ));
    }
    let target = link_target(tail)?;
    if target.len != tail.len() {
        return None;
    }
    Some((
        name,
        DirectiveInfo {
            title,
            href: non_empty(target.href),
            href_title: target.title,
        },
    ))
}

/// The core `leaf_directive` block rule
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeafDirectiveRule;

impl LeafDirectiveRule {
    fn known(state: &BlockState, line: &str) -> Option<(String, String, DirectiveInfo)> {
        let (name, info) = leaf_directive(line)?;
        let node = state.grammar().directives.leaves.get(name)?;
        Some((node.clone(), name.to_owned(), info))
    }
}

impl BlockRule for LeafDirectiveRule {
    fn name(&self) -> &str {
        "leaf_directive"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let line = match state.line() {
            Some(line) => line.to_owned(),
            None => return false,
        };
        let (node, name, info) = match Self::known(state, &line) {
            Some(found) => found,
            None => return false,
        };
        state.push(Token::leaf(&node).info(&name).attrs(info.to_attrs()));
        state.advance(1);
        true
    }

    fn interrupts_paragraph(&self, state: &BlockState, line: &str) -> bool {
        Self::known(state, line).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_forms() {
        assert_eq!(
            parse_directive_info(r#" [Read *this*](https://x.y "Docs") "#),
            DirectiveInfo {
                title: Some("Read *this*".into()),
                href: Some("https://x.y".into()),
                href_title: Some("Docs".into()),
            }
        );
        assert_eq!(
            parse_directive_info(r#"Some title "https://x.y""#),
            DirectiveInfo {
                title: Some("Some title".into()),
                href: Some("https://x.y".into()),
                href_title: None,
            }
        );
        assert_eq!(
            parse_directive_info("Just a title"),
            DirectiveInfo {
                title: Some("Just a title".into()),
                ..DirectiveInfo::default()
            }
        );
        assert_eq!(parse_directive_info("  "), DirectiveInfo::default());
    }

    #[test]
    fn test_heads() {
        assert_eq!(container_head(":::info Title"), Some(("info", " Title")));
        assert_eq!(container_head("::::warning"), Some(("warning", "")));
        assert_eq!(container_head(":::"), None);
        assert!(is_container_close(":::"));
        assert!(is_container_close("  ::::  "));
        assert!(!is_container_close("::"));

        let (name, info) = leaf_directive("::video[Demo](https://v.example/1)").unwrap();
        assert_eq!(name, "video");
        assert_eq!(info.title.as_deref(), Some("Demo"));
        assert_eq!(info.href.as_deref(), Some("https://v.example/1"));
        assert!(leaf_directive("::video[Demo](x) trailing").is_none());
        assert!(leaf_directive(":::video[Demo](x)").is_none());
    }
}
