//! GFM tables. Cells hold a single paragraph and are written on one line.
use crate::commands::{
    add_column_after, add_row_after, create_table, delete_column, delete_row,
    set_column_alignment,
};
use crate::extension::Extension;
use crate::markdown::{indent, is_blank, BlockRule, BlockState, MarkdownWriter, Placement, Token};
use crate::model::{AttrSpec, Attrs, Node, NodeSpec};

/// Tables. Registers the table rule and the table commands.
pub fn table() -> Extension {
    Extension::node("table", NodeSpec::with_content("tr+").group("block").isolating())
        .block_rule(Placement::Default, TableRule)
        .node_writer(write_table)
        .command("createTable", create_table())
        .command("addRowAfter", add_row_after())
        .command("addColumnAfter", add_column_after())
        .command("deleteRow", delete_row())
        .command("deleteColumn", delete_column())
        .command("setColumnAlignment", set_column_alignment())
}

/// Table rows
pub fn tr() -> Extension {
    Extension::node("tr", NodeSpec::with_content("(th | td)+"))
}

/// Header cells
pub fn th() -> Extension {
    cell("th")
}

/// Body cells
pub fn td() -> Extension {
    cell("td")
}

fn cell(name: &str) -> Extension {
    Extension::node(
        name,
        NodeSpec::with_content("paragraph")
            .isolating()
            .attr("alignment", AttrSpec::optional_string()),
    )
}

/// Split a row into trimmed cells. An escaped pipe becomes part of the cell before the
/// inline pass, code spans included.
fn split_row(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if !trimmed.contains('|') || indent(line) > 3 {
        return None;
    }
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => inner,
    };
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => current.push('|'),
                Some(next) => {
                    current.push(c);
                    current.push(next);
                }
                None => current.push(c),
            },
            '|' => cells.push(std::mem::take(&mut current).trim().to_owned()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_owned());
    Some(cells)
}

/// Alignments of a delimiter row
fn delimiter_row(line: &str) -> Option<Vec<Option<&'static str>>> {
    split_row(line)?
        .iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':') && cell.len() > 1;
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Some("center"),
                (true, false) => Some("left"),
                (false, true) => Some("right"),
                (false, false) => None,
            })
        })
        .collect()
}

struct TableRule;

impl TableRule {
    fn push_row(state: &mut BlockState, kind: &str, cells: &[String], aligns: &[Option<&str>]) {
        state.push(Token::open("tr"));
        for (i, align) in aligns.iter().enumerate() {
            let attrs = Attrs::new().with("alignment", *align);
            state.push(Token::open(kind).attrs(attrs));
            state.push_paragraph(cells.get(i).map(String::as_str).unwrap_or(""));
            state.push(Token::close(kind));
        }
        state.push(Token::close("tr"));
    }
}

impl BlockRule for TableRule {
    fn name(&self) -> &str {
        "table"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let header = match state.line().and_then(split_row) {
            Some(header) => header,
            None => return false,
        };
        let start = state.line_index();
        let aligns = match state.line_at(start + 1).and_then(delimiter_row) {
            Some(aligns) if aligns.len() == header.len() => aligns,
            _ => return false,
        };
        let mut rows = Vec::new();
        let mut end = start + 2;
        while let Some(line) = state.line_at(end) {
            if is_blank(line) || state.interrupts_paragraph(line) {
                break;
            }
            match split_row(line) {
                Some(cells) => rows.push(cells),
                None => break,
            }
            end += 1;
        }
        state.push(Token::open("table"));
        Self::push_row(state, "th", &header, &aligns);
        for row in &rows {
            Self::push_row(state, "td", row, &aligns);
        }
        state.push(Token::close("table"));
        state.advance(end - start);
        true
    }
}

fn write_table(w: &mut MarkdownWriter, node: &Node, _parent: &Node, _index: usize) {
    let rows: Vec<Vec<String>> = node
        .content()
        .children()
        .iter()
        .map(|row| row.content().children().iter().map(|c| w.render_cell(c)).collect())
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let aligns: Vec<Option<String>> = (0..columns)
        .map(|i| {
            node.first_child()
                .and_then(|row| row.child(i))
                .and_then(|cell| cell.attrs().get_str("alignment"))
                .map(str::to_owned)
        })
        .collect();
    let pad = w.options().pad_tables;
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .fold(3, usize::max)
        })
        .collect();
    let line = |cells: Vec<String>| format!("| {} |", cells.join(" | "));
    let format_row = |row: &Vec<String>| {
        line((0..columns)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                if pad {
                    format!("{:<width$}", cell, width = widths[i])
                } else {
                    cell.to_owned()
                }
            })
            .collect())
    };
    let delimiter = line(
        aligns
            .iter()
            .enumerate()
            .map(|(i, align)| {
                let width = if pad { widths[i] } else { 3 };
                match align.as_deref() {
                    Some("left") => format!(":{}", "-".repeat(width - 1)),
                    Some("center") => format!(":{}:", "-".repeat(width - 2)),
                    Some("right") => format!("{}:", "-".repeat(width - 1)),
                    _ => "-".repeat(width),
                }
            })
            .collect(),
    );
    let mut lines = Vec::with_capacity(rows.len() + 1);
    let mut rows = rows.iter();
    if let Some(header) = rows.next() {
        lines.push(format_row(header));
    }
    lines.push(delimiter);
    lines.extend(rows.map(format_row));
    for (i, text) in lines.iter().enumerate() {
        if i > 0 {
            w.ensure_new_line();
        }
        w.write(text);
    }
    w.close_block(node);
}
