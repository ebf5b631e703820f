//! Table editing. The table is found by walking up from the selection, and every command
//! rebuilds the whole table node.
use super::{
    command, factory, insert_block_after, rejected, replace_ancestor, CommandContext,
    CommandFactory,
};
use crate::model::{Attrs, Fragment, MarkSet, Node, ResolvedPos, Schema};

const TABLE: &str = "table";
const ROW: &str = "tr";
const HEADER_CELL: &str = "th";
const CELL: &str = "td";
const ALIGNMENTS: [&str; 3] = ["left", "center", "right"];
/// The largest number of rows or columns `createTable` builds
const MAX_TABLE_SIZE: i64 = 1000;

/// The table holding the selection and the cell the selection starts in
struct TableCursor<'a> {
    rp: ResolvedPos<'a>,
    depth: usize,
    row: usize,
    column: usize,
}

impl<'a> TableCursor<'a> {
    fn locate(ctx: &CommandContext<'a>, name: &str) -> Option<Self> {
        let rp = ctx.doc.resolve(ctx.selection.from).ok()?;
        let depth = match rp.find_ancestor(|n| n.type_name() == TABLE) {
            Some(depth) if depth > 0 && rp.depth() >= depth + 2 => depth,
            _ => return rejected(name, "not in a table cell"),
        };
        let row = rp.index(depth);
        let column = rp.index(depth + 1);
        Some(Self {
            rp,
            depth,
            row,
            column,
        })
    }

    fn table(&self) -> &'a Node {
        self.rp.node(self.depth)
    }

    fn rows(&self) -> Vec<Vec<Node>> {
        self.table()
            .content()
            .children()
            .iter()
            .map(|row| row.content().children().to_vec())
            .collect()
    }

    /// Replace the table with one holding the given rows
    fn replace(&self, schema: &Schema, rows: Vec<Vec<Node>>) -> Option<Node> {
        let rows = rows
            .into_iter()
            .map(|cells| schema.node(ROW, &Attrs::new(), cells, MarkSet::new()).ok())
            .collect::<Option<Vec<_>>>()?;
        let table = schema
            .node(TABLE, self.table().attrs(), rows, MarkSet::new())
            .ok()?;
        replace_ancestor(&self.rp, self.depth, Fragment::from(table))
    }
}

fn empty_cell(schema: &Schema, kind: &str, alignment: Option<&str>) -> Option<Node> {
    schema.node_type(kind)?.create_and_fill(
        schema,
        &Attrs::new().with("alignment", alignment),
        Fragment::new(),
        MarkSet::new(),
    )
}

fn cell_kind(row: usize) -> &'static str {
    if row == 0 {
        HEADER_CELL
    } else {
        CELL
    }
}

/// Inserts an empty table after the current block. The size is read from the `rows` and `cols`
/// attributes, a header row included, and defaults to 3×3. Tables larger than
/// `MAX_TABLE_SIZE` in either direction are rejected.
pub fn create_table() -> CommandFactory {
    factory(|attrs: &Attrs| {
        let rows = attrs.get_int("rows").unwrap_or(3);
        let cols = attrs.get_int("cols").unwrap_or(3);
        command(move |ctx: &CommandContext| {
            if rows < 1 || cols < 1 {
                return rejected("createTable", "a table needs a row and a column");
            }
            if rows > MAX_TABLE_SIZE || cols > MAX_TABLE_SIZE {
                return rejected("createTable", "the table is too large");
            }
            let mut content = Vec::with_capacity(rows as usize);
            for row in 0..rows as usize {
                let cells = (0..cols)
                    .map(|_| empty_cell(ctx.schema, cell_kind(row), None))
                    .collect::<Option<Vec<_>>>()?;
                content.push(ctx.schema.node(ROW, &Attrs::new(), cells, MarkSet::new()).ok()?);
            }
            let table = ctx
                .schema
                .node(TABLE, &Attrs::new(), content, MarkSet::new())
                .ok()?;
            let rp = ctx.doc.resolve(ctx.selection.from).ok()?;
            insert_block_after(&rp, table).or_else(|| rejected("createTable", "no place for a table"))
        })
    })
}

/// Inserts an empty row after the current one. Cells take the alignment of their column.
pub fn add_row_after() -> CommandFactory {
    factory(|_: &Attrs| {
        command(|ctx: &CommandContext| {
            let cursor = TableCursor::locate(ctx, "addRowAfter")?;
            let mut rows = cursor.rows();
            let alignments: Vec<Option<String>> = rows
                .first()?
                .iter()
                .map(|cell| cell.attrs().get_str("alignment").map(str::to_owned))
                .collect();
            let row = alignments
                .iter()
                .map(|alignment| empty_cell(ctx.schema, CELL, alignment.as_deref()))
                .collect::<Option<Vec<_>>>()?;
            rows.insert(cursor.row + 1, row);
            cursor.replace(ctx.schema, rows)
        })
    })
}

/// Inserts an empty column after the current one
pub fn add_column_after() -> CommandFactory {
    factory(|_: &Attrs| {
        command(|ctx: &CommandContext| {
            let cursor = TableCursor::locate(ctx, "addColumnAfter")?;
            let mut rows = cursor.rows();
            for (index, row) in rows.iter_mut().enumerate() {
                let at = usize::min(cursor.column + 1, row.len());
                row.insert(at, empty_cell(ctx.schema, cell_kind(index), None)?);
            }
            cursor.replace(ctx.schema, rows)
        })
    })
}

/// Removes the current row. The last row is never removed, and the next row becomes the
/// header when the header is removed.
pub fn delete_row() -> CommandFactory {
    factory(|_: &Attrs| {
        command(|ctx: &CommandContext| {
            let cursor = TableCursor::locate(ctx, "deleteRow")?;
            let mut rows = cursor.rows();
            if rows.len() < 2 {
                return rejected("deleteRow", "the table has a single row");
            }
            rows.remove(cursor.row);
            if cursor.row == 0 {
                let header = ctx.schema.node_type(HEADER_CELL)?;
                rows[0] = rows[0]
                    .iter()
                    .map(|cell| {
                        header
                            .create(cell.attrs(), cell.content().clone(), MarkSet::new())
                            .ok()
                    })
                    .collect::<Option<Vec<_>>>()?;
            }
            cursor.replace(ctx.schema, rows)
        })
    })
}

/// Removes the current column. The last column is never removed.
pub fn delete_column() -> CommandFactory {
    factory(|_: &Attrs| {
        command(|ctx: &CommandContext| {
            let cursor = TableCursor::locate(ctx, "deleteColumn")?;
            let mut rows = cursor.rows();
            if rows.iter().any(|row| row.len() < 2) {
                return rejected("deleteColumn", "the table has a single column");
            }
            for row in rows.iter_mut() {
                if cursor.column < row.len() {
                    row.remove(cursor.column);
                }
            }
            cursor.replace(ctx.schema, rows)
        })
    })
}

/// Sets the `alignment` of every cell in the current column. A missing alignment clears it.
pub fn set_column_alignment() -> CommandFactory {
    factory(|attrs: &Attrs| {
        let alignment = attrs.get_str("alignment").map(str::to_owned);
        command(move |ctx: &CommandContext| {
            if let Some(alignment) = &alignment {
                if !ALIGNMENTS.contains(&alignment.as_str()) {
                    return rejected("setColumnAlignment", "unknown alignment");
                }
            }
            let cursor = TableCursor::locate(ctx, "setColumnAlignment")?;
            let mut rows = cursor.rows();
            for row in rows.iter_mut() {
                if let Some(cell) = row.get_mut(cursor.column) {
                    let attrs = cell.attrs().clone().with("alignment", alignment.as_deref());
                    *cell = cell.with_attrs(attrs);
                }
            }
            cursor.replace(ctx.schema, rows)
        })
    })
}
