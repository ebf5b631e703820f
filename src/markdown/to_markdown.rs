//! Writing a document tree as markdown text.
use super::escape::escape_text;
use super::MarkdownOptions;
use crate::model::{Mark, Node, Schema};
use derivative::Derivative;
use std::borrow::Cow;
use std::sync::Arc;

/// Writes a node: `(writer, node, parent, index in parent)`
pub type NodeWriter = Arc<dyn Fn(&mut MarkdownWriter, &Node, &Node, usize) + Send + Sync>;

/// Produces the opening or closing markup of a mark: `(writer, mark, parent, index)`
pub type MarkDelim = Arc<dyn Fn(&mut MarkdownWriter, &Mark, &Node, usize) -> String + Send + Sync>;

/// How a mark is written
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct MarkWriter {
    /// The opening markup
    #[derivative(Debug = "ignore")]
    pub open: MarkDelim,
    /// The closing markup
    #[derivative(Debug = "ignore")]
    pub close: MarkDelim,
    /// Whether the mark can be opened and closed in any order relative to other mixable marks
    pub mixable: bool,
    /// Whether whitespace at the edges of the marked text goes outside the markup
    pub expel_enclosing_whitespace: bool,
    /// Whether the marked text is escaped
    pub escape: bool,
}

impl MarkWriter {
    /// A mark written with fixed markup
    pub fn new(open: &str, close: &str) -> Self {
        let (open, close) = (open.to_owned(), close.to_owned());
        Self::with(move |_, _, _, _| open.clone(), move |_, _, _, _| close.clone())
    }

    /// A mark written with computed markup
    pub fn with<O, C>(open: O, close: C) -> Self
    where
        O: Fn(&mut MarkdownWriter, &Mark, &Node, usize) -> String + Send + Sync + 'static,
        C: Fn(&mut MarkdownWriter, &Mark, &Node, usize) -> String + Send + Sync + 'static,
    {
        Self {
            open: Arc::new(open),
            close: Arc::new(close),
            mixable: false,
            expel_enclosing_whitespace: false,
            escape: true,
        }
    }

    /// Allow reordering with other mixable marks
    pub fn mixable(mut self) -> Self {
        self.mixable = true;
        self
    }

    /// Move enclosing whitespace out of the markup
    pub fn expel_whitespace(mut self) -> Self {
        self.expel_enclosing_whitespace = true;
        self
    }

    /// Write the marked text verbatim
    pub fn no_escape(mut self) -> Self {
        self.escape = false;
        self
    }
}

/// Serialize a document with the writers of its schema.
pub fn serialize(schema: &Schema, doc: &Node) -> String {
    let mut writer = MarkdownWriter::new(schema);
    writer.render_content(doc);
    writer.out
}

/// The state of the markdown serializer, passed to node and mark writers.
pub struct MarkdownWriter<'a> {
    schema: &'a Schema,
    out: String,
    delim: String,
    closed: Option<String>,
    at_block_start: bool,
    in_tight_list: bool,
    in_table: bool,
    single_line: bool,
    in_autolink: bool,
}

impl<'a> MarkdownWriter<'a> {
    /// A writer with empty output
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            out: String::new(),
            delim: String::new(),
            closed: None,
            at_block_start: false,
            in_tight_list: false,
            in_table: false,
            single_line: false,
            in_autolink: false,
        }
    }

    /// The schema being written
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The markdown options
    pub fn options(&self) -> &'a MarkdownOptions {
        self.schema.options()
    }

    /// The output so far
    pub fn out(&self) -> &str {
        &self.out
    }

    /// Whether line breaks are written as spaces
    pub fn single_line(&self) -> bool {
        self.in_table || self.single_line
    }

    /// Set whether line breaks are written as spaces
    pub fn set_single_line(&mut self, value: bool) {
        self.single_line = value;
    }

    /// Insert text into the output at a byte offset
    pub fn insert_str(&mut self, at: usize, text: &str) {
        self.out.insert_str(at, text);
    }

    /// Whether the text of an autolink is being written
    pub fn in_autolink(&self) -> bool {
        self.in_autolink
    }

    /// Set whether the text of an autolink is being written
    pub fn set_in_autolink(&mut self, value: bool) {
        self.in_autolink = value;
    }

    /// Whether the output ends with an empty line
    pub fn at_blank(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    /// Write the separator owed to a closed block
    pub fn flush_close(&mut self, size: usize) {
        if self.closed.is_some() {
            if !self.at_blank() {
                self.out.push('\n');
            }
            if size > 1 {
                let delim_min = self.delim.trim_end().to_owned();
                for _ in 1..size {
                    self.out.push_str(&delim_min);
                    self.out.push('\n');
                }
            }
            self.closed = None;
        }
    }

    /// Render a block, prefixing each line with `delim`. The first line gets `first_delim`
    /// instead, when given.
    pub fn wrap_block<F>(&mut self, delim: &str, first_delim: Option<&str>, node: &Node, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let old = self.delim.clone();
        self.write(first_delim.unwrap_or(delim));
        self.delim.push_str(delim);
        f(self);
        self.delim = old;
        self.close_block(node);
    }

    /// Make sure the output ends in a newline
    pub fn ensure_new_line(&mut self) {
        if !self.at_blank() {
            self.out.push('\n');
        }
    }

    /// Write markup. Flushes a pending block separator and writes the line prefix first.
    /// Blocks in tight lists are separated by a line break only.
    pub fn write(&mut self, content: &str) {
        self.flush_close(if self.in_tight_list { 1 } else { 2 });
        if !self.delim.is_empty() && self.at_blank() {
            self.out.push_str(&self.delim);
        }
        self.out.push_str(content);
    }

    /// Close the block for the given node
    pub fn close_block(&mut self, node: &Node) {
        self.closed = Some(node.type_name().to_owned());
    }

    /// Write text, escaping markdown syntax unless `escape` is false.
    pub fn text(&mut self, text: &str, escape: bool) {
        let text: Cow<str> = if self.single_line() {
            Cow::Owned(text.replace('\n', " "))
        } else {
            Cow::Borrowed(text)
        };
        let lines: Vec<&str> = text.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            let start_of_line = self.at_block_start || i > 0 || self.at_blank();
            self.write("");
            if !escape && line.starts_with('[') && ends_with_bang(&self.out) {
                self.out.pop();
                self.out.push_str("\\!");
            }
            let mut piece = if escape {
                self.esc(line, start_of_line)
            } else {
                (*line).to_owned()
            };
            if self.in_table {
                piece = piece.replace('|', "\\|");
            }
            self.out.push_str(&piece);
            if i + 1 != lines.len() {
                self.out.push('\n');
            }
        }
    }

    /// Render a node. Nodes without a writer render their children without markup.
    pub fn render(&mut self, node: &Node, parent: &Node, index: usize) {
        let writer = self.schema.grammar().node_writers.get(node.type_name()).cloned();
        match writer {
            Some(writer) => writer(self, node, parent, index),
            None if node.is_text() => {
                let escape = !self.in_autolink;
                self.text(node.text().unwrap_or_default(), escape);
            }
            None if node.is_textblock() => {
                self.render_inline(node);
                self.close_block(node);
            }
            None => self.render_content(node),
        }
    }

    /// Render the children of a block node
    pub fn render_content(&mut self, parent: &Node) {
        for (i, child) in parent.content().children().iter().enumerate() {
            self.render(child, parent, i);
        }
    }

    /// Render the inline content of a textblock
    pub fn render_inline(&mut self, parent: &Node) {
        self.render_inline_from(parent, true)
    }

    /// Render inline content. `from_block_start` tells whether the output is at the start of
    /// a line.
    pub fn render_inline_from(&mut self, parent: &Node, from_block_start: bool) {
        self.at_block_start = from_block_start;
        let mut active: Vec<Mark> = Vec::new();
        let mut trailing = String::new();
        let children = parent.content().children();
        for index in 0..=children.len() {
            self.progress(parent, children.get(index), index, &mut active, &mut trailing);
        }
        self.at_block_start = false;
    }

    fn mark_writer(&self, mark: &Mark) -> Option<&'a MarkWriter> {
        self.schema.grammar().mark_writers.get(mark.type_name())
    }

    fn expels(&self, mark: &Mark) -> bool {
        self.mark_writer(mark)
            .map(|w| w.expel_enclosing_whitespace)
            .unwrap_or(false)
    }

    fn mixable(&self, mark: &Mark) -> bool {
        self.mark_writer(mark).map(|w| w.mixable).unwrap_or(false)
    }

    fn progress(
        &mut self,
        parent: &Node,
        node: Option<&Node>,
        index: usize,
        active: &mut Vec<Mark>,
        trailing: &mut String,
    ) {
        let mut node: Option<Cow<Node>> = node.map(Cow::Borrowed);
        let mut marks: Vec<Mark> = node
            .as_ref()
            .map(|n| n.marks().iter().cloned().collect())
            .unwrap_or_default();

        // a hard break only keeps the marks that continue after it
        if node.as_ref().map(|n| n.type_name() == "hard_break").unwrap_or(false) {
            let next = parent.child(index + 1);
            marks.retain(|m| match next {
                Some(next) => {
                    m.is_in_set(next.marks())
                        && (!next.is_text() || next.text().map(|t| !t.trim().is_empty()) == Some(true))
                }
                None => false,
            });
        }

        let mut leading = std::mem::take(trailing);
        if let Some(text) = node.as_ref().and_then(|n| n.text()).map(str::to_owned) {
            if marks
                .iter()
                .any(|m| self.expels(m) && !active.contains(m))
            {
                let rest = text.trim_start();
                let lead = &text[..text.len() - rest.len()];
                if !lead.is_empty() {
                    leading.push_str(lead);
                    node = match (rest.is_empty(), &node) {
                        (false, Some(n)) => Some(Cow::Owned(n.with_text(rest.to_owned().into()))),
                        _ => None,
                    };
                    if node.is_none() {
                        marks = active.clone();
                    }
                }
            }
        }
        if let Some(text) = node.as_ref().and_then(|n| n.text()).map(str::to_owned) {
            let last = index + 1 >= parent.child_count();
            if marks.iter().any(|m| {
                self.expels(m)
                    && (last
                        || parent
                            .child(index + 1)
                            .map(|next| !m.is_in_set(next.marks()))
                            .unwrap_or(true))
            }) {
                let rest = text.trim_end();
                let trail = &text[rest.len()..];
                if !trail.is_empty() {
                    *trailing = trail.to_owned();
                    node = match (rest.is_empty(), &node) {
                        (false, Some(n)) => Some(Cow::Owned(n.with_text(rest.to_owned().into()))),
                        _ => None,
                    };
                    if node.is_none() {
                        marks = active.clone();
                    }
                }
            }
        }

        let inner = marks.last().cloned();
        let no_esc = inner
            .as_ref()
            .and_then(|m| self.mark_writer(m))
            .map(|w| !w.escape)
            .unwrap_or(false);
        let len = marks.len() - usize::from(no_esc);

        // reorder mixable marks to match the open ones
        'outer: for i in 0..len {
            if !self.mixable(&marks[i]) {
                break;
            }
            for j in 0..active.len() {
                if !self.mixable(&active[j]) {
                    break;
                }
                if marks[i] == active[j] {
                    if i > j {
                        let mark = marks.remove(i);
                        marks.insert(j, mark);
                    } else if j > i {
                        let mark = marks.remove(i);
                        marks.insert(j - 1, mark);
                    }
                    continue 'outer;
                }
            }
        }

        let mut keep = 0;
        while keep < usize::min(active.len(), len) && marks[keep] == active[keep] {
            keep += 1;
        }
        while keep < active.len() {
            if let Some(mark) = active.pop() {
                let markup = self.mark_string(&mark, false, parent, index);
                self.text(&markup, false);
            }
        }

        if !leading.is_empty() {
            self.text(&leading, true);
        }

        if let Some(node) = node {
            while active.len() < len {
                let add = marks[active.len()].clone();
                let markup = self.mark_string(&add, true, parent, index);
                active.push(add);
                self.text(&markup, false);
                self.at_block_start = false;
            }
            match (&inner, node.text()) {
                (Some(inner), Some(text)) if no_esc => {
                    let open = self.mark_string(inner, true, parent, index);
                    let close = self.mark_string(inner, false, parent, index + 1);
                    self.text(&format!("{}{}{}", open, text, close), false);
                }
                _ => self.render(&node, parent, index),
            }
            self.at_block_start = false;
        }
    }

    fn mark_string(&mut self, mark: &Mark, open: bool, parent: &Node, index: usize) -> String {
        match self.mark_writer(mark) {
            Some(writer) if open => (writer.open)(self, mark, parent, index),
            Some(writer) => (writer.close)(self, mark, parent, index),
            None => String::new(),
        }
    }

    /// Render a list. `first_delim` produces the marker of the item at the given index.
    pub fn render_list<F>(&mut self, node: &Node, delim: &str, first_delim: F)
    where
        F: Fn(usize) -> String,
    {
        // the separator owed to the previous block follows the enclosing list, not this one
        if !self.in_tight_list {
            self.flush_close(2);
        } else if self.closed.as_deref() != Some(node.type_name()) {
            self.flush_close(1);
        }
        let tight = node
            .attrs()
            .get_bool("tight")
            .unwrap_or(self.options().tight_lists);
        let prev = self.in_tight_list;
        self.in_tight_list = tight;
        for (i, child) in node.content().children().iter().enumerate() {
            if i > 0 && tight {
                self.flush_close(1);
            }
            let first = first_delim(i);
            self.wrap_block(delim, Some(first.as_str()), node, |w| w.render(child, node, i));
        }
        self.in_tight_list = prev;
    }

    /// Render the content of a table cell on a single line
    pub fn render_cell(&self, cell: &Node) -> String {
        let mut sub = MarkdownWriter::new(self.schema);
        sub.in_table = true;
        for (i, child) in cell.content().children().iter().enumerate() {
            if i > 0 {
                sub.out.push(' ');
            }
            if child.is_textblock() {
                sub.render_inline(child);
            } else {
                sub.render(child, cell, i);
                sub.closed = None;
            }
        }
        sub.out.trim().to_owned()
    }

    /// Escape markdown syntax in text
    pub fn esc(&self, text: &str, start_of_line: bool) -> String {
        escape_text(text, start_of_line, &self.schema.grammar().escapes)
    }

    /// Wrap a string in quotes that do not occur in it
    pub fn quote(&self, text: &str) -> String {
        let wrap = if !text.contains('"') {
            ('"', '"')
        } else if !text.contains('\'') {
            ('\'', '\'')
        } else {
            ('(', ')')
        };
        format!("{}{}{}", wrap.0, text, wrap.1)
    }
}

fn ends_with_bang(out: &str) -> bool {
    let mut rev = out.chars().rev();
    rev.next() == Some('!') && rev.next() != Some('\\')
}
