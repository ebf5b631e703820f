use super::{util::Span, StepError, StepKind, StepResult};
use crate::model::{Fragment, Mark, Node, ResolveErr};

/// Map the inline nodes between `from` and `to` (relative to the content of `parent`), splitting
/// text nodes at the boundaries of the range.
fn map_inline_range<F>(parent: &Node, from: usize, to: usize, f: &F) -> Fragment
where
    F: Fn(Node, &Node) -> Node,
{
    let mut mapped = Fragment::new();
    let mut pos = 0;
    for child in parent.content().children() {
        let end = pos + child.node_size();
        let pieces = if end <= from || pos >= to {
            vec![child.clone()]
        } else if child.is_text() {
            let size = child.node_size();
            let start = from.saturating_sub(pos);
            let stop = usize::min(size, to - pos);
            let mut pieces = Vec::with_capacity(3);
            if start > 0 {
                pieces.push(child.cut(0..start).into_owned());
            }
            pieces.push(f(child.cut(start..stop).into_owned(), parent));
            if stop < size {
                pieces.push(child.cut(stop..).into_owned());
            }
            pieces
        } else if child.is_inline() {
            vec![f(child.clone(), parent)]
        } else {
            let inner_from = from.saturating_sub(pos + 1);
            let inner_to = usize::min(child.content_size(), to.saturating_sub(pos + 1));
            vec![child.copy(map_inline_range(child, inner_from, inner_to, f))]
        };
        for piece in pieces {
            mapped = mapped.append(Fragment::from(piece));
        }
        pos = end;
    }
    mapped
}

fn check_span(doc: &Node, span: &Span) -> Result<(), StepError> {
    if span.to > doc.content_size() || span.from > span.to {
        return Err(ResolveErr::RangeError { pos: span.to }.into());
    }
    Ok(())
}

/// Adding a mark on some part of the document
#[derive(Debug, Clone, PartialEq, new)]
pub struct AddMarkStep {
    /// The affected part of the document
    pub span: Span,
    /// The mark to add
    pub mark: Mark,
}

/// Removing a mark on some part of the document
#[derive(Debug, Clone, PartialEq, new)]
pub struct RemoveMarkStep {
    /// The affected part of the document
    pub span: Span,
    /// The mark to remove
    pub mark: Mark,
}

impl StepKind for AddMarkStep {
    fn apply(&self, doc: &Node) -> StepResult {
        check_span(doc, &self.span)?;
        let new_content = map_inline_range(doc, self.span.from, self.span.to, &|node, parent| {
            if parent.node_type().allows_mark_type(self.mark.type_name()) {
                let marks = self.mark.add_to_set(node.marks());
                node.mark(marks)
            } else {
                node
            }
        });
        Ok(doc.copy(new_content))
    }
}

impl StepKind for RemoveMarkStep {
    fn apply(&self, doc: &Node) -> StepResult {
        check_span(doc, &self.span)?;
        let new_content = map_inline_range(doc, self.span.from, self.span.to, &|node, _parent| {
            let marks = self.mark.remove_from_set(node.marks());
            node.mark(marks)
        });
        Ok(doc.copy(new_content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;
    use crate::model::Attrs;

    #[test]
    fn test_add_and_remove_mark() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("hello world"));
        let strong = schema.mark("strong", &Attrs::new()).unwrap();

        let marked = AddMarkStep::new(Span::new(1, 6), strong.clone())
            .apply(&doc)
            .unwrap();
        assert_eq!(marked, b.doc(b.p((b.strong("hello"), " world"))));

        let unmarked = RemoveMarkStep::new(Span::new(1, 6), strong)
            .apply(&marked)
            .unwrap();
        assert_eq!(unmarked, doc);
    }

    #[test]
    fn test_mark_range_out_of_bounds() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("hi"));
        let em = schema.mark("em", &Attrs::new()).unwrap();
        assert!(AddMarkStep::new(Span::new(1, 40), em).apply(&doc).is_err());
    }

    #[test]
    fn test_code_block_does_not_take_marks() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.code_block("", "let x"));
        let em = schema.mark("em", &Attrs::new()).unwrap();
        let same = AddMarkStep::new(Span::new(1, 4), em).apply(&doc).unwrap();
        assert_eq!(same, doc);
    }
}
