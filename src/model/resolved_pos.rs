use super::Node;
use displaydoc::Display;
use std::borrow::Cow;
use thiserror::Error;

/// Errors at `resolve`
#[derive(Debug, Display, Error, Copy, Clone, PartialEq, Eq)]
pub enum ResolveErr {
    /// Position {pos} out of range
    RangeError {
        /// The position that was out of range
        pos: usize,
    },
    /// Broken Invariant
    BrokenInvariant,
}

impl From<()> for ResolveErr {
    fn from(_e: ()) -> Self {
        Self::BrokenInvariant
    }
}

/// You can resolve a position to get more information about it. Objects of this class represent
/// such a resolved position, providing various pieces of context information, and some helper
/// methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPos<'a> {
    pub(crate) pos: usize,
    pub(crate) path: Vec<(&'a Node, usize, usize)>,
    pub(crate) parent_offset: usize,
    pub(crate) depth: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn new(pos: usize, path: Vec<(&'a Node, usize, usize)>, parent_offset: usize) -> Self {
        Self {
            depth: path.len() - 1,
            pos,
            path,
            parent_offset,
        }
    }

    /// The position that was resolved
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of levels the parent node is from the root. If this position points directly
    /// into the root node, it is 0. If it points into a top-level paragraph, 1, and so on.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The offset this position has into its parent node.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The parent node that the position points into. Note that even if
    /// a position points into a text node, that node is not considered
    /// the parent; text nodes are ‘flat’ in this model, and have no content.
    pub fn parent(&self) -> &'a Node {
        self.node(self.depth)
    }

    /// The root node in which the position was resolved.
    pub fn doc(&self) -> &'a Node {
        self.node(0)
    }

    /// The ancestor node at the given level. `p.node(p.depth)` is the same as `p.parent()`.
    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].0
    }

    /// The index into the ancestor at the given level. If this points at the 3rd node in the
    /// 2nd paragraph on the top level, for example, `p.index(0)` is 1 and `p.index(1)` is 2.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].1
    }

    /// The index pointing after this position into the ancestor at the given level.
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// The (absolute) position at the start of the node at the given level.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].2 + 1
        }
    }

    /// The (absolute) position at the end of the node at the given level.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// The (absolute) position directly before the wrapping node at the given level, or, when
    /// depth is `self.depth + 1`, the original position.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else if depth == self.depth + 1 {
            Some(self.pos)
        } else {
            Some(self.path[depth - 1].2)
        }
    }

    /// The (absolute) position directly after the wrapping node at the given level, or the
    /// original position when depth is `self.depth + 1`.
    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else if depth == self.depth + 1 {
            Some(self.pos)
        } else {
            Some(self.path[depth - 1].2 + self.path[depth].0.node_size())
        }
    }

    /// When this position points into a text node, this returns the distance between the
    /// position and the start of the text node. Will be zero for positions that point between
    /// nodes.
    pub fn text_offset(&self) -> usize {
        self.path.last().map(|p| self.pos - p.2).unwrap_or(0)
    }

    /// Get the node directly before the position, if any. If the position points into a text node,
    /// only the part of that node before the position is returned.
    pub fn node_before(&self) -> Option<Cow<'a, Node>> {
        let index = self.index(self.depth);
        let d_off = self.text_offset();
        if d_off > 0 {
            let child = self.parent().child(index)?;
            Some(child.cut(0..d_off))
        } else if index == 0 {
            None
        } else {
            self.parent().child(index - 1).map(Cow::Borrowed)
        }
    }

    /// Get the node directly after the position, if any. If the position points into a text node,
    /// only the part of that node after the position is returned.
    pub fn node_after(&self) -> Option<Cow<'a, Node>> {
        let parent = self.parent();
        let index = self.index(self.depth);
        let child = parent.child(index)?;
        let d_off = self.text_offset();
        if d_off > 0 {
            Some(child.cut(d_off..))
        } else {
            Some(Cow::Borrowed(child))
        }
    }

    /// The depth up to which this position and the given (non-resolved) position share the same
    /// parent nodes.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth)
            .rev()
            .find(|d| self.start(*d) <= pos && self.end(*d) >= pos)
            .unwrap_or(0)
    }

    /// The innermost depth whose node satisfies the predicate
    pub fn find_ancestor<F: Fn(&Node) -> bool>(&self, pred: F) -> Option<usize> {
        (0..=self.depth).rev().find(|d| pred(self.node(*d)))
    }

    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> Result<Self, ResolveErr> {
        if pos > doc.content_size() {
            return Err(ResolveErr::RangeError { pos });
        }
        let mut path = vec![];
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;

        loop {
            let Index { index, offset } = node.content().find_index(parent_offset, false)?;
            let rem = parent_offset - offset;
            path.push((node, index, start + offset));
            if rem == 0 {
                break;
            }
            node = node.child(index).ok_or(ResolveErr::BrokenInvariant)?;
            if node.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(ResolvedPos::new(pos, path, parent_offset))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Index {
    pub index: usize,
    pub offset: usize,
}

impl Index {
    #[allow(unused)]
    pub fn new(index: usize, offset: usize) -> Index {
        Index { index, offset }
    }
}
