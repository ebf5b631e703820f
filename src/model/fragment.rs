use super::{util, Index, Node, Text};
use std::borrow::Cow;
use std::fmt;
use std::ops::RangeBounds;

/// A fragment represents a node's collection of child nodes.
///
/// Like nodes, fragments are persistent data structures, and you should not mutate them or their
/// content. Rather, you create new instances whenever needed. The API tries to make this easy.
#[derive(Clone, Default, PartialEq)]
pub struct Fragment {
    inner: Vec<Node>,
    size: usize,
}

impl Fragment {
    /// Create a new empty fragment
    pub fn new() -> Self {
        Self::default()
    }

    /// The size of the fragment, which is the total of the size of its content nodes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get a slice to all child nodes
    pub fn children(&self) -> &[Node] {
        &self.inner[..]
    }

    /// The first child of the fragment wrapped in `Some`, or `None` if it is empty.
    pub fn first_child(&self) -> Option<&Node> {
        self.inner.first()
    }

    /// The last child of the fragment wrapped in `Some`, or `None` if it is empty.
    pub fn last_child(&self) -> Option<&Node> {
        self.inner.last()
    }

    /// The number of child nodes in this fragment.
    pub fn child_count(&self) -> usize {
        self.inner.len()
    }

    /// Create a new fragment containing the combined content of this fragment and the other.
    /// Adjacent text nodes with the same marks are joined.
    pub fn append(mut self, mut other: Self) -> Self {
        if let Some(first) = other.first_child() {
            if let Some(last) = self.inner.last_mut() {
                if let (Some(t1), Some(t2)) = (last.text(), first.text()) {
                    if last.same_markup(first) {
                        let mid = last.with_text(Text::from(t1.to_owned() + t2));
                        *last = mid;
                        other.inner.remove(0);
                    }
                }

                self.inner.append(&mut other.inner);
                self.size += other.size;
                self
            } else {
                other
            }
        } else {
            self
        }
    }

    /// Cut out the sub-fragment between the two given positions.
    pub fn cut<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let from = util::from(&range);
        let to = util::to(&range, self.size);

        if from == 0 && to == self.size {
            return self.clone();
        }

        let mut result = vec![];
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            let mut i = 0;
            while pos < to && i < self.inner.len() {
                let child = &self.inner[i];
                let end = pos + child.node_size();
                if end > from {
                    let new_child = if pos < from || end > to {
                        if let Some(text) = child.text_node() {
                            let len = text.len_utf16();
                            let start = from.saturating_sub(pos);
                            let end = usize::min(len, to - pos);
                            child.cut(start..end)
                        } else {
                            let t = pos + 1;
                            let start = from.saturating_sub(t);
                            let end = usize::min(child.content_size(), to.saturating_sub(t));
                            child.cut(start..end)
                        }
                        .into_owned()
                    } else {
                        child.clone()
                    };
                    size += new_child.node_size();
                    result.push(new_child);
                }
                pos = end;
                i += 1;
            }
        }
        Fragment {
            inner: result,
            size,
        }
    }

    /// Cut out the children between the two given indices
    pub fn cut_by_index(&self, from: usize, to: usize) -> Self {
        Fragment::from(self.inner[from..to].to_vec())
    }

    /// Invoke a callback for all descendant nodes between the given two positions (relative to
    /// start of this fragment). Doesn't descend into a node when the callback returns `false`.
    pub fn nodes_between<F: FnMut(&Node, usize) -> bool>(
        &self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
    ) {
        let mut pos = 0;
        for child in &self.inner {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos) && child.content_size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    usize::min(child.content_size(), to.saturating_sub(start)),
                    f,
                    node_start + start,
                )
            }
            pos = end;
        }
    }

    /// Get all text between positions from and to. When `block_separator` is given, it will be
    /// inserted whenever a new block node is started. When `leaf_text` is given, it'll be inserted
    /// for every non-text leaf node encountered.
    pub fn text_between(
        &self,
        text: &mut String,
        mut separated: bool,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) {
        self.nodes_between(
            from,
            to,
            &mut move |node, pos| {
                if let Some(txt) = node.text_node() {
                    let (rest, skip) = if from > pos {
                        let skip = from - pos;
                        (util::split_at_utf16(txt.as_str(), skip).1, skip)
                    } else {
                        (txt.as_str(), 0)
                    };

                    let end = to - pos;
                    let slice = util::split_at_utf16(rest, end.saturating_sub(skip)).0;

                    text.push_str(slice);
                    separated = block_separator.is_none();
                } else if node.is_leaf() {
                    if let Some(leaf_text) = leaf_text {
                        text.push_str(leaf_text);
                    }
                    separated = block_separator.is_none();
                } else if !separated && node.is_block() {
                    text.push_str(block_separator.unwrap_or(""));
                    separated = true
                }
                true
            },
            0,
        )
    }

    /// Create a new fragment in which the node at the given index is replaced by the given node.
    /// Returns `None` when the index is out of range.
    pub fn replace_child(&self, index: usize, node: Node) -> Option<Cow<Self>> {
        let current = self.inner.get(index)?;

        if *current == node {
            Some(Cow::Borrowed(self))
        } else {
            let size = self.size + node.node_size() - current.node_size();
            let mut copy = self.inner.clone();
            copy[index] = node;
            Some(Cow::Owned(Fragment { inner: copy, size }))
        }
    }

    /// Replace the children between the two indices with the given nodes
    pub fn splice(&self, from: usize, to: usize, nodes: Vec<Node>) -> Self {
        let mut inner = Vec::with_capacity(self.inner.len() + nodes.len());
        inner.extend_from_slice(&self.inner[..from]);
        inner.extend(nodes);
        inner.extend_from_slice(&self.inner[to..]);
        Fragment::from(inner)
    }

    /// Get the child node at the given index, if it exists.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.inner.get(index)
    }

    /// Find the index and inner offset corresponding to a given relative position in this
    /// fragment.
    pub(crate) fn find_index(&self, pos: usize, round: bool) -> Result<Index, ()> {
        let len = self.inner.len();
        match pos {
            0 => Ok(Index {
                index: 0,
                offset: pos,
            }),
            p if p == self.size => Ok(Index {
                index: len,
                offset: pos,
            }),
            p if p > self.size => Err(()),
            p => {
                let mut cur_pos = 0;
                for (i, cur) in self.inner.iter().enumerate() {
                    let end = cur_pos + cur.node_size();
                    if end >= p {
                        if (end == p) || round {
                            return Ok(Index {
                                index: i + 1,
                                offset: end,
                            });
                        } else {
                            return Ok(Index {
                                index: i,
                                offset: cur_pos,
                            });
                        }
                    }
                    cur_pos = end;
                }
                Err(())
            }
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter()).finish()
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(src: Vec<Node>) -> Fragment {
        let size = src.iter().map(|x| x.node_size()).sum::<usize>();
        Fragment { inner: src, size }
    }
}

impl From<Fragment> for Vec<Node> {
    fn from(src: Fragment) -> Vec<Node> {
        src.inner
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Fragment {
        Fragment::from(vec![node])
    }
}
