use super::{Attrs, MarkTypeRef};
use std::fmt;

/// A mark is a piece of information that can be attached to a node, such as it being emphasized,
/// in code font, or a link. It has a type and optionally a set of attributes that provide further
/// information (such as the target of the link).
#[derive(Clone, PartialEq)]
pub struct Mark {
    pub(crate) ty: MarkTypeRef,
    pub(crate) attrs: Attrs,
}

impl Mark {
    /// The type of this mark
    pub fn mark_type(&self) -> &MarkTypeRef {
        &self.ty
    }

    /// The name of the type of this mark
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// The attributes associated with this mark.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Test whether this mark has the given type
    pub fn is(&self, name: &str) -> bool {
        self.ty.name() == name
    }

    /// Given a set of marks, create a new set which contains this one as well, in the right
    /// position. If this mark is already in the set, the set itself is returned. If any marks that
    /// are set to be exclusive with this mark are present, those are replaced by this one.
    pub fn add_to_set(&self, set: &MarkSet) -> MarkSet {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.0.iter().enumerate() {
            if self == other {
                return set.clone();
            }
            if self.ty.excludes(&other.ty) {
                if copy.is_none() {
                    copy = Some(set.0[..i].to_vec());
                }
            } else if other.ty.excludes(&self.ty) {
                return set.clone();
            } else {
                if !placed && other.ty.rank() > self.ty.rank() {
                    copy.get_or_insert_with(|| set.0[..i].to_vec()).push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.0.clone());
        if !placed {
            copy.push(self.clone());
        }
        MarkSet(copy)
    }

    /// Remove this mark from the given set, returning a new set. If this mark is not in the set,
    /// the set itself is returned.
    pub fn remove_from_set(&self, set: &MarkSet) -> MarkSet {
        MarkSet(set.0.iter().filter(|m| *m != self).cloned().collect())
    }

    /// Test whether this mark is in the given set of marks.
    pub fn is_in_set(&self, set: &MarkSet) -> bool {
        set.0.iter().any(|m| m == self)
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.ty.name())
        } else {
            write!(f, "{}{:?}", self.ty.name(), self.attrs)
        }
    }
}

/// A set of marks, ordered by the rank of their types
#[derive(Clone, Default, PartialEq)]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    /// The empty set of marks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a properly sorted set from a list of marks
    pub fn from_marks<I: IntoIterator<Item = Mark>>(marks: I) -> Self {
        marks
            .into_iter()
            .fold(MarkSet::new(), |set, mark| mark.add_to_set(&set))
    }

    /// Iterate over the marks
    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.0.iter()
    }

    /// The number of marks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no marks
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find a mark of the given type
    pub fn find(&self, name: &str) -> Option<&Mark> {
        self.0.iter().find(|m| m.is(name))
    }

    /// Remove all marks of the given type
    pub fn without_type(&self, name: &str) -> MarkSet {
        MarkSet(self.0.iter().filter(|m| !m.is(name)).cloned().collect())
    }

    /// Get the marks as a slice
    pub fn as_slice(&self) -> &[Mark] {
        &self.0
    }
}

impl fmt::Debug for MarkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
