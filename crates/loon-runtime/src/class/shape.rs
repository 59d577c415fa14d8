//! Shapes: precomputed ancestry and slot-offset summaries
//!
//! A shape answers the two questions dispatch asks constantly: "is this class
//! a subtype of that one" and "where does slot `name` live on this class".
//! Subtype tests are a membership check against a sorted ancestor-id list —
//! never a walk up the ancestor-pointer chain — and named slots resolve
//! through per-shape offset entries so the same name can sit at different
//! physical offsets in different subclasses.

use super::ClassId;

/// Index of a shape in the class table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub(crate) u32);

/// Where a named slot lives for one particular shape
#[derive(Debug, Clone, Copy)]
pub struct SlotOffset {
    /// Shape the entry applies to
    pub shape: ShapeId,
    /// Index into that class's slot table
    pub offset: usize,
}

/// Precomputed ancestry summary for one class
#[derive(Debug, Clone)]
pub struct Shape {
    /// The class this shape describes
    pub class: ClassId,
    /// Every ancestor id including the class itself, sorted
    ancestors: Vec<ClassId>,
}

impl Shape {
    /// Build a shape from the ancestor's id list plus the new class
    pub(crate) fn derive(class: ClassId, parent: Option<&Shape>) -> Self {
        let mut ancestors = parent.map(|p| p.ancestors.clone()).unwrap_or_default();
        ancestors.push(class);
        ancestors.sort_unstable();
        Self { class, ancestors }
    }

    /// Membership check against the precomputed ancestor list
    pub fn has_ancestor(&self, class: ClassId) -> bool {
        self.ancestors.binary_search(&class).is_ok()
    }

    /// Number of ancestors, the class itself included
    pub fn ancestor_count(&self) -> usize {
        self.ancestors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_shape() {
        let root = Shape::derive(ClassId(0), None);
        assert!(root.has_ancestor(ClassId(0)));
        assert!(!root.has_ancestor(ClassId(1)));
        assert_eq!(root.ancestor_count(), 1);
    }

    #[test]
    fn test_derived_shape() {
        let a = Shape::derive(ClassId(0), None);
        let b = Shape::derive(ClassId(1), Some(&a));
        let c = Shape::derive(ClassId(2), Some(&b));

        assert!(c.has_ancestor(ClassId(0)));
        assert!(c.has_ancestor(ClassId(1)));
        assert!(c.has_ancestor(ClassId(2)));
        assert!(!a.has_ancestor(ClassId(2)));
        assert_eq!(c.ancestor_count(), 3);
    }
}
