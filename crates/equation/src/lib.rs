//! Equation Crate - layout scopes for the equation editor
//!
//! An equation is a tree of containers and wrappers:
//! - A container is a layout scope holding a row of wrappers, left to right
//! - A wrapper is a box in that row; a group wrapper hosts a nested container
//!   (a numerator, a radicand, ...) and so opens a new scope
//! - Every node carries cached properties (width, height, alignment anchors)
//!   derived from its children by explicit rules
//! - Structural edits go through batch operations on [`EquationTree`] which
//!   keep row indices and parent links consistent and re-run layout
//! - View handles mirror structure and size into the presentation layer

pub mod error;
pub mod layout;
pub mod node;
pub mod node_id;
pub mod property;
pub mod settings;
pub mod tree;
pub mod view;

pub use error::*;
pub use node::{Container, EquationNode, FontSize, NodeKind, Wrapper, WrapperKind, WrapperMetrics};
pub use node_id::NodeId;
pub use property::{ComputeRule, Property, ViewSync};
pub use settings::{LayoutSettings, UpdateScope};
pub use tree::EquationTree;
pub use view::{
    NullView, NullViewFactory, RecordingView, RecordingViewFactory, ViewFactory, ViewHandle,
    ViewLog, ViewOp,
};

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================================
    // Integration Tests
    // =============================================================================

    #[test]
    fn test_round_trip_to_empty() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(WrapperMetrics::new(1.0, 2.0, 1.0));
        let b = tree.create_leaf(WrapperMetrics::new(3.0, 1.0, 2.0));
        let c = tree.create_leaf(WrapperMetrics::new(2.0, 2.0, 3.0));

        tree.add_wrappers(container, vec![(0, a), (1, b), (2, c)])
            .unwrap();
        assert_eq!(tree.container(container).unwrap().width(), 6.0);

        tree.remove_wrappers(container, vec![0, 1, 2]).unwrap();
        let node = tree.container(container).unwrap();
        assert!(node.is_empty());
        assert_eq!(node.width(), 0.0);
        assert_eq!(node.height(), 0.0);
    }

    #[test]
    fn test_remove_middle_reindexes() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(WrapperMetrics::new(1.0, 1.0, 1.0));
        let b = tree.create_leaf(WrapperMetrics::new(1.0, 1.0, 2.0));
        let c = tree.create_leaf(WrapperMetrics::new(1.0, 1.0, 3.0));
        tree.add_wrappers(container, vec![(0, a), (1, b), (2, c)])
            .unwrap();

        tree.remove_wrappers(container, vec![1]).unwrap();

        assert_eq!(tree.children(container).unwrap(), &[a, c]);
        assert_eq!(tree.wrapper(a).unwrap().index(), 0);
        assert_eq!(tree.wrapper(c).unwrap().index(), 1);
        assert_eq!(tree.container(container).unwrap().width(), 4.0);
    }

    #[test]
    fn test_out_of_range_removal_leaves_row_unchanged() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(WrapperMetrics::new(1.0, 1.0, 1.0));
        let b = tree.create_leaf(WrapperMetrics::new(1.0, 1.0, 1.0));
        tree.add_wrappers(container, vec![(0, a), (1, b)]).unwrap();

        let err = tree.remove_wrappers(container, vec![5]).unwrap_err();
        assert!(matches!(err, LayoutError::OutOfRangeIndex { .. }));
        assert_eq!(tree.children(container).unwrap(), &[a, b]);
    }
}
