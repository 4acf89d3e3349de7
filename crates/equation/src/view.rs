//! View handles
//!
//! A view handle is the sink that mirrors a node's structure and size into
//! whatever presents the equation (a DOM element, a canvas item, ...). The
//! tree only ever writes to it and never reads anything back.

use crate::node::NodeKind;
use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Sink for structural and dimensional changes of one node
pub trait ViewHandle: std::fmt::Debug {
    /// A child was inserted into the node's row at `index`
    fn insert_child(&mut self, index: usize, child: NodeId);

    /// The child at `index` was removed from the node's row
    fn remove_child(&mut self, index: usize);

    /// The node's width changed (or was re-pushed)
    fn set_width(&mut self, width: f32);

    /// The node's height changed (or was re-pushed)
    fn set_height(&mut self, height: f32);
}

/// Creates a view handle for every node the tree allocates
pub trait ViewFactory: std::fmt::Debug {
    fn create_view(&self, id: NodeId, kind: NodeKind) -> Box<dyn ViewHandle>;
}

/// A view handle that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl ViewHandle for NullView {
    fn insert_child(&mut self, _index: usize, _child: NodeId) {}
    fn remove_child(&mut self, _index: usize) {}
    fn set_width(&mut self, _width: f32) {}
    fn set_height(&mut self, _height: f32) {}
}

/// Factory for [`NullView`] handles
#[derive(Debug, Default, Clone, Copy)]
pub struct NullViewFactory;

impl ViewFactory for NullViewFactory {
    fn create_view(&self, _id: NodeId, _kind: NodeKind) -> Box<dyn ViewHandle> {
        Box::new(NullView)
    }
}

/// A single call made on a view handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewOp {
    InsertChild { index: usize, child: NodeId },
    RemoveChild { index: usize },
    SetWidth(f32),
    SetHeight(f32),
}

/// Shared, ordered log of view traffic across every node of a tree
pub type ViewLog = Rc<RefCell<Vec<(NodeId, ViewOp)>>>;

/// A headless view handle that appends every call to a shared log
#[derive(Debug, Clone)]
pub struct RecordingView {
    id: NodeId,
    log: ViewLog,
}

impl RecordingView {
    pub fn new(id: NodeId, log: ViewLog) -> Self {
        Self { id, log }
    }

    fn record(&self, op: ViewOp) {
        self.log.borrow_mut().push((self.id, op));
    }
}

impl ViewHandle for RecordingView {
    fn insert_child(&mut self, index: usize, child: NodeId) {
        self.record(ViewOp::InsertChild { index, child });
    }

    fn remove_child(&mut self, index: usize) {
        self.record(ViewOp::RemoveChild { index });
    }

    fn set_width(&mut self, width: f32) {
        self.record(ViewOp::SetWidth(width));
    }

    fn set_height(&mut self, height: f32) {
        self.record(ViewOp::SetHeight(height));
    }
}

/// Factory handing out [`RecordingView`]s that share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingViewFactory {
    log: ViewLog,
}

impl RecordingViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared log all created views write to
    pub fn log(&self) -> ViewLog {
        Rc::clone(&self.log)
    }

    /// All operations recorded for one node, in call order
    pub fn ops_for(&self, id: NodeId) -> Vec<ViewOp> {
        self.log
            .borrow()
            .iter()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl ViewFactory for RecordingViewFactory {
    fn create_view(&self, id: NodeId, _kind: NodeKind) -> Box<dyn ViewHandle> {
        Box::new(RecordingView::new(id, self.log()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_view_logs_in_order() {
        let factory = RecordingViewFactory::new();
        let id = NodeId::new();
        let child = NodeId::new();
        let mut view = factory.create_view(id, NodeKind::Container);

        view.insert_child(0, child);
        view.set_width(3.0);
        view.remove_child(0);

        assert_eq!(
            factory.ops_for(id),
            vec![
                ViewOp::InsertChild { index: 0, child },
                ViewOp::SetWidth(3.0),
                ViewOp::RemoveChild { index: 0 },
            ]
        );
    }

    #[test]
    fn test_recording_views_share_log() {
        let factory = RecordingViewFactory::new();
        let a = NodeId::new();
        let b = NodeId::new();
        factory.create_view(a, NodeKind::Container).set_height(1.0);
        factory.create_view(b, NodeKind::Wrapper).set_height(2.0);

        assert_eq!(factory.log().borrow().len(), 2);
        assert_eq!(factory.ops_for(b), vec![ViewOp::SetHeight(2.0)]);

        factory.clear();
        assert!(factory.log().borrow().is_empty());
    }
}
