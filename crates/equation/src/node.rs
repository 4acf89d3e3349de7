//! Node types stored in the equation tree

use crate::layout::rules;
use crate::property::{no_sync, sync_height, sync_width, Property};
use crate::view::ViewHandle;
use crate::NodeId;
use serde::{Deserialize, Serialize};

/// The two kinds of node in an equation tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A layout scope holding a row of wrappers
    Container,
    /// A box inside a container's row
    Wrapper,
}

/// Size class of a container, following LaTeX's nesting conventions.
/// The pixel size behind each class belongs to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    #[default]
    Normal,
    Smaller,
    Smallest,
}

impl FontSize {
    /// Class name the presentation layer styles this size with
    pub fn css_class(&self) -> &'static str {
        match self {
            FontSize::Normal => "fontSizeNormal",
            FontSize::Smaller => "fontSizeSmaller",
            FontSize::Smallest => "fontSizeSmallest",
        }
    }
}

/// Geometry a wrapper contributes to its row
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WrapperMetrics {
    /// Distance from the shared baseline up to the box's top edge
    pub top_align: f32,
    /// Distance from the shared baseline down to the box's bottom edge
    pub bottom_align: f32,
    pub width: f32,
}

impl WrapperMetrics {
    pub fn new(top_align: f32, bottom_align: f32, width: f32) -> Self {
        Self {
            top_align,
            bottom_align,
            width,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn height(&self) -> f32 {
        self.top_align + self.bottom_align
    }
}

/// How a wrapper gets its geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapperKind {
    /// Geometry is measured elsewhere and written with
    /// [`EquationTree::set_metrics`](crate::EquationTree::set_metrics)
    Leaf,
    /// Geometry is derived from a nested container (a new scope, such as a
    /// numerator)
    Group { content: NodeId },
}

// =============================================================================
// Container
// =============================================================================

/// A layout scope: an ordered row of wrappers and the geometry derived from it
#[derive(Debug)]
pub struct Container {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) wrappers: Vec<NodeId>,
    pub(crate) font_size: FontSize,
    pub(crate) max_top_align_index: Property<usize>,
    pub(crate) max_bottom_align_index: Property<usize>,
    pub(crate) width: Property<f32>,
    pub(crate) height: Property<f32>,
    pub(crate) view: Box<dyn ViewHandle>,
}

impl Container {
    pub(crate) fn new(id: NodeId, font_size: FontSize, view: Box<dyn ViewHandle>) -> Self {
        Self {
            id,
            parent: None,
            wrappers: Vec::new(),
            font_size,
            max_top_align_index: Property::new(
                "maxTopAlignIndex",
                id,
                0,
                rules::max_top_align_index,
                no_sync,
            ),
            max_bottom_align_index: Property::new(
                "maxBottomAlignIndex",
                id,
                0,
                rules::max_bottom_align_index,
                no_sync,
            ),
            width: Property::new("width", id, 0.0, rules::container_width, sync_width),
            height: Property::new("height", id, 0.0, rules::container_height, sync_height),
            view,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The group wrapper hosting this container, if any
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child wrappers in layout order
    pub fn wrappers(&self) -> &[NodeId] {
        &self.wrappers
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    pub fn font_size(&self) -> FontSize {
        self.font_size
    }

    /// Index of the first child with the greatest `top_align`
    pub fn max_top_align_index(&self) -> usize {
        self.max_top_align_index.get()
    }

    /// Index of the first child with the greatest `bottom_align`
    pub fn max_bottom_align_index(&self) -> usize {
        self.max_bottom_align_index.get()
    }

    pub fn width(&self) -> f32 {
        self.width.get()
    }

    pub fn height(&self) -> f32 {
        self.height.get()
    }
}

// =============================================================================
// Wrapper
// =============================================================================

/// A box in a container's row
#[derive(Debug)]
pub struct Wrapper {
    pub(crate) id: NodeId,
    pub(crate) index: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: WrapperKind,
    pub(crate) top_align: Property<f32>,
    pub(crate) bottom_align: Property<f32>,
    pub(crate) width: Property<f32>,
    pub(crate) height: Property<f32>,
    pub(crate) view: Box<dyn ViewHandle>,
}

impl Wrapper {
    pub(crate) fn new(
        id: NodeId,
        kind: WrapperKind,
        metrics: WrapperMetrics,
        view: Box<dyn ViewHandle>,
    ) -> Self {
        Self {
            id,
            index: 0,
            parent: None,
            kind,
            top_align: Property::new(
                "topAlign",
                id,
                metrics.top_align,
                rules::wrapper_top_align,
                no_sync,
            ),
            bottom_align: Property::new(
                "bottomAlign",
                id,
                metrics.bottom_align,
                rules::wrapper_bottom_align,
                no_sync,
            ),
            width: Property::new("width", id, metrics.width, rules::wrapper_width, sync_width),
            height: Property::new(
                "height",
                id,
                metrics.height(),
                rules::wrapper_height,
                sync_height,
            ),
            view,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Position in the owning container's row
    pub fn index(&self) -> usize {
        self.index
    }

    /// The owning container, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> WrapperKind {
        self.kind
    }

    pub fn top_align(&self) -> f32 {
        self.top_align.get()
    }

    pub fn bottom_align(&self) -> f32 {
        self.bottom_align.get()
    }

    pub fn width(&self) -> f32 {
        self.width.get()
    }

    pub fn height(&self) -> f32 {
        self.height.get()
    }

    pub fn metrics(&self) -> WrapperMetrics {
        WrapperMetrics::new(self.top_align(), self.bottom_align(), self.width())
    }
}

// =============================================================================
// EquationNode
// =============================================================================

/// A node of either kind, as stored in the tree
#[derive(Debug)]
pub enum EquationNode {
    Container(Container),
    Wrapper(Wrapper),
}

impl EquationNode {
    pub fn id(&self) -> NodeId {
        match self {
            EquationNode::Container(c) => c.id,
            EquationNode::Wrapper(w) => w.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            EquationNode::Container(_) => NodeKind::Container,
            EquationNode::Wrapper(_) => NodeKind::Wrapper,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            EquationNode::Container(c) => c.parent,
            EquationNode::Wrapper(w) => w.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            EquationNode::Container(c) => c.parent = parent,
            EquationNode::Wrapper(w) => w.parent = parent,
        }
    }

    /// Nodes one level down: a container's row, or a group's content
    pub fn child_ids(&self) -> Vec<NodeId> {
        match self {
            EquationNode::Container(c) => c.wrappers.clone(),
            EquationNode::Wrapper(w) => match w.kind {
                WrapperKind::Leaf => Vec::new(),
                WrapperKind::Group { content } => vec![content],
            },
        }
    }
}
