//! Equation tree storage and structural edits
//!
//! All nodes live in one map keyed by [`NodeId`]. A container's row is the
//! only owning edge: parent links are plain ids, and removing a wrapper from
//! its row is what destroys it.

use crate::error::{LayoutError, LayoutResult};
use crate::node::{
    Container, EquationNode, FontSize, NodeKind, Wrapper, WrapperKind, WrapperMetrics,
};
use crate::settings::LayoutSettings;
use crate::view::{NullViewFactory, ViewFactory};
use crate::NodeId;
use std::collections::{HashMap, HashSet};

/// Arena of containers and wrappers making up one or more equations
#[derive(Debug)]
pub struct EquationTree {
    nodes: HashMap<NodeId, EquationNode>,
    views: Box<dyn ViewFactory>,
    settings: LayoutSettings,
}

impl Default for EquationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl EquationTree {
    /// Create an empty tree whose nodes get no-op view handles
    pub fn new() -> Self {
        Self::with_view_factory(NullViewFactory)
    }

    /// Create an empty tree that asks `views` for every node's view handle
    pub fn with_view_factory(views: impl ViewFactory + 'static) -> Self {
        Self {
            nodes: HashMap::new(),
            views: Box::new(views),
            settings: LayoutSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LayoutSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn node(&self, id: NodeId) -> LayoutResult<&EquationNode> {
        self.nodes.get(&id).ok_or(LayoutError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> LayoutResult<&mut EquationNode> {
        self.nodes.get_mut(&id).ok_or(LayoutError::NodeNotFound(id))
    }

    pub fn container(&self, id: NodeId) -> LayoutResult<&Container> {
        match self.node(id)? {
            EquationNode::Container(c) => Ok(c),
            EquationNode::Wrapper(_) => Err(LayoutError::UnexpectedNodeKind {
                id,
                expected: NodeKind::Container,
            }),
        }
    }

    pub(crate) fn container_mut(&mut self, id: NodeId) -> LayoutResult<&mut Container> {
        match self.node_mut(id)? {
            EquationNode::Container(c) => Ok(c),
            EquationNode::Wrapper(_) => Err(LayoutError::UnexpectedNodeKind {
                id,
                expected: NodeKind::Container,
            }),
        }
    }

    pub fn wrapper(&self, id: NodeId) -> LayoutResult<&Wrapper> {
        match self.node(id)? {
            EquationNode::Wrapper(w) => Ok(w),
            EquationNode::Container(_) => Err(LayoutError::UnexpectedNodeKind {
                id,
                expected: NodeKind::Wrapper,
            }),
        }
    }

    pub(crate) fn wrapper_mut(&mut self, id: NodeId) -> LayoutResult<&mut Wrapper> {
        match self.node_mut(id)? {
            EquationNode::Wrapper(w) => Ok(w),
            EquationNode::Container(_) => Err(LayoutError::UnexpectedNodeKind {
                id,
                expected: NodeKind::Wrapper,
            }),
        }
    }

    /// A container's row, in layout order
    pub fn children(&self, container: NodeId) -> LayoutResult<&[NodeId]> {
        Ok(self.container(container)?.wrappers())
    }

    pub fn parent(&self, id: NodeId) -> LayoutResult<Option<NodeId>> {
        Ok(self.node(id)?.parent())
    }

    /// Follow parent links up to the node with no parent
    pub fn root_of(&self, id: NodeId) -> LayoutResult<NodeId> {
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// Ids from `id`'s parent up to the root, nearest first
    pub fn ancestors(&self, id: NodeId) -> LayoutResult<Vec<NodeId>> {
        let mut ancestors = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            ancestors.push(parent);
            current = parent;
        }
        Ok(ancestors)
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    /// Create an empty, unattached container with the default size class
    pub fn create_container(&mut self) -> NodeId {
        self.create_container_with_font_size(self.settings.default_font_size)
    }

    pub fn create_container_with_font_size(&mut self, font_size: FontSize) -> NodeId {
        let id = NodeId::new();
        let view = self.views.create_view(id, NodeKind::Container);
        self.nodes.insert(
            id,
            EquationNode::Container(Container::new(id, font_size, view)),
        );
        id
    }

    /// Create an unattached wrapper whose geometry is set from outside
    pub fn create_leaf(&mut self, metrics: WrapperMetrics) -> NodeId {
        self.insert_wrapper(WrapperKind::Leaf, metrics)
    }

    /// Create an unattached wrapper hosting `content` as a nested scope.
    /// The wrapper's geometry is derived from the container straight away.
    pub fn create_group(&mut self, content: NodeId) -> LayoutResult<NodeId> {
        let container = self.container(content)?;
        if container.parent().is_some() {
            return Err(LayoutError::NotDetached(content));
        }
        let id = self.insert_wrapper(WrapperKind::Group { content }, WrapperMetrics::zero());
        self.container_mut(content)?.parent = Some(id);
        self.update(id)?;
        Ok(id)
    }

    fn insert_wrapper(&mut self, kind: WrapperKind, metrics: WrapperMetrics) -> NodeId {
        let id = NodeId::new();
        let view = self.views.create_view(id, NodeKind::Wrapper);
        self.nodes
            .insert(id, EquationNode::Wrapper(Wrapper::new(id, kind, metrics, view)));
        id
    }

    // =========================================================================
    // Externally driven values
    // =========================================================================

    /// Overwrite a leaf's measured geometry and bring the tree up to date
    pub fn set_metrics(&mut self, leaf: NodeId, metrics: WrapperMetrics) -> LayoutResult<()> {
        let wrapper = self.wrapper_mut(leaf)?;
        if let WrapperKind::Group { .. } = wrapper.kind {
            return Err(LayoutError::DerivedGeometry(leaf));
        }
        wrapper.top_align.set(metrics.top_align);
        wrapper.bottom_align.set(metrics.bottom_align);
        wrapper.width.set(metrics.width);
        self.refresh(leaf)
    }

    pub fn set_font_size(&mut self, container: NodeId, font_size: FontSize) -> LayoutResult<()> {
        self.container_mut(container)?.font_size = font_size;
        Ok(())
    }

    // =========================================================================
    // Batch mutations
    // =========================================================================

    /// Insert wrappers into a container's row.
    ///
    /// Each entry names the final position of its wrapper. Entries are applied
    /// in ascending index order as plain inserts into the row as it stands, so
    /// callers supply mutually consistent final positions; the order of
    /// `entries` itself does not matter. The whole batch is validated before
    /// the row is touched.
    pub fn add_wrappers(
        &mut self,
        container: NodeId,
        mut entries: Vec<(usize, NodeId)>,
    ) -> LayoutResult<()> {
        entries.sort_by_key(|&(index, _)| index);
        self.validate_insertions(container, &entries)?;
        if entries.is_empty() {
            return Ok(());
        }

        tracing::debug!(%container, count = entries.len(), "adding wrappers");

        let row = &mut self.container_mut(container)?.wrappers;
        for &(index, wrapper) in &entries {
            row.insert(index, wrapper);
        }
        self.reindex(container)?;

        // Ascending inserts never shift an earlier entry, so each target index
        // is also its final position.
        let view = &mut self.container_mut(container)?.view;
        for &(index, wrapper) in &entries {
            view.insert_child(index, wrapper);
        }

        self.refresh(container)
    }

    /// Remove and destroy the wrappers at `indices` (positions in the row
    /// before the call), together with everything nested inside them
    pub fn remove_wrappers(&mut self, container: NodeId, indices: Vec<usize>) -> LayoutResult<()> {
        let removed = self.take_wrappers(container, indices)?;
        if removed.is_empty() {
            return Ok(());
        }
        for wrapper in removed {
            self.destroy_subtree(wrapper);
        }
        self.refresh(container)
    }

    /// Remove the wrappers at `indices` but keep them alive and unattached so
    /// they can be added to another row. Returned in original row order.
    pub fn detach_wrappers(
        &mut self,
        container: NodeId,
        indices: Vec<usize>,
    ) -> LayoutResult<Vec<NodeId>> {
        let detached = self.take_wrappers(container, indices)?;
        if detached.is_empty() {
            return Ok(detached);
        }
        for &wrapper in &detached {
            self.node_mut(wrapper)?.set_parent(None);
        }
        self.refresh(container)?;
        Ok(detached)
    }

    /// Drop an unattached node and everything nested inside it
    pub fn discard(&mut self, id: NodeId) -> LayoutResult<()> {
        if self.parent(id)?.is_some() {
            return Err(LayoutError::NotDetached(id));
        }
        self.destroy_subtree(id);
        Ok(())
    }

    fn take_wrappers(
        &mut self,
        container: NodeId,
        mut indices: Vec<usize>,
    ) -> LayoutResult<Vec<NodeId>> {
        indices.sort_unstable();
        self.validate_removals(container, &indices)?;
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(%container, count = indices.len(), "removing wrappers");

        let node = self.container_mut(container)?;
        let mut taken = Vec::with_capacity(indices.len());
        for (correction, &index) in indices.iter().enumerate() {
            let position = index - correction;
            taken.push(node.wrappers.remove(position));
            node.view.remove_child(position);
        }
        self.reindex(container)?;
        Ok(taken)
    }

    fn validate_insertions(
        &self,
        container: NodeId,
        sorted: &[(usize, NodeId)],
    ) -> LayoutResult<()> {
        let len = self.container(container)?.len();
        let root = self.root_of(container)?;
        let mut seen = HashSet::new();

        for (k, pair) in sorted.iter().enumerate() {
            let (index, wrapper) = *pair;
            if k > 0 && sorted[k - 1].0 == index {
                return Err(LayoutError::InconsistentBatchArguments(format!(
                    "duplicate target index {}",
                    index
                )));
            }
            if index > len + k {
                return Err(LayoutError::OutOfRangeIndex {
                    index,
                    len: len + k,
                });
            }
            if !seen.insert(wrapper) {
                return Err(LayoutError::InconsistentBatchArguments(format!(
                    "wrapper {} appears more than once",
                    wrapper
                )));
            }
            if let Some(owner) = self.wrapper(wrapper)?.parent() {
                return Err(LayoutError::InconsistentBatchArguments(format!(
                    "wrapper {} is already attached to {}",
                    wrapper, owner
                )));
            }
            if wrapper == root {
                return Err(LayoutError::InconsistentBatchArguments(format!(
                    "wrapper {} contains container {}",
                    wrapper, container
                )));
            }
        }
        Ok(())
    }

    fn validate_removals(&self, container: NodeId, sorted: &[usize]) -> LayoutResult<()> {
        let len = self.container(container)?.len();
        for (k, &index) in sorted.iter().enumerate() {
            if index >= len {
                return Err(LayoutError::OutOfRangeIndex { index, len });
            }
            if k > 0 && sorted[k - 1] == index {
                return Err(LayoutError::InconsistentBatchArguments(format!(
                    "duplicate index {}",
                    index
                )));
            }
        }
        Ok(())
    }

    /// Point every wrapper in the row at its position and at the container
    fn reindex(&mut self, container: NodeId) -> LayoutResult<()> {
        let row = self.container(container)?.wrappers.clone();
        for (index, id) in row.into_iter().enumerate() {
            let wrapper = self.wrapper_mut(id)?;
            wrapper.index = index;
            wrapper.parent = Some(container);
        }
        Ok(())
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.child_ids());
            }
        }
    }
}
