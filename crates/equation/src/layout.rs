//! Equation Layout - derive container and wrapper geometry
//!
//! A pass over a subtree visits children before their owner: a container
//! updates every wrapper in its row, then recomputes its own properties from
//! the now-valid child values, then pushes them to its view. Every property
//! of a visited node is recomputed; nothing is tracked between passes.

use crate::error::{LayoutError, LayoutResult};
use crate::node::{Container, EquationNode, NodeKind, Wrapper, WrapperKind};
use crate::property::Property;
use crate::settings::UpdateScope;
use crate::{EquationTree, NodeId};

// =============================================================================
// Compute rules
// =============================================================================

/// Derivation rules behind the built-in properties. Each reads only the
/// owner and its immediate children.
pub mod rules {
    use super::*;

    /// Index of the first maximum; 0 for an empty sequence. Only a value
    /// strictly greater than the current best takes over, so ties and
    /// unordered values (NaN) never displace an earlier child.
    fn first_max_index(values: impl IntoIterator<Item = f32>) -> usize {
        let mut values = values.into_iter().enumerate();
        let Some((_, mut max)) = values.next() else {
            return 0;
        };
        let mut best = 0;
        for (index, value) in values {
            if value > max {
                best = index;
                max = value;
            }
        }
        best
    }

    fn row_wrappers<'a>(
        tree: &'a EquationTree,
        container: &Container,
    ) -> LayoutResult<Vec<&'a Wrapper>> {
        container.wrappers.iter().map(|&id| tree.wrapper(id)).collect()
    }

    fn wrapper_at<'a>(
        tree: &'a EquationTree,
        container: &Container,
        index: usize,
    ) -> LayoutResult<&'a Wrapper> {
        let id = container
            .wrappers
            .get(index)
            .ok_or(LayoutError::OutOfRangeIndex {
                index,
                len: container.len(),
            })?;
        tree.wrapper(*id)
    }

    /// Top anchor of a row: `top_align` of its tallest-above-baseline child
    fn row_top(tree: &EquationTree, container: &Container) -> LayoutResult<f32> {
        if container.is_empty() {
            return Ok(0.0);
        }
        Ok(wrapper_at(tree, container, container.max_top_align_index())?.top_align())
    }

    /// Bottom anchor of a row: `bottom_align` of its deepest child
    fn row_bottom(tree: &EquationTree, container: &Container) -> LayoutResult<f32> {
        if container.is_empty() {
            return Ok(0.0);
        }
        Ok(wrapper_at(tree, container, container.max_bottom_align_index())?.bottom_align())
    }

    pub fn max_top_align_index(tree: &EquationTree, id: NodeId) -> LayoutResult<usize> {
        let container = tree.container(id)?;
        let row = row_wrappers(tree, container)?;
        Ok(first_max_index(row.iter().map(|w| w.top_align())))
    }

    pub fn max_bottom_align_index(tree: &EquationTree, id: NodeId) -> LayoutResult<usize> {
        let container = tree.container(id)?;
        let row = row_wrappers(tree, container)?;
        Ok(first_max_index(row.iter().map(|w| w.bottom_align())))
    }

    pub fn container_width(tree: &EquationTree, id: NodeId) -> LayoutResult<f32> {
        let container = tree.container(id)?;
        Ok(row_wrappers(tree, container)?.iter().map(|w| w.width()).sum())
    }

    /// Reads the cached alignment indices, so those are computed first
    pub fn container_height(tree: &EquationTree, id: NodeId) -> LayoutResult<f32> {
        let container = tree.container(id)?;
        Ok(row_top(tree, container)? + row_bottom(tree, container)?)
    }

    pub fn wrapper_top_align(tree: &EquationTree, id: NodeId) -> LayoutResult<f32> {
        let wrapper = tree.wrapper(id)?;
        match wrapper.kind {
            WrapperKind::Leaf => Ok(wrapper.top_align()),
            WrapperKind::Group { content } => row_top(tree, tree.container(content)?),
        }
    }

    pub fn wrapper_bottom_align(tree: &EquationTree, id: NodeId) -> LayoutResult<f32> {
        let wrapper = tree.wrapper(id)?;
        match wrapper.kind {
            WrapperKind::Leaf => Ok(wrapper.bottom_align()),
            WrapperKind::Group { content } => row_bottom(tree, tree.container(content)?),
        }
    }

    pub fn wrapper_width(tree: &EquationTree, id: NodeId) -> LayoutResult<f32> {
        let wrapper = tree.wrapper(id)?;
        match wrapper.kind {
            WrapperKind::Leaf => Ok(wrapper.width()),
            WrapperKind::Group { content } => Ok(tree.container(content)?.width()),
        }
    }

    pub fn wrapper_height(tree: &EquationTree, id: NodeId) -> LayoutResult<f32> {
        let wrapper = tree.wrapper(id)?;
        Ok(wrapper.top_align() + wrapper.bottom_align())
    }

}

// =============================================================================
// Recomputation passes
// =============================================================================

impl EquationTree {
    /// Recompute `id` and everything nested inside it, children first, and
    /// push the results to the view handles.
    pub fn update(&mut self, id: NodeId) -> LayoutResult<()> {
        for child in self.node(id)?.child_ids() {
            self.update(child)?;
        }
        self.recompute_own(id)
    }

    /// Recompute the whole equation `id` belongs to
    pub fn update_all(&mut self, id: NodeId) -> LayoutResult<()> {
        let root = self.root_of(id)?;
        self.update(root)
    }

    /// Bring the tree up to date after `id` was edited
    pub(crate) fn refresh(&mut self, id: NodeId) -> LayoutResult<()> {
        match self.settings().update_scope {
            UpdateScope::Root => self.update_all(id),
            UpdateScope::Subtree => {
                self.update(id)?;
                for ancestor in self.ancestors(id)? {
                    self.recompute_own(ancestor)?;
                }
                Ok(())
            }
        }
    }

    /// Recompute one node's properties from its children's cached values,
    /// then sync its view. Does not descend.
    fn recompute_own(&mut self, id: NodeId) -> LayoutResult<()> {
        tracing::trace!(%id, "recomputing node");
        match self.node(id)?.kind() {
            NodeKind::Container => {
                self.recompute_container(id, |c| &mut c.max_top_align_index)?;
                self.recompute_container(id, |c| &mut c.max_bottom_align_index)?;
                self.recompute_container(id, |c| &mut c.width)?;
                self.recompute_container(id, |c| &mut c.height)?;

                let container = self.container_mut(id)?;
                let view = container.view.as_mut();
                container.max_top_align_index.update_view(view);
                container.max_bottom_align_index.update_view(view);
                container.width.update_view(view);
                container.height.update_view(view);
            }
            NodeKind::Wrapper => {
                self.recompute_wrapper(id, |w| &mut w.top_align)?;
                self.recompute_wrapper(id, |w| &mut w.bottom_align)?;
                self.recompute_wrapper(id, |w| &mut w.width)?;
                self.recompute_wrapper(id, |w| &mut w.height)?;

                let wrapper = self.wrapper_mut(id)?;
                let view = wrapper.view.as_mut();
                wrapper.top_align.update_view(view);
                wrapper.bottom_align.update_view(view);
                wrapper.width.update_view(view);
                wrapper.height.update_view(view);
            }
        }
        Ok(())
    }

    // A rule reads the whole tree while its property lives inside it, so
    // each property is computed on a copy and written back.

    fn recompute_container<T: Copy>(
        &mut self,
        id: NodeId,
        field: fn(&mut Container) -> &mut Property<T>,
    ) -> LayoutResult<()> {
        let mut property = field(self.container_mut(id)?).clone();
        property.compute(self)?;
        *field(self.container_mut(id)?) = property;
        Ok(())
    }

    fn recompute_wrapper<T: Copy>(
        &mut self,
        id: NodeId,
        field: fn(&mut Wrapper) -> &mut Property<T>,
    ) -> LayoutResult<()> {
        let mut property = field(self.wrapper_mut(id)?).clone();
        property.compute(self)?;
        *field(self.wrapper_mut(id)?) = property;
        Ok(())
    }

    // =========================================================================
    // Clone
    // =========================================================================

    /// Build an unattached copy of `id` and everything nested inside it, with
    /// fresh ids and view handles. The original is checked in full before
    /// anything is created.
    pub fn clone_subtree(&mut self, id: NodeId) -> LayoutResult<NodeId> {
        self.verify_subtree(id)?;
        self.copy_subtree(id)
    }

    fn verify_subtree(&self, id: NodeId) -> LayoutResult<()> {
        match self.node(id)? {
            EquationNode::Container(container) => {
                for (index, &child) in container.wrappers.iter().enumerate() {
                    let wrapper = self.wrapper(child).map_err(|e| {
                        LayoutError::InvalidCloneState(format!(
                            "row of {} holds a bad entry at {}: {}",
                            id, index, e
                        ))
                    })?;
                    if wrapper.index() != index || wrapper.parent() != Some(id) {
                        return Err(LayoutError::InvalidCloneState(format!(
                            "wrapper {} at position {} of {} records index {} and parent {:?}",
                            child,
                            index,
                            id,
                            wrapper.index(),
                            wrapper.parent()
                        )));
                    }
                    self.verify_subtree(child)?;
                }
                Ok(())
            }
            EquationNode::Wrapper(wrapper) => match wrapper.kind {
                WrapperKind::Leaf => Ok(()),
                WrapperKind::Group { content } => {
                    let parent = self
                        .container(content)
                        .map_err(|e| {
                            LayoutError::InvalidCloneState(format!(
                                "content of {} is unusable: {}",
                                id, e
                            ))
                        })?
                        .parent();
                    if parent != Some(id) {
                        return Err(LayoutError::InvalidCloneState(format!(
                            "content {} of {} records parent {:?}",
                            content, id, parent
                        )));
                    }
                    self.verify_subtree(content)
                }
            },
        }
    }

    fn copy_subtree(&mut self, id: NodeId) -> LayoutResult<NodeId> {
        match self.node(id)? {
            EquationNode::Container(container) => {
                let font_size = container.font_size();
                let row = container.wrappers.clone();

                let copy = self.create_container_with_font_size(font_size);
                let mut entries = Vec::with_capacity(row.len());
                for (index, child) in row.into_iter().enumerate() {
                    entries.push((index, self.copy_subtree(child)?));
                }
                self.add_wrappers(copy, entries)?;
                Ok(copy)
            }
            EquationNode::Wrapper(wrapper) => match wrapper.kind {
                WrapperKind::Leaf => {
                    let metrics = wrapper.metrics();
                    Ok(self.create_leaf(metrics))
                }
                WrapperKind::Group { content } => {
                    let content = self.copy_subtree(content)?;
                    self.create_group(content)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::WrapperMetrics;
    use crate::settings::LayoutSettings;
    use crate::view::{RecordingViewFactory, ViewOp};

    fn metrics(top: f32, bottom: f32, width: f32) -> WrapperMetrics {
        WrapperMetrics::new(top, bottom, width)
    }

    /// `outer = [a, group(inner = [x, y]), b]`
    struct Nested {
        tree: EquationTree,
        outer: NodeId,
        inner: NodeId,
        group: NodeId,
        x: NodeId,
    }

    fn nested(settings: LayoutSettings) -> Nested {
        let mut tree = EquationTree::new().with_settings(settings);
        let outer = tree.create_container();
        let inner = tree.create_container();
        let x = tree.create_leaf(metrics(1.0, 1.0, 1.0));
        let y = tree.create_leaf(metrics(2.0, 0.5, 1.0));
        tree.add_wrappers(inner, vec![(0, x), (1, y)]).unwrap();
        let group = tree.create_group(inner).unwrap();

        let a = tree.create_leaf(metrics(1.0, 1.0, 2.0));
        let b = tree.create_leaf(metrics(1.5, 0.5, 3.0));
        tree.add_wrappers(outer, vec![(0, a), (1, group), (2, b)])
            .unwrap();

        Nested {
            tree,
            outer,
            inner,
            group,
            x,
        }
    }

    #[test]
    fn test_height_from_alignment_anchors() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(metrics(2.0, 1.0, 1.0));
        let b = tree.create_leaf(metrics(5.0, 3.0, 1.0));
        tree.add_wrappers(container, vec![(0, a), (1, b)]).unwrap();

        let c = tree.container(container).unwrap();
        assert_eq!(c.max_top_align_index(), 1);
        assert_eq!(c.max_bottom_align_index(), 1);
        assert_eq!(c.height(), 8.0);
    }

    #[test]
    fn test_anchors_can_come_from_different_children() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(metrics(4.0, 0.5, 1.0));
        let b = tree.create_leaf(metrics(1.0, 2.5, 1.0));
        tree.add_wrappers(container, vec![(0, a), (1, b)]).unwrap();

        let c = tree.container(container).unwrap();
        assert_eq!(c.max_top_align_index(), 0);
        assert_eq!(c.max_bottom_align_index(), 1);
        assert_eq!(c.height(), 6.5);
    }

    #[test]
    fn test_ties_resolve_to_earliest_child() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(metrics(1.0, 2.0, 1.0));
        let b = tree.create_leaf(metrics(3.0, 2.0, 1.0));
        let c = tree.create_leaf(metrics(3.0, 2.0, 1.0));
        tree.add_wrappers(container, vec![(0, a), (1, b), (2, c)])
            .unwrap();

        let node = tree.container(container).unwrap();
        assert_eq!(node.max_top_align_index(), 1);
        assert_eq!(node.max_bottom_align_index(), 0);
    }

    #[test]
    fn test_unmeasured_child_does_not_move_anchor() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(metrics(3.0, 1.0, 1.0));
        let b = tree.create_leaf(metrics(f32::NAN, 1.0, 1.0));
        let c = tree.create_leaf(metrics(0.5, 1.0, 1.0));
        tree.add_wrappers(container, vec![(0, a), (1, b), (2, c)])
            .unwrap();

        let node = tree.container(container).unwrap();
        assert_eq!(node.max_top_align_index(), 0);
        assert_eq!(node.max_bottom_align_index(), 0);
        assert_eq!(node.height(), 4.0);
    }

    #[test]
    fn test_empty_row_has_zero_geometry() {
        let mut tree = EquationTree::new();
        let container = tree.create_container();
        let a = tree.create_leaf(metrics(2.0, 2.0, 2.0));
        tree.add_wrappers(container, vec![(0, a)]).unwrap();
        tree.remove_wrappers(container, vec![0]).unwrap();

        let c = tree.container(container).unwrap();
        assert_eq!(c.width(), 0.0);
        assert_eq!(c.height(), 0.0);
        assert_eq!(c.max_top_align_index(), 0);
    }

    #[test]
    fn test_group_takes_content_geometry() {
        let n = nested(LayoutSettings::default());
        let group = n.tree.wrapper(n.group).unwrap();
        assert_eq!(group.top_align(), 2.0);
        assert_eq!(group.bottom_align(), 1.0);
        assert_eq!(group.width(), 2.0);
        assert_eq!(group.height(), 3.0);

        let outer = n.tree.container(n.outer).unwrap();
        assert_eq!(outer.width(), 7.0);
        assert_eq!(outer.max_top_align_index(), 1);
        assert_eq!(outer.max_bottom_align_index(), 0);
        assert_eq!(outer.height(), 3.0);
    }

    #[test]
    fn test_nested_edit_reaches_root_in_one_pass() {
        for scope in [UpdateScope::Root, UpdateScope::Subtree] {
            let mut n = nested(LayoutSettings {
                update_scope: scope,
                ..Default::default()
            });
            n.tree.set_metrics(n.x, metrics(6.0, 2.0, 4.0)).unwrap();

            let inner = n.tree.container(n.inner).unwrap();
            assert_eq!(inner.width(), 5.0);
            assert_eq!(inner.height(), 8.0);

            let outer = n.tree.container(n.outer).unwrap();
            assert_eq!(outer.width(), 10.0, "scope {:?}", scope);
            assert_eq!(outer.height(), 8.0, "scope {:?}", scope);
        }
    }

    #[test]
    fn test_update_visits_children_before_owner() {
        let mut n = nested(LayoutSettings::default());
        // Change a leaf behind the tree's back, then run a single pass.
        n.tree
            .wrapper_mut(n.x)
            .unwrap()
            .width
            .set(10.0);

        n.tree.update(n.outer).unwrap();

        assert_eq!(n.tree.container(n.inner).unwrap().width(), 11.0);
        assert_eq!(n.tree.wrapper(n.group).unwrap().width(), 11.0);
        assert_eq!(n.tree.container(n.outer).unwrap().width(), 16.0);
    }

    #[test]
    fn test_pass_stores_rule_results() {
        let mut n = nested(LayoutSettings::default());
        n.tree
            .wrapper_mut(n.x)
            .unwrap()
            .top_align
            .set(9.0);
        n.tree.update(n.inner).unwrap();

        let inner = n.tree.container(n.inner).unwrap();
        assert_eq!(inner.max_top_align_index(), 0);
        assert_eq!(inner.height(), 10.0);
        for property in [&inner.width, &inner.height] {
            assert_eq!(property.get(), property.evaluate(&n.tree).unwrap());
        }
        assert_eq!(
            inner.max_top_align_index.get(),
            inner.max_top_align_index.evaluate(&n.tree).unwrap()
        );
    }

    #[test]
    fn test_update_all_starts_at_root() {
        let mut n = nested(LayoutSettings::default());
        n.tree
            .wrapper_mut(n.x)
            .unwrap()
            .width
            .set(10.0);

        n.tree.update_all(n.x).unwrap();
        assert_eq!(n.tree.container(n.outer).unwrap().width(), 16.0);
    }

    #[test]
    fn test_views_receive_geometry() {
        let views = RecordingViewFactory::new();
        let mut tree = EquationTree::with_view_factory(views.clone());
        let container = tree.create_container();
        let a = tree.create_leaf(metrics(2.0, 1.0, 1.0));
        let b = tree.create_leaf(metrics(5.0, 3.0, 2.0));
        tree.add_wrappers(container, vec![(0, a), (1, b)]).unwrap();

        let ops = views.ops_for(container);
        assert_eq!(
            ops[ops.len() - 2..],
            [ViewOp::SetWidth(3.0), ViewOp::SetHeight(8.0)]
        );
        assert!(views.ops_for(b).contains(&ViewOp::SetHeight(8.0)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut n = nested(LayoutSettings::default());
        let copy = n.tree.clone_subtree(n.outer).unwrap();

        let original = n.tree.container(n.outer).unwrap();
        let cloned = n.tree.container(copy).unwrap();
        assert_eq!(cloned.width(), original.width());
        assert_eq!(cloned.height(), original.height());
        assert_eq!(cloned.len(), original.len());
        assert_eq!(cloned.parent(), None);

        let cloned_group = n.tree.children(copy).unwrap()[1];
        let cloned_inner = match n.tree.wrapper(cloned_group).unwrap().kind() {
            WrapperKind::Group { content } => content,
            WrapperKind::Leaf => panic!("Expected group"),
        };
        assert_ne!(cloned_inner, n.inner);
        let cloned_x = n.tree.children(cloned_inner).unwrap()[0];
        assert_ne!(cloned_x, n.x);

        n.tree.set_metrics(cloned_x, metrics(9.0, 9.0, 9.0)).unwrap();

        let original = n.tree.container(n.outer).unwrap();
        assert_eq!(original.width(), 7.0);
        assert_eq!(original.height(), 3.0);
        assert_eq!(n.tree.container(copy).unwrap().width(), 15.0);
    }

    #[test]
    fn test_clone_preserves_font_size() {
        let mut tree = EquationTree::new();
        let container = tree.create_container_with_font_size(crate::FontSize::Smallest);
        let copy = tree.clone_subtree(container).unwrap();
        assert_eq!(
            tree.container(copy).unwrap().font_size(),
            crate::FontSize::Smallest
        );
    }

    #[test]
    fn test_clone_rejects_broken_row() {
        let mut n = nested(LayoutSettings::default());
        n.tree.wrapper_mut(n.x).unwrap().index = 7;
        let before = n.tree.len();

        let err = n.tree.clone_subtree(n.outer).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidCloneState(_)));
        assert_eq!(n.tree.len(), before, "nothing may be created");
    }

    #[test]
    fn test_clone_rejects_foreign_content() {
        let mut n = nested(LayoutSettings::default());
        n.tree.container_mut(n.inner).unwrap().parent = None;

        assert!(matches!(
            n.tree.clone_subtree(n.group),
            Err(LayoutError::InvalidCloneState(_))
        ));
    }
}
