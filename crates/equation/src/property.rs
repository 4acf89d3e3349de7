//! Cached, rule-derived node attributes
//!
//! A [`Property`] separates a value from the rule that derives it. The rule is
//! only run when a recomputation pass asks for it; reads always hit the cache.
//! There is no dependency tracking: the pass in [`crate::layout`] visits nodes
//! children-first and recomputes every property it meets.

use crate::error::LayoutResult;
use crate::view::ViewHandle;
use crate::{EquationTree, NodeId};

/// Derivation rule: a pure function of the owner's current state in the tree
pub type ComputeRule<T> = fn(&EquationTree, NodeId) -> LayoutResult<T>;

/// Pushes a cached value to the owner's view handle
pub type ViewSync<T> = fn(T, &mut dyn ViewHandle);

/// A named attribute of a node with a cached value and an explicit rule
#[derive(Clone)]
pub struct Property<T> {
    name: &'static str,
    owner: NodeId,
    value: T,
    compute: ComputeRule<T>,
    sync: ViewSync<T>,
}

impl<T: Copy> Property<T> {
    /// Create a property owned by `owner`, starting at `initial`
    pub fn new(
        name: &'static str,
        owner: NodeId,
        initial: T,
        compute: ComputeRule<T>,
        sync: ViewSync<T>,
    ) -> Self {
        Self {
            name,
            owner,
            value: initial,
            compute,
            sync,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// The cached value. Never runs the rule.
    pub fn get(&self) -> T {
        self.value
    }

    /// Overwrite the cached value, bypassing the rule
    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// Run the rule against the tree as it stands, without storing the result.
    ///
    /// The rule reads the owner's children, so callers must make sure those
    /// are up to date first.
    pub fn evaluate(&self, tree: &EquationTree) -> LayoutResult<T> {
        (self.compute)(tree, self.owner)
    }

    /// Run the rule and store the result in the cache
    pub fn compute(&mut self, tree: &EquationTree) -> LayoutResult<T> {
        self.value = self.evaluate(tree)?;
        Ok(self.value)
    }

    /// Push the cached value to a view handle
    pub fn update_view(&self, view: &mut dyn ViewHandle) {
        (self.sync)(self.value, view);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("value", &self.value)
            .finish()
    }
}

/// Sync rule for values the view does not mirror
pub fn no_sync<T>(_value: T, _view: &mut dyn ViewHandle) {}

/// Sync rule pushing a width
pub fn sync_width(value: f32, view: &mut dyn ViewHandle) {
    view.set_width(value);
}

/// Sync rule pushing a height
pub fn sync_height(value: f32, view: &mut dyn ViewHandle) {
    view.set_height(value);
}
