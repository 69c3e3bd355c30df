//! Layout merging.
//!
//! Two kinds of merges are supported:
//!
//! - **Concatenation** ([`concat_layout_elements`]): several layouts are
//!   combined into one, keeping each layout's slots. Later layouts override
//!   earlier ones on the same semantic, index and slot.
//! - **Reconciliation** ([`merge_with_reference`]): a base layout (what a mesh
//!   provides) is adjusted against a reference layout (what a shader
//!   requires) according to a [`MergePolicy`]. Matching is by semantic and
//!   index only: the backend binds inputs by semantic, so the base keeps its
//!   own placement for every element it already has.

use crate::element::VertexElement;
use crate::layout::{VertexElements, VertexLayoutRef};

/// Controls how a base layout is reconciled with a reference layout.
///
/// The default is additive: nothing the base provides is dropped, and every
/// element the reference requires is added if missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergePolicy {
    /// Drop base elements whose semantic and index the reference lacks.
    pub remove_unused: bool,
    /// Append reference elements whose semantic and index the base lacks.
    pub add_missing: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            remove_unused: false,
            add_missing: true,
        }
    }
}

impl MergePolicy {
    /// Keep every base element and add whatever the reference is missing.
    pub fn additive() -> Self {
        Self::default()
    }

    /// Make the result match the reference's semantics exactly.
    pub fn exact() -> Self {
        Self {
            remove_unused: true,
            add_missing: true,
        }
    }

    /// Set whether unused base elements are dropped.
    pub fn with_remove_unused(mut self, remove_unused: bool) -> Self {
        self.remove_unused = remove_unused;
        self
    }

    /// Set whether missing reference elements are added.
    pub fn with_add_missing(mut self, add_missing: bool) -> Self {
        self.add_missing = add_missing;
        self
    }
}

/// Reconcile `base` against `reference`.
///
/// Returns `None` if the policy leaves `base` unchanged, otherwise the merged
/// elements with base elements first (in base order) followed by the added
/// reference elements (in reference order).
pub fn merge_with_reference(
    base: &[VertexElement],
    reference: &[VertexElement],
    policy: MergePolicy,
) -> Option<VertexElements> {
    let mut changed = false;
    let mut merged = VertexElements::new();

    for element in base {
        if policy.remove_unused && !reference.iter().any(|r| r.same_semantic(element)) {
            changed = true;
            continue;
        }
        merged.push(*element);
    }

    if policy.add_missing {
        for required in reference {
            if !base.iter().any(|b| b.same_semantic(required)) {
                changed = true;
                merged.push(*required);
            }
        }
    }

    changed.then_some(merged)
}

/// Concatenate the elements of several layouts.
///
/// Slots are kept as they are. An element overrides an earlier one with the
/// same semantic, index and slot, taking its position in the result.
pub fn concat_layout_elements(layouts: &[VertexLayoutRef]) -> VertexElements {
    let mut elements = VertexElements::new();
    for element in layouts.iter().flat_map(|l| l.elements()) {
        match elements.iter_mut().find(|e| e.key() == element.key()) {
            Some(existing) => *existing = *element,
            None => elements.push(*element),
        }
    }
    elements
}
