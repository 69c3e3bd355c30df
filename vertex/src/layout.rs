//! Immutable vertex layouts.
//!
//! A [`VertexLayout`] holds a finalized, canonically ordered list of
//! [`VertexElement`]s together with the per-slot strides derived from them.
//! Layouts are only created by a [`VertexLayoutCache`](crate::VertexLayoutCache),
//! which hands out [`VertexLayoutRef`] handles to the single canonical
//! instance of each structural shape.
//!
//! # Strides
//!
//! Each buffer slot has its own stride: the maximum `offset + size` over the
//! elements reading from that slot. Use [`VertexLayout::slot_stride`] when
//! binding a buffer or computing its pitch. [`VertexLayout::stride`] is the
//! sum over all slots, which equals the slot stride for single-slot layouts
//! and is the number of bytes one vertex occupies across all streams.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::element::{VertexElement, VertexSemantic};

/// Maximum number of elements in one layout.
///
/// Matches the vertex input attribute limit of the supported backends.
pub const MAX_VERTEX_ELEMENTS: usize = 16;

/// Inline element storage for a layout. Never spills: the builder rejects
/// inputs larger than [`MAX_VERTEX_ELEMENTS`].
pub type VertexElements = SmallVec<[VertexElement; MAX_VERTEX_ELEMENTS]>;

/// Stride of a single buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotStride {
    /// Buffer slot.
    pub slot: u32,
    /// Size in bytes of one record in this slot.
    pub stride: u32,
}

/// Describes the layout of vertex data across one or more buffer slots.
///
/// Layouts are immutable and safe to read from any thread. Two layouts are
/// equal when their canonical element lists are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    elements: VertexElements,
    strides: SmallVec<[SlotStride; 4]>,
    fingerprint: u64,
}

impl VertexLayout {
    /// Assemble a layout from canonical elements (called by the builder).
    pub(crate) fn from_parts(
        elements: VertexElements,
        strides: SmallVec<[SlotStride; 4]>,
        fingerprint: u64,
    ) -> Self {
        Self {
            elements,
            strides,
            fingerprint,
        }
    }

    /// Get the elements of this layout in canonical order.
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Get the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the layout has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the aggregate stride: the sum of all per-slot strides.
    pub fn stride(&self) -> u64 {
        self.strides.iter().map(|s| u64::from(s.stride)).sum()
    }

    /// Get the pitch of one record when every element is read from a single
    /// buffer: the furthest byte touched by any element, whatever its slot.
    pub fn record_pitch(&self) -> u32 {
        self.strides.iter().map(|s| s.stride).max().unwrap_or(0)
    }

    /// Get the stride for a specific slot (0 if the slot is unused).
    pub fn slot_stride(&self, slot: u32) -> u32 {
        self.strides
            .iter()
            .find(|s| s.slot == slot)
            .map(|s| s.stride)
            .unwrap_or(0)
    }

    /// Get the strides of all used slots, sorted by slot.
    pub fn slot_strides(&self) -> &[SlotStride] {
        &self.strides
    }

    /// Get the number of distinct slots used by this layout.
    pub fn slot_count(&self) -> usize {
        self.strides.len()
    }

    /// Get the structural fingerprint used for cache lookup.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Check if this layout has an element with the given semantic and index.
    pub fn has_semantic(&self, semantic: VertexSemantic, index: u8) -> bool {
        self.find(semantic, index).is_some()
    }

    /// Get the first element with the given semantic and index.
    pub fn find(&self, semantic: VertexSemantic, index: u8) -> Option<&VertexElement> {
        self.elements
            .iter()
            .find(|e| e.semantic == semantic && e.index == index)
    }

    /// Get all elements reading from a specific slot.
    pub fn elements_for_slot(&self, slot: u32) -> impl Iterator<Item = &VertexElement> {
        self.elements.iter().filter(move |e| e.slot == slot)
    }

    /// Check if this layout is compatible with another layout.
    ///
    /// A layout is compatible if the other layout has all the semantics this
    /// one has, with matching formats. Slots and offsets don't need to match.
    pub fn is_compatible_with(&self, other: &VertexLayout) -> bool {
        self.elements.iter().all(|e| {
            other
                .elements
                .iter()
                .any(|o| o.same_semantic(e) && o.format == e.format)
        })
    }

    /// Get the elements as text, one line per element.
    pub fn debug_text(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_text())
    }
}

/// Handle to a canonical [`VertexLayout`] owned by a cache.
///
/// Cloning is cheap and the handle never needs to be released explicitly.
/// Equality and hashing use identity: two handles are equal only if they
/// point at the same canonical instance, which makes them usable as batching
/// keys.
#[derive(Clone)]
pub struct VertexLayoutRef(Arc<VertexLayout>);

impl VertexLayoutRef {
    pub(crate) fn new(layout: VertexLayout) -> Self {
        Self(Arc::new(layout))
    }

    /// Check if two handles point at the same canonical layout.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for VertexLayoutRef {
    type Target = VertexLayout;

    fn deref(&self) -> &VertexLayout {
        &self.0
    }
}

impl AsRef<VertexLayout> for VertexLayoutRef {
    fn as_ref(&self) -> &VertexLayout {
        &self.0
    }
}

impl PartialEq for VertexLayoutRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for VertexLayoutRef {}

impl Hash for VertexLayoutRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for VertexLayoutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexLayoutRef")
            .field("fingerprint", &format_args!("{:016x}", self.0.fingerprint))
            .field("elements", &self.0.elements.len())
            .field("stride", &self.0.stride())
            .finish()
    }
}

// Layouts are shared across render and worker threads.
static_assertions::assert_impl_all!(VertexLayout: Send, Sync);
static_assertions::assert_impl_all!(VertexLayoutRef: Send, Sync);
