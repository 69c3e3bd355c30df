//! # RedLilium Vertex
//!
//! Canonical vertex input layouts for RedLilium Engine.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`VertexElement`] - One attribute of a vertex record (semantic, format, slot, offset)
//! - [`VertexLayout`] - An immutable, canonically ordered element list with per-slot strides
//! - [`VertexLayoutCache`] - Interns layouts so each structural shape exists exactly once
//! - [`VertexBuffer`] - Buffer description carrying the layout of its stream
//! - [`MergePolicy`] - Rules for reconciling a mesh layout with shader requirements
//!
//! Layouts are handed out as [`VertexLayoutRef`] handles. Handles to the same
//! shape compare equal by pointer, which makes them cheap batching keys.
//!
//! ## Example
//!
//! ```
//! use redlilium_vertex::{VertexElement, VertexLayoutCache};
//!
//! let cache = VertexLayoutCache::new();
//! let layout = cache.get(&[VertexElement::position(), VertexElement::color()], false)?;
//! assert_eq!(layout.slot_stride(0), 28);
//! println!("{}", layout.debug_text());
//! # Ok::<(), redlilium_vertex::VertexLayoutError>(())
//! ```

pub mod buffer;
pub mod builder;
pub mod cache;
pub mod config;
pub mod element;
pub mod error;
pub mod layout;
pub mod merge;

// Re-export main types for convenience
pub use buffer::{
    BufferDescriptor, BufferUsage, VertexBuffer, VertexLayoutSource, aggregate_buffer_elements,
};
pub use builder::LayoutBuilder;
pub use cache::{CacheStats, VertexLayoutCache};
pub use config::{OverlapCheck, VertexLayoutCacheConfig};
pub use element::{ElementKey, VertexElement, VertexFormat, VertexSemantic};
pub use error::{Result, VertexLayoutError};
pub use layout::{MAX_VERTEX_ELEMENTS, SlotStride, VertexElements, VertexLayout, VertexLayoutRef};
pub use merge::{MergePolicy, concat_layout_elements, merge_with_reference};

/// Vertex library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
