//! Vertex buffers and multi-stream layout aggregation.
//!
//! A vertex format is often authored per stream: one layout for static data,
//! another for animated data, a third for per-instance data. Each
//! [`VertexBuffer`] carries the layout of its own stream, and
//! [`aggregate_buffer_elements`] assembles the combined layout positionally:
//! every element of the buffer at position `p` reads from slot `p`.
//!
//! # Example
//!
//! ```
//! use redlilium_vertex::{BufferDescriptor, VertexBuffer, VertexElement, VertexLayoutCache};
//!
//! let cache = VertexLayoutCache::new();
//! let positions = VertexBuffer::new(BufferDescriptor::vertex(1200).with_label("positions"));
//! let uvs = VertexBuffer::new(BufferDescriptor::vertex(800).with_label("uvs"));
//! positions.set_vertex_layout(Some(cache.get(&[VertexElement::position()], false)?));
//! uvs.set_vertex_layout(Some(cache.get(&[VertexElement::texcoord(0)], false)?));
//!
//! let layout = cache.get_for_buffers(&[&positions, &uvs])?;
//! assert_eq!(layout.slot_stride(0), 12);
//! assert_eq!(layout.slot_stride(1), 8);
//! # Ok::<(), redlilium_vertex::VertexLayoutError>(())
//! ```

use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;

use crate::error::{Result, VertexLayoutError};
use crate::layout::{VertexElements, VertexLayoutRef};

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 6;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Create a descriptor for a vertex buffer that can be uploaded to.
    pub fn vertex(size: u64) -> Self {
        Self::new(size, BufferUsage::VERTEX | BufferUsage::COPY_DST)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Anything that can report the vertex layout of its contents.
///
/// Implemented by [`VertexBuffer`] and by references and `Arc`s to any
/// implementor, so buffer lists can be passed as `&[&VertexBuffer]`,
/// `&[Arc<VertexBuffer>]` or `&[VertexBuffer]`.
pub trait VertexLayoutSource {
    /// Get the layout assigned to this source, if any.
    fn vertex_layout(&self) -> Option<VertexLayoutRef>;
}

impl<T: VertexLayoutSource + ?Sized> VertexLayoutSource for &T {
    fn vertex_layout(&self) -> Option<VertexLayoutRef> {
        (**self).vertex_layout()
    }
}

impl<T: VertexLayoutSource + ?Sized> VertexLayoutSource for Arc<T> {
    fn vertex_layout(&self) -> Option<VertexLayoutRef> {
        (**self).vertex_layout()
    }
}

/// A vertex buffer description with an optional assigned layout.
///
/// The layout describes a single stream; slot values inside it are ignored
/// when the buffer is combined with others through
/// [`VertexLayoutCache::get_for_buffers`](crate::VertexLayoutCache::get_for_buffers).
pub struct VertexBuffer {
    descriptor: BufferDescriptor,
    layout: RwLock<Option<VertexLayoutRef>>,
}

impl VertexBuffer {
    /// Create a buffer without a layout.
    pub fn new(descriptor: BufferDescriptor) -> Self {
        Self {
            descriptor,
            layout: RwLock::new(None),
        }
    }

    /// Create a buffer with an assigned layout.
    pub fn with_layout(descriptor: BufferDescriptor, layout: VertexLayoutRef) -> Self {
        Self {
            descriptor,
            layout: RwLock::new(Some(layout)),
        }
    }

    /// Assign or clear the layout of this buffer.
    pub fn set_vertex_layout(&self, layout: Option<VertexLayoutRef>) {
        *self.layout.write() = layout;
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Number of whole records that fit in this buffer, or `None` if no
    /// layout is assigned or the layout is empty.
    ///
    /// Every element of the layout is read from this buffer, so a record
    /// spans up to [`VertexLayout::record_pitch`] bytes.
    ///
    /// [`VertexLayout::record_pitch`]: crate::VertexLayout::record_pitch
    pub fn record_count(&self) -> Option<u64> {
        let layout = self.layout.read();
        let pitch = layout.as_ref()?.record_pitch();
        (pitch > 0).then(|| self.descriptor.size / u64::from(pitch))
    }
}

impl VertexLayoutSource for VertexBuffer {
    fn vertex_layout(&self) -> Option<VertexLayoutRef> {
        self.layout.read().clone()
    }
}

impl std::fmt::Debug for VertexBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexBuffer")
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .field("layout", &*self.layout.read())
            .finish()
    }
}

// Buffers are shared with worker threads that prepare draw state.
static_assertions::assert_impl_all!(VertexBuffer: Send, Sync);

/// Combine the layouts of a buffer list into one element list.
///
/// Every element of the buffer at position `p` is rewritten to read from
/// slot `p`; format, offset and step mode are kept.
///
/// # Errors
///
/// Returns [`VertexLayoutError::MissingBufferLayout`] for the first buffer
/// without an assigned layout.
pub fn aggregate_buffer_elements<B: VertexLayoutSource>(buffers: &[B]) -> Result<VertexElements> {
    let mut elements = VertexElements::new();
    for (position, buffer) in buffers.iter().enumerate() {
        let layout = buffer
            .vertex_layout()
            .ok_or(VertexLayoutError::MissingBufferLayout { position })?;
        let slot = position as u32;
        elements.extend(layout.elements().iter().map(|e| e.at_slot(slot)));
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::VertexLayoutCache;
    use crate::element::{VertexElement, VertexSemantic};

    #[test]
    fn test_buffer_descriptor() {
        let desc = BufferDescriptor::vertex(1024).with_label("mesh");
        assert_eq!(desc.size, 1024);
        assert_eq!(desc.usage, BufferUsage::VERTEX | BufferUsage::COPY_DST);
        assert_eq!(BufferDescriptor::new(64, BufferUsage::VERTEX).usage, BufferUsage::VERTEX);
        assert_eq!(desc.label.as_deref(), Some("mesh"));
    }

    #[test]
    fn test_buffer_layout_assignment() {
        let cache = VertexLayoutCache::new();
        let buffer = VertexBuffer::new(BufferDescriptor::vertex(240));
        assert!(buffer.vertex_layout().is_none());
        assert_eq!(buffer.record_count(), None);

        let layout = cache
            .get(&[VertexElement::position(), VertexElement::normal()], false)
            .unwrap();
        buffer.set_vertex_layout(Some(layout.clone()));
        assert_eq!(buffer.vertex_layout(), Some(layout));
        assert_eq!(buffer.record_count(), Some(10));

        buffer.set_vertex_layout(None);
        assert!(buffer.vertex_layout().is_none());
    }

    #[test]
    fn test_record_count_multi_slot_layout() {
        let cache = VertexLayoutCache::new();
        // Slot 0 ends at 24, slot 1 at 8: the buffer pitch is 24, not 32
        let layout = cache
            .get(
                &[
                    VertexElement::position(),
                    VertexElement::normal(),
                    VertexElement::texcoord(0).at_slot(1),
                ],
                false,
            )
            .unwrap();
        let buffer = VertexBuffer::with_layout(BufferDescriptor::vertex(240), layout);

        assert_eq!(buffer.record_count(), Some(10));
    }

    #[test]
    fn test_record_count_empty_layout() {
        let cache = VertexLayoutCache::new();
        let buffer = VertexBuffer::with_layout(
            BufferDescriptor::vertex(240),
            cache.get(&[], false).unwrap(),
        );

        assert_eq!(buffer.record_count(), None);
    }

    #[test]
    fn test_aggregate_rewrites_slots() {
        let cache = VertexLayoutCache::new();
        let a = VertexBuffer::with_layout(
            BufferDescriptor::vertex(12),
            cache.get(&[VertexElement::position().at_slot(3)], false).unwrap(),
        );
        let b = VertexBuffer::with_layout(
            BufferDescriptor::vertex(12),
            cache.get(&[VertexElement::normal().at_slot(3)], false).unwrap(),
        );

        let elements = aggregate_buffer_elements(&[&a, &b]).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].semantic, VertexSemantic::Position);
        assert_eq!(elements[0].slot, 0);
        assert_eq!(elements[1].semantic, VertexSemantic::Normal);
        assert_eq!(elements[1].slot, 1);
    }

    #[test]
    fn test_aggregate_missing_layout() {
        let cache = VertexLayoutCache::new();
        let a = Arc::new(VertexBuffer::with_layout(
            BufferDescriptor::vertex(12),
            cache.get(&[VertexElement::position()], false).unwrap(),
        ));
        let b = Arc::new(VertexBuffer::new(BufferDescriptor::vertex(12)));

        assert_eq!(
            aggregate_buffer_elements(&[a, b]).unwrap_err(),
            VertexLayoutError::MissingBufferLayout { position: 1 }
        );
    }

    #[test]
    fn test_buffer_debug() {
        let buffer = VertexBuffer::new(BufferDescriptor::vertex(1024));
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("VertexBuffer"));
        assert!(debug.contains("1024"));
    }
}
