//! Vertex layout error types.

use thiserror::Error;

use crate::element::{VertexFormat, VertexSemantic};

/// Errors that can occur while building or interning a vertex layout.
///
/// Every error is raised before the cache is touched, so a failed request
/// never leaves a partially built layout behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VertexLayoutError {
    /// More elements were supplied than a layout can hold.
    #[error("too many vertex elements: {count} (max {max})")]
    CapacityExceeded { count: usize, max: usize },
    /// A buffer passed to a buffer-list lookup has no layout assigned.
    #[error("vertex buffer at position {position} has no layout assigned")]
    MissingBufferLayout { position: usize },
    /// An element uses a zero-size or unrecognized format.
    #[error("invalid format {format:?} for element {semantic}{index}")]
    InvalidFormat {
        semantic: VertexSemantic,
        index: u8,
        format: VertexFormat,
    },
    /// An explicitly placed element ends past the addressable range of its slot.
    #[error("element {semantic}{index} at offset {offset} overflows its slot")]
    OffsetOverflow {
        semantic: VertexSemantic,
        index: u8,
        offset: u32,
    },
    /// A raw format code does not name any known format.
    #[error("unrecognized vertex format code {0}")]
    UnknownFormatCode(u32),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VertexLayoutError>;
