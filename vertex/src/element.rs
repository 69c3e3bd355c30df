//! Vertex element definitions.
//!
//! A [`VertexElement`] describes one attribute inside a vertex record: what it
//! means ([`VertexSemantic`] plus an index), how it is encoded
//! ([`VertexFormat`]), which buffer slot it is read from, where it sits in
//! that slot's record, and whether it advances per vertex or per instance.
//!
//! # Example
//!
//! ```
//! use redlilium_vertex::{VertexElement, VertexFormat, VertexSemantic};
//!
//! // Position and normal in slot 0, a second UV set in slot 1.
//! let elements = [
//!     VertexElement::position(),
//!     VertexElement::normal(),
//!     VertexElement::texcoord(1).at_slot(1),
//! ];
//! assert_eq!(elements[2].semantic, VertexSemantic::TexCoord);
//! assert_eq!(elements[2].format, VertexFormat::Float32x2);
//! ```

use std::fmt;

use crate::error::VertexLayoutError;

/// Semantic meaning of a vertex element.
///
/// Semantics are used to match mesh elements with shader inputs. Repeats of
/// the same semantic are told apart by [`VertexElement::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VertexSemantic {
    /// Vertex position (typically float3).
    Position,
    /// Vertex normal (typically float3).
    Normal,
    /// Vertex tangent (typically float4, w = handedness).
    Tangent,
    /// Vertex bitangent (typically float3).
    Bitangent,
    /// Vertex color (typically float4 or unorm4).
    Color,
    /// Texture coordinates (typically float2).
    TexCoord,
    /// Bone indices for skinning (typically uint4).
    BlendIndices,
    /// Bone weights for skinning (typically float4).
    BlendWeights,
    /// Custom attribute, usually per-instance data.
    Attribute,
}

impl VertexSemantic {
    /// Get the display name of this semantic.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::Normal => "Normal",
            Self::Tangent => "Tangent",
            Self::Bitangent => "Bitangent",
            Self::Color => "Color",
            Self::TexCoord => "TexCoord",
            Self::BlendIndices => "BlendIndices",
            Self::BlendWeights => "BlendWeights",
            Self::Attribute => "Attribute",
        }
    }
}

impl fmt::Display for VertexSemantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data format of a vertex element.
///
/// The discriminants are stable and can be stored or sent across an API
/// boundary; use [`VertexFormat::try_from`] to decode them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u32)]
pub enum VertexFormat {
    /// No format. Has zero size and is rejected by the layout builder.
    #[default]
    Unknown = 0,
    /// Single 32-bit float.
    Float32 = 1,
    /// Two 32-bit floats.
    Float32x2 = 2,
    /// Three 32-bit floats.
    Float32x3 = 3,
    /// Four 32-bit floats.
    Float32x4 = 4,
    /// Two 16-bit floats.
    Float16x2 = 5,
    /// Four 16-bit floats.
    Float16x4 = 6,
    /// Four 8-bit unsigned integers.
    Uint8x4 = 7,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4 = 8,
    /// Four 8-bit signed integers (normalized to -1.0-1.0).
    Snorm8x4 = 9,
    /// Two 16-bit unsigned integers.
    Uint16x2 = 10,
    /// Four 16-bit unsigned integers.
    Uint16x4 = 11,
    /// Two 16-bit unsigned integers (normalized).
    Unorm16x2 = 12,
    /// Four 16-bit unsigned integers (normalized).
    Unorm16x4 = 13,
    /// Two 16-bit signed integers (normalized).
    Snorm16x2 = 14,
    /// Four 16-bit signed integers (normalized).
    Snorm16x4 = 15,
    /// Single 32-bit unsigned integer.
    Uint32 = 16,
    /// Two 32-bit unsigned integers.
    Uint32x2 = 17,
    /// Three 32-bit unsigned integers.
    Uint32x3 = 18,
    /// Four 32-bit unsigned integers.
    Uint32x4 = 19,
    /// Single 32-bit signed integer.
    Sint32 = 20,
    /// Two 32-bit signed integers.
    Sint32x2 = 21,
    /// Three 32-bit signed integers.
    Sint32x3 = 22,
    /// Four 32-bit signed integers.
    Sint32x4 = 23,
    /// Packed 10-10-10-2 unsigned normalized.
    Unorm10_10_10_2 = 24,
}

impl VertexFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Float32 | Self::Uint32 | Self::Sint32 => 4,
            Self::Float32x2 | Self::Uint32x2 | Self::Sint32x2 => 8,
            Self::Float32x3 | Self::Uint32x3 | Self::Sint32x3 => 12,
            Self::Float32x4 | Self::Uint32x4 | Self::Sint32x4 => 16,
            Self::Float16x2 | Self::Uint16x2 | Self::Unorm16x2 | Self::Snorm16x2 => 4,
            Self::Float16x4 | Self::Uint16x4 | Self::Unorm16x4 | Self::Snorm16x4 => 8,
            Self::Uint8x4 | Self::Unorm8x4 | Self::Snorm8x4 => 4,
            Self::Unorm10_10_10_2 => 4,
        }
    }

    /// Get the number of components in this format.
    pub fn components(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Float32 | Self::Uint32 | Self::Sint32 => 1,
            Self::Float32x2
            | Self::Float16x2
            | Self::Uint16x2
            | Self::Unorm16x2
            | Self::Snorm16x2
            | Self::Uint32x2
            | Self::Sint32x2 => 2,
            Self::Float32x3 | Self::Uint32x3 | Self::Sint32x3 => 3,
            Self::Float32x4
            | Self::Float16x4
            | Self::Uint8x4
            | Self::Unorm8x4
            | Self::Snorm8x4
            | Self::Uint16x4
            | Self::Unorm16x4
            | Self::Snorm16x4
            | Self::Uint32x4
            | Self::Sint32x4
            | Self::Unorm10_10_10_2 => 4,
        }
    }

    /// Check if this format can be used in a layout.
    pub fn is_valid(&self) -> bool {
        self.size() > 0
    }
}

impl TryFrom<u32> for VertexFormat {
    type Error = VertexLayoutError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        const ALL: [VertexFormat; 25] = [
            VertexFormat::Unknown,
            VertexFormat::Float32,
            VertexFormat::Float32x2,
            VertexFormat::Float32x3,
            VertexFormat::Float32x4,
            VertexFormat::Float16x2,
            VertexFormat::Float16x4,
            VertexFormat::Uint8x4,
            VertexFormat::Unorm8x4,
            VertexFormat::Snorm8x4,
            VertexFormat::Uint16x2,
            VertexFormat::Uint16x4,
            VertexFormat::Unorm16x2,
            VertexFormat::Unorm16x4,
            VertexFormat::Snorm16x2,
            VertexFormat::Snorm16x4,
            VertexFormat::Uint32,
            VertexFormat::Uint32x2,
            VertexFormat::Uint32x3,
            VertexFormat::Uint32x4,
            VertexFormat::Sint32,
            VertexFormat::Sint32x2,
            VertexFormat::Sint32x3,
            VertexFormat::Sint32x4,
            VertexFormat::Unorm10_10_10_2,
        ];

        ALL.get(code as usize)
            .copied()
            .ok_or(VertexLayoutError::UnknownFormatCode(code))
    }
}

/// Deduplication key of an element inside a layout.
pub type ElementKey = (VertexSemantic, u8, u32);

/// A single vertex element description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Semantic meaning of this element.
    pub semantic: VertexSemantic,
    /// Index disambiguating repeats of the same semantic (e.g. TexCoord1).
    pub index: u8,
    /// Data format of this element.
    pub format: VertexFormat,
    /// Vertex buffer binding slot this element reads from.
    pub slot: u32,
    /// Byte offset within the slot's vertex record.
    ///
    /// Only meaningful when the layout is built with explicit offsets;
    /// otherwise the builder overwrites it.
    pub offset: u32,
    /// True if the element advances once per instance instead of per vertex.
    pub per_instance: bool,
}

impl VertexElement {
    /// Create a new per-vertex element at slot 0, offset 0.
    pub fn new(semantic: VertexSemantic, index: u8, format: VertexFormat) -> Self {
        Self {
            semantic,
            index,
            format,
            slot: 0,
            offset: 0,
            per_instance: false,
        }
    }

    /// Create a position element (float3).
    pub fn position() -> Self {
        Self::new(VertexSemantic::Position, 0, VertexFormat::Float32x3)
    }

    /// Create a normal element (float3).
    pub fn normal() -> Self {
        Self::new(VertexSemantic::Normal, 0, VertexFormat::Float32x3)
    }

    /// Create a tangent element (float4).
    pub fn tangent() -> Self {
        Self::new(VertexSemantic::Tangent, 0, VertexFormat::Float32x4)
    }

    /// Create a color element (float4).
    pub fn color() -> Self {
        Self::new(VertexSemantic::Color, 0, VertexFormat::Float32x4)
    }

    /// Create a texture coordinate element (float2) for the given UV set.
    pub fn texcoord(index: u8) -> Self {
        Self::new(VertexSemantic::TexCoord, index, VertexFormat::Float32x2)
    }

    /// Create a blend indices element (uint4).
    pub fn blend_indices() -> Self {
        Self::new(VertexSemantic::BlendIndices, 0, VertexFormat::Uint32x4)
    }

    /// Create a blend weights element (float4).
    pub fn blend_weights() -> Self {
        Self::new(VertexSemantic::BlendWeights, 0, VertexFormat::Float32x4)
    }

    /// Create a custom attribute element.
    pub fn attribute(index: u8, format: VertexFormat) -> Self {
        Self::new(VertexSemantic::Attribute, index, format)
    }

    /// Set the buffer slot for this element.
    pub fn at_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    /// Set the byte offset for this element.
    pub fn at_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set the format for this element.
    pub fn with_format(mut self, format: VertexFormat) -> Self {
        self.format = format;
        self
    }

    /// Mark this element as per-instance data.
    pub fn instanced(mut self) -> Self {
        self.per_instance = true;
        self
    }

    /// Size in bytes of this element.
    pub fn size(&self) -> u32 {
        self.format.size()
    }

    /// First byte past the end of this element within its slot.
    ///
    /// Saturates at `u32::MAX`; the layout builder rejects explicit offsets
    /// where that would happen.
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.size())
    }

    /// Key used to deduplicate elements inside one layout.
    pub fn key(&self) -> ElementKey {
        (self.semantic, self.index, self.slot)
    }

    /// Check if this element carries the same semantic and index as another,
    /// regardless of placement.
    pub fn same_semantic(&self, other: &VertexElement) -> bool {
        self.semantic == other.semantic && self.index == other.index
    }

    /// Check if two elements in the same slot share any bytes.
    pub(crate) fn overlaps(&self, other: &VertexElement) -> bool {
        self.slot == other.slot && self.offset < other.end() && other.offset < self.end()
    }
}

impl fmt::Display for VertexElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}: {:?}, slot {}, offset {}, {}",
            self.semantic,
            self.index,
            self.format,
            self.slot,
            self.offset,
            if self.per_instance {
                "per-instance"
            } else {
                "per-vertex"
            }
        )
    }
}
