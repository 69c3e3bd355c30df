//! Layout construction: validation, deduplication, offsets and strides.
//!
//! [`LayoutBuilder::build`] turns an arbitrary element list into a canonical
//! [`VertexLayout`]. It is a pure function of its input and never touches a
//! cache, so a failed build leaves no trace.
//!
//! # Offsets
//!
//! With `explicit_offsets == false` every element is packed right after the
//! previous element of the same slot, in input order:
//!
//! ```text
//! [Position(float3), Color(float4)]  ->  offsets [0, 12], stride 28
//! ```
//!
//! With `explicit_offsets == true` the caller's offsets are taken verbatim.
//!
//! # Canonical order
//!
//! The finished elements are sorted by `(slot, offset, semantic, index)`.
//! Auto-packed offsets grow in input order, so this only normalizes how
//! slots are interleaved; explicitly placed elements supplied in any order
//! end up identical.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::config::{OverlapCheck, VertexLayoutCacheConfig};
use crate::element::VertexElement;
use crate::error::{Result, VertexLayoutError};
use crate::layout::{MAX_VERTEX_ELEMENTS, SlotStride, VertexElements, VertexLayout};

/// Builds canonical layouts from element lists.
#[derive(Debug, Clone, Copy)]
pub struct LayoutBuilder {
    overlap_check: OverlapCheck,
    log_overrides: bool,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new(&VertexLayoutCacheConfig::default())
    }
}

impl LayoutBuilder {
    /// Create a builder using the validation settings of a cache config.
    pub fn new(config: &VertexLayoutCacheConfig) -> Self {
        Self {
            overlap_check: config.overlap_check,
            log_overrides: config.log_overrides,
        }
    }

    /// Build a layout from the given elements.
    ///
    /// Later elements override earlier ones with the same semantic, index and
    /// slot; the override keeps the position of the first occurrence.
    ///
    /// # Errors
    ///
    /// - [`VertexLayoutError::CapacityExceeded`] if more than
    ///   [`MAX_VERTEX_ELEMENTS`] elements are supplied.
    /// - [`VertexLayoutError::InvalidFormat`] if an element has a zero-size format.
    /// - [`VertexLayoutError::OffsetOverflow`] if an explicitly placed element
    ///   ends past `u32::MAX`.
    pub fn build(&self, elements: &[VertexElement], explicit_offsets: bool) -> Result<VertexLayout> {
        if elements.len() > MAX_VERTEX_ELEMENTS {
            return Err(VertexLayoutError::CapacityExceeded {
                count: elements.len(),
                max: MAX_VERTEX_ELEMENTS,
            });
        }

        if let Some(invalid) = elements.iter().find(|e| !e.format.is_valid()) {
            return Err(VertexLayoutError::InvalidFormat {
                semantic: invalid.semantic,
                index: invalid.index,
                format: invalid.format,
            });
        }

        let mut unique = self.dedup(elements);

        if explicit_offsets {
            if let Some(overflow) = unique
                .iter()
                .find(|e| e.offset.checked_add(e.size()).is_none())
            {
                return Err(VertexLayoutError::OffsetOverflow {
                    semantic: overflow.semantic,
                    index: overflow.index,
                    offset: overflow.offset,
                });
            }
            if self.overlap_check == OverlapCheck::Warn {
                warn_overlaps(&unique);
            }
        } else {
            assign_offsets(&mut unique);
        }

        unique.sort_unstable_by_key(|e| (e.slot, e.offset, e.semantic, e.index));

        let strides = compute_strides(&unique);
        let fingerprint = fingerprint(&unique);
        Ok(VertexLayout::from_parts(unique, strides, fingerprint))
    }

    fn dedup(&self, elements: &[VertexElement]) -> VertexElements {
        let mut unique = VertexElements::new();
        for element in elements {
            match unique.iter_mut().find(|e| e.key() == element.key()) {
                Some(existing) => {
                    if self.log_overrides {
                        log::debug!(
                            "Vertex element {}{} in slot {} redefined ({:?} -> {:?})",
                            element.semantic,
                            element.index,
                            element.slot,
                            existing.format,
                            element.format
                        );
                    }
                    *existing = *element;
                }
                None => unique.push(*element),
            }
        }
        unique
    }
}

/// Pack elements per slot in input order.
fn assign_offsets(elements: &mut [VertexElement]) {
    let mut cursors: SmallVec<[(u32, u32); 4]> = SmallVec::new();
    for element in elements.iter_mut() {
        let index = match cursors.iter().position(|(slot, _)| *slot == element.slot) {
            Some(index) => index,
            None => {
                cursors.push((element.slot, 0));
                cursors.len() - 1
            }
        };
        let cursor = &mut cursors[index].1;
        element.offset = *cursor;
        *cursor += element.size();
    }
}

/// Index pairs of elements sharing bytes in the same slot.
pub(crate) fn overlapping_pairs(elements: &[VertexElement]) -> SmallVec<[(usize, usize); 4]> {
    let mut pairs = SmallVec::new();
    for (i, a) in elements.iter().enumerate() {
        for (j, b) in elements.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

fn warn_overlaps(elements: &[VertexElement]) {
    for (i, j) in overlapping_pairs(elements) {
        let (a, b) = (&elements[i], &elements[j]);
        log::warn!(
            "Vertex elements {}{} and {}{} overlap in slot {} ({}..{} vs {}..{})",
            a.semantic,
            a.index,
            b.semantic,
            b.index,
            a.slot,
            a.offset,
            a.end(),
            b.offset,
            b.end()
        );
    }
}

/// Per-slot stride: the furthest byte touched by any element of the slot.
fn compute_strides(elements: &[VertexElement]) -> SmallVec<[SlotStride; 4]> {
    let mut strides: SmallVec<[SlotStride; 4]> = SmallVec::new();
    for element in elements {
        match strides.iter_mut().find(|s| s.slot == element.slot) {
            Some(s) => s.stride = s.stride.max(element.end()),
            None => strides.push(SlotStride {
                slot: element.slot,
                stride: element.end(),
            }),
        }
    }
    strides.sort_unstable_by_key(|s| s.slot);
    strides
}

/// Structural hash of canonical elements.
pub(crate) fn fingerprint(elements: &[VertexElement]) -> u64 {
    let mut hasher = FxHasher::default();
    elements.len().hash(&mut hasher);
    for element in elements {
        element.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{VertexFormat, VertexSemantic};

    /// Minimal logger that records every message for inspection.
    mod capture {
        use std::sync::{Mutex, OnceLock};

        static RECORDS: OnceLock<Mutex<Vec<(log::Level, String)>>> = OnceLock::new();

        struct CaptureLogger;

        impl log::Log for CaptureLogger {
            fn enabled(&self, _: &log::Metadata) -> bool {
                true
            }

            fn log(&self, record: &log::Record) {
                if let Ok(mut records) = RECORDS.get_or_init(Default::default).lock() {
                    records.push((record.level(), record.args().to_string()));
                }
            }

            fn flush(&self) {}
        }

        static LOGGER: CaptureLogger = CaptureLogger;

        pub fn install() {
            RECORDS.get_or_init(Default::default);
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Trace);
            }
        }

        pub fn contains(level: log::Level, needle: &str) -> bool {
            RECORDS
                .get_or_init(Default::default)
                .lock()
                .map(|records| {
                    records
                        .iter()
                        .any(|(l, message)| *l == level && message.contains(needle))
                })
                .unwrap_or(false)
        }
    }

    fn offsets(layout: &VertexLayout) -> Vec<u32> {
        layout.elements().iter().map(|e| e.offset).collect()
    }

    #[test]
    fn test_auto_offsets() {
        let layout = LayoutBuilder::default()
            .build(&[VertexElement::position(), VertexElement::color()], false)
            .unwrap();

        assert_eq!(offsets(&layout), vec![0, 12]);
        assert_eq!(layout.slot_stride(0), 28);
        assert_eq!(layout.stride(), 28);
    }

    #[test]
    fn test_auto_offsets_ignore_input_offsets() {
        let layout = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::position().at_offset(100),
                    VertexElement::color().at_offset(4),
                ],
                false,
            )
            .unwrap();

        assert_eq!(offsets(&layout), vec![0, 12]);
    }

    #[test]
    fn test_auto_offsets_per_slot() {
        let layout = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::texcoord(0).at_slot(1),
                    VertexElement::position(),
                    VertexElement::texcoord(1).at_slot(1),
                    VertexElement::normal(),
                ],
                false,
            )
            .unwrap();

        // Slot 0 first, each slot packed in input order
        let placed: Vec<_> = layout
            .elements()
            .iter()
            .map(|e| (e.semantic, e.index, e.slot, e.offset))
            .collect();
        assert_eq!(
            placed,
            vec![
                (VertexSemantic::Position, 0, 0, 0),
                (VertexSemantic::Normal, 0, 0, 12),
                (VertexSemantic::TexCoord, 0, 1, 0),
                (VertexSemantic::TexCoord, 1, 1, 8),
            ]
        );
        assert_eq!(layout.slot_stride(0), 24);
        assert_eq!(layout.slot_stride(1), 16);
        assert_eq!(layout.stride(), 40);
    }

    #[test]
    fn test_auto_offsets_order_matters() {
        let a = LayoutBuilder::default()
            .build(&[VertexElement::position(), VertexElement::color()], false)
            .unwrap();
        let b = LayoutBuilder::default()
            .build(&[VertexElement::color(), VertexElement::position()], false)
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(a.stride(), b.stride());
    }

    #[test]
    fn test_explicit_offsets() {
        let layout = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::position().at_offset(0),
                    VertexElement::color().at_offset(16),
                ],
                true,
            )
            .unwrap();

        assert_eq!(offsets(&layout), vec![0, 16]);
        assert_eq!(layout.slot_stride(0), 32);
    }

    #[test]
    fn test_explicit_offsets_canonical_order() {
        let a = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::color().at_offset(16),
                    VertexElement::position().at_offset(0),
                ],
                true,
            )
            .unwrap();
        let b = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::position().at_offset(0),
                    VertexElement::color().at_offset(16),
                ],
                true,
            )
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_explicit_offset_overflow() {
        let result = LayoutBuilder::default().build(
            &[
                VertexElement::normal(),
                VertexElement::position().at_offset(u32::MAX - 4),
            ],
            true,
        );

        assert_eq!(
            result,
            Err(VertexLayoutError::OffsetOverflow {
                semantic: VertexSemantic::Position,
                index: 0,
                offset: u32::MAX - 4,
            })
        );
    }

    #[test]
    fn test_explicit_offset_at_upper_bound() {
        let offset = u32::MAX - 12;
        let layout = LayoutBuilder::default()
            .build(&[VertexElement::position().at_offset(offset)], true)
            .unwrap();

        assert_eq!(layout.slot_stride(0), u32::MAX);
    }

    #[test]
    fn test_overridden_overflow_is_accepted() {
        // Only the winning element is placed
        let layout = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::position().at_offset(u32::MAX),
                    VertexElement::position().at_offset(0),
                ],
                true,
            )
            .unwrap();

        assert_eq!(layout.slot_stride(0), 12);
    }

    #[test]
    fn test_overlapping_pairs() {
        let elements = [
            VertexElement::position().at_offset(0),
            VertexElement::normal().at_offset(8),
            VertexElement::color().at_offset(20),
            VertexElement::texcoord(0).at_slot(1).at_offset(4),
        ];

        // Normal (8..20) touches position (0..12) but ends where color starts
        assert_eq!(overlapping_pairs(&elements).as_slice(), &[(0, 1)]);
        assert!(overlapping_pairs(&elements[2..]).is_empty());
    }

    #[test]
    fn test_overlap_warning_is_logged() {
        capture::install();
        let config = VertexLayoutCacheConfig::default().with_overlap_check(OverlapCheck::Warn);
        LayoutBuilder::new(&config)
            .build(
                &[
                    VertexElement::attribute(11, VertexFormat::Float32x4).at_slot(91),
                    VertexElement::attribute(12, VertexFormat::Float32x4)
                        .at_slot(91)
                        .at_offset(8),
                ],
                true,
            )
            .unwrap();

        assert!(capture::contains(
            log::Level::Warn,
            "Attribute11 and Attribute12 overlap in slot 91"
        ));
    }

    #[test]
    fn test_overlap_ignored_by_default() {
        capture::install();
        LayoutBuilder::default()
            .build(
                &[
                    VertexElement::attribute(11, VertexFormat::Float32x4).at_slot(94),
                    VertexElement::attribute(12, VertexFormat::Float32x4)
                        .at_slot(94)
                        .at_offset(8),
                ],
                true,
            )
            .unwrap();

        assert!(!capture::contains(log::Level::Warn, "overlap in slot 94"));
    }

    #[test]
    fn test_override_logging() {
        capture::install();
        let element =
            |index, slot| VertexElement::attribute(index, VertexFormat::Float32).at_slot(slot);

        LayoutBuilder::default()
            .build(
                &[
                    element(13, 92),
                    element(13, 92).with_format(VertexFormat::Float32x2),
                ],
                false,
            )
            .unwrap();
        assert!(capture::contains(
            log::Level::Debug,
            "Attribute13 in slot 92 redefined (Float32 -> Float32x2)"
        ));

        let quiet = VertexLayoutCacheConfig::default().with_log_overrides(false);
        LayoutBuilder::new(&quiet)
            .build(&[element(14, 93), element(14, 93)], false)
            .unwrap();
        assert!(!capture::contains(log::Level::Debug, "Attribute14 in slot 93"));
    }

    #[test]
    fn test_explicit_overlap_is_accepted() {
        let config = VertexLayoutCacheConfig::default().with_overlap_check(OverlapCheck::Warn);
        let layout = LayoutBuilder::new(&config)
            .build(
                &[
                    VertexElement::position().at_offset(0),
                    VertexElement::normal().at_offset(8),
                ],
                true,
            )
            .unwrap();

        assert_eq!(layout.slot_stride(0), 20);
    }

    #[test]
    fn test_duplicate_last_write_wins() {
        let layout = LayoutBuilder::default()
            .build(
                &[
                    VertexElement::position(),
                    VertexElement::texcoord(0),
                    VertexElement::position().with_format(VertexFormat::Float32x4),
                ],
                false,
            )
            .unwrap();

        // Override keeps the first position in the packing order
        assert_eq!(layout.len(), 2);
        let position = layout.find(VertexSemantic::Position, 0).unwrap();
        assert_eq!(position.format, VertexFormat::Float32x4);
        assert_eq!(position.offset, 0);
        assert_eq!(layout.find(VertexSemantic::TexCoord, 0).unwrap().offset, 16);
    }

    #[test]
    fn test_same_semantic_different_slot_is_kept() {
        let layout = LayoutBuilder::default()
            .build(
                &[VertexElement::position(), VertexElement::position().at_slot(1)],
                false,
            )
            .unwrap();

        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_capacity_boundary() {
        let full: Vec<_> = (0..MAX_VERTEX_ELEMENTS as u8)
            .map(|i| VertexElement::attribute(i, VertexFormat::Float32x4))
            .collect();
        assert!(LayoutBuilder::default().build(&full, false).is_ok());

        let mut over = full.clone();
        over.push(VertexElement::attribute(99, VertexFormat::Float32));
        assert_eq!(
            LayoutBuilder::default().build(&over, false),
            Err(VertexLayoutError::CapacityExceeded {
                count: MAX_VERTEX_ELEMENTS + 1,
                max: MAX_VERTEX_ELEMENTS,
            })
        );
    }

    #[test]
    fn test_invalid_format() {
        let result = LayoutBuilder::default().build(
            &[
                VertexElement::position(),
                VertexElement::texcoord(3).with_format(VertexFormat::Unknown),
            ],
            false,
        );

        assert_eq!(
            result,
            Err(VertexLayoutError::InvalidFormat {
                semantic: VertexSemantic::TexCoord,
                index: 3,
                format: VertexFormat::Unknown,
            })
        );
    }

    #[test]
    fn test_empty_layout() {
        let layout = LayoutBuilder::default().build(&[], false).unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout.stride(), 0);
        assert_eq!(layout.slot_count(), 0);
    }
}
