//! Interning cache for vertex layouts.
//!
//! [`VertexLayoutCache`] guarantees that exactly one [`VertexLayout`] exists
//! per structural shape: every request is canonicalized by the
//! [`LayoutBuilder`] and looked up by fingerprint, and structurally identical
//! requests receive the same [`VertexLayoutRef`]. Layouts are created lazily
//! and never evicted; dropping the cache releases them (callers' handles keep
//! their layout alive on their own).
//!
//! # Thread Safety
//!
//! Lookups take a shared read lock and never block each other. A miss takes
//! the write lock and re-checks before inserting, so two threads building the
//! same layout at once still end up with one canonical instance; the losing
//! candidate is dropped without ever being published.
//!
//! # Example
//!
//! ```
//! use redlilium_vertex::{MergePolicy, VertexElement, VertexLayoutCache, VertexLayoutRef};
//!
//! let cache = VertexLayoutCache::new();
//! let a = cache.get(&[VertexElement::position(), VertexElement::normal()], false)?;
//! let b = cache.get(&[VertexElement::position(), VertexElement::normal()], false)?;
//! assert!(VertexLayoutRef::ptr_eq(&a, &b));
//!
//! // Make sure a shader requiring UVs gets them.
//! let shader_inputs = cache.get(&[VertexElement::position(), VertexElement::texcoord(0)], false)?;
//! let merged = cache.merge(Some(&a), &shader_inputs, MergePolicy::default())?;
//! assert_eq!(merged.len(), 3);
//! # Ok::<(), redlilium_vertex::VertexLayoutError>(())
//! ```

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::buffer::{VertexLayoutSource, aggregate_buffer_elements};
use crate::builder::LayoutBuilder;
use crate::config::VertexLayoutCacheConfig;
use crate::element::VertexElement;
use crate::error::Result;
use crate::layout::{VertexLayout, VertexLayoutRef};
use crate::merge::{MergePolicy, concat_layout_elements, merge_with_reference};

/// Layouts sharing a fingerprint. Almost always a single entry.
type Bucket = SmallVec<[VertexLayoutRef; 1]>;

/// Cache usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of lookups performed.
    pub queries: u64,
    /// Lookups answered by an existing layout.
    pub hits: u64,
    /// Lookups that created a new layout.
    pub misses: u64,
    /// Number of canonical layouts held.
    pub entries: usize,
}

/// Registry of canonical vertex layouts.
///
/// Create one per owner (or per test) with [`VertexLayoutCache::new`], or use
/// the process-wide instance from [`VertexLayoutCache::global`].
pub struct VertexLayoutCache {
    config: VertexLayoutCacheConfig,
    registry: RwLock<FxHashMap<u64, Bucket>>,
    queries: AtomicU64,
    misses: AtomicU64,
}

impl VertexLayoutCache {
    /// Create an empty cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(VertexLayoutCacheConfig::default())
    }

    /// Create an empty cache with the given configuration.
    pub fn with_config(config: VertexLayoutCacheConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(FxHashMap::default()),
            queries: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the process-wide cache, creating it on first use.
    ///
    /// Layouts interned here live until the process exits.
    pub fn global() -> &'static VertexLayoutCache {
        static GLOBAL: OnceLock<VertexLayoutCache> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            log::debug!("Creating global vertex layout cache");
            VertexLayoutCache::new()
        })
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &VertexLayoutCacheConfig {
        &self.config
    }

    /// Get the canonical layout for a list of elements.
    ///
    /// With `explicit_offsets == false` offsets are packed per slot in input
    /// order; otherwise the elements' own offsets are used.
    ///
    /// # Errors
    ///
    /// Fails if the elements exceed the capacity of a layout or use an
    /// invalid format. Nothing is inserted on failure.
    pub fn get(&self, elements: &[VertexElement], explicit_offsets: bool) -> Result<VertexLayoutRef> {
        let layout = LayoutBuilder::new(&self.config).build(elements, explicit_offsets)?;
        Ok(self.intern(layout))
    }

    /// Get the canonical layout for a list of vertex buffers.
    ///
    /// Each buffer's own layout is re-slotted to the buffer's position in the
    /// list, then the combined elements are interned with their existing
    /// offsets.
    ///
    /// # Errors
    ///
    /// Fails with [`MissingBufferLayout`](crate::VertexLayoutError::MissingBufferLayout)
    /// if a buffer has no layout, or if the combined layout is invalid.
    pub fn get_for_buffers<B: VertexLayoutSource>(&self, buffers: &[B]) -> Result<VertexLayoutRef> {
        let elements = aggregate_buffer_elements(buffers)?;
        self.get(&elements, true)
    }

    /// Get the canonical layout combining several layouts.
    ///
    /// Slots and offsets are kept; later layouts override earlier ones on the
    /// same semantic, index and slot.
    pub fn get_for_layouts(&self, layouts: &[VertexLayoutRef]) -> Result<VertexLayoutRef> {
        let elements = concat_layout_elements(layouts);
        self.get(&elements, true)
    }

    /// Reconcile a base layout against a reference layout.
    ///
    /// Returns `reference` when there is no base, and `base` itself when the
    /// policy leaves it unchanged. Otherwise the merged layout is interned
    /// with explicit offsets.
    pub fn merge(
        &self,
        base: Option<&VertexLayoutRef>,
        reference: &VertexLayoutRef,
        policy: MergePolicy,
    ) -> Result<VertexLayoutRef> {
        let Some(base) = base else {
            return Ok(reference.clone());
        };

        match merge_with_reference(base.elements(), reference.elements(), policy) {
            Some(elements) => self.get(&elements, true),
            None => Ok(base.clone()),
        }
    }

    /// Number of canonical layouts held by this cache.
    pub fn len(&self) -> usize {
        self.registry.read().values().map(|bucket| bucket.len()).sum()
    }

    /// Check if the cache holds no layouts.
    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    /// Check if a handle refers to a layout owned by this cache.
    pub fn contains(&self, layout: &VertexLayoutRef) -> bool {
        self.registry
            .read()
            .get(&layout.fingerprint())
            .is_some_and(|bucket| bucket.iter().any(|l| VertexLayoutRef::ptr_eq(l, layout)))
    }

    /// Get usage statistics.
    pub fn stats(&self) -> CacheStats {
        let queries = self.queries.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            queries,
            hits: queries.saturating_sub(misses),
            misses,
            entries: self.len(),
        }
    }

    /// Look up a built layout, inserting it if no structural match exists.
    fn intern(&self, layout: VertexLayout) -> VertexLayoutRef {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let fingerprint = layout.fingerprint();

        {
            let registry = self.registry.read();
            if let Some(existing) = find_in(&registry, &layout) {
                log::trace!("Vertex layout cache hit ({fingerprint:016x})");
                return existing;
            }
        }

        let mut registry = self.registry.write();
        // Another thread may have inserted it between the two locks
        if let Some(existing) = find_in(&registry, &layout) {
            log::trace!("Vertex layout cache hit after race ({fingerprint:016x})");
            return existing;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Interned vertex layout {fingerprint:016x}: {} elements, {} slots, stride {}",
            layout.len(),
            layout.slot_count(),
            layout.stride()
        );

        let handle = VertexLayoutRef::new(layout);
        registry
            .entry(fingerprint)
            .or_default()
            .push(handle.clone());
        handle
    }
}

/// Find a structurally equal layout. The fingerprint only selects the bucket.
fn find_in(registry: &FxHashMap<u64, Bucket>, layout: &VertexLayout) -> Option<VertexLayoutRef> {
    registry
        .get(&layout.fingerprint())?
        .iter()
        .find(|candidate| candidate.elements() == layout.elements())
        .cloned()
}

// ============================================================================
// Common Layouts
// ============================================================================

impl VertexLayoutCache {
    /// Position-only layout (12 bytes per vertex, single slot).
    pub fn position_only(&self) -> Result<VertexLayoutRef> {
        self.get(&[VertexElement::position()], false)
    }

    /// Position + normal layout (24 bytes per vertex, single slot).
    pub fn position_normal(&self) -> Result<VertexLayoutRef> {
        self.get(&[VertexElement::position(), VertexElement::normal()], false)
    }

    /// Position + normal + texcoord layout (32 bytes per vertex, single slot).
    pub fn position_normal_uv(&self) -> Result<VertexLayoutRef> {
        self.get(
            &[
                VertexElement::position(),
                VertexElement::normal(),
                VertexElement::texcoord(0),
            ],
            false,
        )
    }

    /// Full PBR layout: position + normal + tangent + texcoord (48 bytes, single slot).
    pub fn pbr(&self) -> Result<VertexLayoutRef> {
        self.get(
            &[
                VertexElement::position(),
                VertexElement::normal(),
                VertexElement::tangent(),
                VertexElement::texcoord(0),
            ],
            false,
        )
    }
}

impl Default for VertexLayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VertexLayoutCache {
    fn drop(&mut self) {
        log::debug!("Releasing vertex layout cache ({} layouts)", self.len());
    }
}

impl std::fmt::Debug for VertexLayoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexLayoutCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

// The cache is shared between render and worker threads.
static_assertions::assert_impl_all!(VertexLayoutCache: Send, Sync);
