//! Vertex layout cache configuration.

/// How the builder reacts to explicit offsets whose byte ranges overlap
/// inside one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlapCheck {
    /// Accept overlapping ranges silently (default).
    #[default]
    Ignore,
    /// Accept overlapping ranges but log a warning for each pair.
    Warn,
}

/// Configuration for a [`VertexLayoutCache`](crate::VertexLayoutCache).
///
/// Use [`Default::default()`] for sensible defaults.
#[derive(Debug, Clone)]
pub struct VertexLayoutCacheConfig {
    /// Validation applied to explicit offsets. Default: [`OverlapCheck::Ignore`].
    pub overlap_check: OverlapCheck,
    /// Log a debug message whenever a later element overrides an earlier one
    /// with the same semantic, index and slot. Default: `true`.
    pub log_overrides: bool,
}

impl Default for VertexLayoutCacheConfig {
    fn default() -> Self {
        Self {
            overlap_check: OverlapCheck::Ignore,
            log_overrides: true,
        }
    }
}

impl VertexLayoutCacheConfig {
    /// Set the overlap validation mode.
    pub fn with_overlap_check(mut self, overlap_check: OverlapCheck) -> Self {
        self.overlap_check = overlap_check;
        self
    }

    /// Enable or disable override logging.
    pub fn with_log_overrides(mut self, log_overrides: bool) -> Self {
        self.log_overrides = log_overrides;
        self
    }
}
