/// Default maximum nesting depth accepted by the decoder.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Default shape-resolution budget, in search steps per input byte and per
/// search order.
pub const DEFAULT_SEARCH_STEPS_PER_BYTE: usize = 64;

/// Minimum shape-resolution budget regardless of input size.
pub const MIN_SEARCH_STEPS: usize = 1 << 16;

/// Configuration for the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Maximum list/map nesting depth. The root collection is depth 1.
    pub max_depth: usize,
    /// Search steps allowed per input byte while resolving nested `0x01`/`0x02`
    /// tags. Each search order gets this budget; once every order has spent
    /// it, decoding fails with the most specific error seen.
    pub search_steps_per_byte: usize,
}

impl DecodeConfig {
    /// Step budget of one search order for a buffer of `len` bytes.
    pub fn search_budget(&self, len: usize) -> usize {
        len.saturating_mul(self.search_steps_per_byte)
            .max(MIN_SEARCH_STEPS)
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            search_steps_per_byte: DEFAULT_SEARCH_STEPS_PER_BYTE,
        }
    }
}
