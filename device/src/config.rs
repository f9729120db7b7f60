use bon::bon;

use crate::memory::MEMORY_ALIGNMENT;

/// Tuning for [`CachingAllocator`](crate::CachingAllocator).
///
/// Built through [`AllocatorConfig::builder`] or [`AllocatorConfig::from_env`], which both reject
/// alignments that are not a power of two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    alignment: usize,
    evict_on_oom: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { alignment: MEMORY_ALIGNMENT, evict_on_oom: true }
    }
}

#[bon]
impl AllocatorConfig {
    #[builder]
    pub fn new(
        #[builder(default = MEMORY_ALIGNMENT)] alignment: usize,
        #[builder(default = true)] evict_on_oom: bool,
    ) -> Self {
        Self { alignment: Self::checked_alignment(alignment), evict_on_oom }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_ALLOC_ALIGNMENT` - Block alignment in bytes (default: 16 on ARM, 64 otherwise)
    /// * `TESSERA_ALLOC_NO_EVICT` - Disable cache eviction on out-of-memory if set
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let alignment = var("TESSERA_ALLOC_ALIGNMENT").and_then(|s| s.parse().ok()).unwrap_or(MEMORY_ALIGNMENT);
        let evict_on_oom = var("TESSERA_ALLOC_NO_EVICT").is_none();

        Self { alignment: Self::checked_alignment(alignment), evict_on_oom }
    }

    /// Alignment for block sizes that are a multiple of it. Always a power of two.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Evict the whole cache and retry once when the host runs out of memory.
    pub fn evict_on_oom(&self) -> bool {
        self.evict_on_oom
    }

    fn checked_alignment(alignment: usize) -> usize {
        if alignment.is_power_of_two() {
            alignment
        } else {
            tracing::warn!(alignment, fallback = MEMORY_ALIGNMENT, "alignment is not a power of two");
            MEMORY_ALIGNMENT
        }
    }
}
