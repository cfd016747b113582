//! GPU memory pressure policy for per-layer geometry buffers.

use serde::{Deserialize, Serialize};

/// Resident-feature ceiling used by the 32-bit address space policy
pub const LEGACY_FEATURE_CEILING: usize = 125_000;

/// When and how aggressively cached layer buffers are evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Never evict; every visible layer keeps its buffer.
    Disabled,
    /// Evict only on 32-bit targets whose backend lacks native buffer objects.
    Legacy32Bit { ceiling: usize },
    /// Always bound the number of resident features.
    Always { ceiling: usize },
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::Legacy32Bit {
            ceiling: LEGACY_FEATURE_CEILING,
        }
    }
}

impl EvictionPolicy {
    /// The feature ceiling in force for a backend, or `None` when eviction is off.
    pub fn active_ceiling(&self, supports_buffer_objects: bool) -> Option<usize> {
        match *self {
            EvictionPolicy::Disabled => None,
            EvictionPolicy::Legacy32Bit { ceiling } => {
                (cfg!(target_pointer_width = "32") && !supports_buffer_objects).then_some(ceiling)
            }
            EvictionPolicy::Always { ceiling } => Some(ceiling),
        }
    }

    pub fn ceiling(&self) -> Option<usize> {
        match *self {
            EvictionPolicy::Disabled => None,
            EvictionPolicy::Legacy32Bit { ceiling } | EvictionPolicy::Always { ceiling } => {
                Some(ceiling)
            }
        }
    }
}
