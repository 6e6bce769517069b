//! Machine configuration.

use serde::{Deserialize, Serialize};

/// Default buffer size of each observer channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Tunables for a [`Machine`](super::Machine).
///
/// Missing fields fall back to their defaults when deserialized, so hosts can
/// embed a partial `[machine]` table in their own configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Values buffered per observer before a slow one starts lagging
    pub channel_capacity: usize,

    /// Whether diagnostics reach the sink at all
    pub logging_enabled: bool,

    /// Name used by the tracing sink; a random one is generated when unset
    pub label: Option<String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            logging_enabled: true,
            label: None,
        }
    }
}

impl MachineConfig {
    /// Observer channel capacity, never zero.
    pub(crate) fn effective_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }
}
