//! Storage-layer bookkeeping types.

use serde::Serialize;

/// Occupancy of a snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    /// Distinct payloads held.
    pub snapshots: usize,
    /// Sum of the payloads' canonical JSON sizes.
    pub approx_bytes: usize,
}
