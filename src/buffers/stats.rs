//! Buffer pool statistics snapshots
//!
//! Read-only diagnostics for capacity planning. Snapshots have no effect
//! on the pools they describe and play no part in allocation decisions.

use serde::{Deserialize, Serialize};

use crate::arena::NumaNode;

/// Point-in-time view of one pool's configuration and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Configured payload capacity (the size class)
    pub payload_size: usize,
    /// Total buffer units in the pool
    pub unit_count: usize,
    /// Configured headroom per buffer
    pub headroom: usize,
    /// Configured tailroom per buffer
    pub tailroom: usize,
    /// NUMA node the arena was placed on
    pub numa_node: NumaNode,
    /// Units currently on the free list
    pub free_count: usize,
    /// Cumulative successful allocations
    pub alloc_count: u64,
    /// Cumulative deallocations
    pub dealloc_count: u64,
    /// Allocation attempts that found the free list empty
    pub alloc_failures: u64,
}

impl PoolStats {
    /// Units currently held by callers
    pub fn in_use(&self) -> usize {
        self.unit_count - self.free_count
    }

    /// Pool utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.unit_count == 0 {
            return 0.0;
        }
        self.in_use() as f64 / self.unit_count as f64
    }

    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "pool(payload: {} B, units: {}, headroom: {} B, tailroom: {} B, node: {}) \
             free: {}, in_use: {}, allocs: {}, deallocs: {}, failures: {}",
            self.payload_size,
            self.unit_count,
            self.headroom,
            self.tailroom,
            self.numa_node,
            self.free_count,
            self.in_use(),
            self.alloc_count,
            self.dealloc_count,
            self.alloc_failures
        )
    }
}
