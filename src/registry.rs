//! Pool registry: size-class and NUMA-affinity routing
//!
//! A [`PoolRegistry`] owns every pool in a process and is the single entry
//! point for "give me at least S bytes, preferably on node N". Pools are
//! keyed by (node, payload size class); requests pick the smallest size
//! class that satisfies them, falling back to the [`NUMA_ANY`] tier when
//! the requested node has no fitting class.
//!
//! The registry is an explicitly constructed object meant to be built once
//! at startup and passed to whatever allocates buffers. Dropping it drops
//! every owned pool and arena.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::{
    arena::{NumaNode, NUMA_ANY},
    buffers::{BufferHandle, BufferPool, PoolConfig, PoolStats},
    error::{PoolError, Result},
};

/// Registry of buffer pools keyed by (NUMA node, payload size class).
#[derive(Debug, Default)]
pub struct PoolRegistry {
    // Ordered size keys give best-fit-ascending selection by range scan;
    // readers never observe a partially-inserted pool.
    pools: RwLock<BTreeMap<NumaNode, BTreeMap<usize, BufferPool>>>,
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Default::default()
    }

    /// Construct a pool from `config` and register it under `node`.
    ///
    /// A pool already registered for this (node, payload size) pair is
    /// kept untouched and the conflict is reported as
    /// [`PoolError::PoolExists`]. A pool construction failure aborts the
    /// registration and is propagated.
    pub fn register_pool(&self, node: NumaNode, config: PoolConfig) -> Result<()> {
        let mut pools = self.pools.write().unwrap();
        let tier = pools.entry(node).or_default();

        if tier.contains_key(&config.payload_size) {
            return Err(PoolError::pool_exists(node, config.payload_size));
        }

        let pool = BufferPool::new(config, node)?;
        log::info!(
            "registered pool: payload {} B x {} units (headroom {} B, tailroom {} B) on node {}",
            pool.payload_size(),
            pool.unit_count(),
            pool.headroom(),
            pool.tailroom(),
            node
        );
        tier.insert(pool.payload_size(), pool);
        Ok(())
    }

    /// Register a batch of pools under `node`. Size classes that already
    /// exist are skipped with a warning; a construction failure stops the
    /// batch and is propagated.
    pub fn configure_node(&self, node: NumaNode, configs: &[PoolConfig]) -> Result<()> {
        for config in configs {
            match self.register_pool(node, config.clone()) {
                Ok(()) => {}
                Err(PoolError::PoolExists { payload_size, .. }) => {
                    log::warn!(
                        "pool for payload size {} on node {} already exists, skipping",
                        payload_size,
                        node
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Allocate a buffer of at least `requested_size` bytes, preferably
    /// from a pool on `node`.
    ///
    /// Selection is best-fit ascending: the smallest registered size class
    /// `>= requested_size` on the requested node, then the same rule on
    /// the [`NUMA_ANY`] tier. Returns `None` when no pool fits or the
    /// selected pool is exhausted; exhaustion does not trigger a further
    /// fallback to a larger class or another node.
    pub fn allocate(&self, requested_size: usize, node: NumaNode) -> Option<BufferHandle> {
        let pool = match self.find_pool(requested_size, node) {
            Some(pool) => pool,
            None => {
                log::debug!(
                    "no pool satisfies {} bytes on node {} (or the global tier)",
                    requested_size,
                    node
                );
                return None;
            }
        };

        let buffer = pool.allocate_buffer();
        if buffer.is_none() {
            log::debug!(
                "pool (payload {} B, node {}) exhausted for a {} byte request",
                pool.payload_size(),
                pool.numa_node(),
                requested_size
            );
        }
        buffer
    }

    /// Convenience equivalent of [`BufferHandle::release`]. The registry
    /// holds no reference of its own, so this drops exactly one.
    pub fn deallocate(&self, buffer: BufferHandle) {
        buffer.release();
    }

    /// Number of registered pools across all nodes
    pub fn pool_count(&self) -> usize {
        let pools = self.pools.read().unwrap();
        pools.values().map(|tier| tier.len()).sum()
    }

    /// Statistics snapshots for every registered pool, ordered by node
    /// then size class
    pub fn stats(&self) -> Vec<(NumaNode, PoolStats)> {
        let pools = self.pools.read().unwrap();
        pools
            .iter()
            .flat_map(|(&node, tier)| tier.values().map(move |pool| (node, pool.stats())))
            .collect()
    }

    /// Log a per-pool summary at info level
    pub fn log_summary(&self) {
        let stats = self.stats();
        if stats.is_empty() {
            log::info!("pool registry: no pools configured");
            return;
        }
        for (node, stats) in stats {
            let tier = if node == NUMA_ANY {
                " (global tier)"
            } else {
                ""
            };
            log::info!("node {}{}: {}", node, tier, stats.summary());
        }
    }

    // Pool selection happens under the read lock; the free-list pop runs
    // after the lock is dropped so registration never waits on allocation.
    fn find_pool(&self, requested_size: usize, node: NumaNode) -> Option<BufferPool> {
        let pools = self.pools.read().unwrap();

        if let Some(tier) = pools.get(&node) {
            if let Some((_, pool)) = tier.range(requested_size..).next() {
                return Some(pool.clone());
            }
        }

        if node != NUMA_ANY {
            if let Some(tier) = pools.get(&NUMA_ANY) {
                if let Some((_, pool)) = tier.range(requested_size..).next() {
                    return Some(pool.clone());
                }
            }
        }

        None
    }
}
