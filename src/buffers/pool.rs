//! Fixed-capacity buffer pool over a single arena
//!
//! A [`BufferPool`] pre-allocates every buffer it will ever serve: one
//! contiguous [`Arena`] holds the `[headroom|payload|tailroom]` region of
//! each slot at a fixed, cache-line-aligned stride, and a typed slot table
//! holds each slot's control block and attribute record. Slots are never
//! created or destroyed individually: they cycle between the free list
//! (ref-count 0) and live handles (ref-count >= 1) until the pool itself
//! is dropped, which tears down the whole arena at once.

use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc, Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{
    arena::{Arena, NumaNode},
    defaults,
    error::Result,
};

use super::{
    handle::BufferHandle,
    record::{BufferRecord, BufferState},
    stats::PoolStats,
};

/// Configuration for a single buffer pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Payload capacity of each buffer in bytes (the pool's size class)
    pub payload_size: usize,
    /// Number of buffer units, fixed for the pool's lifetime
    pub unit_count: usize,
    /// Slack reserved before the payload for in-place prepending
    pub headroom: usize,
    /// Slack reserved after the payload for in-place appending
    pub tailroom: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            payload_size: 2048,
            unit_count: 512,
            headroom: defaults::DEFAULT_HEADROOM,
            tailroom: defaults::DEFAULT_TAILROOM,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the default head/tail slack
    pub fn new(payload_size: usize, unit_count: usize) -> Self {
        Self {
            payload_size,
            unit_count,
            ..Default::default()
        }
    }

    /// Set the headroom size
    pub fn with_headroom(mut self, headroom: usize) -> Self {
        self.headroom = headroom;
        self
    }

    /// Set the tailroom size
    pub fn with_tailroom(mut self, tailroom: usize) -> Self {
        self.tailroom = tailroom;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        use crate::error::PoolError;

        if self.payload_size == 0 {
            return Err(PoolError::invalid_parameter(
                "payload_size",
                "payload size cannot be zero",
            ));
        }
        if self.unit_count == 0 {
            return Err(PoolError::invalid_parameter(
                "unit_count",
                "unit count cannot be zero",
            ));
        }
        self.headroom
            .checked_add(self.payload_size)
            .and_then(|n| n.checked_add(self.tailroom))
            .and_then(|region| align_up(region, defaults::SLOT_ALIGN).checked_mul(self.unit_count))
            .ok_or_else(|| {
                PoolError::invalid_parameter("unit_count", "pool memory size overflows")
            })?;
        Ok(())
    }

    /// Size of one slot's `[headroom|payload|tailroom]` region
    pub fn region_size(&self) -> usize {
        self.headroom + self.payload_size + self.tailroom
    }

    /// Total arena memory the pool will map for this configuration
    pub fn total_memory_required(&self) -> usize {
        align_up(self.region_size(), defaults::SLOT_ALIGN) * self.unit_count
    }
}

/// Mutable window state of one slot, guarded by the slot's own lock.
///
/// `data_off` is relative to the slot's region start and the window
/// invariant `data_off + data_len <= region_size` holds at all times.
#[derive(Debug)]
pub(super) struct Window {
    pub(super) data_off: usize,
    pub(super) data_len: usize,
    pub(super) next: Option<BufferHandle>,
}

/// Control block of one slot
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) ref_count: AtomicU32,
    pub(super) window: Mutex<Window>,
    pub(super) record: Mutex<BufferRecord>,
}

impl Slot {
    fn new(headroom: usize) -> Self {
        Self {
            ref_count: AtomicU32::new(0),
            window: Mutex::new(Window {
                data_off: headroom,
                data_len: 0,
                next: None,
            }),
            record: Mutex::new(BufferRecord::new()),
        }
    }
}

/// Shared pool state. Handles keep this alive through an `Arc`, so the
/// arena outlives every buffer view even if the pool's owner drops first.
#[derive(Debug)]
pub(crate) struct PoolCore {
    pub(super) payload_size: usize,
    pub(super) unit_count: usize,
    pub(super) headroom: usize,
    pub(super) tailroom: usize,
    pub(super) region_size: usize,
    pub(super) stride: usize,
    pub(super) numa_node: NumaNode,
    pub(super) arena: Arena,
    pub(super) slots: Box<[Slot]>,
    free: Mutex<Vec<u32>>,
    alloc_count: AtomicU64,
    dealloc_count: AtomicU64,
    alloc_failures: AtomicU64,
}

impl PoolCore {
    /// Return a slot to the free list. Reached only from the last
    /// `release()` of a handle, so the slot is guaranteed idle and to
    /// belong to this pool.
    pub(super) fn deallocate_slot(&self, index: u32) {
        // The state flips to Free before the push: once the index is on
        // the list another thread may immediately re-allocate the slot.
        self.slots[index as usize]
            .record
            .lock()
            .unwrap()
            .set_state(BufferState::Free);

        let mut free = self.free.lock().unwrap();
        free.push(index);
        self.dealloc_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn free_count(&self) -> usize {
        self.free.lock().unwrap().len()
    }

    pub(super) fn alloc_count(&self) -> u64 {
        self.alloc_count.load(Ordering::Relaxed)
    }

    pub(super) fn dealloc_count(&self) -> u64 {
        self.dealloc_count.load(Ordering::Relaxed)
    }

    pub(super) fn alloc_failures(&self) -> u64 {
        self.alloc_failures.load(Ordering::Relaxed)
    }

    /// Base pointer of a slot's `[headroom|payload|tailroom]` region.
    pub(super) fn region_ptr(&self, index: u32) -> *mut u8 {
        debug_assert!((index as usize) < self.unit_count);
        unsafe { self.arena.base().as_ptr().add(index as usize * self.stride) }
    }
}

/// A pool of pre-allocated, reference-counted packet buffers.
///
/// Cloning is cheap and shares the same underlying pool.
#[derive(Debug, Clone)]
pub struct BufferPool {
    core: Arc<PoolCore>,
}

impl BufferPool {
    /// Construct a pool: map the arena, build every slot in place, and
    /// put all units on the free list.
    ///
    /// Failure to obtain memory is reported as an error; a pool is never
    /// observable in a partially-initialized state.
    pub fn new(config: PoolConfig, numa_node: NumaNode) -> Result<Self> {
        config.validate()?;

        let region_size = config.region_size();
        let stride = align_up(region_size, defaults::SLOT_ALIGN);
        let arena = Arena::new(stride * config.unit_count, numa_node)?;

        let slots: Box<[Slot]> = (0..config.unit_count)
            .map(|_| Slot::new(config.headroom))
            .collect();

        // Reversed so the first allocation pops slot 0; any order would do.
        let free: Vec<u32> = (0..config.unit_count as u32).rev().collect();

        Ok(Self {
            core: Arc::new(PoolCore {
                payload_size: config.payload_size,
                unit_count: config.unit_count,
                headroom: config.headroom,
                tailroom: config.tailroom,
                region_size,
                stride,
                numa_node,
                arena,
                slots,
                free: Mutex::new(free),
                alloc_count: AtomicU64::new(0),
                dealloc_count: AtomicU64::new(0),
                alloc_failures: AtomicU64::new(0),
            }),
        })
    }

    /// Take one buffer from the free list.
    ///
    /// Returns `None` when the pool is exhausted, an expected condition
    /// the caller handles rather than an error.
    pub fn allocate_buffer(&self) -> Option<BufferHandle> {
        let core = &self.core;
        let index = {
            let mut free = core.free.lock().unwrap();
            match free.pop() {
                Some(index) => {
                    core.alloc_count.fetch_add(1, Ordering::Relaxed);
                    index
                }
                None => {
                    // Exhaustion is an expected outcome, not an error; the
                    // allocation counter stays untouched.
                    core.alloc_failures.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        };

        let slot = &core.slots[index as usize];
        slot.ref_count.store(1, Ordering::Release);
        {
            let mut window = slot.window.lock().unwrap();
            window.data_off = core.headroom;
            window.data_len = 0;
            window.next = None;
        }
        slot.record.lock().unwrap().set_state(BufferState::Allocated);

        Some(BufferHandle::new(Arc::clone(core), index))
    }

    /// Configured payload capacity (the pool's size class)
    pub fn payload_size(&self) -> usize {
        self.core.payload_size
    }

    /// Total number of buffer units in the pool
    pub fn unit_count(&self) -> usize {
        self.core.unit_count
    }

    /// Configured headroom per buffer
    pub fn headroom(&self) -> usize {
        self.core.headroom
    }

    /// Configured tailroom per buffer
    pub fn tailroom(&self) -> usize {
        self.core.tailroom
    }

    /// NUMA node the arena was placed on
    pub fn numa_node(&self) -> NumaNode {
        self.core.numa_node
    }

    /// Buffers currently on the free list
    pub fn free_count(&self) -> usize {
        self.core.free_count()
    }

    /// Cumulative successful allocations
    pub fn alloc_count(&self) -> u64 {
        self.core.alloc_count()
    }

    /// Cumulative deallocations
    pub fn dealloc_count(&self) -> u64 {
        self.core.dealloc_count()
    }

    /// Read-only statistics snapshot
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            payload_size: self.core.payload_size,
            unit_count: self.core.unit_count,
            headroom: self.core.headroom,
            tailroom: self.core.tailroom,
            numa_node: self.core.numa_node,
            free_count: self.core.free_count(),
            alloc_count: self.core.alloc_count(),
            dealloc_count: self.core.dealloc_count(),
            alloc_failures: self.core.alloc_failures(),
        }
    }
}

/// Align a value up to the given power-of-two alignment
fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
