//! Reference-counted buffer handle
//!
//! A [`BufferHandle`] names one slot of one pool: it carries the owning
//! pool (an `Arc`, so the arena can never disappear underneath a live
//! handle) and the slot index. All window arithmetic is offset-based and
//! checked against the slot's fixed `[headroom|payload|tailroom]` region.
//!
//! The reference count is a caller protocol, exactly as in classic packet
//! stacks: [`retain`](BufferHandle::retain) mints an additional reference
//! and [`release`](BufferHandle::release) drops one, returning the slot to
//! its pool when the last reference goes away. Cloning a handle is a
//! pointer-like copy and does **not** retain.
//!
//! Handles may cross threads freely; releasing on any thread returns the
//! slot to the same pool. Callers that share one buffer across threads
//! must not write to it while another holder is reading: the pool hands
//! out views, it does not referee concurrent access to packet bytes.

use std::slice;
use std::sync::{atomic::Ordering, Arc, MutexGuard};

use crate::arena::NumaNode;

use super::{
    pool::{PoolCore, Slot},
    record::{BufferRecord, BufferState},
};

/// Handle to one reference-counted buffer slot.
#[derive(Debug, Clone)]
pub struct BufferHandle {
    pool: Arc<PoolCore>,
    index: u32,
}

impl BufferHandle {
    pub(super) fn new(pool: Arc<PoolCore>, index: u32) -> Self {
        Self { pool, index }
    }

    fn slot(&self) -> &Slot {
        &self.pool.slots[self.index as usize]
    }

    /// End of the slot's data region, relative to its start.
    fn region_size(&self) -> usize {
        self.pool.region_size
    }

    /// Take an additional reference and return a handle for it.
    ///
    /// Safe to call concurrently from any thread holding a live reference.
    pub fn retain(&self) -> BufferHandle {
        self.slot().ref_count.fetch_add(1, Ordering::Relaxed);
        self.clone()
    }

    /// Drop one reference. When the last reference goes away the window is
    /// reset, the record flips to [`BufferState::Released`], and the slot
    /// goes back to its owning pool.
    ///
    /// Releasing a buffer that is already back in the pool is misuse; the
    /// count saturates at zero and the free list is left untouched.
    pub fn release(&self) {
        let slot = self.slot();
        let mut current = slot.ref_count.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                debug_assert!(false, "buffer released past zero (slot {})", self.index);
                log::error!(
                    "release of an already-free buffer (slot {}), ignoring",
                    self.index
                );
                return;
            }
            match slot.ref_count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        if current == 1 {
            // Last reference: every prior holder's writes are visible here
            // through the acquire side of the decrement.
            {
                let mut window = slot.window.lock().unwrap();
                window.data_off = self.pool.headroom;
                window.data_len = 0;
                window.next = None;
            }
            slot.record.lock().unwrap().set_state(BufferState::Released);
            self.pool.deallocate_slot(self.index);
        }
    }

    /// Current reference count. Zero only for a slot back in its pool.
    pub fn ref_count(&self) -> u32 {
        self.slot().ref_count.load(Ordering::Relaxed)
    }

    /// The readable window of packet data.
    pub fn data(&self) -> &[u8] {
        let (off, len) = {
            let window = self.slot().window.lock().unwrap();
            (window.data_off, window.data_len)
        };
        // Window invariants keep off + len inside the slot's region.
        unsafe { slice::from_raw_parts(self.pool.region_ptr(self.index).add(off), len) }
    }

    /// The writable window of packet data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        let (off, len) = {
            let window = self.slot().window.lock().unwrap();
            (window.data_off, window.data_len)
        };
        unsafe { slice::from_raw_parts_mut(self.pool.region_ptr(self.index).add(off), len) }
    }

    /// Current length of the data window.
    pub fn data_len(&self) -> usize {
        self.slot().window.lock().unwrap().data_len
    }

    /// Set the window length to `len`, silently clamped to the space left
    /// between the window start and the region end. This clamp is the
    /// designed behavior, not a failure: callers that need to know the
    /// effective length re-read [`data_len`](BufferHandle::data_len).
    pub fn set_data_len(&self, len: usize) {
        let mut window = self.slot().window.lock().unwrap();
        let max = self.region_size() - window.data_off;
        window.data_len = len.min(max);
    }

    /// Grow the window backwards into the headroom, modeling an in-place
    /// header prepend: the window start moves back by `len` and the length
    /// grows by the same amount.
    ///
    /// Returns the `len` newly exposed bytes at the new window start, or
    /// `None` (with no state change) when the remaining dynamic headroom
    /// is smaller than `len`.
    pub fn reserve_headroom(&mut self, len: usize) -> Option<&mut [u8]> {
        let off = {
            let mut window = self.slot().window.lock().unwrap();
            if len > window.data_off {
                return None;
            }
            window.data_off -= len;
            window.data_len += len;
            window.data_off
        };
        Some(unsafe { slice::from_raw_parts_mut(self.pool.region_ptr(self.index).add(off), len) })
    }

    /// Grow the window forwards into the tailroom, modeling an in-place
    /// append: the length grows by `len`.
    ///
    /// Returns the `len` bytes at the old window end for the caller to
    /// write into, or `None` (with no state change) when the remaining
    /// dynamic tailroom is smaller than `len`.
    pub fn reserve_tailroom(&mut self, len: usize) -> Option<&mut [u8]> {
        let end = {
            let mut window = self.slot().window.lock().unwrap();
            let end = window.data_off + window.data_len;
            if len > self.pool.region_size - end {
                return None;
            }
            window.data_len += len;
            end
        };
        Some(unsafe { slice::from_raw_parts_mut(self.pool.region_ptr(self.index).add(end), len) })
    }

    /// Prepend `bytes` in place via the headroom. `None` if they don't fit.
    pub fn prepend(&mut self, bytes: &[u8]) -> Option<()> {
        self.reserve_headroom(bytes.len())?.copy_from_slice(bytes);
        Some(())
    }

    /// Append `bytes` in place via the tailroom. `None` if they don't fit.
    pub fn append(&mut self, bytes: &[u8]) -> Option<()> {
        self.reserve_tailroom(bytes.len())?.copy_from_slice(bytes);
        Some(())
    }

    /// Move the window start back to the configured-headroom boundary
    /// without touching the length (which is clamped only if the region
    /// end would otherwise be exceeded).
    pub fn reset_data_start(&self) {
        let mut window = self.slot().window.lock().unwrap();
        window.data_off = self.pool.headroom;
        let max = self.region_size() - window.data_off;
        if window.data_len > max {
            window.data_len = max;
        }
    }

    /// Configured payload capacity: the pool's size class, constant for
    /// the life of the slot.
    pub fn capacity(&self) -> usize {
        self.pool.payload_size
    }

    /// Headroom size the pool was configured with.
    pub fn headroom(&self) -> usize {
        self.pool.headroom
    }

    /// Tailroom size the pool was configured with.
    pub fn tailroom(&self) -> usize {
        self.pool.tailroom
    }

    /// Dynamic headroom still available for reservation.
    pub fn available_headroom(&self) -> usize {
        self.slot().window.lock().unwrap().data_off
    }

    /// Dynamic tailroom still available for reservation.
    pub fn available_tailroom(&self) -> usize {
        let window = self.slot().window.lock().unwrap();
        self.region_size() - (window.data_off + window.data_len)
    }

    /// NUMA node the slot's memory lives on, fixed at pool construction.
    pub fn numa_node(&self) -> NumaNode {
        self.pool.numa_node
    }

    /// Next buffer in a multi-segment chain, if any.
    pub fn next(&self) -> Option<BufferHandle> {
        self.slot().window.lock().unwrap().next.clone()
    }

    /// Link `next` as the following segment. Plain assignment: linking
    /// does not retain the linked buffer, and chain ownership stays with
    /// the caller.
    pub fn set_next(&self, next: Option<BufferHandle>) {
        self.slot().window.lock().unwrap().next = next;
    }

    /// Exclusive access to the attached attribute record.
    pub fn record(&self) -> MutexGuard<'_, BufferRecord> {
        self.slot().record.lock().unwrap()
    }
}

/// Two handles are equal when they name the same slot of the same pool.
impl PartialEq for BufferHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool) && self.index == other.index
    }
}

impl Eq for BufferHandle {}
