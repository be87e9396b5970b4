//! Arena memory backing pool slots, with best-effort NUMA placement
//!
//! A pool owns exactly one [`Arena`]: a single anonymous mapping that holds
//! every slot's `[headroom|payload|tailroom]` region at a fixed stride. The
//! mapping never moves or resizes for the lifetime of the pool, which is
//! what makes the raw-slice views handed out by buffer handles sound.
//!
//! NUMA placement of the underlying pages is a host-environment service:
//! when a concrete node is requested on Linux, the mapping is bound with
//! `mbind(2)` before any page is touched. If binding is unavailable (no
//! NUMA support, non-Linux target, insufficient privileges) the arena
//! degrades to default placement; the pool contract does not depend on it.

use std::ptr::NonNull;

use memmap2::{MmapMut, MmapOptions};

use crate::error::{PoolError, Result};

/// NUMA node identifier. Non-negative values name a concrete node.
pub type NumaNode = i32;

/// The global/unspecified affinity tier. Pools registered under this node
/// serve as the fallback for requests no node-local pool can satisfy.
pub const NUMA_ANY: NumaNode = -1;

/// One contiguous anonymous mapping, fixed in size and address.
#[derive(Debug)]
pub struct Arena {
    map: MmapMut,
    base: NonNull<u8>,
    numa_node: NumaNode,
}

impl Arena {
    /// Map `len` bytes of anonymous memory, bound to `numa_node` when one
    /// is named. The mapping is zero-filled by the kernel.
    pub fn new(len: usize, numa_node: NumaNode) -> Result<Self> {
        if len == 0 {
            return Err(PoolError::invalid_parameter(
                "len",
                "arena length must be greater than 0",
            ));
        }

        let mut map = MmapOptions::new()
            .len(len)
            .map_anon()
            .map_err(|e| PoolError::memory(format!("mapping {} bytes failed: {}", len, e)))?;

        let base = NonNull::new(map.as_mut_ptr())
            .ok_or_else(|| PoolError::memory("anonymous mapping returned a null base"))?;

        let arena = Self {
            map,
            base,
            numa_node,
        };
        arena.bind_to_node();
        Ok(arena)
    }

    /// Total length of the mapping in bytes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the mapping is empty (never true for a constructed arena).
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The node this arena's memory was requested on, [`NUMA_ANY`] if none.
    pub fn numa_node(&self) -> NumaNode {
        self.numa_node
    }

    /// Base address of the mapping. Valid for `len()` bytes until drop.
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[cfg(target_os = "linux")]
    fn bind_to_node(&self) {
        const MASK_BITS: u32 = libc::c_ulong::BITS;

        if self.numa_node < 0 {
            return;
        }
        if self.numa_node as u32 >= MASK_BITS {
            log::debug!(
                "node {} exceeds the {}-bit bind mask, using default placement",
                self.numa_node,
                MASK_BITS
            );
            return;
        }

        // Bind before first touch so every page faults in on the node.
        let mask: libc::c_ulong = 1 << self.numa_node;
        let rc = unsafe {
            libc::syscall(
                libc::SYS_mbind,
                self.base.as_ptr() as *mut libc::c_void,
                self.map.len() as libc::c_ulong,
                libc::MPOL_BIND,
                &mask as *const libc::c_ulong,
                MASK_BITS as libc::c_ulong,
                0,
            )
        };
        if rc != 0 {
            log::debug!(
                "mbind to node {} unavailable ({}), using default placement",
                self.numa_node,
                std::io::Error::last_os_error()
            );
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn bind_to_node(&self) {
        if self.numa_node >= 0 {
            log::debug!(
                "NUMA binding not supported on this platform, node {} request ignored",
                self.numa_node
            );
        }
    }
}

// The raw base pointer aliases memory owned by `map`, which lives exactly
// as long as the Arena and is only ever dereferenced through slot-bounded
// views handed out by the owning pool.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}
