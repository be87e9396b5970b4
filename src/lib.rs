//! # pktpool - Zero-Copy Packet Buffer Pools
//!
//! pktpool hands out reusable, reference-counted packet buffers from
//! fixed-capacity, size-classed pools, for high-throughput packet I/O
//! where per-packet heap allocation is unaffordable.
//!
//! ## Features
//!
//! - **Single-slab pools**: every buffer a pool will ever serve lives in
//!   one contiguous arena mapped at construction time
//! - **Headroom/tailroom protocol**: each buffer carries pre-reserved
//!   slack so protocol layers prepend and append headers in place
//! - **Reference counting**: explicit retain/release on an atomic
//!   counter; the last release returns the buffer to its pool
//! - **NUMA-aware routing**: pools are keyed by (node, size class) with
//!   a global fallback tier
//! - **Attached records**: per-buffer port/VLAN/timestamp attributes with
//!   a pool-driven lifecycle tag
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  PoolRegistry                    │
//! │   (node, size class) -> BufferPool, with the     │
//! │   NUMA_ANY tier as fallback                      │
//! ├──────────────────────────────────────────────────┤
//! │  BufferPool          │  BufferPool               │
//! │  arena + free list   │  arena + free list        │
//! │  ┌────────────────┐  │  ┌────────────────┐       │
//! │  │ slot 0..N      │  │  │ slot 0..N      │       │
//! │  │ [record|ctrl]  │  │  │ [record|ctrl]  │       │
//! │  │ [head|pay|tail]│  │  │ [head|pay|tail]│       │
//! │  └────────────────┘  │  └────────────────┘       │
//! └──────────┬───────────┴───────────┬───────────────┘
//!            ▼                       ▼
//!      BufferHandle            BufferHandle
//!      (retain/release,        (cross-thread, released
//!       window ops)             back to its own pool)
//! ```
//!
//! ## Example
//!
//! ```
//! use pktpool::{PoolConfig, PoolRegistry, NUMA_ANY};
//!
//! let registry = PoolRegistry::new();
//! registry
//!     .register_pool(NUMA_ANY, PoolConfig::new(2048, 64).with_headroom(128))
//!     .unwrap();
//!
//! let mut buf = registry.allocate(1500, NUMA_ANY).unwrap();
//! buf.append(b"payload").unwrap();
//! buf.prepend(b"hdr").unwrap();
//! assert_eq!(buf.data(), b"hdrpayload");
//! buf.release();
//! ```

pub mod arena;
pub mod buffers;
pub mod error;
pub mod registry;

// Main API re-exports
pub use arena::{Arena, NumaNode, NUMA_ANY};
pub use buffers::{BufferHandle, BufferPool, BufferRecord, BufferState, PoolConfig, PoolStats};
pub use error::{PoolError, Result};
pub use registry::PoolRegistry;

/// Default configuration constants
pub mod defaults {
    /// Default headroom reserved in front of each payload (bytes)
    pub const DEFAULT_HEADROOM: usize = 64;

    /// Default tailroom reserved after each payload (bytes)
    pub const DEFAULT_TAILROOM: usize = 0;

    /// Slot regions are aligned to this boundary within the arena
    pub const SLOT_ALIGN: usize = 64;
}
