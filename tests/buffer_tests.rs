//! Tests for buffer handle semantics: reference counting, window
//! arithmetic, clamping, and chaining

use pktpool::{BufferPool, BufferState, PoolConfig, NUMA_ANY};

fn small_pool() -> BufferPool {
    // payload 100, headroom 32, tailroom 16 -> region of 148 bytes
    let config = PoolConfig::new(100, 4).with_headroom(32).with_tailroom(16);
    BufferPool::new(config, NUMA_ANY).unwrap()
}

#[test]
fn test_fresh_buffer_window() {
    let pool = small_pool();
    let buf = pool.allocate_buffer().unwrap();

    assert_eq!(buf.ref_count(), 1);
    assert_eq!(buf.data_len(), 0);
    assert_eq!(buf.data(), b"");
    assert_eq!(buf.capacity(), 100);
    assert_eq!(buf.headroom(), 32);
    assert_eq!(buf.tailroom(), 16);
    assert_eq!(buf.available_headroom(), 32);
    assert_eq!(buf.available_tailroom(), 116);
    buf.release();
}

#[test]
fn test_retain_release_ref_counting() {
    let pool = small_pool();
    let buf = pool.allocate_buffer().unwrap();
    assert_eq!(buf.ref_count(), 1);

    let second = buf.retain();
    assert_eq!(buf.ref_count(), 2);
    assert_eq!(second.ref_count(), 2);
    assert_eq!(buf, second);

    second.release();
    assert_eq!(buf.ref_count(), 1);
    // Not the last reference yet, so the slot stayed out of the pool.
    assert_eq!(pool.free_count(), 3);

    buf.release();
    assert_eq!(pool.free_count(), 4);
}

#[test]
fn test_clone_is_not_a_retain() {
    let pool = small_pool();
    let buf = pool.allocate_buffer().unwrap();

    let alias = buf.clone();
    assert_eq!(alias.ref_count(), 1);
    buf.release();
    assert_eq!(pool.free_count(), 4);
}

#[test]
fn test_reserve_headroom_moves_window_back() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();
    buf.set_data_len(10);

    let header = buf.reserve_headroom(8).unwrap();
    assert_eq!(header.len(), 8);
    header.copy_from_slice(b"abcdefgh");

    assert_eq!(buf.data_len(), 18);
    assert_eq!(buf.available_headroom(), 24);
    assert_eq!(&buf.data()[..8], b"abcdefgh");
    buf.release();
}

#[test]
fn test_reserve_headroom_failure_leaves_state_unchanged() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();
    buf.set_data_len(5);

    let before = (buf.available_headroom(), buf.data_len());
    assert!(buf.reserve_headroom(33).is_none());
    let after = (buf.available_headroom(), buf.data_len());
    assert_eq!(before, after);
    buf.release();
}

#[test]
fn test_reserve_tailroom_appends_at_old_end() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();
    buf.append(b"head").unwrap();

    let tail = buf.reserve_tailroom(4).unwrap();
    tail.copy_from_slice(b"tail");

    assert_eq!(buf.data(), b"headtail");
    assert_eq!(buf.available_tailroom(), 116 - 8);
    buf.release();
}

#[test]
fn test_reserve_tailroom_failure_leaves_state_unchanged() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();
    buf.set_data_len(100);

    // 16 bytes of dynamic tailroom remain; 17 must fail without effect.
    let before = (buf.available_tailroom(), buf.data_len());
    assert!(buf.reserve_tailroom(17).is_none());
    assert_eq!((buf.available_tailroom(), buf.data_len()), before);

    assert!(buf.reserve_tailroom(16).is_some());
    assert_eq!(buf.data_len(), 116);
    buf.release();
}

#[test]
fn test_set_data_len_clamps_silently() {
    let pool = small_pool();
    let buf = pool.allocate_buffer().unwrap();

    // From the fresh window start, payload + tailroom bytes fit.
    buf.set_data_len(buf.capacity() + 1000);
    assert_eq!(buf.data_len(), 116);

    buf.set_data_len(50);
    assert_eq!(buf.data_len(), 50);
    buf.release();
}

#[test]
fn test_clamp_law_without_tailroom() {
    let config = PoolConfig::new(128, 1).with_headroom(32).with_tailroom(0);
    let pool = BufferPool::new(config, NUMA_ANY).unwrap();
    let buf = pool.allocate_buffer().unwrap();

    buf.set_data_len(buf.capacity() + 1);
    assert_eq!(buf.data_len(), buf.capacity());
    buf.release();
}

#[test]
fn test_reset_data_start_keeps_length() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();

    buf.set_data_len(20);
    buf.reserve_headroom(10).unwrap();
    assert_eq!(buf.available_headroom(), 22);
    assert_eq!(buf.data_len(), 30);

    buf.reset_data_start();
    assert_eq!(buf.available_headroom(), 32);
    assert_eq!(buf.data_len(), 30);
    buf.release();
}

#[test]
fn test_release_resets_window_and_record() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();

    buf.prepend(b"xy").unwrap();
    buf.record().set_ingress_port(9);
    buf.record().set_state(BufferState::InUse);
    buf.release();

    // The slot comes back with a fresh window but the record's opaque
    // fields survive reuse; only the state tag is pool-managed.
    let buf = pool.allocate_buffer().unwrap();
    assert_eq!(buf.data_len(), 0);
    assert_eq!(buf.available_headroom(), 32);
    assert_eq!(buf.record().state(), BufferState::Allocated);
    assert_eq!(buf.record().ingress_port(), 9);
    buf.release();
}

#[test]
fn test_prepend_append_compose() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();

    buf.append(b"payload").unwrap();
    buf.prepend(b"ip:").unwrap();
    buf.prepend(b"eth:").unwrap();
    assert_eq!(buf.data(), b"eth:ip:payload");

    // Headroom is 32; a 30-byte prepend no longer fits after 7 were used.
    assert!(buf.prepend(&[0u8; 30]).is_none());
    assert_eq!(buf.data(), b"eth:ip:payload");
    buf.release();
}

#[test]
fn test_data_mut_round_trip() {
    let pool = small_pool();
    let mut buf = pool.allocate_buffer().unwrap();
    buf.set_data_len(4);
    buf.data_mut().copy_from_slice(b"wxyz");
    assert_eq!(buf.data(), b"wxyz");
    buf.release();
}

#[test]
fn test_chaining_is_plain_get_set() {
    let pool = small_pool();
    let first = pool.allocate_buffer().unwrap();
    let second = pool.allocate_buffer().unwrap();

    assert!(first.next().is_none());
    first.set_next(Some(second.clone()));

    let linked = first.next().unwrap();
    assert_eq!(linked, second);
    // Linking did not retain the second buffer.
    assert_eq!(second.ref_count(), 1);

    first.set_next(None);
    assert!(first.next().is_none());

    second.release();
    first.release();
}

#[test]
fn test_chain_link_cleared_on_release() {
    let pool = small_pool();
    let first = pool.allocate_buffer().unwrap();
    let second = pool.allocate_buffer().unwrap();

    first.set_next(Some(second.clone()));
    first.release();

    let reused = pool.allocate_buffer().unwrap();
    assert!(reused.next().is_none());

    reused.release();
    second.release();
}

#[test]
fn test_numa_affinity_is_immutable_per_buffer() {
    let pool = BufferPool::new(PoolConfig::new(64, 2), 0).unwrap();
    let buf = pool.allocate_buffer().unwrap();
    assert_eq!(buf.numa_node(), 0);
    buf.release();

    let buf = pool.allocate_buffer().unwrap();
    assert_eq!(buf.numa_node(), 0);
    buf.release();
}
