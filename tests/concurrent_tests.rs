//! Concurrent stress tests: contended allocation, cross-thread release,
//! and shared-buffer reference counting

use std::{
    sync::{mpsc, Arc, Barrier},
    thread,
};

use pktpool::{BufferPool, PoolConfig, PoolRegistry, NUMA_ANY};

#[test]
fn stress_contended_allocate_release_conserves_units() {
    let pool = BufferPool::new(PoolConfig::new(256, 64), NUMA_ANY).unwrap();

    let thread_count = 4;
    let iterations = 500;
    let barrier = Arc::new(Barrier::new(thread_count));

    let mut workers = Vec::new();
    for _ in 0..thread_count {
        let pool = pool.clone();
        let barrier = barrier.clone();

        workers.push(thread::spawn(move || {
            barrier.wait();

            let mut served = 0u64;
            for i in 0..iterations {
                // Hold a small batch to create real contention.
                let batch: Vec<_> = (0..(i % 8 + 1))
                    .filter_map(|_| pool.allocate_buffer())
                    .collect();
                served += batch.len() as u64;
                for buf in batch {
                    buf.release();
                }
            }
            served
        }));
    }

    let total_served: u64 = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert!(total_served > 0);

    // Every unit came home.
    assert_eq!(pool.free_count(), 64);
    assert_eq!(pool.alloc_count(), total_served);
    assert_eq!(pool.dealloc_count(), total_served);
}

#[test]
fn test_release_on_another_thread_returns_to_same_pool() {
    let pool = BufferPool::new(PoolConfig::new(512, 4), NUMA_ANY).unwrap();

    let mut buf = pool.allocate_buffer().unwrap();
    buf.append(b"cross-thread").unwrap();

    let handle = thread::spawn(move || {
        assert_eq!(buf.data(), b"cross-thread");
        buf.release();
    });
    handle.join().unwrap();

    assert_eq!(pool.free_count(), 4);
    assert_eq!(pool.dealloc_count(), 1);
}

#[test]
fn test_shared_buffer_last_release_wins() {
    let pool = BufferPool::new(PoolConfig::new(128, 2), NUMA_ANY).unwrap();
    let buf = pool.allocate_buffer().unwrap();

    let holders = 8;
    let barrier = Arc::new(Barrier::new(holders));

    let mut workers = Vec::new();
    for _ in 0..holders {
        let reference = buf.retain();
        let barrier = barrier.clone();
        workers.push(thread::spawn(move || {
            barrier.wait();
            reference.release();
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    // The original reference is still live, so the slot stayed out.
    assert_eq!(buf.ref_count(), 1);
    assert_eq!(pool.free_count(), 1);

    buf.release();
    assert_eq!(pool.free_count(), 2);
}

#[test]
fn test_buffers_flow_through_channels() {
    let registry = Arc::new(PoolRegistry::new());
    registry
        .register_pool(NUMA_ANY, PoolConfig::new(256, 32).with_headroom(32))
        .unwrap();

    let (tx, rx) = mpsc::channel();

    let producer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let mut sent = 0;
            for i in 0..100u8 {
                if let Some(mut buf) = registry.allocate(200, NUMA_ANY) {
                    buf.append(&[i; 16]).unwrap();
                    buf.record().set_ingress_port(u16::from(i));
                    tx.send(buf).unwrap();
                    sent += 1;
                }
            }
            sent
        })
    };

    let consumer = thread::spawn(move || {
        let mut received = 0;
        while let Ok(buf) = rx.recv() {
            let port = buf.record().ingress_port();
            assert_eq!(buf.data(), &[port as u8; 16]);
            buf.release();
            received += 1;
        }
        received
    });

    let sent = producer.join().unwrap();
    let received = consumer.join().unwrap();
    assert_eq!(sent, received);
    assert!(sent > 0);

    let stats = registry.stats();
    assert_eq!(stats[0].1.free_count, 32);
}
