//! Basic usage example of the pktpool packet buffer allocator

use pktpool::{PoolConfig, PoolRegistry, Result, NUMA_ANY};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    println!("pktpool Packet Buffer Pool Example");
    println!("==================================");

    // Build the registry: three size classes on node 0 plus a global
    // fallback tier for requests no node-local class can satisfy.
    let registry = PoolRegistry::new();
    registry.configure_node(
        0,
        &[
            PoolConfig::new(128, 1024).with_headroom(32),
            PoolConfig::new(512, 512).with_headroom(64),
            PoolConfig::new(2048, 256).with_headroom(128).with_tailroom(64),
        ],
    )?;
    registry.configure_node(NUMA_ANY, &[PoolConfig::new(4096, 64).with_headroom(128)])?;

    println!("Registered {} pools", registry.pool_count());

    // Allocate a buffer for a 1400 byte frame, preferably on node 0.
    println!("\nAllocating a 1400 byte buffer on node 0...");
    let mut buf = registry
        .allocate(1400, 0)
        .expect("a 2048 byte class is registered");

    println!("  capacity:  {} bytes", buf.capacity());
    println!("  node:      {}", buf.numa_node());
    println!("  headroom:  {} bytes", buf.available_headroom());
    println!("  tailroom:  {} bytes", buf.available_tailroom());

    // Fill the payload, then push protocol headers on in place, the way
    // a protocol stack would: no copies, just window arithmetic.
    buf.append(b"application payload").unwrap();
    buf.prepend(b"[udp]").unwrap();
    buf.prepend(b"[ip]").unwrap();
    buf.prepend(b"[eth]").unwrap();

    println!("\nAfter in-place header pushes:");
    println!("  data ({} bytes): {:?}", buf.data_len(), String::from_utf8_lossy(buf.data()));
    println!("  headroom left: {} bytes", buf.available_headroom());

    // Stamp the attached record.
    {
        let mut record = buf.record();
        record.set_ingress_port(3);
        record.set_vlan_id(42);
        record.set_rx_timestamp(std::time::SystemTime::now());
    }

    // Hand the buffer to a second holder, then let both go.
    let second = buf.retain();
    println!("\nRetained: ref_count = {}", buf.ref_count());
    second.release();
    buf.release();

    // A request too large for node 0 falls back to the global tier.
    println!("\nAllocating 3000 bytes on node 0 (served by the global tier)...");
    let big = registry.allocate(3000, 0).expect("global 4096 class");
    println!("  capacity: {} bytes, node: {}", big.capacity(), big.numa_node());
    big.release();

    // A request nothing can satisfy is an ordinary None, not a panic.
    assert!(registry.allocate(100_000, 0).is_none());
    println!("\n100000 byte request: no matching pool (as expected)");

    println!("\nFinal pool statistics:");
    for (node, stats) in registry.stats() {
        println!("  node {:>2}: {}", node, stats.summary());
    }

    Ok(())
}
