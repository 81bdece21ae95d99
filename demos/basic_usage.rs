// demos/basic_usage.rs
//! Basic usage of the object pool with a custom allocator.

use repool::prelude::*;

struct Message {
    seq: u64,
    body: Vec<u8>,
}

struct MessageAllocator {
    body_capacity: usize,
}

impl PoolAllocator<Message> for MessageAllocator {
    fn construct(&self) -> Result<Message> {
        Ok(Message {
            seq: 0,
            body: Vec::with_capacity(self.body_capacity),
        })
    }

    fn reset(&self, obj: &mut Message) {
        obj.seq = 0;
        obj.body.clear();
    }

    fn validate(&self, obj: &Message) -> bool {
        obj.body.capacity() >= self.body_capacity
    }
}

fn main() -> Result<()> {
    println!("=== Object Pool Basics ===\n");

    let pool = ObjectPool::new(
        PoolConfig {
            capacity: 8,
            shard_count: 2,
            queue_capacity: 16,
        },
        MessageAllocator {
            body_capacity: 4096,
        },
    )?;

    println!(
        "Pool created: capacity={}, shards={}",
        pool.capacity(),
        pool.shard_count()
    );

    // Acquire a few messages and fill them in.
    {
        let mut held = Vec::new();
        for seq in 1..=3u64 {
            let mut msg = pool.acquire().expect("pool has free objects");
            msg.seq = seq;
            msg.body.extend_from_slice(b"payload bytes");
            println!(
                "acquired seq={} at shard={} slot={}",
                msg.seq,
                msg.slot_addr().shard(),
                msg.slot_addr().index()
            );
            held.push(msg);
        }
        println!("in use: {}/{}", pool.used_count(), pool.capacity());
        // Messages are reset and returned when dropped.
    }

    println!("after release: {} in use", pool.used_count());

    // Resize the pool at runtime.
    pool.grow(4)?;
    println!("after grow(4): capacity={}", pool.capacity());
    pool.shrink(6)?;
    println!("after shrink(6): capacity={}", pool.capacity());

    let stats = pool.stats();
    println!(
        "\nstats: acquired={} released={} max_used={} grows={} shrinks={}",
        stats.acquire_count,
        stats.release_count,
        stats.max_used,
        stats.grow_count,
        stats.shrink_count
    );

    Ok(())
}
