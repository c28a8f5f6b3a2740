//! Monotonic, wrap-safe packet id allocation.

use std::sync::atomic::{AtomicU32, Ordering};

/// Per-endpoint counter handing out `packet_id`s. Starts at 1 and wraps
/// modulo 2^32, skipping 0 (reserved for "no id").
#[derive(Debug, Default)]
pub struct PacketIdSource {
    next: AtomicU32,
}

impl PacketIdSource {
    pub fn new() -> Self {
        PacketIdSource {
            next: AtomicU32::new(1),
        }
    }

    /// Atomically allocate the next id.
    pub fn next(&self) -> u32 {
        loop {
            let current = self.next.fetch_add(1, Ordering::Relaxed);
            if current != 0 {
                return current;
            }
            // We landed on the reserved id after wraparound; the fetch_add
            // already advanced `next` past it, so just retry the load.
        }
    }
}
