//! Lock-free single-producer/single-consumer ring queue.
//!
//! The queue is the only handoff mechanism between the pipeline threads:
//! gateway → matching engine → publisher → snapshot synthesizer on the
//! exchange, and consumer → trade engine on the client. Each queue has
//! exactly one producer thread and one consumer thread; the type system
//! enforces this by splitting the ring into a non-clonable [`Producer`]
//! and [`Consumer`] pair.
//!
//! Synchronization protocol:
//! - the producer publishes a slot with a release store of the write
//!   cursor in [`Producer::commit_write`];
//! - the consumer observes it with an acquire load of the write cursor in
//!   [`Consumer::peek_read`];
//! - cursors are cache-padded so the two threads never false-share.
//!
//! The ring never blocks. Filling it up is a sizing bug, not a runtime
//! condition, and aborts the process.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Ring<T> {
    slots: Box<[UnsafeCell<T>]>,
    /// Index of the slot the producer writes next. Written by the
    /// producer only; release on commit.
    next_write: CachePadded<AtomicUsize>,
    /// Index of the slot the consumer reads next. Written by the
    /// consumer only.
    next_read: CachePadded<AtomicUsize>,
    /// Approximate element count, maintained alongside the cursors for
    /// `size()` and the overflow check.
    count: CachePadded<AtomicUsize>,
}

// The slots are plain UnsafeCells; the producer/consumer split plus the
// cursor protocol guarantees no slot is aliased mutably.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

/// Creates a bounded SPSC ring of `capacity` default-constructed slots
/// and returns its two endpoints.
///
/// `capacity` must exceed the peak burst between two consumer drains;
/// overflowing the ring aborts the process.
pub fn spsc_channel<T: Default>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity >= 2, "spsc queue capacity must be at least 2");
    let slots: Box<[UnsafeCell<T>]> = (0..capacity).map(|_| UnsafeCell::new(T::default())).collect();
    let ring = Arc::new(Ring {
        slots,
        next_write: CachePadded::new(AtomicUsize::new(0)),
        next_read: CachePadded::new(AtomicUsize::new(0)),
        count: CachePadded::new(AtomicUsize::new(0)),
    });
    (
        Producer { ring: Arc::clone(&ring) },
        Consumer { ring },
    )
}

/// Writing endpoint of an SPSC ring. Owned by exactly one thread.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

/// Reading endpoint of an SPSC ring. Owned by exactly one thread.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Returns the slot at the write cursor for in-place construction.
    /// The write is not visible to the consumer until
    /// [`commit_write`](Self::commit_write).
    ///
    /// Panics when the ring is full: overflow is a sizing invariant.
    pub fn reserve_write(&mut self) -> &mut T {
        let ring = &self.ring;
        assert!(
            ring.count.load(Ordering::Acquire) < ring.slots.len(),
            "spsc queue overflow: capacity {} exhausted",
            ring.slots.len()
        );
        let idx = ring.next_write.load(Ordering::Relaxed);
        // Sole producer: no other thread touches this slot until commit.
        unsafe { &mut *ring.slots[idx].get() }
    }

    /// Publishes the slot written after [`reserve_write`](Self::reserve_write),
    /// advancing the write cursor with release ordering.
    pub fn commit_write(&mut self) {
        let ring = &self.ring;
        let idx = ring.next_write.load(Ordering::Relaxed);
        let next = if idx + 1 == ring.slots.len() { 0 } else { idx + 1 };
        ring.next_write.store(next, Ordering::Release);
        ring.count.fetch_add(1, Ordering::Release);
    }

    /// Reserve, assign, and commit in one step.
    pub fn push(&mut self, value: T) {
        *self.reserve_write() = value;
        self.commit_write();
    }

    /// Approximate number of unconsumed elements.
    pub fn size(&self) -> usize {
        self.ring.count.load(Ordering::Relaxed)
    }
}

impl<T> Consumer<T> {
    /// Returns the slot at the read cursor, or `None` when the ring is
    /// empty. The slot stays valid until [`release_read`](Self::release_read).
    pub fn peek_read(&self) -> Option<&T> {
        let ring = &self.ring;
        let read = ring.next_read.load(Ordering::Relaxed);
        let write = ring.next_write.load(Ordering::Acquire);
        if read == write {
            return None;
        }
        // The acquire load above synchronizes with the producer's release
        // store, so the slot contents are fully written.
        Some(unsafe { &*ring.slots[read].get() })
    }

    /// Advances the read cursor past the slot returned by
    /// [`peek_read`](Self::peek_read).
    pub fn release_read(&mut self) {
        let ring = &self.ring;
        let idx = ring.next_read.load(Ordering::Relaxed);
        let next = if idx + 1 == ring.slots.len() { 0 } else { idx + 1 };
        ring.next_read.store(next, Ordering::Release);
        ring.count.fetch_sub(1, Ordering::Release);
    }

    /// Copies out the next element and releases its slot.
    pub fn pop(&mut self) -> Option<T>
    where
        T: Copy,
    {
        let value = *self.peek_read()?;
        self.release_read();
        Some(value)
    }

    /// Approximate number of unconsumed elements.
    pub fn size(&self) -> usize {
        self.ring.count.load(Ordering::Relaxed)
    }
}
