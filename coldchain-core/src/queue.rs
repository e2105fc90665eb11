//! Lock-Free Event Queue
#![allow(unsafe_code)] // Required for the atomic ring buffer
//!
//! Bounded single-producer multiple-consumer ring used between the
//! ingestion side and pipeline workers. Telemetry gateways feed readings
//! from one receive loop; any number of workers may drain.
//!
//! The ring holds `N` slots (power of two) with atomic head/tail indexes.
//! The producer writes at `head` and publishes with a Release store;
//! consumers claim `tail` slots with a CAS loop. A full queue drops the
//! incoming event and counts it - alert-path consumers size queues so
//! that drops only occur under sustained overload, which the stats make
//! visible.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::events::Event;

/// Lock-free event queue with `N` slots (`N` must be a power of two).
pub struct EventQueue<const N: usize> {
    /// Ring buffer storage.
    buffer: UnsafeCell<[MaybeUninit<Event>; N]>,
    /// Next write position (producer owned).
    head: AtomicUsize,
    /// Next read position (consumer shared).
    tail: AtomicUsize,
    /// Queue statistics.
    stats: QueueStats,
}

/// Queue health counters, updated with relaxed ordering.
pub struct QueueStats {
    /// Total events pushed.
    pub pushed: AtomicU32,
    /// Total events popped.
    pub popped: AtomicU32,
    /// Events dropped because the queue was full.
    pub dropped: AtomicU32,
    /// Maximum queue depth seen.
    pub max_depth: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    fn update_max_depth(&self, current: u32) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }
}

impl<const N: usize> EventQueue<N> {
    /// Create a new empty queue. Usable in static context.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "queue capacity must be a power of 2");
        Self {
            buffer: UnsafeCell::new(unsafe { MaybeUninit::uninit().assume_init() }),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            stats: QueueStats::new(),
        }
    }

    /// Push an event (single producer). Returns false if the queue is full.
    ///
    /// ## Safety contract
    /// Only one thread may push at a time.
    pub fn push(&self, event: Event) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let next_head = (head + 1) & (N - 1);

        if next_head == self.tail.load(Ordering::Acquire) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // Sole producer: this slot is ours until the Release store below
        unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[head].write(event);
        }

        self.head.store(next_head, Ordering::Release);

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth(self.len() as u32);

        true
    }

    /// Pop an event (any consumer). Returns None if the queue is empty.
    pub fn pop(&self) -> Option<Event> {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);

            if tail == head {
                return None;
            }

            // Read before publishing the new tail: the producer treats
            // the slot as occupied until tail moves past it, so the
            // copy cannot be overwritten mid-read
            let event = unsafe {
                let buffer = &*self.buffer.get();
                ptr::read(&buffer[tail]).assume_init()
            };

            let next_tail = (tail + 1) & (N - 1);
            match self.tail.compare_exchange_weak(
                tail,
                next_tail,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.stats.popped.fetch_add(1, Ordering::Relaxed);
                    return Some(event);
                }
                Err(_) => {
                    // Another consumer claimed the slot; the winner
                    // keeps its copy, ours is dropped
                    drop(event);
                    core::hint::spin_loop();
                }
            }
        }
    }

    /// Current queue length.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);

        if head >= tail {
            head - tail
        } else {
            N - tail + head
        }
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Whether the queue is full.
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        ((head + 1) & (N - 1)) == tail
    }

    /// Queue statistics.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Drain all events from the queue.
    pub fn drain(&self) -> QueueDrain<'_, N> {
        QueueDrain { queue: self }
    }
}

// The atomics serialize all cross-thread access to the ring
unsafe impl<const N: usize> Send for EventQueue<N> {}
unsafe impl<const N: usize> Sync for EventQueue<N> {}

/// Iterator draining a queue.
pub struct QueueDrain<'a, const N: usize> {
    queue: &'a EventQueue<N>,
}

impl<'a, const N: usize> Iterator for QueueDrain<'a, N> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop()
    }
}
