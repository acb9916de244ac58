use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

// ============================================================================
// Timer Queue
// ============================================================================

/// Handle for a scheduled timer. Cancelling a handle whose timer already
/// fired (or was already cancelled) is a safe no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

struct Entry<O, T> {
    fire_at_ms: u64,
    /// Monotonic schedule id; doubles as the FIFO tie-break at one instant
    id: u64,
    owner: O,
    payload: T,
}

impl<O, T> PartialEq for Entry<O, T> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at_ms == other.fire_at_ms && self.id == other.id
    }
}

impl<O, T> Eq for Entry<O, T> {}

impl<O, T> PartialOrd for Entry<O, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<O, T> Ord for Entry<O, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Heap order: scheduled time, then schedule order (FIFO at the
        // same instant)
        (self.fire_at_ms, self.id).cmp(&(other.fire_at_ms, other.id))
    }
}

/// A deterministic deferred-event queue.
///
/// All simulation timing (spawn delays, transit delays, patience, day
/// length) goes through one of these instead of wall-clock timers, so a test
/// can drive the simulation to any instant with `advance_to`. Events fire in
/// non-decreasing scheduled-time order; events scheduled for the same
/// instant fire in schedule order.
pub struct TimerQueue<O, T> {
    heap: BinaryHeap<Reverse<Entry<O, T>>>,
    /// Timers scheduled and not yet fired or cancelled, keyed by id
    live: HashMap<u64, O>,
    next_id: u64,
}

impl<O: Clone + Eq + Hash, T> TimerQueue<O, T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule `payload` to fire at `fire_at_ms`
    pub fn schedule(&mut self, fire_at_ms: u64, owner: O, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;

        self.live.insert(id, owner.clone());
        self.heap.push(Reverse(Entry { fire_at_ms, id, owner, payload }));
        TimerHandle(id)
    }

    /// Cancel a single timer. No-op if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.live.remove(&handle.0);
    }

    /// Cancel every pending timer belonging to `owner`. No-op for owners
    /// with nothing pending.
    pub fn cancel_owner(&mut self, owner: &O) {
        self.live.retain(|_, o| &*o != owner);
    }

    /// Pop the next timer due at or before `now_ms`, along with its
    /// scheduled fire time. Cancelled entries are dropped silently. Callers
    /// that schedule follow-up timers while draining should use the returned
    /// fire time as their "now" so behavior is independent of tick cadence.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, T)> {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.fire_at_ms > now_ms {
                return None;
            }
            let Reverse(entry) = self.heap.pop().expect("peeked entry");
            if self.live.remove(&entry.id).is_some() {
                return Some((entry.fire_at_ms, entry.payload));
            }
        }
        None
    }

    /// Pop every timer due at or before `now_ms`, in firing order.
    /// Cancelled entries are dropped silently.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<T> {
        let mut fired = Vec::new();
        while let Some((_, payload)) = self.pop_due(now_ms) {
            fired.push(payload);
        }
        fired
    }

    /// Number of timers still pending
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// Whether any pending timer belongs to `owner`
    pub fn has_owner(&self, owner: &O) -> bool {
        self.live.values().any(|o| o == owner)
    }
}

impl<O: Clone + Eq + Hash, T> Default for TimerQueue<O, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Owner {
        Day,
        Customer(u32),
    }

    #[test]
    fn test_fires_in_time_order() {
        let mut queue: TimerQueue<Owner, &str> = TimerQueue::new();
        queue.schedule(300, Owner::Day, "c");
        queue.schedule(100, Owner::Day, "a");
        queue.schedule(200, Owner::Day, "b");

        assert_eq!(queue.advance_to(250), vec!["a", "b"]);
        assert_eq!(queue.advance_to(250), Vec::<&str>::new());
        assert_eq!(queue.advance_to(300), vec!["c"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_same_instant_fires_fifo() {
        let mut queue: TimerQueue<Owner, u32> = TimerQueue::new();
        for n in 0..5 {
            queue.schedule(100, Owner::Day, n);
        }
        assert_eq!(queue.advance_to(100), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut queue: TimerQueue<Owner, &str> = TimerQueue::new();
        let handle = queue.schedule(100, Owner::Customer(1), "patience");
        queue.schedule(100, Owner::Customer(2), "other");

        queue.cancel(handle);
        queue.cancel(handle); // already cancelled
        assert_eq!(queue.advance_to(100), vec!["other"]);
        queue.cancel(handle); // already fired window, still a no-op
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_cancel_owner_spares_others() {
        let mut queue: TimerQueue<Owner, &str> = TimerQueue::new();
        queue.schedule(50, Owner::Customer(1), "c1_browse");
        queue.schedule(60, Owner::Customer(1), "c1_patience");
        queue.schedule(70, Owner::Customer(2), "c2_browse");
        queue.schedule(80, Owner::Day, "day_end");

        queue.cancel_owner(&Owner::Customer(1));
        assert!(!queue.has_owner(&Owner::Customer(1)));
        assert!(queue.has_owner(&Owner::Customer(2)));

        assert_eq!(queue.advance_to(100), vec!["c2_browse", "day_end"]);

        // Cancelling an owner with nothing pending is fine
        queue.cancel_owner(&Owner::Customer(99));
    }
}
