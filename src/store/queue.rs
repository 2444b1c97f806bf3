//! Priority-ordered, dedup-by-id queue of write intents drained by the
//! writer thread.
//!
//! A `BinaryHeap` keyed by `(scheduled_at, seq)` gives earliest-first
//! ordering in O(log n); a side table of id -> (intent, seq) gives O(1)
//! dedup-aware enqueue. Heap entries whose `seq` no longer matches the side
//! table's current sequence for that id are stale and discarded lazily on
//! pop (spec's option (b) for supporting `remove_by_id` on a binary heap).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::clock::now_ms;
use crate::store::intent::WriteIntent;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeapKey {
    scheduled_at: u64,
    seq: u64,
    id: String,
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.scheduled_at, self.seq).cmp(&(other.scheduled_at, other.seq))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct QueueState {
    heap: BinaryHeap<Reverse<HeapKey>>,
    intents: HashMap<String, (WriteIntent, u64)>,
    next_seq: u64,
    shutting_down: bool,
}

impl QueueState {
    /// Drops stale heap entries and returns the id of the true earliest
    /// live intent, if any, without removing it.
    fn peek_live_id(&mut self) -> Option<String> {
        loop {
            let Reverse(top) = self.heap.peek()?.clone();
            match self.intents.get(&top.id) {
                Some((_, seq)) if *seq == top.seq => return Some(top.id.clone()),
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}

/// Shared, thread-safe write-intent queue with a condition variable the
/// writer thread waits on between drain passes.
pub struct WriteQueue {
    state: Mutex<QueueState>,
    cv: Condvar,
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteQueue {
    pub fn new() -> Self {
        WriteQueue {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                intents: HashMap::new(),
                next_seq: 0,
                shutting_down: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Enqueues `intent`, superseding any existing intent that shares its
    /// id, and wakes the writer thread.
    pub fn enqueue(&self, intent: WriteIntent) {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.heap.push(Reverse(HeapKey {
            scheduled_at: intent.scheduled_at,
            seq,
            id: intent.id.clone(),
        }));
        guard.intents.insert(intent.id.clone(), (intent, seq));
        drop(guard);
        self.cv.notify_all();
    }

    /// Cancels any pending intent with id `id`. Used e.g. when a `set`
    /// with no TTL cancels a previously scheduled `del`.
    pub fn remove_by_id(&self, id: &str) {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        guard.intents.remove(id);
    }

    /// Returns `(id, scheduled_at)` of the earliest live intent, if any.
    pub fn peek_earliest(&self) -> Option<(String, u64)> {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        let id = guard.peek_live_id()?;
        let scheduled_at = guard.intents.get(&id)?.0.scheduled_at;
        Some((id, scheduled_at))
    }

    /// Pops and returns the earliest live intent if one is due by `now` (or
    /// `force` is set, for shutdown drain), else returns `None` without
    /// consuming anything.
    pub fn pop_earliest_if_due(&self, now: u64, force: bool) -> Option<WriteIntent> {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        let id = guard.peek_live_id()?;
        let scheduled_at = guard.intents.get(&id)?.0.scheduled_at;
        if !force && scheduled_at > now {
            return None;
        }
        guard.heap.pop();
        guard.intents.remove(&id).map(|(intent, _)| intent)
    }

    /// Pops and returns *any* remaining live intent, ignoring schedule,
    /// for use while iterating a shutdown drain to completion.
    pub fn pop_any(&self) -> Option<WriteIntent> {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        let id = guard.peek_live_id()?;
        guard.heap.pop();
        guard.intents.remove(&id).map(|(intent, _)| intent)
    }

    pub fn is_empty(&self) -> bool {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        guard.peek_live_id().is_none()
    }

    pub fn len(&self) -> usize {
        let guard = self.state.lock().expect("write queue lock poisoned");
        guard.intents.len()
    }

    /// Flags the queue as shutting down and wakes the writer thread.
    pub fn shutdown(&self) {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        guard.shutting_down = true;
        drop(guard);
        self.cv.notify_all();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().expect("write queue lock poisoned").shutting_down
    }

    /// Blocks the writer thread until there is work to do: either the
    /// queue becomes non-empty, the earliest deadline arrives, or shutdown
    /// is signalled. Implements the wait-until-deadline-that-can-change
    /// loop with a spurious-wake guard.
    pub fn wait_for_work(&self) {
        let mut guard = self.state.lock().expect("write queue lock poisoned");
        loop {
            if guard.shutting_down {
                return;
            }
            match guard.peek_live_id() {
                None => {
                    guard = self
                        .cv
                        .wait_timeout(guard, Duration::from_millis(1000))
                        .expect("write queue lock poisoned")
                        .0;
                }
                Some(id) => {
                    let scheduled_at = guard.intents.get(&id).map(|(i, _)| i.scheduled_at).unwrap_or(0);
                    let now = now_ms();
                    if scheduled_at <= now {
                        return;
                    }
                    let wait_ms = scheduled_at - now;
                    let (next_guard, _timeout) = self
                        .cv
                        .wait_timeout(guard, Duration::from_millis(wait_ms))
                        .expect("write queue lock poisoned");
                    guard = next_guard;
                    // Re-check on wake: queue identity or deadline may have
                    // changed (spurious-wake guard), loop re-evaluates.
                    if guard.shutting_down {
                        return;
                    }
                    match guard.peek_live_id() {
                        Some(still_id) if still_id == id => {
                            if now_ms() >= scheduled_at {
                                return;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
