//! Cancellable, rearmable deadline timers.
//!
//! [`TimerQueue`] holds explicit [`TimerHandle`]s rather than spawning
//! tasks: the owner polls it with the current time and gets back whatever
//! expired. Nothing fires on its own, so dropping the queue cancels
//! everything.

use revtree_core::Timestamp;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer<K> {
    handle: TimerHandle,
    deadline: Timestamp,
    key: K,
}

/// A set of pending deadlines, each carrying a key.
#[derive(Debug)]
pub struct TimerQueue<K> {
    timers: Vec<Timer<K>>,
    next_handle: u64,
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        TimerQueue {
            timers: Vec::new(),
            next_handle: 0,
        }
    }

    /// Schedules `key` to expire at `deadline`.
    pub fn schedule(&mut self, deadline: Timestamp, key: K) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.push(Timer {
            handle,
            deadline,
            key,
        });
        handle
    }

    /// Cancels a timer, returning its key if it was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<K> {
        let pos = self.timers.iter().position(|t| t.handle == handle)?;
        Some(self.timers.swap_remove(pos).key)
    }

    /// Moves a pending timer to a new deadline. Returns false if it already
    /// fired or was cancelled.
    pub fn rearm(&mut self, handle: TimerHandle, deadline: Timestamp) -> bool {
        match self.timers.iter_mut().find(|t| t.handle == handle) {
            Some(timer) => {
                timer.deadline = deadline;
                true
            }
            None => false,
        }
    }

    /// Removes and returns every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn pop_due(&mut self, now: Timestamp) -> Vec<(TimerHandle, K)> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.timers.len() {
            if self.timers[i].deadline <= now {
                due.push(self.timers.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|t| (t.deadline, t.handle));
        due.into_iter().map(|t| (t.handle, t.key)).collect()
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cancels everything. Returns how many timers were pending.
    pub fn clear(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_timers_pop_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(Timestamp(30), "c");
        q.schedule(Timestamp(10), "a");
        q.schedule(Timestamp(20), "b");
        q.schedule(Timestamp(99), "later");

        let due: Vec<_> = q.pop_due(Timestamp(30)).into_iter().map(|(_, k)| k).collect();
        assert_eq!(due, vec!["a", "b", "c"]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(Timestamp(99)));
    }

    #[test]
    fn rearm_pushes_deadline_back() {
        let mut q = TimerQueue::new();
        let h = q.schedule(Timestamp(10), ());
        assert!(q.rearm(h, Timestamp(50)));
        assert!(q.pop_due(Timestamp(10)).is_empty());
        assert_eq!(q.next_deadline(), Some(Timestamp(50)));
        assert_eq!(q.pop_due(Timestamp(50)).len(), 1);
        assert!(!q.rearm(h, Timestamp(60)));
    }

    #[test]
    fn cancel_returns_key_once() {
        let mut q = TimerQueue::new();
        let h = q.schedule(Timestamp(10), 7);
        assert_eq!(q.cancel(h), Some(7));
        assert_eq!(q.cancel(h), None);
        assert!(q.is_empty());
    }

    #[test]
    fn clear_cancels_everything() {
        let mut q = TimerQueue::new();
        q.schedule(Timestamp(1), ());
        q.schedule(Timestamp(2), ());
        assert_eq!(q.clear(), 2);
        assert_eq!(q.next_deadline(), None);
    }
}
