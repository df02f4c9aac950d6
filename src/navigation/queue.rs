//! Destination queue shared between the operator console and the mission worker.
//!
//! The console appends targets and cancels pending ones; the worker peeks and
//! pops the front. Every queued target also has a pending marker, which is
//! what the console removes on cancellation.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::geometry::Location;

use super::events::MissionLog;

#[derive(Debug, Default)]
struct QueueInner {
    destinations: VecDeque<Location>,
    pending: HashSet<Location>,
}

/// FIFO of destinations with pending markers.
#[derive(Debug, Default)]
pub struct DestinationQueue {
    inner: Mutex<QueueInner>,
    /// While set, the queue is committed and cancelled markers are ignored
    mission_active: AtomicBool,
}

impl DestinationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue pre-filled with `destinations`.
    pub fn from_destinations<I>(destinations: I) -> Self
    where
        I: IntoIterator<Item = Location>,
    {
        let queue = Self::new();
        for d in destinations {
            queue.enqueue(d);
        }
        queue
    }

    /// Queue to drive a logged mission again.
    ///
    /// The queue is committed: operator cancellations are ignored until the
    /// mission ends.
    pub fn replay(log: &MissionLog) -> Self {
        let queue = Self::from_destinations(log.destinations());
        queue.set_mission_active(true);
        queue
    }

    /// Append a destination and mark it pending.
    pub fn enqueue(&self, location: Location) {
        let mut inner = self.lock();
        inner.destinations.push_back(location);
        inner.pending.insert(location);
    }

    /// Withdraw the pending marker for `location`.
    ///
    /// The worker drops the destination once it reaches the front of the
    /// queue (within one tick if it is the leg in progress), unless the
    /// mission is active. Returns false if no such marker exists.
    pub fn cancel(&self, location: &Location) -> bool {
        self.lock().pending.remove(location)
    }

    /// Drop every destination and marker.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.destinations.clear();
        inner.pending.clear();
    }

    pub fn set_mission_active(&self, active: bool) {
        self.mission_active.store(active, Ordering::Release);
    }

    pub fn is_mission_active(&self) -> bool {
        self.mission_active.load(Ordering::Acquire)
    }

    pub fn front(&self) -> Option<Location> {
        self.lock().destinations.front().copied()
    }

    /// Remove and return the front destination together with its marker.
    pub fn pop_front(&self) -> Option<Location> {
        let mut inner = self.lock();
        let front = inner.destinations.pop_front()?;
        if !inner.destinations.contains(&front) {
            inner.pending.remove(&front);
        }
        Some(front)
    }

    /// Pop the front destination only if it is still `expected`.
    ///
    /// Guards against the operator editing the queue between a peek and a pop.
    pub fn pop_if_front(&self, expected: &Location) -> bool {
        let mut inner = self.lock();
        if inner.destinations.front() != Some(expected) {
            return false;
        }
        inner.destinations.pop_front();
        if !inner.destinations.contains(expected) {
            inner.pending.remove(expected);
        }
        true
    }

    /// Remove the first occurrence of `location`. Returns whether one was found.
    pub fn remove(&self, location: &Location) -> bool {
        let mut inner = self.lock();
        match inner.destinations.iter().position(|d| d == location) {
            Some(index) => {
                inner.destinations.remove(index);
                if !inner.destinations.contains(location) {
                    inner.pending.remove(location);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, location: &Location) -> bool {
        self.lock().pending.contains(location)
    }

    pub fn len(&self) -> usize {
        self.lock().destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().destinations.is_empty()
    }

    /// Copy of the queued destinations, front first.
    pub fn snapshot(&self) -> Vec<Location> {
        self.lock().destinations.iter().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = DestinationQueue::from_destinations([
            Location::planar(1.0, 1.0),
            Location::planar(2.0, 2.0),
        ]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_front(), Some(Location::planar(1.0, 1.0)));
        assert_eq!(queue.front(), Some(Location::planar(2.0, 2.0)));
    }

    #[test]
    fn test_pop_clears_marker() {
        let queue = DestinationQueue::from_destinations([Location::planar(1.0, 1.0)]);
        assert!(queue.is_pending(&Location::planar(1.0, 1.0)));
        queue.pop_front();
        assert!(!queue.is_pending(&Location::planar(1.0, 1.0)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_only_removes_marker() {
        let target = Location::planar(5.0, 5.0);
        let queue = DestinationQueue::from_destinations([target]);
        assert!(queue.cancel(&target));
        assert!(!queue.cancel(&target));
        assert!(!queue.is_pending(&target));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_if_front() {
        let a = Location::planar(1.0, 0.0);
        let b = Location::planar(2.0, 0.0);
        let queue = DestinationQueue::from_destinations([a, b]);
        assert!(!queue.pop_if_front(&b));
        assert!(queue.pop_if_front(&a));
        assert_eq!(queue.snapshot(), vec![b]);
    }

    #[test]
    fn test_remove_and_clear() {
        let a = Location::planar(1.0, 0.0);
        let b = Location::planar(2.0, 0.0);
        let queue = DestinationQueue::from_destinations([a, b]);
        assert!(queue.remove(&b));
        assert!(!queue.remove(&b));
        assert_eq!(queue.snapshot(), vec![a]);

        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.is_pending(&a));
    }

    #[test]
    fn test_replay_is_committed() {
        use crate::navigation::events::MissionEvents;

        let a = Location::planar(0.0, 30.0);
        let b = Location::planar(0.0, 60.0);
        let mut log = MissionLog::new();
        log.on_destination_started(1, a);
        log.on_arrived(a);
        log.on_destination_started(2, b);
        log.on_arrived(b);

        let queue = DestinationQueue::replay(&log);
        assert_eq!(queue.snapshot(), vec![a, b]);
        assert!(queue.is_mission_active());
        assert!(queue.is_pending(&a));
    }

    #[test]
    fn test_mission_active_flag() {
        let queue = DestinationQueue::new();
        assert!(!queue.is_mission_active());
        queue.set_mission_active(true);
        assert!(queue.is_mission_active());
    }
}
