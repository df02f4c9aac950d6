//! Mission progress events.
//!
//! The mission worker reports progress through [`MissionEvents`]. It never
//! waits on the sink, so implementations should return quickly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::geometry::Location;

/// Event sink for mission progress.
pub trait MissionEvents: Send {
    /// A mission over `destinations` targets has started.
    fn on_mission_started(&mut self, _destinations: usize) {}

    /// The worker began driving to the `index`-th destination (1-based).
    fn on_destination_started(&mut self, index: usize, location: Location);

    /// The destination was reached and removed from the queue.
    fn on_arrived(&mut self, location: Location);

    /// The destination was cancelled by the operator before it was reached.
    fn on_destination_cancelled(&mut self, _location: Location) {}

    /// The queue was drained.
    fn on_mission_finished(&mut self);

    /// The mission was stopped before the queue was drained.
    fn on_mission_cancelled(&mut self) {}
}

/// A mission progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum MissionEvent {
    Started { destinations: usize },
    DestinationStarted { index: usize, location: Location },
    Arrived { location: Location },
    DestinationCancelled { location: Location },
    Finished,
    Cancelled,
}

impl MissionEvent {
    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            Self::Started { destinations } => {
                format!("Starting AutoDrive sequence with {} destinations", destinations)
            }
            Self::DestinationStarted { index, location } => {
                format!("Destination {} : {}", index, location)
            }
            Self::Arrived { location } => format!("Status: Reached {}", location),
            Self::DestinationCancelled { location } => {
                format!("Destination was manually removed: {}", location)
            }
            Self::Finished => "All destinations reached successfully".to_string(),
            Self::Cancelled => "Mission stopped".to_string(),
        }
    }
}

/// A timestamped mission log line.
#[derive(Clone, Debug)]
pub struct MissionLogEntry {
    /// Time since the log was created
    pub elapsed: Duration,
    pub event: MissionEvent,
}

/// Mission log owned by a single mission.
///
/// Cloning yields another handle to the same log, so the owner can keep one
/// while the worker writes through the other.
#[derive(Clone, Debug)]
pub struct MissionLog {
    started: Instant,
    entries: Arc<Mutex<Vec<MissionLogEntry>>>,
}

impl MissionLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Copy of all entries so far.
    pub fn entries(&self) -> Vec<MissionLogEntry> {
        self.lock().clone()
    }

    /// Events in the order they were logged.
    pub fn events(&self) -> Vec<MissionEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// Status lines in the order they were logged.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.event.message()).collect()
    }

    /// Destinations of the logged mission in the order its legs started.
    ///
    /// This is the route a replay drives again.
    pub fn destinations(&self) -> Vec<Location> {
        self.lock()
            .iter()
            .filter_map(|e| match e.event {
                MissionEvent::DestinationStarted { location, .. } => Some(location),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, event: MissionEvent) {
        tracing::info!("{}", event.message());
        let entry = MissionLogEntry {
            elapsed: self.started.elapsed(),
            event,
        };
        self.lock().push(entry);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MissionLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MissionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionEvents for MissionLog {
    fn on_mission_started(&mut self, destinations: usize) {
        self.push(MissionEvent::Started { destinations });
    }

    fn on_destination_started(&mut self, index: usize, location: Location) {
        self.push(MissionEvent::DestinationStarted { index, location });
    }

    fn on_arrived(&mut self, location: Location) {
        self.push(MissionEvent::Arrived { location });
    }

    fn on_destination_cancelled(&mut self, location: Location) {
        self.push(MissionEvent::DestinationCancelled { location });
    }

    fn on_mission_finished(&mut self) {
        self.push(MissionEvent::Finished);
    }

    fn on_mission_cancelled(&mut self) {
        self.push(MissionEvent::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_handles_share_entries() {
        let log = MissionLog::new();
        let mut writer = log.clone();
        writer.on_mission_started(1);
        writer.on_destination_started(1, Location::planar(100.0, 0.0));
        writer.on_arrived(Location::planar(100.0, 0.0));
        writer.on_mission_finished();

        assert_eq!(log.len(), 4);
        assert_eq!(
            log.lines(),
            vec![
                "Starting AutoDrive sequence with 1 destinations".to_string(),
                "Destination 1 : (100, 0, 0)".to_string(),
                "Status: Reached (100, 0, 0)".to_string(),
                "All destinations reached successfully".to_string(),
            ]
        );
    }

    #[test]
    fn test_destinations_follow_leg_order() {
        let mut log = MissionLog::new();
        let first = Location::planar(0.0, 30.0);
        let second = Location::planar(5.0, 60.0);
        log.on_mission_started(2);
        log.on_destination_started(1, first);
        log.on_arrived(first);
        log.on_destination_started(2, second);
        log.on_destination_cancelled(second);
        log.on_mission_finished();

        assert_eq!(log.destinations(), vec![first, second]);
        assert!(MissionLog::new().destinations().is_empty());
    }

    #[test]
    fn test_entries_are_time_ordered() {
        let mut log = MissionLog::new();
        log.on_mission_started(2);
        log.on_mission_cancelled();
        let entries = log.entries();
        assert!(entries[0].elapsed <= entries[1].elapsed);
        assert_eq!(entries[1].event, MissionEvent::Cancelled);
    }
}
