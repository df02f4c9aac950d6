//! Obstacles and the deduplicating obstacle store.
//!
//! The radar reports the same physical obstacle many times per session.
//! [`ObstacleStore`] collapses detections whose coordinates round to the same
//! hundredth into a single entry.

use std::collections::HashSet;

use crate::geometry::Location;

/// Where an obstacle reading came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObstacleSource {
    /// Polar reading: range and bearing (degrees from +Z)
    FromPolar { distance: f64, angle: f64 },
    /// Already resolved location
    FromWorld { location: Location },
}

/// An obstacle with its canonical location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    location: Location,
    source: ObstacleSource,
}

impl Obstacle {
    /// Obstacle at a resolved location.
    pub fn at(location: Location) -> Self {
        Self::from_source(ObstacleSource::FromWorld { location })
    }

    /// Obstacle from a range/bearing pair.
    pub fn from_polar(distance: f64, angle: f64) -> Self {
        Self::from_source(ObstacleSource::FromPolar { distance, angle })
    }

    pub fn from_source(source: ObstacleSource) -> Self {
        let location = match source {
            ObstacleSource::FromWorld { location } => location,
            ObstacleSource::FromPolar { distance, angle } => {
                let (sin, cos) = angle.to_radians().sin_cos();
                Location::planar(distance * sin, distance * cos)
            }
        };
        Self { location, source }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn source(&self) -> ObstacleSource {
        self.source
    }

    /// Deduplication key for this obstacle.
    pub fn key(&self) -> ObstacleKey {
        ObstacleKey::of(&self.location)
    }
}

/// Coordinates rounded to two decimals, stored as integer hundredths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObstacleKey {
    x: i64,
    z: i64,
}

impl ObstacleKey {
    pub fn of(location: &Location) -> Self {
        Self {
            x: hundredths(location.x),
            z: hundredths(location.z),
        }
    }
}

#[inline]
fn hundredths(v: f64) -> i64 {
    (v * 100.0).round() as i64
}

/// Set of unique obstacles seen during a session.
#[derive(Clone, Debug, Default)]
pub struct ObstacleStore {
    obstacles: Vec<Obstacle>,
    keys: HashSet<ObstacleKey>,
}

impl ObstacleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the obstacle unless one with the same key is known.
    ///
    /// Returns true when the obstacle was new.
    pub fn record(&mut self, obstacle: Obstacle) -> bool {
        if !self.keys.insert(obstacle.key()) {
            return false;
        }
        self.obstacles.push(obstacle);
        tracing::debug!("Unique obstacles so far: {}", self.obstacles.len());
        true
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.keys.contains(&ObstacleKey::of(location))
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Obstacles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    /// Copy of the known obstacles.
    pub fn snapshot(&self) -> Vec<Obstacle> {
        self.obstacles.clone()
    }

    /// Forget everything (mission or radar restart).
    pub fn reset(&mut self) {
        self.obstacles.clear();
        self.keys.clear();
    }
}
