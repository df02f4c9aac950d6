//! Shared telemetry state.
//!
//! Written by the telemetry ingest path, read by the mission worker:
//! - Vehicle state (position, heading, energy, radar pose)
//! - Radar sweep buffer (vehicle-relative blips of the current sweep)
//! - Obstacle store (unique world-frame obstacles for the session)
//!
//! Every reader gets a copy taken under the lock, never a live view.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::geometry::Location;
use crate::obstacle::{Obstacle, ObstacleStore};
use crate::radar::{RadarPoint, RadarPose, RadarSweep};
use crate::vehicle::{PositionUpdate, VehicleState, ensure_finite};

/// Result of recording one radar blip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlipOutcome {
    /// Blip in world coordinates
    pub world: Location,
    /// Whether the obstacle store had not seen it before
    pub is_new: bool,
}

/// Telemetry shared between ingest and navigation threads.
#[derive(Debug)]
pub struct Telemetry {
    vehicle: RwLock<VehicleState>,
    sweep: RwLock<RadarSweep>,
    store: RwLock<ObstacleStore>,
}

impl Telemetry {
    /// Create telemetry with an initial vehicle state.
    pub fn new(initial: VehicleState, radar_max_distance: f64) -> Self {
        Self {
            vehicle: RwLock::new(initial),
            sweep: RwLock::new(RadarSweep::new(radar_max_distance)),
            store: RwLock::new(ObstacleStore::new()),
        }
    }

    /// Apply a position sample. Malformed samples leave the state untouched.
    pub fn update_position(&self, update: PositionUpdate) -> Result<()> {
        if let Err(e) = update.validate() {
            tracing::warn!("Dropping position update: {}", e);
            return Err(e);
        }
        write(&self.vehicle).apply(&update);
        Ok(())
    }

    /// Start a new radar sweep at `pose`, discarding the previous sweep's blips.
    pub fn update_radar_pose(&self, pose: RadarPose) -> Result<()> {
        if let Err(e) = pose.validate() {
            tracing::warn!("Dropping radar pose: {}", e);
            return Err(e);
        }
        write(&self.vehicle).radar_pose = pose;
        write(&self.sweep).clear();
        Ok(())
    }

    /// Record a vehicle-relative blip of the current sweep.
    ///
    /// The blip is resolved to world coordinates with the current radar pose
    /// and offered to the obstacle store.
    pub fn record_radar_blip(&self, rel_x: f64, rel_z: f64) -> Result<BlipOutcome> {
        if let Err(e) = ensure_finite("blip x", rel_x).and(ensure_finite("blip z", rel_z)) {
            tracing::warn!("Dropping radar blip: {}", e);
            return Err(e);
        }

        let pose = read(&self.vehicle).radar_pose;
        let world = pose.to_world(rel_x, rel_z);

        write(&self.sweep).push(RadarPoint::new(rel_x, rel_z));
        let is_new = write(&self.store).record(Obstacle::at(world));

        Ok(BlipOutcome { world, is_new })
    }

    /// Copy of the current vehicle state.
    pub fn vehicle(&self) -> VehicleState {
        *read(&self.vehicle)
    }

    /// Vehicle-relative obstacles of the current sweep.
    pub fn sweep_obstacles(&self) -> Vec<Location> {
        read(&self.sweep)
            .points()
            .iter()
            .map(RadarPoint::as_location)
            .collect()
    }

    /// Current sweep points within radar range.
    pub fn filtered_points(&self) -> Vec<RadarPoint> {
        read(&self.sweep).filtered_points()
    }

    /// Copy of the unique world-frame obstacles.
    pub fn known_obstacles(&self) -> Vec<Obstacle> {
        read(&self.store).snapshot()
    }

    pub fn obstacle_count(&self) -> usize {
        read(&self.store).len()
    }

    /// Clear the sweep buffer and the obstacle store (radar restart).
    pub fn reset_radar(&self) {
        write(&self.sweep).clear();
        write(&self.store).reset();
        tracing::info!("Radar state reset");
    }

    pub fn set_arrived(&self, arrived: bool) {
        write(&self.vehicle).arrived = arrived;
    }

    pub fn set_auto_drive_active(&self, active: bool) {
        write(&self.vehicle).auto_drive_active = active;
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(VehicleState::default(), 200.0)
    }
}

// Writers only assign plain fields, so a poisoned lock still holds a usable value.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavError;

    fn sample(x: f64, z: f64, heading: f64) -> PositionUpdate {
        PositionUpdate {
            x,
            y: 0.0,
            z,
            heading,
            energy: 0.9,
            solar: 0.1,
        }
    }

    #[test]
    fn test_malformed_update_keeps_prior_state() {
        let telemetry = Telemetry::default();
        telemetry.update_position(sample(1.0, 2.0, 10.0)).unwrap();

        let bad = PositionUpdate {
            energy: f64::NAN,
            ..sample(50.0, 50.0, 0.0)
        };
        assert!(matches!(
            telemetry.update_position(bad),
            Err(NavError::MalformedTelemetry(_))
        ));

        let state = telemetry.vehicle();
        assert_eq!(state.position, Location::new(1.0, 0.0, 2.0));
        assert_eq!(state.heading, 10.0);
    }

    #[test]
    fn test_new_sweep_clears_buffer_but_not_store() {
        let telemetry = Telemetry::default();
        telemetry.update_radar_pose(RadarPose::new(0.0, 0.0, 0.0)).unwrap();
        telemetry.record_radar_blip(1.0, 2.0).unwrap();
        telemetry.record_radar_blip(3.0, 4.0).unwrap();
        assert_eq!(telemetry.sweep_obstacles().len(), 2);

        telemetry.update_radar_pose(RadarPose::new(5.0, 5.0, 0.0)).unwrap();
        assert!(telemetry.sweep_obstacles().is_empty());
        assert_eq!(telemetry.obstacle_count(), 2);
    }

    #[test]
    fn test_blip_uses_current_pose() {
        let telemetry = Telemetry::default();
        telemetry.update_radar_pose(RadarPose::new(10.0, 20.0, 0.0)).unwrap();
        let first = telemetry.record_radar_blip(1.0, 1.0).unwrap();
        assert_eq!(first.world, Location::planar(11.0, 21.0));
        assert!(first.is_new);

        let repeat = telemetry.record_radar_blip(1.0, 1.0).unwrap();
        assert!(!repeat.is_new);

        telemetry.update_radar_pose(RadarPose::new(0.0, 0.0, 0.0)).unwrap();
        let moved = telemetry.record_radar_blip(1.0, 1.0).unwrap();
        assert_eq!(moved.world, Location::planar(1.0, 1.0));
        assert!(moved.is_new);
    }

    #[test]
    fn test_bad_pose_and_blip_rejected() {
        let telemetry = Telemetry::default();
        assert!(
            telemetry
                .update_radar_pose(RadarPose::new(f64::INFINITY, 0.0, 0.0))
                .is_err()
        );
        assert!(telemetry.record_radar_blip(f64::NAN, 1.0).is_err());
        assert_eq!(telemetry.obstacle_count(), 0);
        assert_eq!(telemetry.vehicle().radar_pose, RadarPose::default());
    }

    #[test]
    fn test_reset_radar() {
        let telemetry = Telemetry::default();
        telemetry.record_radar_blip(1.0, 1.0).unwrap();
        telemetry.reset_radar();
        assert_eq!(telemetry.obstacle_count(), 0);
        assert!(telemetry.sweep_obstacles().is_empty());
    }
}
