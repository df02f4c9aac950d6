//! Kinematic rover simulator.
//!
//! Integrates drive commands into a pose and publishes it as telemetry, so
//! the navigation loop can be exercised without the external simulator.
//! Also produces radar sweeps over a fixed set of world obstacles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::geometry::{Location, normalize_angle};
use crate::navigation::{CommandSink, DriveCommand};
use crate::radar::RadarPose;
use crate::telemetry::Telemetry;
use crate::vehicle::PositionUpdate;

/// Simulator parameters.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Speed at full throttle (units/s)
    pub max_speed: f64,
    /// Heading rate per degree of steering (1/s)
    pub steer_rate: f64,
    /// Integration step per received command (s)
    pub dt: f64,
    /// Energy used per second at full throttle
    pub energy_drain: f64,
    /// Solar charge gained per second
    pub solar_gain: f64,
    /// Radar detection range
    pub radar_range: f64,
    /// The rover stops short of obstacles closer than this
    pub collision_radius: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            steer_rate: 8.0,
            dt: 0.05,
            energy_drain: 0.002,
            solar_gain: 0.0005,
            radar_range: 30.0,
            collision_radius: 0.5,
        }
    }
}

/// Simulated rover pose and energy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimPose {
    pub x: f64,
    pub z: f64,
    /// Degrees from +Z
    pub heading: f64,
    pub energy: f64,
    pub solar: f64,
}

#[derive(Debug)]
struct SimState {
    pose: SimPose,
    obstacles: Vec<Location>,
    collisions: usize,
}

/// Rover simulator. Accepts drive commands as a [`CommandSink`].
#[derive(Debug)]
pub struct SimulatedRover {
    config: SimConfig,
    telemetry: Arc<Telemetry>,
    state: Mutex<SimState>,
}

impl SimulatedRover {
    /// Create a rover at `(x, z)` facing `heading` and publish its pose.
    pub fn new(
        config: SimConfig,
        telemetry: Arc<Telemetry>,
        x: f64,
        z: f64,
        heading: f64,
    ) -> Self {
        let rover = Self {
            config,
            telemetry,
            state: Mutex::new(SimState {
                pose: SimPose {
                    x,
                    z,
                    heading: normalize_angle(heading),
                    energy: 1.0,
                    solar: 0.0,
                },
                obstacles: Vec::new(),
                collisions: 0,
            }),
        };
        rover.publish(&rover.lock().pose);
        rover
    }

    /// Place world obstacles for the radar and collision checks.
    pub fn with_obstacles(self, obstacles: Vec<Location>) -> Self {
        self.lock().obstacles = obstacles;
        self
    }

    pub fn pose(&self) -> SimPose {
        self.lock().pose
    }

    pub fn collisions(&self) -> usize {
        self.lock().collisions
    }

    /// Integrate `command` for `dt` seconds and publish the new pose.
    ///
    /// Heading is updated before translation.
    pub fn step(&self, command: &DriveCommand, dt: f64) -> SimPose {
        let mut state = self.lock();
        let throttle = command.throttle.clamp(-1.0, 1.0);

        let turn_rate = command.turn * self.config.steer_rate;
        let heading = normalize_angle(state.pose.heading + turn_rate * dt);
        let distance = throttle * self.config.max_speed * dt;
        let (sin, cos) = heading.to_radians().sin_cos();
        let next = Location::planar(state.pose.x + distance * sin, state.pose.z + distance * cos);

        let collided = state
            .obstacles
            .iter()
            .any(|o| o.distance_xz(&next) < self.config.collision_radius);
        if collided {
            state.collisions += 1;
            tracing::debug!("Simulated collision at ({:.2}, {:.2})", next.x, next.z);
        } else {
            state.pose.x = next.x;
            state.pose.z = next.z;
        }
        state.pose.heading = heading;
        state.pose.energy = (state.pose.energy
            - throttle.abs() * self.config.energy_drain * dt
            + self.config.solar_gain * dt)
            .clamp(0.0, 1.0);
        state.pose.solar = (state.pose.solar + self.config.solar_gain * dt).clamp(0.0, 1.0);

        let pose = state.pose;
        drop(state);
        self.publish(&pose);
        pose
    }

    /// Run one radar sweep: announce the pose, then report a blip for every
    /// obstacle within range. Returns the number of blips.
    pub fn sweep(&self) -> usize {
        let state = self.lock();
        let pose = state.pose;
        let blips: Vec<(f64, f64)> = state
            .obstacles
            .iter()
            .filter(|o| o.distance_xz(&Location::planar(pose.x, pose.z)) <= self.config.radar_range)
            .map(|o| {
                let dx = o.x - pose.x;
                let dz = o.z - pose.z;
                let (sin, cos) = pose.heading.to_radians().sin_cos();
                (dx * cos - dz * sin, dx * sin + dz * cos)
            })
            .collect();
        drop(state);

        if self
            .telemetry
            .update_radar_pose(RadarPose::new(pose.x, pose.z, pose.heading))
            .is_err()
        {
            return 0;
        }
        blips
            .iter()
            .filter(|(rel_x, rel_z)| self.telemetry.record_radar_blip(*rel_x, *rel_z).is_ok())
            .count()
    }

    fn publish(&self, pose: &SimPose) {
        let update = PositionUpdate {
            x: pose.x,
            y: 0.0,
            z: pose.z,
            heading: pose.heading,
            energy: pose.energy,
            solar: pose.solar,
        };
        if let Err(e) = self.telemetry.update_position(update) {
            tracing::warn!("Simulator produced bad telemetry: {}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommandSink for SimulatedRover {
    fn send_drive(&self, command: DriveCommand) -> Result<()> {
        self.step(&command, self.config.dt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rover() -> (SimulatedRover, Arc<Telemetry>) {
        let telemetry = Arc::new(Telemetry::default());
        let rover =
            SimulatedRover::new(SimConfig::default(), Arc::clone(&telemetry), 0.0, 0.0, 0.0);
        (rover, telemetry)
    }

    #[test]
    fn test_straight_line() {
        let (rover, telemetry) = rover();
        for _ in 0..20 {
            rover.step(&DriveCommand::new(0.5, 0.0, 1.0), 0.1);
        }
        let pose = rover.pose();
        assert_relative_eq!(pose.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.z, 10.0, epsilon = 1e-9);
        assert_relative_eq!(telemetry.vehicle().position.z, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_positive_turn_increases_heading() {
        let (rover, _) = rover();
        let pose = rover.step(&DriveCommand::new(0.4, 5.0, 1.0), 0.05);
        assert_relative_eq!(pose.heading, 2.0, epsilon = 1e-9);
        assert!(pose.x > 0.0);
    }

    #[test]
    fn test_stop_holds_position() {
        let (rover, _) = rover();
        let before = rover.pose();
        rover.step(&DriveCommand::STOP, 0.05);
        let after = rover.pose();
        assert_eq!(before.x, after.x);
        assert_eq!(before.z, after.z);
    }

    #[test]
    fn test_sweep_reports_relative_blips() {
        let telemetry = Arc::new(Telemetry::default());
        let obstacles = vec![Location::planar(15.0, 10.0), Location::planar(500.0, 0.0)];
        let rover =
            SimulatedRover::new(SimConfig::default(), Arc::clone(&telemetry), 10.0, 10.0, 90.0)
                .with_obstacles(obstacles);

        assert_eq!(rover.sweep(), 1);
        // Facing +X, an obstacle 5 units along +X is dead ahead
        let relative = telemetry.sweep_obstacles();
        assert_relative_eq!(relative[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(relative[0].z, 5.0, epsilon = 1e-9);

        let known = telemetry.known_obstacles();
        assert_relative_eq!(known[0].location().x, 15.0, epsilon = 1e-9);
        assert_relative_eq!(known[0].location().z, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collision_blocks_translation() {
        let telemetry = Arc::new(Telemetry::default());
        let rover = SimulatedRover::new(SimConfig::default(), telemetry, 0.0, 0.0, 0.0)
            .with_obstacles(vec![Location::planar(0.0, 0.6)]);
        rover.step(&DriveCommand::new(0.4, 0.0, 1.0), 0.05);
        assert_eq!(rover.collisions(), 1);
        assert_eq!(rover.pose().z, 0.0);
    }
}
