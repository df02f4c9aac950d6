//! Mission state machine.
//!
//! Walks the destination queue one tick at a time: announces each leg,
//! drops legs the operator cancelled, detects arrival and otherwise steers
//! towards the front destination through the obstacle avoidance fan.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::avoidance::{AvoidanceConfig, ObstacleAvoidance};
use crate::geometry::{Location, angle_to_point, normalize_angle};
use crate::telemetry::Telemetry;
use crate::vehicle::VehicleState;

use super::command::{CommandSink, DriveCommand};
use super::events::MissionEvents;
use super::queue::DestinationQueue;

/// Configuration for the navigation loop.
#[derive(Clone, Debug)]
pub struct NavigatorConfig {
    /// Loop interval
    pub tick: Duration,
    /// A destination is reached when strictly closer than this
    pub arrival_threshold: f64,
    /// Throttle while driving
    pub cruise_throttle: f64,
    /// Auxiliary channel value while driving
    pub aux: f64,
    /// Heading error beyond which a turn bias is applied (degrees)
    pub heading_deadband: f64,
    /// Magnitude of the turn bias (degrees)
    pub heading_bias: f64,
    /// Radius within which an obstacle suppresses the turn bias
    pub near_obstacle_radius: f64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            arrival_threshold: 3.0,
            cruise_throttle: 0.4,
            aux: 1.0,
            heading_deadband: 20.0,
            heading_bias: 5.0,
            near_obstacle_radius: 10.0,
        }
    }
}

/// Navigation state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavState {
    Idle,
    Driving(Location),
    Arrived(Location),
    Finished,
    Cancelled,
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// A drive command was emitted towards the front destination
    Drive(DriveCommand),
    /// The front destination was reached and popped
    Arrived(Location),
    /// The front destination was cancelled by the operator and dropped
    Skipped(Location),
    /// The queue is empty; the mission is over
    Finished,
}

/// How a mission ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissionOutcome {
    /// Queue drained
    Completed { reached: usize, cancelled: usize },
    /// Stopped early; `remaining` destinations were left in the queue
    Cancelled { remaining: usize },
}

/// Per-mission navigation state machine.
pub struct MissionRunner {
    config: NavigatorConfig,
    avoidance: ObstacleAvoidance,
    telemetry: Arc<Telemetry>,
    queue: Arc<DestinationQueue>,
    commands: Arc<dyn CommandSink>,
    events: Box<dyn MissionEvents>,
    state: NavState,
    /// Destination whose leg has been announced
    current: Option<Location>,
    leg_index: usize,
    reached: usize,
    cancelled: usize,
}

impl MissionRunner {
    pub fn new(
        config: NavigatorConfig,
        avoidance: AvoidanceConfig,
        telemetry: Arc<Telemetry>,
        queue: Arc<DestinationQueue>,
        commands: Arc<dyn CommandSink>,
        events: Box<dyn MissionEvents>,
    ) -> Self {
        Self {
            config,
            avoidance: ObstacleAvoidance::new(avoidance),
            telemetry,
            queue,
            commands,
            events,
            state: NavState::Idle,
            current: None,
            leg_index: 0,
            reached: 0,
            cancelled: 0,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Announce the mission and hand control to autonomous driving.
    pub fn start(&mut self) {
        let destinations = self.queue.len();
        tracing::info!("Starting mission with {} destinations", destinations);
        self.telemetry.set_arrived(false);
        self.telemetry.set_auto_drive_active(true);
        self.events.on_mission_started(destinations);
    }

    /// Run one iteration of the navigation loop.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(destination) = self.queue.front() else {
            self.finish();
            return TickOutcome::Finished;
        };

        if self.current != Some(destination) {
            self.leg_index += 1;
            self.current = Some(destination);
            self.state = NavState::Driving(destination);
            tracing::info!("Leg {}: driving to {}", self.leg_index, destination);
            self.events.on_destination_started(self.leg_index, destination);
        }

        if !self.queue.is_mission_active() && !self.queue.is_pending(&destination) {
            if self.queue.pop_if_front(&destination) {
                tracing::info!("Destination was manually removed: {}", destination);
                self.cancelled += 1;
                self.events.on_destination_cancelled(destination);
            }
            self.current = None;
            return TickOutcome::Skipped(destination);
        }

        let vehicle = self.telemetry.vehicle();
        let distance = vehicle.position.distance_xz(&destination);

        if distance < self.config.arrival_threshold {
            return self.complete_leg(destination, distance);
        }

        let obstacles = self.telemetry.sweep_obstacles();
        let command = self.steer(&vehicle, &destination, &obstacles);
        tracing::debug!(
            "tick: dist={:.2}, heading={:.1}°, obstacles={}, {}",
            distance,
            vehicle.heading,
            obstacles.len(),
            command
        );
        self.emit(command);
        TickOutcome::Drive(command)
    }

    /// Compute the drive command towards `destination`.
    pub fn steer(
        &self,
        vehicle: &VehicleState,
        destination: &Location,
        obstacles: &[Location],
    ) -> DriveCommand {
        let near = ObstacleAvoidance::near_obstacle(obstacles, self.config.near_obstacle_radius);
        let bearing = angle_to_point(&vehicle.position, destination);
        let angle_error = normalize_angle(bearing - vehicle.heading);

        let bias = if near {
            0.0
        } else if angle_error >= self.config.heading_deadband {
            self.config.heading_bias
        } else if angle_error <= -self.config.heading_deadband {
            -self.config.heading_bias
        } else {
            0.0
        };

        let turn = self.avoidance.correct_heading(bias, obstacles);
        DriveCommand::new(self.config.cruise_throttle, turn, self.config.aux)
    }

    /// Drive the queue to completion, or until `cancel` is raised.
    pub fn run(&mut self, cancel: &AtomicBool) -> MissionOutcome {
        self.start();

        loop {
            let tick_start = Instant::now();

            if cancel.load(Ordering::Acquire) {
                self.abort();
                return MissionOutcome::Cancelled {
                    remaining: self.queue.len(),
                };
            }

            match self.tick() {
                TickOutcome::Drive(_) => {
                    let elapsed = tick_start.elapsed();
                    if elapsed < self.config.tick {
                        std::thread::sleep(self.config.tick - elapsed);
                    }
                }
                TickOutcome::Arrived(_) | TickOutcome::Skipped(_) => {}
                TickOutcome::Finished => {
                    return MissionOutcome::Completed {
                        reached: self.reached,
                        cancelled: self.cancelled,
                    };
                }
            }
        }
    }

    /// Pop a reached destination. A destination the operator removed in the
    /// meantime is not counted as reached.
    fn complete_leg(&mut self, destination: Location, distance: f64) -> TickOutcome {
        self.current = None;
        if !self.queue.pop_if_front(&destination) {
            tracing::info!("Destination {} left the queue before arrival", destination);
            return TickOutcome::Skipped(destination);
        }

        self.reached += 1;
        self.state = NavState::Arrived(destination);
        tracing::info!("Arrived at {} (distance {:.2})", destination, distance);
        self.events.on_arrived(destination);
        self.emit_stop();
        self.telemetry.set_arrived(true);
        TickOutcome::Arrived(destination)
    }

    /// Stop mid-mission, leaving unreached destinations queued.
    pub fn abort(&mut self) {
        tracing::info!(
            "Mission cancelled with {} destinations remaining",
            self.queue.len()
        );
        self.emit_stop();
        self.release();
        self.state = NavState::Cancelled;
        self.events.on_mission_cancelled();
    }

    fn finish(&mut self) {
        if self.state == NavState::Finished {
            return;
        }
        tracing::info!(
            "Mission finished: {} reached, {} cancelled",
            self.reached,
            self.cancelled
        );
        self.events.on_mission_finished();
        self.emit_stop();
        self.release();
        self.state = NavState::Finished;
    }

    fn release(&self) {
        self.queue.set_mission_active(false);
        self.telemetry.set_auto_drive_active(false);
    }

    fn emit(&self, command: DriveCommand) {
        if let Err(e) = self.commands.send_drive(command) {
            tracing::warn!("Failed to send {}: {}", command, e);
        }
    }

    fn emit_stop(&self) {
        if let Err(e) = self.commands.send_stop() {
            tracing::warn!("Failed to send stop: {}", e);
        }
    }
}
