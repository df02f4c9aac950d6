//! RoverNav - autonomous waypoint navigation for a simulated planetary rover
//!
//! # Architecture
//!
//! ```text
//! telemetry callbacks ──► Telemetry (vehicle state, radar sweep, obstacle store)
//!                              │
//! operator console ──► DestinationQueue
//!                              │
//!                     NavigationEngine ── mission thread (MissionRunner, 50 ms tick)
//!                              │
//!                  ObstacleAvoidance ──► CommandSink (DRIVE throttle turn aux)
//! ```
//!
//! - [`geometry`]: planar locations, angle normalization, bearings
//! - [`vehicle`]: latest rover pose and energy
//! - [`radar`]: radar pose and vehicle-to-world transform
//! - [`obstacle`]: de-duplicated world-frame obstacle store
//! - [`avoidance`]: heading correction through the avoidance fan
//! - [`navigation`]: destination queue, mission loop and worker thread
//! - [`sim`]: kinematic rover simulator for the demo and tests

pub mod avoidance;
pub mod config;
pub mod error;
pub mod geometry;
pub mod navigation;
pub mod obstacle;
pub mod radar;
pub mod sim;
pub mod telemetry;
pub mod vehicle;

pub use avoidance::{AvoidanceConfig, ObstacleAvoidance};
pub use config::RoverConfig;
pub use error::{NavError, Result};
pub use geometry::{Location, angle_to_point, normalize_angle};
pub use navigation::{
    ChannelCommandSink, CommandSink, DestinationQueue, DriveCommand, MissionEvent, MissionEvents,
    MissionHandle, MissionLog, MissionOutcome, MissionRunner, NavState, NavigationEngine,
    NavigatorConfig, TickOutcome,
};
pub use obstacle::{Obstacle, ObstacleSource, ObstacleStore};
pub use radar::{RadarPose, RadarSweep};
pub use sim::{SimConfig, SimulatedRover};
pub use telemetry::{BlipOutcome, Telemetry};
pub use vehicle::{PositionUpdate, VehicleState};
