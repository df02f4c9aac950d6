//! Autonomous waypoint navigation.
//!
//! - Queue: destinations shared with the operator console
//! - Mission: per-tick state machine (leg start, cancel, arrival, steering)
//! - Engine: mission worker thread with cancellation and join
//! - Command / events: outbound seams (drive commands, progress events)

mod command;
mod engine;
mod events;
mod mission;
mod queue;

pub use command::{ChannelCommandSink, CommandSink, DriveCommand};
pub use engine::{MissionHandle, NavigationEngine};
pub use events::{MissionEvent, MissionEvents, MissionLog, MissionLogEntry};
pub use mission::{MissionOutcome, MissionRunner, NavState, NavigatorConfig, TickOutcome};
pub use queue::DestinationQueue;
