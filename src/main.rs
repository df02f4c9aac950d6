//! RoverNav demo - drives a simulated rover through a list of destinations
//!
//! Usage: `rover-nav [config.toml] [--goto x,z ...]`
//!
//! Two threads run alongside main:
//!
//! - **Mission Thread** (~20Hz): reads telemetry, steers, emits drive commands
//! - **Driver Thread**: receives drive commands from the channel, integrates
//!   them in the simulator and produces a radar sweep per step

use rover_nav::{
    ChannelCommandSink, CommandSink, DestinationQueue, DriveCommand, Location, MissionLog,
    MissionOutcome, NavError, NavigationEngine, Result, RoverConfig, SimulatedRover, Telemetry,
    VehicleState,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        RoverConfig::load(Path::new(&args[1]))?
    } else {
        RoverConfig::load_or_default(Path::new("rover.toml"))?
    };

    // Initialize logging; RUST_LOG overrides the configured level
    let directive = format!("rover_nav={}", config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| "rover_nav=info".parse().unwrap()),
            ),
        )
        .init();

    info!("RoverNav v{}", env!("CARGO_PKG_VERSION"));

    let destinations = parse_destinations(&args)?;
    info!("Planned destinations: {}", destinations.len());

    let sim = &config.simulation;
    let start = Location::planar(sim.start_x, sim.start_z);
    info!(
        "Start pose: {} heading {:.1}°, {} world obstacles",
        start,
        sim.start_heading,
        sim.obstacles.len()
    );

    let telemetry = Arc::new(Telemetry::new(
        VehicleState::new(start, sim.start_heading),
        config.radar.max_distance,
    ));
    let rover = Arc::new(
        SimulatedRover::new(
            config.sim_config(),
            Arc::clone(&telemetry),
            sim.start_x,
            sim.start_z,
            sim.start_heading,
        )
        .with_obstacles(config.world_obstacles()),
    );

    let (sink, commands) = ChannelCommandSink::with_stop_timeout(
        config.navigation.command_channel_capacity,
        config.stop_timeout(),
    );
    let shutdown = Arc::new(AtomicBool::new(false));
    let driver = spawn_driver(commands, Arc::clone(&rover), Arc::clone(&shutdown))?;

    let engine = NavigationEngine::new(
        config.navigator_config(),
        config.avoidance_config(),
        Arc::clone(&telemetry),
        Arc::new(sink),
    );

    let queue = Arc::new(DestinationQueue::from_destinations(destinations));
    let log = MissionLog::new();
    let mission = engine.run_mission(Arc::clone(&queue), Box::new(log.clone()))?;

    // Main thread: monitor progress
    let check_interval = Duration::from_millis(500);
    while !mission.is_finished() {
        thread::sleep(check_interval);
        let vehicle = telemetry.vehicle();
        info!(
            "Pose {} heading {:.1}°, energy {:.3}, {} obstacles known, {} destinations left",
            vehicle.position,
            vehicle.heading,
            vehicle.energy,
            telemetry.obstacle_count(),
            queue.len()
        );
        if driver.is_finished() {
            warn!("Driver thread exited unexpectedly");
            mission.cancel();
        }
    }

    let outcome = mission.join()?;
    shutdown.store(true, Ordering::Release);
    if let Err(e) = driver.join() {
        error!("Driver thread panicked: {:?}", e);
    }

    match outcome {
        MissionOutcome::Completed { reached, cancelled } => {
            info!("Mission complete: {} reached, {} cancelled", reached, cancelled)
        }
        MissionOutcome::Cancelled { remaining } => {
            warn!("Mission cancelled with {} destinations remaining", remaining)
        }
    }
    info!(
        "{} log entries, {} collisions, final pose {}",
        log.len(),
        rover.collisions(),
        telemetry.vehicle().position
    );

    info!("RoverNav finished");
    Ok(())
}

/// Destinations from `--goto x,z` arguments, or a default survey route.
fn parse_destinations(args: &[String]) -> Result<Vec<Location>> {
    let mut destinations = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg != "--goto" {
            continue;
        }
        let value = iter
            .next()
            .ok_or_else(|| NavError::Config("--goto needs an x,z value".to_string()))?;
        destinations.push(parse_point(value)?);
    }

    if destinations.is_empty() {
        destinations = vec![
            Location::planar(0.0, 60.0),
            Location::planar(40.0, 80.0),
            Location::planar(40.0, 20.0),
        ];
    }
    Ok(destinations)
}

fn parse_point(value: &str) -> Result<Location> {
    let (x, z) = value
        .split_once(',')
        .ok_or_else(|| NavError::Config(format!("Expected x,z but got '{}'", value)))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| NavError::Config(format!("Invalid coordinate '{}'", s)))
    };
    Ok(Location::planar(parse(x)?, parse(z)?))
}

/// Apply queued drive commands to the simulator until shutdown, then apply
/// whatever is still queued so the final stop reaches the rover.
fn spawn_driver(
    commands: Receiver<DriveCommand>,
    rover: Arc<SimulatedRover>,
    shutdown: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("driver".into())
        .spawn(move || {
            info!("Driver thread started");
            let apply = |command: DriveCommand| {
                if let Err(e) = rover.send_drive(command) {
                    warn!("Simulator rejected {}: {}", command, e);
                }
                rover.sweep();
            };

            let mut applied = 0usize;
            while !shutdown.load(Ordering::Acquire) {
                match commands.recv_timeout(Duration::from_millis(100)) {
                    Ok(command) => {
                        apply(command);
                        applied += 1;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            for command in commands.try_iter() {
                apply(command);
                applied += 1;
            }
            info!("Driver thread exited after {} commands", applied);
        })
        .map_err(|e| NavError::Thread(format!("failed to spawn driver thread: {}", e)))
}
