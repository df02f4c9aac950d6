//! Configuration loading for RoverNav

use crate::avoidance::AvoidanceConfig;
use crate::error::{NavError, Result};
use crate::geometry::Location;
use crate::navigation::NavigatorConfig;
use crate::sim::SimConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RoverConfig {
    #[serde(default)]
    pub navigation: NavigationSection,
    #[serde(default)]
    pub avoidance: AvoidanceSection,
    #[serde(default)]
    pub radar: RadarSection,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Navigation loop settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NavigationSection {
    /// Loop interval in milliseconds (default: 50)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Arrival distance (default: 3.0)
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f64,

    /// Throttle while driving (default: 0.4)
    #[serde(default = "default_cruise_throttle")]
    pub cruise_throttle: f64,

    /// Auxiliary channel value (default: 1.0)
    #[serde(default = "default_aux")]
    pub aux: f64,

    /// Heading error that triggers a turn bias, degrees (default: 20)
    #[serde(default = "default_heading_deadband")]
    pub heading_deadband_deg: f64,

    /// Turn bias magnitude, degrees (default: 5)
    #[serde(default = "default_heading_bias")]
    pub heading_bias_deg: f64,

    /// Obstacles inside this radius suppress the turn bias (default: 10.0)
    #[serde(default = "default_near_obstacle_radius")]
    pub near_obstacle_radius: f64,

    /// Outbound drive command buffer (default: 64)
    #[serde(default = "default_command_channel_capacity")]
    pub command_channel_capacity: usize,

    /// How long a stop waits for room in a full command channel (default: 1000)
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

/// Obstacle avoidance fan
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AvoidanceSection {
    #[serde(default = "default_safe_distance")]
    pub safe_distance: f64,

    #[serde(default = "default_cone_width")]
    pub cone_width_deg: f64,

    #[serde(default = "default_angle_step")]
    pub angle_step_deg: f64,

    #[serde(default = "default_angle_limit")]
    pub angle_limit_deg: f64,
}

/// Radar settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RadarSection {
    /// Sweep points beyond this range are filtered (default: 200.0)
    #[serde(default = "default_radar_max_distance")]
    pub max_distance: f64,
}

/// Kinematic simulator used by the demo binary
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimulationSection {
    /// Speed at full throttle, units/s (default: 10.0)
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    /// Heading rate per degree of steering, 1/s (default: 8.0)
    #[serde(default = "default_steer_rate")]
    pub steer_rate: f64,

    #[serde(default)]
    pub start_x: f64,

    #[serde(default)]
    pub start_z: f64,

    /// Degrees from +Z
    #[serde(default)]
    pub start_heading: f64,

    /// Energy used per second at full throttle (default: 0.002)
    #[serde(default = "default_energy_drain")]
    pub energy_drain: f64,

    /// Solar charge per second (default: 0.0005)
    #[serde(default = "default_solar_gain")]
    pub solar_gain: f64,

    /// Simulated radar range (default: 30.0)
    #[serde(default = "default_sim_radar_range")]
    pub radar_range: f64,

    /// World obstacles as `[x, z]` pairs
    #[serde(default)]
    pub obstacles: Vec<[f64; 2]>,
}

/// Logging settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Default filter directive when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for NavigationSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            arrival_threshold: default_arrival_threshold(),
            cruise_throttle: default_cruise_throttle(),
            aux: default_aux(),
            heading_deadband_deg: default_heading_deadband(),
            heading_bias_deg: default_heading_bias(),
            near_obstacle_radius: default_near_obstacle_radius(),
            command_channel_capacity: default_command_channel_capacity(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for AvoidanceSection {
    fn default() -> Self {
        Self {
            safe_distance: default_safe_distance(),
            cone_width_deg: default_cone_width(),
            angle_step_deg: default_angle_step(),
            angle_limit_deg: default_angle_limit(),
        }
    }
}

impl Default for RadarSection {
    fn default() -> Self {
        Self {
            max_distance: default_radar_max_distance(),
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            max_speed: default_max_speed(),
            steer_rate: default_steer_rate(),
            start_x: 0.0,
            start_z: 0.0,
            start_heading: 0.0,
            energy_drain: default_energy_drain(),
            solar_gain: default_solar_gain(),
            radar_range: default_sim_radar_range(),
            obstacles: Vec::new(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_tick_ms() -> u64 {
    50
}
fn default_arrival_threshold() -> f64 {
    3.0
}
fn default_cruise_throttle() -> f64 {
    0.4
}
fn default_aux() -> f64 {
    1.0
}
fn default_heading_deadband() -> f64 {
    20.0
}
fn default_heading_bias() -> f64 {
    5.0
}
fn default_near_obstacle_radius() -> f64 {
    10.0
}
fn default_command_channel_capacity() -> usize {
    64
}
fn default_stop_timeout_ms() -> u64 {
    1000
}

// Avoidance defaults
fn default_safe_distance() -> f64 {
    10.0
}
fn default_cone_width() -> f64 {
    10.0
}
fn default_angle_step() -> f64 {
    5.0
}
fn default_angle_limit() -> f64 {
    30.0
}

fn default_radar_max_distance() -> f64 {
    200.0
}

// Simulation defaults
fn default_max_speed() -> f64 {
    10.0
}
fn default_steer_rate() -> f64 {
    8.0
}
fn default_energy_drain() -> f64 {
    0.002
}
fn default_solar_gain() -> f64 {
    0.0005
}
fn default_sim_radar_range() -> f64 {
    30.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RoverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: RoverConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("{} not found, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn navigator_config(&self) -> NavigatorConfig {
        let nav = &self.navigation;
        NavigatorConfig {
            tick: Duration::from_millis(nav.tick_ms),
            arrival_threshold: nav.arrival_threshold,
            cruise_throttle: nav.cruise_throttle,
            aux: nav.aux,
            heading_deadband: nav.heading_deadband_deg,
            heading_bias: nav.heading_bias_deg,
            near_obstacle_radius: nav.near_obstacle_radius,
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation.stop_timeout_ms)
    }

    pub fn avoidance_config(&self) -> AvoidanceConfig {
        AvoidanceConfig {
            safe_distance: self.avoidance.safe_distance,
            cone_width: self.avoidance.cone_width_deg,
            angle_step: self.avoidance.angle_step_deg,
            angle_limit: self.avoidance.angle_limit_deg,
        }
    }

    /// Simulator parameters; one integration step per navigation tick.
    pub fn sim_config(&self) -> SimConfig {
        let sim = &self.simulation;
        SimConfig {
            max_speed: sim.max_speed,
            steer_rate: sim.steer_rate,
            dt: self.navigation.tick_ms as f64 / 1000.0,
            energy_drain: sim.energy_drain,
            solar_gain: sim.solar_gain,
            radar_range: sim.radar_range,
            ..SimConfig::default()
        }
    }

    pub fn world_obstacles(&self) -> Vec<Location> {
        self.simulation
            .obstacles
            .iter()
            .map(|[x, z]| Location::planar(*x, *z))
            .collect()
    }
}
