//! Vehicle state model.
//!
//! Holds the latest telemetry for the rover: position, heading, energy and
//! solar levels, and the radar pose used to interpret relative blips.

use crate::error::{NavError, Result};
use crate::geometry::{Location, normalize_angle};
use crate::radar::RadarPose;

/// Latest known state of the rover.
#[derive(Clone, Copy, Debug, Default)]
pub struct VehicleState {
    /// World position
    pub position: Location,
    /// Heading in degrees from +Z, normalized to (-180, 180]
    pub heading: f64,
    /// Battery level in [0, 1]
    pub energy: f64,
    /// Solar charge in [0, 1]
    pub solar_charge: f64,
    /// Sensor frame of the current radar sweep
    pub radar_pose: RadarPose,
    /// Set when the last destination was reached
    pub arrived: bool,
    /// Set while autonomous driving is in control
    pub auto_drive_active: bool,
}

impl VehicleState {
    /// Create a state at `position` facing `heading`.
    pub fn new(position: Location, heading: f64) -> Self {
        Self {
            position,
            heading: normalize_angle(heading),
            energy: 1.0,
            solar_charge: 0.0,
            ..Default::default()
        }
    }

    /// Overwrite the kinematic and energy fields from a telemetry update.
    pub fn apply(&mut self, update: &PositionUpdate) {
        self.position = Location::new(update.x, update.y, update.z);
        self.heading = normalize_angle(update.heading);
        self.energy = update.energy.clamp(0.0, 1.0);
        self.solar_charge = update.solar.clamp(0.0, 1.0);
    }
}

/// A position telemetry sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionUpdate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Heading in degrees
    pub heading: f64,
    pub energy: f64,
    pub solar: f64,
}

impl PositionUpdate {
    /// Check every field is a finite number.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("z", self.z),
            ("heading", self.heading),
            ("energy", self.energy),
            ("solar", self.solar),
        ];
        for (name, value) in fields {
            ensure_finite(name, value)?;
        }
        Ok(())
    }

    /// Parse `x y z heading energy solar` from textual fields.
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            x: parse_field(fields, 0, "x")?,
            y: parse_field(fields, 1, "y")?,
            z: parse_field(fields, 2, "z")?,
            heading: parse_field(fields, 3, "heading")?,
            energy: parse_field(fields, 4, "energy")?,
            solar: parse_field(fields, 5, "solar")?,
        })
    }
}

/// Parse the numeric field at `index`, rejecting missing, unparsable or
/// non-finite values.
pub fn parse_field(fields: &[&str], index: usize, name: &str) -> Result<f64> {
    let raw = fields
        .get(index)
        .ok_or_else(|| NavError::MalformedTelemetry(format!("missing field '{}'", name)))?;
    let value: f64 = raw.trim().parse().map_err(|_| {
        NavError::MalformedTelemetry(format!("field '{}' is not a number: {:?}", name, raw))
    })?;
    ensure_finite(name, value)?;
    Ok(value)
}

pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NavError::MalformedTelemetry(format!(
            "field '{}' is not finite: {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_fields() {
        let update =
            PositionUpdate::from_fields(&["168.53", "0.12", "-92.36", "79.96", "0.98", "0.00"])
                .unwrap();
        assert_eq!(update.x, 168.53);
        assert_eq!(update.z, -92.36);
        assert_eq!(update.heading, 79.96);
        assert_eq!(update.energy, 0.98);
    }

    #[test]
    fn test_parse_rejects_missing_and_garbage() {
        assert!(matches!(
            PositionUpdate::from_fields(&["1", "2", "3"]),
            Err(NavError::MalformedTelemetry(_))
        ));
        assert!(matches!(
            PositionUpdate::from_fields(&["1", "2", "abc", "4", "0.5", "0.5"]),
            Err(NavError::MalformedTelemetry(_))
        ));
        assert!(matches!(
            PositionUpdate::from_fields(&["1", "2", "NaN", "4", "0.5", "0.5"]),
            Err(NavError::MalformedTelemetry(_))
        ));
    }

    #[test]
    fn test_apply_normalizes_and_clamps() {
        let mut state = VehicleState::default();
        state.apply(&PositionUpdate {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            heading: 270.0,
            energy: 1.2,
            solar: -0.1,
        });
        assert_eq!(state.heading, -90.0);
        assert_eq!(state.energy, 1.0);
        assert_eq!(state.solar_charge, 0.0);
        assert_eq!(state.position, Location::new(1.0, 2.0, 3.0));
    }
}
