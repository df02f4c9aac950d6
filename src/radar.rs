//! Radar frame handling.
//!
//! Blips arrive relative to the radar pose announced at the start of each
//! sweep. [`to_world`] maps them into world coordinates; [`RadarSweep`]
//! buffers the raw relative points of the sweep in progress.

use crate::error::Result;
use crate::geometry::Location;
use crate::vehicle::{ensure_finite, parse_field};

/// Sensor frame of a radar sweep: world position and orientation (degrees).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RadarPose {
    pub x: f64,
    pub z: f64,
    pub angle: f64,
}

impl RadarPose {
    pub const fn new(x: f64, z: f64, angle: f64) -> Self {
        Self { x, z, angle }
    }

    /// Check every field is a finite number.
    pub fn validate(&self) -> Result<()> {
        ensure_finite("radar x", self.x)?;
        ensure_finite("radar z", self.z)?;
        ensure_finite("radar angle", self.angle)
    }

    /// Parse `x z angle` from textual fields.
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            x: parse_field(fields, 0, "radar x")?,
            z: parse_field(fields, 1, "radar z")?,
            angle: parse_field(fields, 2, "radar angle")?,
        })
    }

    /// Transform a sensor-relative blip into world coordinates.
    #[inline]
    pub fn to_world(&self, rel_x: f64, rel_z: f64) -> Location {
        to_world(self, rel_x, rel_z)
    }
}

/// Rotate a relative blip by the pose angle, then translate by the pose
/// position. An angle of 0 is a pure translation.
pub fn to_world(pose: &RadarPose, rel_x: f64, rel_z: f64) -> Location {
    let theta = pose.angle.to_radians();
    let (sin, cos) = theta.sin_cos();
    Location::planar(
        pose.x + rel_x * cos + rel_z * sin,
        pose.z + rel_z * cos - rel_x * sin,
    )
}

/// Parse a `rel_x rel_z` blip from textual fields.
pub fn parse_blip_fields(fields: &[&str]) -> Result<RadarPoint> {
    Ok(RadarPoint::new(
        parse_field(fields, 0, "blip x")?,
        parse_field(fields, 1, "blip z")?,
    ))
}

/// A single raw radar detection, relative to the vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadarPoint {
    pub rel_x: f64,
    pub rel_z: f64,
}

impl RadarPoint {
    pub const fn new(rel_x: f64, rel_z: f64) -> Self {
        Self { rel_x, rel_z }
    }

    /// Distance from the vehicle.
    #[inline]
    pub fn range(&self) -> f64 {
        (self.rel_x * self.rel_x + self.rel_z * self.rel_z).sqrt()
    }

    /// The point as a vehicle-relative location.
    pub fn as_location(&self) -> Location {
        Location::planar(self.rel_x, self.rel_z)
    }
}

/// Blips of the sweep in progress. Cleared whenever a new sweep starts.
#[derive(Clone, Debug)]
pub struct RadarSweep {
    points: Vec<RadarPoint>,
    max_distance: f64,
}

impl RadarSweep {
    pub fn new(max_distance: f64) -> Self {
        Self {
            points: Vec::new(),
            max_distance,
        }
    }

    /// Drop all buffered points.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn push(&mut self, point: RadarPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All buffered points, including those out of range.
    pub fn points(&self) -> &[RadarPoint] {
        &self.points
    }

    /// Points within the maximum detection range.
    pub fn filtered_points(&self) -> Vec<RadarPoint> {
        self.points
            .iter()
            .filter(|p| p.range() <= self.max_distance)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_angle_is_translation() {
        let pose = RadarPose::new(12.5, -7.25, 0.0);
        let origin = to_world(&pose, 0.0, 0.0);
        assert_eq!(origin.x, 12.5);
        assert_eq!(origin.z, -7.25);

        let shifted = to_world(&pose, 3.0, 4.0);
        assert_eq!(shifted.x, 15.5);
        assert_eq!(shifted.z, -3.25);
    }

    #[test]
    fn test_quarter_turn() {
        // Facing +X: forward (+Z relative) maps to +X world
        let pose = RadarPose::new(0.0, 0.0, 90.0);
        let p = pose.to_world(0.0, 10.0);
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-9);

        let q = pose.to_world(10.0, 0.0);
        assert_relative_eq!(q.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(q.z, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_preserves_range() {
        let pose = RadarPose::new(0.0, 0.0, 37.0);
        let p = pose.to_world(3.0, 4.0);
        assert_relative_eq!(p.range(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sweep_filters_by_range() {
        let mut sweep = RadarSweep::new(200.0);
        sweep.push(RadarPoint::new(10.0, 10.0));
        sweep.push(RadarPoint::new(0.0, 200.0));
        sweep.push(RadarPoint::new(150.0, 150.0));
        assert_eq!(sweep.len(), 3);
        assert_eq!(sweep.filtered_points().len(), 2);

        sweep.clear();
        assert!(sweep.is_empty());
    }

    #[test]
    fn test_parse_pose_fields() {
        let pose = RadarPose::from_fields(&["1.5", "-2", "45"]).unwrap();
        assert_eq!(pose, RadarPose::new(1.5, -2.0, 45.0));
        assert!(RadarPose::from_fields(&["1.5", "x", "45"]).is_err());
        assert!(parse_blip_fields(&["1.0"]).is_err());
    }
}
