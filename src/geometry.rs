//! Geometry primitives shared by every navigation component.
//!
//! Angles are in degrees. Bearings are measured from the +Z axis (the
//! rover's forward direction), positive towards +X.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A point in world (or vehicle-relative) coordinates.
///
/// `y` is carried along for telemetry but ignored by 2-D navigation, which
/// works in the XZ plane.
#[derive(Clone, Copy, Debug, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    /// Create a location with all three components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a planar location (`y = 0`).
    pub const fn planar(x: f64, z: f64) -> Self {
        Self { x, y: 0.0, z }
    }

    /// Distance to another point in the XZ plane.
    #[inline]
    pub fn distance_xz(&self, other: &Location) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Distance from the origin in the XZ plane.
    #[inline]
    pub fn range(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    fn key_bits(&self) -> [u64; 3] {
        // Fold -0.0 into 0.0 so the two compare and hash alike
        [
            (self.x + 0.0).to_bits(),
            (self.y + 0.0).to_bits(),
            (self.z + 0.0).to_bits(),
        ]
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.key_bits() == other.key_bits()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_bits().hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Normalize an angle in degrees to (-180, 180].
///
/// In-range values are returned untouched. Non-finite input is returned as is.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() || (angle > -180.0 && angle <= 180.0) {
        return angle;
    }
    let a = angle.rem_euclid(360.0);
    if a > 180.0 { a - 360.0 } else { a }
}

/// Bearing from `from` to `to`, measured from +Z, in (-180, 180].
#[inline]
pub fn angle_to_point(from: &Location, to: &Location) -> f64 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    normalize_angle(dx.atan2(dz).to_degrees())
}
