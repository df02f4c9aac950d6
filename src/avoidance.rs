//! Cone-based obstacle avoidance.
//!
//! Given a candidate turn angle and the obstacles of the current radar sweep
//! (vehicle-relative), finds the nearest angle whose cone is clear, trying
//! left before right at each step.
//!
//! ## Safety caveat
//!
//! When every angle in the search fan is blocked the candidate is returned
//! unchanged: the rover keeps driving into the obstacle rather than
//! stalling.

use crate::geometry::{Location, normalize_angle};

/// Fixed offset between the obstacle bearing (`atan2(z, x)`, from +X) and
/// the vehicle's forward axis.
const BEARING_OFFSET_DEG: f64 = 90.0;

/// Configuration for the heading corrector.
#[derive(Clone, Debug)]
pub struct AvoidanceConfig {
    /// Obstacles farther than this are ignored
    pub safe_distance: f64,
    /// Half-width of the blocking cone (degrees)
    pub cone_width: f64,
    /// Search increment (degrees)
    pub angle_step: f64,
    /// Maximum deviation from the candidate (degrees)
    pub angle_limit: f64,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            safe_distance: 10.0,
            cone_width: 10.0,
            angle_step: 5.0,
            angle_limit: 30.0,
        }
    }
}

/// Heading corrector.
#[derive(Clone, Debug, Default)]
pub struct ObstacleAvoidance {
    config: AvoidanceConfig,
}

impl ObstacleAvoidance {
    pub fn new(config: AvoidanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    /// Return the first clear angle in the fan around `candidate`.
    pub fn correct_heading(&self, candidate: f64, obstacles: &[Location]) -> f64 {
        if !self.in_path(candidate, obstacles) {
            return candidate;
        }

        let step = self.config.angle_step;
        if step > 0.0 {
            let mut offset = step;
            while offset <= self.config.angle_limit {
                let left = normalize_angle(candidate - offset);
                if !self.in_path(left, obstacles) {
                    tracing::debug!(
                        "Path blocked at {:.1}°, steering left to {:.1}°",
                        candidate,
                        left
                    );
                    return left;
                }

                let right = normalize_angle(candidate + offset);
                if !self.in_path(right, obstacles) {
                    tracing::debug!(
                        "Path blocked at {:.1}°, steering right to {:.1}°",
                        candidate,
                        right
                    );
                    return right;
                }
                offset += step;
            }
        }

        tracing::warn!(
            "No clear heading within ±{:.0}° of {:.1}°, keeping course",
            self.config.angle_limit,
            candidate
        );
        candidate
    }

    /// Whether any obstacle within the safe distance lies in the cone at `angle`.
    pub fn in_path(&self, angle: f64, obstacles: &[Location]) -> bool {
        obstacles.iter().any(|o| {
            let distance = o.range();
            if distance > self.config.safe_distance {
                return false;
            }
            let obstacle_angle = normalize_angle(o.z.atan2(o.x).to_degrees());
            let diff = normalize_angle(obstacle_angle - angle - BEARING_OFFSET_DEG);
            let blocked = diff.abs() <= self.config.cone_width;
            if blocked {
                tracing::trace!(
                    "Obstacle at {:.2} units blocks {:.1}° (diff {:.1}°)",
                    distance,
                    angle,
                    diff
                );
            }
            blocked
        })
    }

    /// Whether any obstacle is within `radius` of the vehicle.
    pub fn near_obstacle(obstacles: &[Location], radius: f64) -> bool {
        obstacles.iter().any(|o| o.range() < radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avoidance() -> ObstacleAvoidance {
        ObstacleAvoidance::new(AvoidanceConfig::default())
    }

    #[test]
    fn test_no_obstacles_no_correction() {
        let a = avoidance();
        for candidate in [-30.0, -5.0, 0.0, 5.0, 42.0, 180.0] {
            assert_eq!(a.correct_heading(candidate, &[]), candidate);
        }
    }

    #[test]
    fn test_obstacle_dead_ahead() {
        let a = avoidance();
        let obstacles = [Location::planar(0.0, 5.0)];
        let corrected = a.correct_heading(0.0, &obstacles);
        assert_ne!(corrected, 0.0);
        assert!(corrected.abs() <= 30.0);
        assert_eq!(corrected % 5.0, 0.0);
        // Left is tried first
        assert_eq!(corrected, -15.0);
    }

    #[test]
    fn test_far_obstacle_ignored() {
        let a = avoidance();
        let obstacles = [Location::planar(0.0, 10.5)];
        assert_eq!(a.correct_heading(0.0, &obstacles), 0.0);
    }

    #[test]
    fn test_right_chosen_when_left_blocked() {
        let a = avoidance();
        // Left side heavily populated, right side free
        let obstacles: Vec<Location> = (-2..=40)
            .map(|deg| {
                let bearing = (90.0 - deg as f64).to_radians();
                Location::planar(5.0 * bearing.cos(), 5.0 * bearing.sin())
            })
            .collect();
        let corrected = a.correct_heading(0.0, &obstacles);
        assert_eq!(corrected, 15.0);
    }

    #[test]
    fn test_fully_blocked_keeps_candidate() {
        let a = avoidance();
        let obstacles: Vec<Location> = (0..360)
            .map(|deg| {
                let r = (deg as f64).to_radians();
                Location::planar(5.0 * r.cos(), 5.0 * r.sin())
            })
            .collect();
        assert_eq!(a.correct_heading(12.0, &obstacles), 12.0);
    }

    #[test]
    fn test_correction_never_exceeds_limit() {
        let a = avoidance();
        let obstacles = [
            Location::planar(0.0, 5.0),
            Location::planar(2.0, 6.0),
            Location::planar(-1.5, 4.0),
        ];
        for candidate in [-175.0, -90.0, -20.0, 0.0, 15.0, 90.0, 175.0, 180.0] {
            let corrected = a.correct_heading(candidate, &obstacles);
            assert!(normalize_angle(corrected - candidate).abs() <= 30.0 + 1e-9);
        }
    }

    #[test]
    fn test_near_obstacle_strict() {
        assert!(ObstacleAvoidance::near_obstacle(&[Location::planar(0.0, 9.99)], 10.0));
        assert!(!ObstacleAvoidance::near_obstacle(&[Location::planar(0.0, 10.0)], 10.0));
    }
}
