// Differential-drive inverse kinematics for a two-wheel base
// Converts body-frame velocities (x, theta) to left/right wheel RPM.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::registers::CMD_RPM_LIMIT;

/// Wheel configuration (8-inch hub motors)
pub const WHEEL_RADIUS: f32 = 0.1016; // meters
pub const TRACK_WIDTH: f32 = 0.40; // meters (distance between wheel contact points)

/// Default safety limit on commanded wheel speed
pub const MAX_RPM: i16 = 200;

/// Wheel speed commands for the two motors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelRpm {
    pub left: i16,
    pub right: i16,
}

impl WheelRpm {
    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

impl From<[i16; 2]> for WheelRpm {
    fn from(rpm: [i16; 2]) -> Self {
        Self::new(rpm[0], rpm[1])
    }
}

/// Convert linear wheel speed (m/s) to RPM, clamped to +/- max_rpm
fn mps_to_rpm(speed: f32, wheel_radius: f32, max_rpm: i16) -> i16 {
    let rpm = speed / (2.0 * PI * wheel_radius) * 60.0;
    let limit = i32::from(max_rpm).abs().min(CMD_RPM_LIMIT);
    (rpm.round() as i32).clamp(-limit, limit) as i16
}

/// Convert body-frame velocities to wheel RPM
///
/// # Arguments
/// * `x` - Forward velocity in m/s (positive = forward)
/// * `theta` - Rotational velocity in deg/s (positive = counter-clockwise)
pub fn body_to_wheel_rpm(x: f32, theta: f32) -> WheelRpm {
    body_to_wheel_rpm_with_params(x, theta, WHEEL_RADIUS, TRACK_WIDTH, MAX_RPM)
}

/// Convert body-frame velocities to wheel RPM with custom parameters
pub fn body_to_wheel_rpm_with_params(
    x: f32,
    theta: f32,
    wheel_radius: f32,
    track_width: f32,
    max_rpm: i16,
) -> WheelRpm {
    let theta_rad = theta * (PI / 180.0);
    let half_track = track_width / 2.0;

    // Tangential speed each wheel must add or shed to turn
    let left = x - theta_rad * half_track;
    let right = x + theta_rad * half_track;

    WheelRpm::new(
        mps_to_rpm(left, wheel_radius, max_rpm),
        mps_to_rpm(right, wheel_radius, max_rpm),
    )
}
