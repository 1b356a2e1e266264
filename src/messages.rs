// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::motor::kinematics::body_to_wheel_rpm_with_params;
use crate::motor::WheelRpm;

pub use crate::motor::WheelFeedback;

// Command from teleop/scripts -> runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseCommand {
    pub x_vel: f32,     // m/s
    pub theta_vel: f32, // deg/s
}

/// Geometry used to turn a `BaseCommand` into wheel speeds
#[derive(Debug, Clone, Copy)]
pub struct BaseGeometry {
    pub wheel_radius: f32,
    pub track_width: f32,
    pub max_rpm: i16,
}

impl Default for BaseGeometry {
    fn default() -> Self {
        use crate::motor::kinematics::{MAX_RPM, TRACK_WIDTH, WHEEL_RADIUS};
        Self {
            wheel_radius: WHEEL_RADIUS,
            track_width: TRACK_WIDTH,
            max_rpm: MAX_RPM,
        }
    }
}

impl BaseGeometry {
    pub fn wheel_rpm(&self, cmd: &BaseCommand) -> WheelRpm {
        body_to_wheel_rpm_with_params(
            cmd.x_vel,
            cmd.theta_vel,
            self.wheel_radius,
            self.track_width,
            self.max_rpm,
        )
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    MotorFault,
    BusError,
}
