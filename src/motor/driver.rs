// High-level motor driver for a ZLAC8015D base
//
// Wraps the register-level facade with the startup sequence and the
// readings the runtime publishes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fault::FaultFlags;
use super::kinematics::{body_to_wheel_rpm, WheelRpm};
use super::registers::OperatingMode;
use super::transport::{ModbusTransport, Result};
use super::zlac::Zlac8015d;

/// Default acceleration / deceleration ramps
pub const DEFAULT_ACCEL_MS: i32 = 500;
pub const DEFAULT_DECEL_MS: i32 = 500;

/// Ramp times applied during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampProfile {
    pub accel_ms: i32,
    pub decel_ms: i32,
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            accel_ms: DEFAULT_ACCEL_MS,
            decel_ms: DEFAULT_DECEL_MS,
        }
    }
}

/// One snapshot of the controller's measured state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelFeedback {
    pub rpm: WheelRpm,
    pub left_fault: u16,
    pub right_fault: u16,
    pub left_encoder: i32,
    pub right_encoder: i32,
}

impl WheelFeedback {
    pub fn left_faults(&self) -> FaultFlags {
        FaultFlags::from_bits_retain(self.left_fault)
    }

    pub fn right_faults(&self) -> FaultFlags {
        FaultFlags::from_bits_retain(self.right_fault)
    }

    pub fn has_fault(&self) -> bool {
        self.left_fault != 0 || self.right_fault != 0
    }
}

/// High-level driver for the two-wheel base
pub struct MotorDriver<T: ModbusTransport> {
    zlac: Zlac8015d<T>,
    ramps: RampProfile,
}

impl<T: ModbusTransport> MotorDriver<T> {
    pub fn new(transport: T) -> Self {
        Self::with_ramps(transport, RampProfile::default())
    }

    pub fn with_ramps(transport: T, ramps: RampProfile) -> Self {
        Self {
            zlac: Zlac8015d::new(transport),
            ramps,
        }
    }

    /// Initialize the controller for velocity control
    ///
    /// Clears latched alarms, releases torque, selects velocity mode,
    /// writes the ramp profile and re-applies torque.
    pub fn initialize(&mut self) -> Result<()> {
        info!("Initializing ZLAC8015D for velocity control ({:?})", self.ramps);

        let faults = self.zlac.get_fault_code()?;
        if faults != [0, 0] {
            warn!(
                "Latched faults before init: left={:?}, right={:?}; clearing",
                FaultFlags::from_raw(faults[0]).names(),
                FaultFlags::from_raw(faults[1]).names()
            );
            self.zlac.clear_alarm()?;
        }

        self.zlac.disable_motor()?;
        self.zlac.set_mode(OperatingMode::Velocity.into())?;
        self.zlac
            .set_accel_time(self.ramps.accel_ms, self.ramps.accel_ms)?;
        self.zlac
            .set_decel_time(self.ramps.decel_ms, self.ramps.decel_ms)?;
        self.zlac.enable_motor()?;

        info!("Motors initialized successfully");
        Ok(())
    }

    /// Send body velocity command to the base
    ///
    /// # Arguments
    /// * `x` - Forward velocity in m/s (positive = forward)
    /// * `theta` - Rotational velocity in deg/s (positive = counter-clockwise)
    pub fn set_body_velocity(&mut self, x: f32, theta: f32) -> Result<()> {
        self.set_wheel_rpm(body_to_wheel_rpm(x, theta))
    }

    pub fn set_wheel_rpm(&mut self, rpm: WheelRpm) -> Result<()> {
        debug!("Setting wheel RPM: left={}, right={}", rpm.left, rpm.right);
        self.zlac
            .set_rpm(i32::from(rpm.left), i32::from(rpm.right))
    }

    /// Command zero speed (torque stays applied)
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping motors");
        self.set_wheel_rpm(WheelRpm::zero())
    }

    /// Release torque (wheels spin freely)
    pub fn disable(&mut self) -> Result<()> {
        info!("Disabling motors");
        self.zlac.disable_motor()
    }

    pub fn emergency_stop(&mut self) -> Result<()> {
        warn!("Emergency stop");
        self.zlac.emergency_stop()
    }

    pub fn clear_alarm(&mut self) -> Result<()> {
        self.zlac.clear_alarm()
    }

    /// Read speed, faults and encoder counts (three transactions)
    pub fn feedback(&mut self) -> Result<WheelFeedback> {
        let rpm = self.zlac.get_rpm()?;
        let faults = self.zlac.get_fault_code()?;
        let encoders = self.zlac.get_encoder_count()?;

        Ok(WheelFeedback {
            rpm: rpm.into(),
            left_fault: faults[0] as u16,
            right_fault: faults[1] as u16,
            left_encoder: encoders[0],
            right_encoder: encoders[1],
        })
    }
}

impl<T: ModbusTransport> Drop for MotorDriver<T> {
    fn drop(&mut self) {
        // Try to stop motors when driver is dropped (safety measure)
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
