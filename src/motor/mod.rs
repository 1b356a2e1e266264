// Motor control module for a ZLAC8015D dual-wheel base
//
// Provides:
// - ZLAC8015D register map and Modbus command encoding
// - Transport contract with RTU and loopback implementations
// - Differential-drive kinematics
// - High-level motor driver API

mod driver;
pub mod fault;
pub mod kinematics;
pub mod loopback;
pub mod registers;
pub mod rtu;
pub mod transport;
pub mod zlac;

pub use driver::{MotorDriver, RampProfile, WheelFeedback, DEFAULT_ACCEL_MS, DEFAULT_DECEL_MS};
pub use fault::FaultFlags;
pub use kinematics::{body_to_wheel_rpm, WheelRpm};
pub use loopback::LoopbackTransport;
pub use rtu::{RtuBus, RtuConfig, RtuTransport};
pub use transport::{ModbusTransport, TransportError};
pub use zlac::Zlac8015d;
