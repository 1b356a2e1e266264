// Timeouts, topics, motor configuration
use std::time::Duration;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Feedback is read every Nth tick (three Modbus reads per sample)
pub const FEEDBACK_EVERY_TICKS: u64 = 5;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_BASE: &str = "zlac/cmd/base"; // commands
pub const TOPIC_RT_WHEELS: &str = "zlac/rt/wheels"; // actuation
pub const TOPIC_FEEDBACK: &str = "zlac/state/feedback"; // measured wheel state
pub const TOPIC_HEALTH: &str = "zlac/state/health"; // health status

// Motor configuration
// Serial port of the USB/RS-485 adapter wired to the ZLAC8015D
pub const MOTOR_PORT: &str = "/dev/ttyUSB0";
