// ZLAC8015D register command encoder/decoder
//
// Each method maps one motor operation onto exactly one Modbus transaction.
// Arguments are saturated into the device's accepted ranges; there is no
// retry and no call-order enforcement. The recommended startup order is
// disable -> configure -> enable (see `MotorDriver::initialize`).

use tracing::debug;

use super::registers::{
    ControlCommand, PositionControlType, PositionStart, Register, CMD_RPM_LIMIT,
    FEEDBACK_RPM_SCALE, POS_RPM_MAX, POS_RPM_MIN, RAMP_MS_MAX, RAMP_MS_MIN,
};
use super::transport::{ModbusTransport, Result};

/// Dual-wheel ZLAC8015D controller
pub struct Zlac8015d<T> {
    transport: T,
}

impl<T: ModbusTransport> Zlac8015d<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn control(&mut self, command: ControlCommand) -> Result<()> {
        debug!("Control command: {:?}", command);
        self.transport
            .write_single_register(Register::Control.addr(), command.code())
    }

    /// Release torque from both wheels
    pub fn disable_motor(&mut self) -> Result<()> {
        self.control(ControlCommand::DownTime)
    }

    /// Apply torque; the wheels hold their commanded state
    pub fn enable_motor(&mut self) -> Result<()> {
        self.control(ControlCommand::Enable)
    }

    /// Halt both wheels immediately; the controller latches an alarm
    pub fn emergency_stop(&mut self) -> Result<()> {
        self.control(ControlCommand::EmergencyStop)
    }

    /// Reset latched faults so the controller accepts commands again
    pub fn clear_alarm(&mut self) -> Result<()> {
        self.control(ControlCommand::AlarmClear)
    }

    /// Write the operating mode register. The value is not validated:
    /// see `OperatingMode` for the codes the device understands.
    pub fn set_mode(&mut self, mode: u8) -> Result<()> {
        debug!("Set mode: {}", mode);
        self.transport
            .write_single_register(Register::OperatingMode.addr(), u16::from(mode))
    }

    /// Acceleration ramp per wheel in milliseconds, saturated to [0, 32767]
    pub fn set_accel_time(&mut self, left_ms: i32, right_ms: i32) -> Result<()> {
        let words = [ramp_word(left_ms), ramp_word(right_ms)];
        self.transport
            .write_multiple_registers(Register::LeftAccelTime.addr(), &words)
    }

    /// Deceleration ramp per wheel in milliseconds, saturated to [0, 32767]
    pub fn set_decel_time(&mut self, left_ms: i32, right_ms: i32) -> Result<()> {
        let words = [ramp_word(left_ms), ramp_word(right_ms)];
        self.transport
            .write_multiple_registers(Register::LeftDecelTime.addr(), &words)
    }

    /// Maximum speed in position mode, saturated to [1, 1000] RPM
    pub fn set_max_rpm_pos(&mut self, left_rpm: i32, right_rpm: i32) -> Result<()> {
        let words = [pos_rpm_word(left_rpm), pos_rpm_word(right_rpm)];
        self.transport
            .write_multiple_registers(Register::LeftMaxRpmPos.addr(), &words)
    }

    /// Velocity setpoint per wheel.
    ///
    /// The right wheel is mounted mirrored, so its value is negated before
    /// being saturated to [-3000, 3000]. Positive values on both wheels
    /// drive the cart forward.
    pub fn set_rpm(&mut self, left_rpm: i32, right_rpm: i32) -> Result<()> {
        let words = encode_rpm(left_rpm, right_rpm);
        debug!("Set RPM: left={}, right={} -> {:04X?}", left_rpm, right_rpm, words);
        self.transport
            .write_multiple_registers(Register::LeftCommandRpm.addr(), &words)
    }

    /// Measured wheel speed in whole RPM, `[left, right]`, right sign-corrected
    pub fn get_rpm(&mut self) -> Result<[i16; 2]> {
        let mut raw = [0u16; 2];
        self.transport
            .read_holding_registers(Register::LeftFeedbackRpm.addr(), &mut raw)?;
        Ok(decode_rpm(raw))
    }

    /// Raw fault words, `[left, right]`. See `FaultFlags` for the bit layout.
    pub fn get_fault_code(&mut self) -> Result<[i16; 2]> {
        let mut raw = [0u16; 2];
        self.transport
            .read_holding_registers(Register::LeftFault.addr(), &mut raw)?;
        Ok([raw[0] as i16, raw[1] as i16])
    }

    /// Encoder position counts, `[left, right]`
    pub fn get_encoder_count(&mut self) -> Result<[i32; 2]> {
        let mut raw = [0u16; 4];
        self.transport
            .read_holding_registers(Register::LeftFeedbackPosHigh.addr(), &mut raw)?;
        Ok(decode_encoder_counts(raw))
    }

    pub fn set_position_control_type(&mut self, kind: PositionControlType) -> Result<()> {
        self.transport
            .write_single_register(Register::PositionControlType.addr(), kind as u16)
    }

    /// Relative position target in encoder counts. The right wheel is
    /// negated for the same reason as in `set_rpm`.
    pub fn set_relative_position(&mut self, left_counts: i32, right_counts: i32) -> Result<()> {
        let [lh, ll] = split_i32(left_counts);
        let [rh, rl] = split_i32(right_counts.wrapping_neg());
        self.transport
            .write_multiple_registers(Register::LeftRelPosHigh.addr(), &[lh, ll, rh, rl])
    }

    /// Start a previously loaded position move
    pub fn start_position(&mut self, start: PositionStart) -> Result<()> {
        self.control(start.into())
    }
}

fn ramp_word(ms: i32) -> u16 {
    ms.clamp(RAMP_MS_MIN, RAMP_MS_MAX) as u16
}

fn pos_rpm_word(rpm: i32) -> u16 {
    rpm.clamp(POS_RPM_MIN, POS_RPM_MAX) as u16
}

/// Two's-complement command words, right wheel negated first
fn encode_rpm(left: i32, right: i32) -> [u16; 2] {
    let left = left.clamp(-CMD_RPM_LIMIT, CMD_RPM_LIMIT) as i16;
    let right = right
        .saturating_neg()
        .clamp(-CMD_RPM_LIMIT, CMD_RPM_LIMIT) as i16;
    [left as u16, right as u16]
}

/// Feedback comes in 0.1 RPM; division truncates toward zero
fn decode_rpm(raw: [u16; 2]) -> [i16; 2] {
    let left = raw[0] as i16 / FEEDBACK_RPM_SCALE;
    let right = raw[1] as i16 / FEEDBACK_RPM_SCALE;
    [left, -right]
}

/// `[left_hi, left_lo, right_hi, right_lo]` -> `[left, right]`.
/// Each half is masked to 16 bits and the result reinterpreted as i32, so a
/// high word of 0xFFFF produces a negative count.
fn decode_encoder_counts(raw: [u16; 4]) -> [i32; 2] {
    let join = |hi: u16, lo: u16| -> i32 {
        (((u32::from(hi) & 0xFFFF) << 16) | (u32::from(lo) & 0xFFFF)) as i32
    };
    [join(raw[0], raw[1]), join(raw[2], raw[3])]
}

fn split_i32(value: i32) -> [u16; 2] {
    let bits = value as u32;
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::loopback::{LoopbackTransport, Transaction};

    fn last_write(zlac: &Zlac8015d<LoopbackTransport>) -> Transaction {
        zlac.transport().transactions().last().cloned().expect("a transaction")
    }

    #[test]
    fn test_ramp_clamping() {
        assert_eq!(ramp_word(-5), 0);
        assert_eq!(ramp_word(40000), 32767);
        assert_eq!(ramp_word(500), 500);
        assert_eq!(pos_rpm_word(0), 1);
        assert_eq!(pos_rpm_word(5000), 1000);
        assert_eq!(pos_rpm_word(250), 250);
    }

    #[test]
    fn test_accel_decel_write_both_wheels() {
        let mut zlac = Zlac8015d::new(LoopbackTransport::new());
        zlac.set_accel_time(-5, 40000).unwrap();
        assert_eq!(
            last_write(&zlac),
            Transaction::WriteMultiple {
                address: 0x2080,
                values: vec![0, 32767]
            }
        );

        zlac.set_decel_time(100, 200).unwrap();
        assert_eq!(
            last_write(&zlac),
            Transaction::WriteMultiple {
                address: 0x2082,
                values: vec![100, 200]
            }
        );

        zlac.set_max_rpm_pos(0, 5000).unwrap();
        assert_eq!(
            last_write(&zlac),
            Transaction::WriteMultiple {
                address: 0x208E,
                values: vec![1, 1000]
            }
        );
    }

    #[test]
    fn test_rpm_right_wheel_sign_inverted() {
        assert_eq!(encode_rpm(100, 50), [100, (-50i16) as u16]);
        assert_eq!(encode_rpm(100, -50), [100, 50]);
        // Negation happens before saturation
        assert_eq!(encode_rpm(-5000, -5000), [(-3000i16) as u16, 3000]);
        assert_eq!(encode_rpm(0, i32::MIN), [0, 3000]);
    }

    #[test]
    fn test_rpm_decoding() {
        let raw = [300i16 as u16, (-150i16) as u16];
        assert_eq!(decode_rpm(raw), [30, 15]);
        // Truncation toward zero, as in integer division
        assert_eq!(decode_rpm([(-19i16) as u16, 19]), [-1, -1]);
    }

    #[test]
    fn test_encoder_count_reassembly() {
        let counts = decode_encoder_counts([0x0001, 0x0002, 0xFFFF, 0xFFFE]);
        assert_eq!(counts[0], 0x0001_0002);
        assert_eq!(counts[1], 0xFFFF_FFFEu32 as i32);
        assert_eq!(counts[1], -2);
    }

    #[test]
    fn test_control_writes() {
        let mut zlac = Zlac8015d::new(LoopbackTransport::new());
        zlac.disable_motor().unwrap();
        zlac.enable_motor().unwrap();
        zlac.set_mode(3).unwrap();

        assert_eq!(
            zlac.transport().transactions(),
            &[
                Transaction::WriteSingle { address: 0x200E, value: 0x07 },
                Transaction::WriteSingle { address: 0x200E, value: 0x08 },
                Transaction::WriteSingle { address: 0x200D, value: 3 },
            ]
        );
    }

    #[test]
    fn test_reads_decode_from_device_registers() {
        let mut bus = LoopbackTransport::new();
        bus.set_register(0x20AB, 300);
        bus.set_register(0x20AC, (-150i16) as u16);
        bus.inject_fault(0x0001, 0x0400);
        for (offset, word) in [0x0001u16, 0x0002, 0xFFFF, 0xFFFE].iter().enumerate() {
            bus.set_register(0x20A7 + offset as u16, *word);
        }

        let mut zlac = Zlac8015d::new(bus);
        assert_eq!(zlac.get_rpm().unwrap(), [30, 15]);
        assert_eq!(zlac.get_fault_code().unwrap(), [0x0001, 0x0400]);
        assert_eq!(zlac.get_encoder_count().unwrap(), [0x0001_0002, -2]);

        assert_eq!(
            zlac.transport().transactions(),
            &[
                Transaction::Read { address: 0x20AB, count: 2 },
                Transaction::Read { address: 0x20A5, count: 2 },
                Transaction::Read { address: 0x20A7, count: 4 },
            ]
        );
    }

    #[test]
    fn test_failed_read_produces_no_value() {
        let mut zlac = Zlac8015d::new(LoopbackTransport::new());
        zlac.transport_mut().set_register(0x20AB, 500);

        let mut last_rpm = [7i16, 7];
        zlac.transport_mut().fail_next(0xE2);
        match zlac.get_rpm() {
            Ok(rpm) => last_rpm = rpm,
            Err(e) => assert_eq!(e.status(), 0xE2),
        }
        assert_eq!(last_rpm, [7, 7]);
    }

    #[test]
    fn test_failed_fault_and_encoder_reads_produce_no_value() {
        let mut bus = LoopbackTransport::new();
        bus.inject_fault(0x0004, 0x0008);
        bus.set_register(0x20A8, 99);
        let mut zlac = Zlac8015d::new(bus);

        let mut faults = [-1i16, -1];
        zlac.transport_mut().fail_next(0x02);
        match zlac.get_fault_code() {
            Ok(raw) => faults = raw,
            Err(e) => assert_eq!(e.status(), 0x02),
        }
        assert_eq!(faults, [-1, -1]);

        let mut counts = [i32::MIN, i32::MAX];
        zlac.transport_mut().fail_next(0xE3);
        match zlac.get_encoder_count() {
            Ok(raw) => counts = raw,
            Err(e) => assert_eq!(e.status(), 0xE3),
        }
        assert_eq!(counts, [i32::MIN, i32::MAX]);

        // The link is fine again afterwards
        assert_eq!(zlac.get_fault_code().unwrap(), [0x0004, 0x0008]);
        assert_eq!(zlac.get_encoder_count().unwrap(), [99, 0]);
    }

    #[test]
    fn test_failed_write_leaves_registers_unchanged() {
        let mut zlac = Zlac8015d::new(LoopbackTransport::new());
        zlac.set_accel_time(300, 400).unwrap();

        zlac.transport_mut().fail_next(0x03);
        let err = zlac.set_accel_time(1000, 2000).unwrap_err();
        assert_eq!(err.status(), 0x03);

        assert_eq!(zlac.transport().register(0x2080), 300);
        assert_eq!(zlac.transport().register(0x2081), 400);
    }

    #[test]
    fn test_position_commands() {
        let mut zlac = Zlac8015d::new(LoopbackTransport::new());
        zlac.set_position_control_type(PositionControlType::Synchronous)
            .unwrap();
        zlac.set_relative_position(0x0001_0002, 1).unwrap();
        zlac.start_position(PositionStart::Left).unwrap();

        assert_eq!(
            zlac.transport().transactions(),
            &[
                Transaction::WriteSingle { address: 0x200F, value: 1 },
                Transaction::WriteMultiple {
                    address: 0x208A,
                    values: vec![0x0001, 0x0002, 0xFFFF, 0xFFFF]
                },
                Transaction::WriteSingle { address: 0x200E, value: 0x11 },
            ]
        );
    }
}
