// ZLAC8015D holding-register map and command codes
//
// All addresses are 16-bit Modbus holding registers. Paired registers are
// laid out left wheel first, so a 2-register transaction starting at the
// left address covers both wheels.

/// Holding-register addresses
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    // Common
    OperatingMode = 0x200D,
    Control = 0x200E,
    LeftAccelTime = 0x2080,
    RightAccelTime = 0x2081,
    LeftDecelTime = 0x2082,
    RightDecelTime = 0x2083,

    // Velocity control
    LeftCommandRpm = 0x2088,
    RightCommandRpm = 0x2089,
    LeftFeedbackRpm = 0x20AB,
    RightFeedbackRpm = 0x20AC,

    // Position control
    PositionControlType = 0x200F,
    LeftMaxRpmPos = 0x208E,
    RightMaxRpmPos = 0x208F,
    LeftRelPosHigh = 0x208A,
    LeftRelPosLow = 0x208B,
    RightRelPosHigh = 0x208C,
    RightRelPosLow = 0x208D,
    LeftFeedbackPosHigh = 0x20A7,
    LeftFeedbackPosLow = 0x20A8,
    RightFeedbackPosHigh = 0x20A9,
    RightFeedbackPosLow = 0x20AA,

    // Faults
    LeftFault = 0x20A5,
    RightFault = 0x20A6,
}

impl Register {
    pub const fn addr(self) -> u16 {
        self as u16
    }
}

/// Values written to `Register::Control`
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    EmergencyStop = 0x05,
    AlarmClear = 0x06,
    /// Releases torque from both wheels
    DownTime = 0x07,
    Enable = 0x08,
    PositionSyncStart = 0x10,
    PositionLeftStart = 0x11,
    PositionRightStart = 0x12,
}

impl ControlCommand {
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x05 => Some(Self::EmergencyStop),
            0x06 => Some(Self::AlarmClear),
            0x07 => Some(Self::DownTime),
            0x08 => Some(Self::Enable),
            0x10 => Some(Self::PositionSyncStart),
            0x11 => Some(Self::PositionLeftStart),
            0x12 => Some(Self::PositionRightStart),
            _ => None,
        }
    }
}

/// Operating modes accepted by the mode register
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    RelativePosition = 1,
    AbsolutePosition = 2,
    Velocity = 3,
}

impl From<OperatingMode> for u8 {
    fn from(mode: OperatingMode) -> Self {
        mode as u8
    }
}

/// Whether the two wheels start position moves independently or together
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionControlType {
    Asynchronous = 0,
    Synchronous = 1,
}

/// Which wheel(s) a position-start command triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStart {
    Both,
    Left,
    Right,
}

impl From<PositionStart> for ControlCommand {
    fn from(start: PositionStart) -> Self {
        match start {
            PositionStart::Both => ControlCommand::PositionSyncStart,
            PositionStart::Left => ControlCommand::PositionLeftStart,
            PositionStart::Right => ControlCommand::PositionRightStart,
        }
    }
}

/// Ramp time limits in milliseconds
pub const RAMP_MS_MIN: i32 = 0;
pub const RAMP_MS_MAX: i32 = 32767;

/// Maximum speed limits in position mode
pub const POS_RPM_MIN: i32 = 1;
pub const POS_RPM_MAX: i32 = 1000;

/// Velocity command limit (both directions)
pub const CMD_RPM_LIMIT: i32 = 3000;

/// Feedback RPM registers report in 0.1 RPM units
pub const FEEDBACK_RPM_SCALE: i16 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_addresses_match_device_map() {
        assert_eq!(Register::Control.addr(), 0x200E);
        assert_eq!(Register::OperatingMode.addr(), 0x200D);
        assert_eq!(Register::LeftAccelTime.addr(), 0x2080);
        assert_eq!(Register::LeftDecelTime.addr(), 0x2082);
        assert_eq!(Register::LeftCommandRpm.addr(), 0x2088);
        assert_eq!(Register::LeftFeedbackRpm.addr(), 0x20AB);
        assert_eq!(Register::LeftFault.addr(), 0x20A5);
        assert_eq!(Register::LeftFeedbackPosHigh.addr(), 0x20A7);
        assert_eq!(Register::LeftMaxRpmPos.addr(), 0x208E);
    }

    #[test]
    fn test_right_wheel_follows_left() {
        let pairs = [
            (Register::LeftAccelTime, Register::RightAccelTime),
            (Register::LeftDecelTime, Register::RightDecelTime),
            (Register::LeftCommandRpm, Register::RightCommandRpm),
            (Register::LeftFeedbackRpm, Register::RightFeedbackRpm),
            (Register::LeftMaxRpmPos, Register::RightMaxRpmPos),
            (Register::LeftFault, Register::RightFault),
        ];
        for (left, right) in pairs {
            assert_eq!(left.addr() + 1, right.addr(), "{:?}", left);
        }
        assert_eq!(Register::RightFeedbackPosHigh.addr(), Register::LeftFeedbackPosHigh.addr() + 2);
        assert_eq!(Register::RightRelPosLow.addr(), Register::LeftRelPosHigh.addr() + 3);
    }

    #[test]
    fn test_control_codes() {
        assert_eq!(ControlCommand::EmergencyStop.code(), 0x05);
        assert_eq!(ControlCommand::AlarmClear.code(), 0x06);
        assert_eq!(ControlCommand::DownTime.code(), 0x07);
        assert_eq!(ControlCommand::Enable.code(), 0x08);
        assert_eq!(ControlCommand::from_code(0x11), Some(ControlCommand::PositionLeftStart));
        assert_eq!(ControlCommand::from_code(0x09), None);
        assert_eq!(u8::from(OperatingMode::Velocity), 3);
    }
}
