// Per-wheel fault register bits

use bitflags::bitflags;

bitflags! {
    /// Contents of a ZLAC8015D fault register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FaultFlags: u16 {
        const OVER_VOLTAGE              = 0x0001;
        const UNDER_VOLTAGE             = 0x0002;
        const OVER_CURRENT              = 0x0004;
        const OVER_LOAD                 = 0x0008;
        /// Current out of tolerance
        const CURRENT_TOLERANCE         = 0x0010;
        /// Encoder out of tolerance
        const ENCODER_TOLERANCE         = 0x0020;
        const MOTOR_BAD                 = 0x0040;
        const REFERENCE_VOLTAGE         = 0x0080;
        const EEPROM                    = 0x0100;
        /// Hall sensor error
        const HALL                      = 0x0200;
        const HIGH_TEMPERATURE          = 0x0400;
    }
}

impl FaultFlags {
    /// Interpret a raw fault word, keeping bits the table does not name
    pub fn from_raw(raw: i16) -> Self {
        Self::from_bits_retain(raw as u16)
    }

    /// Human-readable names of the set bits
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_bits() {
        let flags = FaultFlags::from_raw(0b0000_0100_0000_0101);
        assert!(flags.contains(FaultFlags::OVER_VOLTAGE));
        assert!(flags.contains(FaultFlags::OVER_CURRENT));
        assert!(flags.contains(FaultFlags::HIGH_TEMPERATURE));
        assert!(!flags.contains(FaultFlags::UNDER_VOLTAGE));
        assert_eq!(
            flags.names(),
            vec!["OVER_VOLTAGE", "OVER_CURRENT", "HIGH_TEMPERATURE"]
        );
    }

    #[test]
    fn test_unknown_bits_retained() {
        let flags = FaultFlags::from_raw(0x8000u16 as i16);
        assert_eq!(flags.bits(), 0x8000);
        assert!(flags.names().is_empty());
        assert!(FaultFlags::from_raw(0).is_empty());
    }
}
