// Modbus transport contract
//
// The ZLAC facade issues exactly one transaction per call through this
// trait. Framing, CRC and timing live behind it.

use std::io;

/// Status codes, matching the usual Modbus master conventions
pub mod status {
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub const SLAVE_DEVICE_FAILURE: u8 = 0x04;
    pub const INVALID_SLAVE_ID: u8 = 0xE0;
    pub const INVALID_FUNCTION: u8 = 0xE1;
    pub const RESPONSE_TIMED_OUT: u8 = 0xE2;
    pub const INVALID_CRC: u8 = 0xE3;
    pub const OTHER: u8 = 0xFF;
}

/// Error returned by a failed Modbus transaction
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Illegal function")]
    IllegalFunction,

    #[error("Illegal data address")]
    IllegalDataAddress,

    #[error("Illegal data value")]
    IllegalDataValue,

    #[error("Slave device failure")]
    SlaveDeviceFailure,

    #[error("Response from unexpected slave id")]
    InvalidSlaveId,

    #[error("Response carried an unexpected function code")]
    InvalidFunction,

    #[error("Response timed out")]
    ResponseTimedOut,

    #[error("CRC mismatch in response")]
    InvalidCrc,

    #[error("Short response: expected {expected} registers, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// 8-bit status code for this failure (never 0)
    pub fn status(&self) -> u8 {
        match self {
            Self::IllegalFunction => status::ILLEGAL_FUNCTION,
            Self::IllegalDataAddress => status::ILLEGAL_DATA_ADDRESS,
            Self::IllegalDataValue => status::ILLEGAL_DATA_VALUE,
            Self::SlaveDeviceFailure => status::SLAVE_DEVICE_FAILURE,
            Self::InvalidSlaveId => status::INVALID_SLAVE_ID,
            Self::InvalidFunction => status::INVALID_FUNCTION,
            Self::ResponseTimedOut => status::RESPONSE_TIMED_OUT,
            Self::InvalidCrc => status::INVALID_CRC,
            Self::ShortResponse { .. } | Self::Io(_) => status::OTHER,
        }
    }

    /// Rebuild an error from a status code. Returns `None` for 0 (success)
    /// and for codes outside the known set.
    pub fn from_status(code: u8) -> Option<Self> {
        match code {
            status::ILLEGAL_FUNCTION => Some(Self::IllegalFunction),
            status::ILLEGAL_DATA_ADDRESS => Some(Self::IllegalDataAddress),
            status::ILLEGAL_DATA_VALUE => Some(Self::IllegalDataValue),
            status::SLAVE_DEVICE_FAILURE => Some(Self::SlaveDeviceFailure),
            status::INVALID_SLAVE_ID => Some(Self::InvalidSlaveId),
            status::INVALID_FUNCTION => Some(Self::InvalidFunction),
            status::RESPONSE_TIMED_OUT => Some(Self::ResponseTimedOut),
            status::INVALID_CRC => Some(Self::InvalidCrc),
            _ => None,
        }
    }

    /// Classify an I/O error coming out of the serial transport
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Self::ResponseTimedOut,
            io::ErrorKind::InvalidData => Self::InvalidCrc,
            _ => Self::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// One request/response exchange with the motor controller.
///
/// Implementations block until the response arrives or the transport's
/// own timeout expires. At most one transaction may be in flight per
/// handle.
pub trait ModbusTransport {
    /// Function 0x06
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<()>;

    /// Function 0x10
    fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()>;

    /// Function 0x03. Fills `buf` with `buf.len()` registers starting at
    /// `address`; `buf` is left untouched on error.
    fn read_holding_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<()>;
}

impl<T: ModbusTransport + ?Sized> ModbusTransport for &mut T {
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        (**self).write_single_register(address, value)
    }

    fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        (**self).write_multiple_registers(address, values)
    }

    fn read_holding_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<()> {
        (**self).read_holding_registers(address, buf)
    }
}

impl<T: ModbusTransport + ?Sized> ModbusTransport for Box<T> {
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        (**self).write_single_register(address, value)
    }

    fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        (**self).write_multiple_registers(address, values)
    }

    fn read_holding_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<()> {
        (**self).read_holding_registers(address, buf)
    }
}

/// Copy a transport response into the caller's buffer, rejecting short reads
pub(crate) fn fill_response(buf: &mut [u16], response: &[u16]) -> Result<()> {
    if response.len() < buf.len() {
        return Err(TransportError::ShortResponse {
            expected: buf.len(),
            actual: response.len(),
        });
    }
    buf.copy_from_slice(&response[..buf.len()]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for code in [0x01, 0x02, 0x03, 0x04, 0xE0, 0xE1, 0xE2, 0xE3] {
            let err = TransportError::from_status(code).expect("known status");
            assert_eq!(err.status(), code);
        }
        assert!(TransportError::from_status(0).is_none());
        assert!(TransportError::from_status(0x42).is_none());
    }

    #[test]
    fn test_io_classification() {
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "no reply");
        assert!(matches!(
            TransportError::from_io(timeout),
            TransportError::ResponseTimedOut
        ));

        let crc = io::Error::new(io::ErrorKind::InvalidData, "bad crc");
        assert_eq!(TransportError::from_io(crc).status(), status::INVALID_CRC);

        let broken = io::Error::new(io::ErrorKind::BrokenPipe, "unplugged");
        assert_eq!(TransportError::from_io(broken).status(), status::OTHER);
    }

    #[test]
    fn test_fill_response_rejects_short_reads() {
        let mut buf = [7u16; 4];
        let err = fill_response(&mut buf, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortResponse { expected: 4, actual: 2 }
        ));
        assert_eq!(buf, [7; 4]);

        fill_response(&mut buf, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
