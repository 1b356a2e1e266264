// In-memory ZLAC8015D stand-in
//
// Behaves like a controller with its wheels spinning exactly at the
// commanded speed: command RPM writes show up in the feedback RPM registers
// (in 0.1 RPM units). Used for tests and for running the runtime without
// hardware.

use std::collections::HashMap;

use tracing::debug;

use super::registers::{ControlCommand, Register, FEEDBACK_RPM_SCALE};
use super::transport::{ModbusTransport, Result, TransportError};

/// One recorded exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    WriteSingle { address: u16, value: u16 },
    WriteMultiple { address: u16, values: Vec<u16> },
    Read { address: u16, count: usize },
}

#[derive(Debug, Default)]
pub struct LoopbackTransport {
    registers: HashMap<u16, u16>,
    log: Vec<Transaction>,
    fail_next: Option<u8>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction seen so far, oldest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Current value of a register (0 if never written)
    pub fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }

    /// Make the next transaction fail with the given status code.
    /// Unknown codes fail as a timeout.
    pub fn fail_next(&mut self, status: u8) {
        self.fail_next = Some(status);
    }

    /// Latch fault bits as the controller would on an alarm
    pub fn inject_fault(&mut self, left: u16, right: u16) {
        self.set_register(Register::LeftFault.addr(), left);
        self.set_register(Register::RightFault.addr(), right);
    }

    /// Last command written to the control register
    pub fn last_control(&self) -> Option<ControlCommand> {
        ControlCommand::from_code(self.register(Register::Control.addr()))
    }

    fn check_failure(&mut self) -> Result<()> {
        match self.fail_next.take() {
            Some(code) => {
                Err(TransportError::from_status(code).unwrap_or(TransportError::ResponseTimedOut))
            }
            None => Ok(()),
        }
    }

    fn store(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);

        if address == Register::Control.addr() && value == ControlCommand::AlarmClear.code() {
            self.inject_fault(0, 0);
        }

        let feedback = if address == Register::LeftCommandRpm.addr() {
            Some(Register::LeftFeedbackRpm)
        } else if address == Register::RightCommandRpm.addr() {
            Some(Register::RightFeedbackRpm)
        } else {
            None
        };
        if let Some(reg) = feedback {
            let rpm = value as i16;
            let scaled = rpm.saturating_mul(FEEDBACK_RPM_SCALE);
            self.registers.insert(reg.addr(), scaled as u16);
        }
    }
}

impl ModbusTransport for LoopbackTransport {
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        self.log.push(Transaction::WriteSingle { address, value });
        self.check_failure()?;
        debug!("Loopback write: addr=0x{:04X}, value=0x{:04X}", address, value);
        self.store(address, value);
        Ok(())
    }

    fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        self.log.push(Transaction::WriteMultiple {
            address,
            values: values.to_vec(),
        });
        self.check_failure()?;
        for (offset, &value) in values.iter().enumerate() {
            self.store(address.wrapping_add(offset as u16), value);
        }
        Ok(())
    }

    fn read_holding_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<()> {
        self.log.push(Transaction::Read {
            address,
            count: buf.len(),
        });
        self.check_failure()?;
        for (offset, slot) in buf.iter_mut().enumerate() {
            *slot = self.register(address.wrapping_add(offset as u16));
        }
        Ok(())
    }
}
