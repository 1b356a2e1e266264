// Modbus RTU transport over a serial line
//
// Framing and CRC are handled by tokio-modbus (sync client). Several
// controllers can share one RS-485 bus: `RtuBus` owns the connection and
// hands out per-slave `RtuTransport` handles that serialize on a mutex.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_modbus::client::sync::{self, Reader, Writer};
use tokio_modbus::prelude::{Slave, SlaveContext};
use tokio_serial::{DataBits, Parity, StopBits};
use tracing::{debug, info};

use super::transport::{fill_response, ModbusTransport, Result, TransportError};

/// Factory defaults for the ZLAC8015D RS-485 port
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_SLAVE_ID: u8 = 1;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Serial line settings
#[derive(Debug, Clone)]
pub struct RtuConfig {
    pub port: String,
    pub baudrate: u32,
    pub timeout: Duration,
}

impl RtuConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baudrate: DEFAULT_BAUDRATE,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// A shared RS-485 bus
#[derive(Clone)]
pub struct RtuBus {
    ctx: Arc<Mutex<sync::Context>>,
}

impl RtuBus {
    /// Open the serial port. Must not be called from inside an async
    /// runtime thread; use `spawn_blocking` there.
    pub fn open(config: &RtuConfig) -> Result<Self> {
        info!(
            "Opening Modbus RTU bus on {} @ {} baud",
            config.port, config.baudrate
        );
        let builder = tokio_serial::new(&config.port, config.baudrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.timeout);

        // The serial builder's timeout does not reach the async reads
        // tokio-modbus drives; the context needs its own.
        let ctx = sync::rtu::connect_slave_with_timeout(
            &builder,
            Slave(DEFAULT_SLAVE_ID),
            Some(config.timeout),
        )
        .map_err(TransportError::from_io)?;

        Ok(Self {
            ctx: Arc::new(Mutex::new(ctx)),
        })
    }

    /// Transport handle addressing one slave on this bus
    pub fn handle(&self, slave_id: u8) -> RtuTransport {
        RtuTransport {
            bus: self.clone(),
            slave: slave_id,
        }
    }

    fn with_slave<R>(
        &self,
        slave: u8,
        f: impl FnOnce(&mut sync::Context) -> std::io::Result<R>,
    ) -> Result<R> {
        // Poisoning leaves the context itself usable
        let mut ctx = self.ctx.lock().unwrap_or_else(|e| e.into_inner());
        ctx.set_slave(Slave(slave));
        f(&mut *ctx).map_err(TransportError::from_io)
    }
}

/// Modbus RTU transport bound to one slave id
#[derive(Clone)]
pub struct RtuTransport {
    bus: RtuBus,
    slave: u8,
}

impl RtuTransport {
    /// Open a dedicated bus for a single controller
    pub fn open(config: &RtuConfig, slave_id: u8) -> Result<Self> {
        Ok(RtuBus::open(config)?.handle(slave_id))
    }
}

impl ModbusTransport for RtuTransport {
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        debug!(
            "RTU write single: slave={}, addr=0x{:04X}, value=0x{:04X}",
            self.slave, address, value
        );
        self.bus
            .with_slave(self.slave, |ctx| ctx.write_single_register(address, value))
    }

    fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        debug!(
            "RTU write multiple: slave={}, addr=0x{:04X}, values={:04X?}",
            self.slave, address, values
        );
        self.bus
            .with_slave(self.slave, |ctx| ctx.write_multiple_registers(address, values))
    }

    fn read_holding_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<()> {
        let count = buf.len() as u16;
        let response = self
            .bus
            .with_slave(self.slave, |ctx| ctx.read_holding_registers(address, count))?;
        debug!(
            "RTU read: slave={}, addr=0x{:04X}, words={:04X?}",
            self.slave, address, response
        );
        fill_response(buf, &response)
    }
}
