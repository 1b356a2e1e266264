use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zlac_zenoh_runtime::config::MOTOR_PORT;
use zlac_zenoh_runtime::messages::BaseGeometry;
use zlac_zenoh_runtime::motor::kinematics::{MAX_RPM, TRACK_WIDTH, WHEEL_RADIUS};
use zlac_zenoh_runtime::motor::rtu::{DEFAULT_BAUDRATE, DEFAULT_SLAVE_ID, DEFAULT_TIMEOUT_MS};
use zlac_zenoh_runtime::motor::{DEFAULT_ACCEL_MS, DEFAULT_DECEL_MS, RampProfile, RtuConfig};
use zlac_zenoh_runtime::runtime::{MotorBackend, RuntimeOptions};

/// Zenoh runtime for a ZLAC8015D dual-wheel base
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial port of the RS-485 adapter
    #[arg(long, default_value = MOTOR_PORT)]
    port: String,

    #[arg(long, default_value_t = DEFAULT_BAUDRATE)]
    baud: u32,

    /// Modbus slave id of the controller
    #[arg(long, default_value_t = DEFAULT_SLAVE_ID)]
    slave: u8,

    /// Per-transaction response timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    #[arg(long, default_value_t = DEFAULT_ACCEL_MS)]
    accel_ms: i32,

    #[arg(long, default_value_t = DEFAULT_DECEL_MS)]
    decel_ms: i32,

    /// Safety limit on commanded wheel speed
    #[arg(long, default_value_t = MAX_RPM)]
    max_rpm: i16,

    #[arg(long, default_value_t = WHEEL_RADIUS)]
    wheel_radius: f32,

    #[arg(long, default_value_t = TRACK_WIDTH)]
    track_width: f32,

    /// Run against an in-memory controller instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Print available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    fn into_options(self) -> RuntimeOptions {
        let backend = if self.simulate {
            MotorBackend::Loopback
        } else {
            MotorBackend::Rtu {
                config: RtuConfig {
                    port: self.port,
                    baudrate: self.baud,
                    timeout: Duration::from_millis(self.timeout_ms),
                },
                slave_id: self.slave,
            }
        };

        RuntimeOptions {
            backend,
            ramps: RampProfile {
                accel_ms: self.accel_ms,
                decel_ms: self.decel_ms,
            },
            geometry: BaseGeometry {
                wheel_radius: self.wheel_radius,
                track_width: self.track_width,
                max_rpm: self.max_rpm,
            },
        }
    }
}

fn list_ports() -> Result<(), serialport::Error> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{} ({:?})", port.port_name, port.port_type);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(
            "info".parse().expect("static directive parses"),
        ))
        .init(); // installs the subscriber globally

    if args.list_ports {
        if let Err(e) = list_ports() {
            eprintln!("Failed to list serial ports: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = zlac_zenoh_runtime::runtime::run(args.into_options()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
