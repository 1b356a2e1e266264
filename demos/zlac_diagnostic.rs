// ZLAC8015D diagnostic: READ-ONLY check of the Modbus link
//
// This tool does NOT write anything to the controller - it's completely safe.
//
// Usage: cargo run --example zlac_diagnostic -- [port] [slave_id]
// Example: cargo run --example zlac_diagnostic -- /dev/ttyUSB0 1

use zlac_zenoh_runtime::config::MOTOR_PORT;
use zlac_zenoh_runtime::motor::rtu::DEFAULT_SLAVE_ID;
use zlac_zenoh_runtime::motor::{FaultFlags, RtuConfig, RtuTransport, Zlac8015d};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse()?),
        )
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| MOTOR_PORT.to_string());
    let slave_id: u8 = match std::env::args().nth(2) {
        Some(id) => id.parse()?,
        None => DEFAULT_SLAVE_ID,
    };

    println!("ZLAC8015D diagnostic (read-only)");
    println!("Serial port: {}, slave id: {}", port, slave_id);
    println!();

    println!("Step 1: Available serial ports");
    match serialport::available_ports() {
        Ok(ports) if !ports.is_empty() => {
            for p in ports {
                let marker = if p.port_name == port { "*" } else { " " };
                println!("  {} {}", marker, p.port_name);
            }
        }
        Ok(_) => println!("  (none found)"),
        Err(e) => println!("  ✗ Failed to enumerate ports: {}", e),
    }
    println!();

    println!("Step 2: Opening serial port...");
    let transport = match RtuTransport::open(&RtuConfig::new(&port), slave_id) {
        Ok(t) => {
            println!("  ✓ Serial port opened successfully");
            t
        }
        Err(e) => {
            println!("  ✗ Failed to open serial port: {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the RS-485 adapter is connected (A/B not swapped)");
            println!("  - On Linux, make sure your user is in the dialout group");
            return Err(e.into());
        }
    };
    let mut zlac = Zlac8015d::new(transport);
    println!();

    println!("Step 3: Reading controller registers...");
    match zlac.get_rpm() {
        Ok([left, right]) => println!("  Speed:    left={} rpm, right={} rpm", left, right),
        Err(e) => println!("  Speed:    ERROR (status 0x{:02X}) - {}", e.status(), e),
    }

    match zlac.get_fault_code() {
        Ok([left, right]) => {
            for (name, raw) in [("left", left), ("right", right)] {
                let flags = FaultFlags::from_raw(raw);
                if flags.is_empty() {
                    println!("  Fault {:<5} 0x{:04X} (none)", name, raw as u16);
                } else {
                    println!("  Fault {:<5} 0x{:04X} {:?}", name, raw as u16, flags.names());
                }
            }
        }
        Err(e) => println!("  Faults:   ERROR (status 0x{:02X}) - {}", e.status(), e),
    }

    match zlac.get_encoder_count() {
        Ok([left, right]) => println!("  Encoders: left={}, right={}", left, right),
        Err(e) => println!("  Encoders: ERROR (status 0x{:02X}) - {}", e.status(), e),
    }

    println!();
    println!("If all reads succeeded, start the runtime with: cargo run -- --port {}", port);
    Ok(())
}
