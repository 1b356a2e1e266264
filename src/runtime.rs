// 50 Hz loop with watchdog
// Note: a watchdog is a safety mechanism that triggers a safe action if something goes wrong
// Eg. without it if teleop crashes and stops sending commands, the wheels would keep spinning

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{error, info, warn};

// local imports
use crate::config::{
    CMD_TIMEOUT, FEEDBACK_EVERY_TICKS, LOOP_HZ, TOPIC_CMD_BASE, TOPIC_FEEDBACK, TOPIC_HEALTH,
    TOPIC_RT_WHEELS,
};
use crate::messages::{BaseCommand, BaseGeometry, RuntimeHealth, WheelFeedback};
use crate::motor::{
    LoopbackTransport, ModbusTransport, MotorDriver, RampProfile, RtuConfig, RtuTransport,
    TransportError, WheelRpm,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where motor commands go
#[derive(Debug, Clone)]
pub enum MotorBackend {
    /// Real controller on a serial RS-485 line
    Rtu { config: RtuConfig, slave_id: u8 },
    /// In-memory controller, no hardware
    Loopback,
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub backend: MotorBackend,
    pub ramps: RampProfile,
    pub geometry: BaseGeometry,
}

pub struct Runtime {
    latest_cmd: Option<BaseCommand>,
    cmd_received_at: Instant,
    cmd_stale: bool,
    faulted: bool,
    bus_error: bool,
    geometry: BaseGeometry,
}

impl Runtime {
    pub fn new(geometry: BaseGeometry) -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            cmd_stale: true, // Start stale until first cmd
            faulted: false,
            bus_error: false,
            geometry,
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        if self.bus_error {
            RuntimeHealth::BusError
        } else if self.faulted {
            RuntimeHealth::MotorFault
        } else if self.cmd_stale {
            RuntimeHealth::CmdStale
        } else {
            RuntimeHealth::Ok
        }
    }

    /// Process incoming command
    fn on_command(&mut self, cmd: BaseCommand) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Compute wheel speeds based on watchdog and fault state
    fn compute_actuation(&mut self) -> WheelRpm {
        let cmd_age = self.cmd_received_at.elapsed();

        let rpm = if cmd_age > CMD_TIMEOUT {
            // Watchdog triggered - stop the wheels
            if !self.cmd_stale {
                warn!("Command stale ({:?} old), stopping wheels", cmd_age);
            }
            self.cmd_stale = true;
            WheelRpm::zero()
        } else if let Some(ref cmd) = self.latest_cmd {
            self.cmd_stale = false;
            self.geometry.wheel_rpm(cmd)
        } else {
            // No command ever received
            self.cmd_stale = true;
            WheelRpm::zero()
        };

        // Hold zero while faulted so the base does not lurch once cleared
        if self.faulted { WheelRpm::zero() } else { rpm }
    }

    fn on_feedback(&mut self, feedback: &WheelFeedback) {
        let faulted = feedback.has_fault();
        if faulted && !self.faulted {
            error!(
                "Motor fault: left={:?}, right={:?}",
                feedback.left_faults().names(),
                feedback.right_faults().names()
            );
        } else if !faulted && self.faulted {
            info!("Motor faults cleared");
        }
        self.faulted = faulted;
    }

    fn on_bus_result(&mut self, result: &Result<(), TransportError>) {
        match result {
            Ok(()) => {
                if self.bus_error {
                    info!("Modbus link recovered");
                }
                self.bus_error = false;
            }
            Err(e) => {
                if !self.bus_error {
                    warn!("Modbus transaction failed (status 0x{:02X}): {}", e.status(), e);
                }
                self.bus_error = true;
            }
        }
    }
}

/// Runs blocking driver calls off the async worker threads
struct BlockingDriver<T: ModbusTransport + Send + 'static> {
    inner: Option<MotorDriver<T>>,
}

impl<T: ModbusTransport + Send + 'static> BlockingDriver<T> {
    fn new(driver: MotorDriver<T>) -> Self {
        Self {
            inner: Some(driver),
        }
    }

    async fn call<R, F>(&mut self, f: F) -> Result<R, BoxError>
    where
        R: Send + 'static,
        F: FnOnce(&mut MotorDriver<T>) -> R + Send + 'static,
    {
        let mut driver = self
            .inner
            .take()
            .ok_or("motor driver lost after a failed blocking call")?;
        let (driver, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut driver);
            (driver, result)
        })
        .await?;
        self.inner = Some(driver);
        Ok(result)
    }

    /// Zero speed, release torque, and drop the transport on a blocking thread
    async fn shutdown(mut self) {
        let Some(mut driver) = self.inner.take() else {
            return;
        };
        let joined = tokio::task::spawn_blocking(move || {
            if let Err(e) = driver.stop() {
                warn!("Failed to stop motors: {}", e);
            }
            if let Err(e) = driver.disable() {
                warn!("Failed to disable motors: {}", e);
            }
        })
        .await;
        if let Err(e) = joined {
            error!("Motor shutdown task failed: {}", e);
        }
    }
}

impl<T: ModbusTransport + Send + 'static> Drop for BlockingDriver<T> {
    fn drop(&mut self) {
        // The sync transport must not be dropped on an async worker thread
        if let Some(driver) = self.inner.take() {
            std::thread::spawn(move || drop(driver));
        }
    }
}

pub async fn run(options: RuntimeOptions) -> Result<(), BoxError> {
    let RuntimeOptions {
        backend,
        ramps,
        geometry,
    } = options;

    match backend {
        MotorBackend::Loopback => {
            info!("Simulation mode: using in-memory loopback controller");
            let driver = MotorDriver::with_ramps(LoopbackTransport::new(), ramps);
            run_with_driver(driver, geometry).await
        }
        MotorBackend::Rtu { config, slave_id } => {
            let driver = tokio::task::spawn_blocking(move || {
                RtuTransport::open(&config, slave_id)
                    .map(|transport| MotorDriver::with_ramps(transport, ramps))
            })
            .await??;
            run_with_driver(driver, geometry).await
        }
    }
}

async fn run_with_driver<T>(driver: MotorDriver<T>, geometry: BaseGeometry) -> Result<(), BoxError>
where
    T: ModbusTransport + Send + 'static,
{
    let mut driver = BlockingDriver::new(driver);
    driver.call(|d| d.initialize()).await??;

    let result = control_loop(&mut driver, geometry).await;
    info!("Shutting down motors...");
    driver.shutdown().await;
    result
}

async fn control_loop<T>(
    driver: &mut BlockingDriver<T>,
    geometry: BaseGeometry,
) -> Result<(), BoxError>
where
    T: ModbusTransport + Send + 'static,
{
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_BASE).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_WHEELS).await?;
    let pub_feedback = session.declare_publisher(TOPIC_FEEDBACK).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(geometry);
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut tick_count: u64 = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_BASE);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_WHEELS, TOPIC_FEEDBACK, TOPIC_HEALTH
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Ctrl-C received");
                return Ok(());
            }
        }

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<BaseCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Compute actuation (includes watchdog logic)
        let actuation = runtime.compute_actuation();

        // 3. Drive the motors, sampling feedback every few ticks
        let sample_feedback = tick_count % FEEDBACK_EVERY_TICKS == 0;
        tick_count = tick_count.wrapping_add(1);
        let (bus_result, feedback) = driver
            .call(move |d| {
                if let Err(e) = d.set_wheel_rpm(actuation) {
                    return (Err(e), None);
                }
                if !sample_feedback {
                    return (Ok(()), None);
                }
                match d.feedback() {
                    Ok(fb) => (Ok(()), Some(fb)),
                    Err(e) => (Err(e), None),
                }
            })
            .await?;
        runtime.on_bus_result(&bus_result);

        // 4. Publish actuation
        let actuation_json = serde_json::to_string(&actuation)?;
        pub_actuation.put(actuation_json).await?;

        // 5. Publish feedback
        if let Some(fb) = feedback {
            runtime.on_feedback(&fb);
            let feedback_json = serde_json::to_string(&fb)?;
            pub_feedback.put(feedback_json).await?;
        }

        // 6. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
