// End-to-end checks of the public motor API against the loopback controller

use zlac_zenoh_runtime::motor::loopback::Transaction;
use zlac_zenoh_runtime::motor::registers::{ControlCommand, OperatingMode, Register};
use zlac_zenoh_runtime::motor::{
    LoopbackTransport, ModbusTransport, MotorDriver, TransportError, WheelRpm, Zlac8015d,
};

#[test]
fn set_then_get_rpm_round_trips() {
    let mut zlac = Zlac8015d::new(LoopbackTransport::new());

    for (left, right) in [(100, 50), (100, -50), (-3000, 3000), (0, 0), (7, -1)] {
        zlac.set_rpm(left, right).unwrap();
        let rpm = zlac.get_rpm().unwrap();
        assert_eq!(rpm, [left as i16, right as i16], "set_rpm({}, {})", left, right);
    }
}

#[test]
fn out_of_range_rpm_reads_back_saturated() {
    let mut zlac = Zlac8015d::new(LoopbackTransport::new());
    zlac.set_rpm(9000, -9000).unwrap();
    assert_eq!(zlac.get_rpm().unwrap(), [3000, -3000]);
}

#[test]
fn every_operation_is_one_transaction() {
    let mut zlac = Zlac8015d::new(LoopbackTransport::new());

    zlac.disable_motor().unwrap();
    zlac.set_mode(OperatingMode::Velocity.into()).unwrap();
    zlac.set_accel_time(100, 100).unwrap();
    zlac.set_decel_time(100, 100).unwrap();
    zlac.set_max_rpm_pos(100, 100).unwrap();
    zlac.enable_motor().unwrap();
    zlac.set_rpm(10, 10).unwrap();
    zlac.get_rpm().unwrap();
    zlac.get_fault_code().unwrap();
    zlac.get_encoder_count().unwrap();

    assert_eq!(zlac.transport().transactions().len(), 10);
}

#[test]
fn failed_write_leaves_device_untouched() {
    let mut bus = LoopbackTransport::new();
    bus.fail_next(0x04);

    let mut zlac = Zlac8015d::new(&mut bus);
    let err = zlac.set_rpm(500, 500).unwrap_err();
    assert!(matches!(err, TransportError::SlaveDeviceFailure));
    assert_eq!(err.status(), 0x04);

    assert_eq!(bus.register(Register::LeftCommandRpm.addr()), 0);
    assert_eq!(bus.register(Register::LeftFeedbackRpm.addr()), 0);
}

#[test]
fn driver_drives_and_releases_base() {
    let mut bus = LoopbackTransport::new();
    {
        let mut driver = MotorDriver::new(&mut bus);
        driver.initialize().unwrap();
        driver.set_body_velocity(0.5, 0.0).unwrap();

        let fb = driver.feedback().unwrap();
        assert_eq!(fb.rpm, WheelRpm::new(47, 47));
        assert!(!fb.has_fault());

        driver.disable().unwrap();
    }

    assert_eq!(bus.last_control(), Some(ControlCommand::DownTime));
    // Drop leaves zero speed commanded
    assert_eq!(
        bus.transactions().last(),
        Some(&Transaction::WriteMultiple {
            address: Register::LeftCommandRpm.addr(),
            values: vec![0, 0],
        })
    );
}

#[test]
fn boxed_transport_is_accepted() {
    let transport: Box<dyn ModbusTransport> = Box::new(LoopbackTransport::new());
    let mut zlac = Zlac8015d::new(transport);
    zlac.emergency_stop().unwrap();
    zlac.clear_alarm().unwrap();
    assert_eq!(zlac.get_fault_code().unwrap(), [0, 0]);
}
