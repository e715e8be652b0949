//! Net-level requirement checks reported after the final solve.

mod common;

use common::*;
use volta_config::RefinementConfig;
use volta_elaborate::{BlockRef, ElabError, LibraryRegistry};
use volta_ir::{Expr, Kind, PortModel, PortType, Range, Value};

fn pair(
    a: (&'static str, BlockRef),
    b: (&'static str, BlockRef),
    net: Vec<(&'static str, &'static str)>,
) -> BlockRef {
    top(vec![a, b], vec![net])
}

#[test]
fn overvoltage_names_the_link() {
    let design = pair(
        ("src", source(Range::new(4.5, 5.5))),
        ("load", sink(Range::new(0.0, 3.6), Range::ZERO)),
        vec![("src", "out"), ("load", "pwr")],
    );
    let (result, diags) = run(design);
    assert!(matches!(result, Err(ElabError::Violations { count: 1 })));
    assert_eq!(errors(&diags), vec![("src_out".to_string(), "overvoltage".to_string())]);
}

#[test]
fn compatible_power_net_is_clean() {
    let design = pair(
        ("src", source_limited(Range::exact(3.3), Range::new(0.0, 0.5))),
        ("load", sink(Range::new(0.0, 3.6), Range::new(0.0, 0.25))),
        vec![("src", "out"), ("load", "pwr")],
    );
    let (result, diags) = run(design);
    let elab = result.expect("clean design");
    assert!(errors(&diags).is_empty());
    assert_eq!(elab.report.violated, 0);
    assert_eq!(elab.report.unchecked, 0);
    assert_eq!(elab.generator_rounds, 0);
}

#[test]
fn fail_fast_stops_at_first_violation() {
    let make = || {
        pair(
            ("src", source_limited(Range::new(4.5, 5.5), Range::new(0.0, 0.1))),
            ("load", sink(Range::new(0.0, 3.6), Range::new(0.0, 0.5))),
            vec![("src", "out"), ("load", "pwr")],
        )
    };
    let (result, diags) = run(make());
    assert!(matches!(result, Err(ElabError::Violations { count: 1 })));
    assert_eq!(errors(&diags).len(), 1);

    let (result, diags) = run_with(
        make(),
        &LibraryRegistry::new(),
        &RefinementConfig::default(),
        collect(),
    );
    assert!(matches!(result, Err(ElabError::Violations { count: 2 })));
    let messages: Vec<String> = errors(&diags).into_iter().map(|(_, m)| m).collect();
    assert_eq!(messages, vec!["overvoltage", "overcurrent"]);
}

#[test]
fn voltage_net_needs_a_source() {
    let design = pair(
        ("a", sink(Range::new(0.0, 3.6), Range::ZERO)),
        ("b", sink(Range::new(0.0, 3.6), Range::ZERO)),
        vec![("a", "pwr"), ("b", "pwr")],
    );
    let (result, diags) = run(design);
    assert!(matches!(result, Err(ElabError::Violations { .. })));
    assert_eq!(
        errors(&diags),
        vec![("a_pwr".to_string(), "requires a connected source".to_string())]
    );
}

#[test]
fn two_push_pull_sources_conflict() {
    let thresholds = Range::new(0.4, 2.9);
    let design = top(
        vec![
            ("a", driver(Range::exact(3.3), thresholds)),
            ("b", driver(Range::exact(3.3), thresholds)),
            ("rx", receiver(Range::new(-0.3, 3.6), Range::new(0.8, 2.0))),
        ],
        vec![vec![("a", "out"), ("b", "out"), ("rx", "in")]],
    );
    let (result, diags) = run(design);
    assert!(matches!(result, Err(ElabError::Violations { count: 1 })));
    assert_eq!(
        errors(&diags),
        vec![("a_out".to_string(), "conflicting source drivers".to_string())]
    );
}

#[test]
fn open_drain_with_pullup_is_clean() {
    let od = block("t.OpenDrain", |b| {
        b.port("out", PortModel::open_drain(Range::new(0.4, 2.9)))?;
        Ok(())
    });
    let pull = block("t.PullUp", |b| {
        b.port("out", PortModel::pull_up(Range::exact(3.3)))?;
        Ok(())
    });
    let design = top(
        vec![
            ("od", od),
            ("pu", pull),
            ("rx", receiver(Range::new(-0.3, 3.6), Range::new(0.8, 2.0))),
        ],
        vec![vec![("od", "out"), ("pu", "out"), ("rx", "in")]],
    );
    let (result, diags) = run(design);
    assert!(result.is_ok(), "unexpected errors: {:?}", errors(&diags));
}

#[test]
fn open_drain_alone_needs_pullup() {
    let od = block("t.OpenDrain", |b| {
        b.port("out", PortModel::open_drain(Range::new(0.4, 2.9)))?;
        Ok(())
    });
    let design = pair(
        ("od", od),
        ("rx", receiver(Range::new(-0.3, 3.6), Range::new(0.8, 2.0))),
        vec![("od", "out"), ("rx", "in")],
    );
    let (_, diags) = run(design);
    assert_eq!(
        errors(&diags),
        vec![("od_out".to_string(), "requires high driver or pullup".to_string())]
    );
}

#[test]
fn narrow_output_thresholds_rejected() {
    let design = pair(
        ("tx", driver(Range::exact(3.3), Range::new(1.0, 2.0))),
        ("rx", receiver(Range::new(-0.3, 3.6), Range::new(0.8, 2.0))),
        vec![("tx", "out"), ("rx", "in")],
    );
    let (_, diags) = run(design);
    assert_eq!(
        errors(&diags),
        vec![("tx_out".to_string(), "incompatible digital thresholds".to_string())]
    );
}

#[test]
fn unconnected_required_port_reported() {
    let design = top(vec![("load", sink(Range::new(0.0, 3.6), Range::ZERO))], vec![]);
    let (result, diags) = run(design);
    assert!(matches!(result, Err(ElabError::Violations { count: 1 })));
    assert_eq!(
        errors(&diags),
        vec![("load.pwr".to_string(), "required port is not connected".to_string())]
    );
}

#[test]
fn optional_port_may_stay_open() {
    let spare = block("t.Spare", |b| {
        b.optional_port("aux", PortModel::new(PortType::VoltageSink))?;
        Ok(())
    });
    let (result, _) = run(top(vec![("spare", spare)], vec![]));
    assert!(result.is_ok());
}

#[test]
fn unrelated_port_types_rejected() {
    let uart = block("t.Uart", |b| {
        b.port("uart", PortModel::new(PortType::UartPort))?;
        Ok(())
    });
    let design = pair(
        ("u", uart),
        ("load", sink(Range::new(0.0, 3.6), Range::ZERO)),
        vec![("u", "uart"), ("load", "pwr")],
    );
    let (result, diags) = run(design);
    match result {
        Err(ElabError::IncompatiblePorts { a, b, .. }) => {
            let mut types = [a, b];
            types.sort_by_key(|t| t.name());
            assert_eq!(types, [PortType::UartPort, PortType::VoltageSink]);
        }
        other => panic!("expected incompatible ports, got {other:?}"),
    }
    assert!(diags.is_empty());
}

fn bus(class: &'static str, model: PortModel) -> BlockRef {
    block(class, move |b| {
        b.port("bus", model.clone())?;
        Ok(())
    })
}

fn i2c_controller() -> BlockRef {
    bus(
        "t.I2cController",
        PortModel::new(PortType::I2cController).with("frequency", Range::exact(100e3)),
    )
}

fn i2c_target(address: i64) -> BlockRef {
    block("t.I2cTarget", move |b| {
        let addresses = Expr::literal(
            Kind::array_of(Kind::Int),
            Value::Array(vec![Value::Int(address)]),
        )?;
        let model = PortModel::new(PortType::I2cTarget)
            .with("frequency_limit", Range::new(0.0, 400e3))
            .with("addresses", addresses);
        b.port("bus", model)?;
        Ok(())
    })
}

fn i2c_pullup() -> BlockRef {
    bus("t.I2cPullup", PortModel::new(PortType::I2cPullup))
}

#[test]
fn i2c_bus_with_pullup_and_distinct_addresses_is_clean() {
    let design = top(
        vec![
            ("ctl", i2c_controller()),
            ("imu", i2c_target(0x68)),
            ("eeprom", i2c_target(0x50)),
            ("pull", i2c_pullup()),
        ],
        vec![vec![("ctl", "bus"), ("imu", "bus"), ("eeprom", "bus"), ("pull", "bus")]],
    );
    let (result, diags) = run(design);
    assert!(result.is_ok(), "unexpected errors: {:?}", errors(&diags));
}

#[test]
fn i2c_duplicate_addresses_conflict() {
    let design = top(
        vec![
            ("ctl", i2c_controller()),
            ("a", i2c_target(0x48)),
            ("b", i2c_target(0x48)),
            ("pull", i2c_pullup()),
        ],
        vec![vec![("ctl", "bus"), ("a", "bus"), ("b", "bus"), ("pull", "bus")]],
    );
    let (result, diags) = run(design);
    assert!(matches!(result, Err(ElabError::Violations { count: 1 })));
    assert_eq!(
        errors(&diags),
        vec![("ctl_bus".to_string(), "conflicting addresses on I2C bus".to_string())]
    );
}

#[test]
fn i2c_without_pullup_rejected() {
    let design = pair(
        ("ctl", i2c_controller()),
        ("imu", i2c_target(0x68)),
        vec![("ctl", "bus"), ("imu", "bus")],
    );
    let (_, diags) = run(design);
    assert_eq!(
        errors(&diags),
        vec![("ctl_bus".to_string(), "requires pullup".to_string())]
    );
}

fn spi_bus(frequency: f64, limit: f64) -> BlockRef {
    pair(
        (
            "ctl",
            bus(
                "t.SpiController",
                PortModel::new(PortType::SpiController).with("frequency", Range::exact(frequency)),
            ),
        ),
        (
            "flash",
            bus(
                "t.SpiFlash",
                PortModel::new(PortType::SpiPeripheral).with("frequency_limit", Range::new(0.0, limit)),
            ),
        ),
        vec![("ctl", "bus"), ("flash", "bus")],
    )
}

#[test]
fn spi_within_peripheral_limit_is_clean() {
    let (result, diags) = run(spi_bus(1e6, 20e6));
    assert!(result.is_ok(), "unexpected errors: {:?}", errors(&diags));
}

#[test]
fn spi_too_fast_for_peripheral() {
    let (_, diags) = run(spi_bus(10e6, 1e6));
    assert_eq!(
        errors(&diags),
        vec![("ctl_bus".to_string(), "frequency exceeds peripheral limits".to_string())]
    );
}

fn uart(baud: f64, limit: Range) -> BlockRef {
    bus(
        "t.Uart",
        PortModel::new(PortType::UartPort)
            .with("baud", Range::exact(baud))
            .with("baud_limit", limit),
    )
}

#[test]
fn uart_matching_rates_are_clean() {
    let design = pair(
        ("host", uart(115200.0, Range::new(9600.0, 921600.0))),
        ("dev", uart(115200.0, Range::new(9600.0, 115200.0))),
        vec![("host", "bus"), ("dev", "bus")],
    );
    let (result, diags) = run(design);
    assert!(result.is_ok(), "unexpected errors: {:?}", errors(&diags));
}

#[test]
fn uart_rate_above_receiver_limit() {
    let design = pair(
        ("host", uart(115200.0, Range::ALL)),
        ("dev", uart(9600.0, Range::new(0.0, 10e3))),
        vec![("host", "bus"), ("dev", "bus")],
    );
    let (_, diags) = run(design);
    assert_eq!(
        errors(&diags),
        vec![("host_bus".to_string(), "baud rate outside receiver limits (a to b)".to_string())]
    );
}
