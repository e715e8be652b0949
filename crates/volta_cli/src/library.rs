//! The reference block library shipped with the `volta` binary.
//!
//! Modules:
//!
//! - `power`: the abstract `power.Regulator` with two concrete rails
//! - `demo`: connectors, a microcontroller, an indicator LED and the
//!   `demo.Blinky` board that ties them together
//!
//! `power.Ldo33` is the default for `power.Regulator`; a design picks the
//! buck converter through its refinement table.

use volta_elaborate::{
    BlockBuilder, BlockDef, ElabError, LibraryRegistry, PowerRail, Resettable,
};
use volta_ir::{Footprint, PortId, PortModel, PortType, Range};

/// Builds the registry with every reference block.
pub fn reference_library() -> Result<LibraryRegistry, ElabError> {
    let mut library = LibraryRegistry::new();
    library.register(Regulator)?;
    library.register(Ldo33)?;
    library.register(Buck33)?;
    library.register(UsbInput)?;
    library.register(Mcu)?;
    library.register(LedResistor)?;
    library.register(Led)?;
    library.register(IndicatorLed)?;
    library.register(Blinky)?;
    library.register_default("power.Regulator", "power.Ldo33")?;
    Ok(library)
}

fn part(prefix: &str, footprint: &str, pins: &[(&str, PortId)]) -> Footprint {
    Footprint {
        footprint: footprint.to_string(),
        refdes_prefix: prefix.to_string(),
        pinning: pins.iter().map(|(pin, port)| (pin.to_string(), *port)).collect(),
        ..Footprint::default()
    }
}

/// Any 3.3 V regulator.
pub struct Regulator;

impl BlockDef for Regulator {
    fn class(&self) -> &str {
        "power.Regulator"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        b.implement(&PowerRail {
            output: Range::from_tolerance(3.3, 0.05),
        })?;
        Ok(())
    }

    fn is_abstract(&self) -> bool {
        true
    }

    fn capabilities(&self) -> &[&'static str] {
        &["PowerRail"]
    }

    fn description(&self) -> &str {
        "3.3 V rail from a higher input"
    }
}

/// Shared body of the concrete regulators: input limits, output tolerance
/// and current limit, with the input drawing what the output supplies.
fn regulator(
    b: &mut BlockBuilder<'_, '_>,
    input: Range,
    tolerance: f64,
    max_current: f64,
    fp: &str,
    part_number: &str,
) -> Result<(), ElabError> {
    b.port(
        "pwr_in",
        PortModel::new(PortType::VoltageSink).with("voltage_limits", input),
    )?;
    let ports = b.implement(&PowerRail {
        output: Range::from_tolerance(3.3, tolerance),
    })?;
    let (pwr_in, pwr_out, gnd) = (ports[0], ports[1], ports[2]);
    b.assign_field(pwr_out, "current_limits", Range::new(0.0, max_current))?;
    let drawn = b.link_field(pwr_out, "current_drawn")?;
    b.assign_field(pwr_in, "current_draw", drawn)?;
    b.footprint(Footprint {
        mfr: Some("Volta Reference".to_string()),
        part: Some(part_number.to_string()),
        ..part("U", fp, &[("1", gnd), ("2", pwr_out), ("3", pwr_in)])
    })
}

/// Linear regulator, 4-6 V in.
pub struct Ldo33;

impl BlockDef for Ldo33 {
    fn class(&self) -> &str {
        "power.Ldo33"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        regulator(b, Range::new(4.0, 6.0), 0.02, 0.3, "SOT-23", "LDO33")
    }

    fn capabilities(&self) -> &[&'static str] {
        &["PowerRail"]
    }

    fn description(&self) -> &str {
        "300 mA linear regulator"
    }
}

/// Buck converter, 4.5-28 V in.
pub struct Buck33;

impl BlockDef for Buck33 {
    fn class(&self) -> &str {
        "power.Buck33"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        regulator(b, Range::new(4.5, 28.0), 0.03, 1.0, "SOT-23-6", "BUCK33")
    }

    fn capabilities(&self) -> &[&'static str] {
        &["PowerRail"]
    }

    fn description(&self) -> &str {
        "1 A buck converter"
    }
}

/// USB-C power input.
pub struct UsbInput;

impl BlockDef for UsbInput {
    fn class(&self) -> &str {
        "demo.UsbInput"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let vbus = b.port(
            "vbus",
            PortModel::voltage_source(Range::from_tolerance(5.0, 0.05), Range::new(0.0, 0.5)),
        )?;
        let gnd = b.port("gnd", PortModel::new(PortType::GroundReference))?;
        b.footprint(part("J", "USB_C_Receptacle", &[("A4", vbus), ("A1", gnd)]))
    }

    fn description(&self) -> &str {
        "USB-C receptacle, 5 V at up to 500 mA"
    }
}

/// Microcontroller with one LED output.
pub struct Mcu;

impl BlockDef for Mcu {
    fn class(&self) -> &str {
        "demo.Mcu"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let pwr = b.port(
            "pwr",
            PortModel::voltage_sink(Range::new(3.0, 3.6), Range::new(0.0, 0.05)),
        )?;
        let gnd = b.port("gnd", PortModel::new(PortType::Ground))?;
        let led = b.port(
            "led",
            PortModel::push_pull(Range::new(0.0, 3.3), Range::new(0.4, 2.9))
                .with("current_limits", Range::new(-0.02, 0.02)),
        )?;
        let reset = b.optional_port("reset", PortModel::new(PortType::DigitalSink))?;
        b.implement(&Resettable)?;
        b.footprint(part(
            "U",
            "QFN-32",
            &[("1", pwr), ("2", gnd), ("3", led), ("4", reset)],
        ))
    }

    fn capabilities(&self) -> &[&'static str] {
        &["Resettable"]
    }

    fn description(&self) -> &str {
        "3.3 V microcontroller"
    }
}

/// E12 values from 100 to 820 ohms.
const E12: [f64; 12] = [
    100.0, 120.0, 150.0, 180.0, 220.0, 270.0, 330.0, 390.0, 470.0, 560.0, 680.0, 820.0,
];

/// LED forward voltage.
const LED_VF: f64 = 2.0;
/// LED target current.
const LED_CURRENT: f64 = 0.005;

/// Smallest E12 value at or above `ohms`, or the largest one.
fn e12_at_least(ohms: f64) -> f64 {
    E12.iter().copied().find(|r| *r >= ohms).unwrap_or(E12[E12.len() - 1])
}

/// Current-limiting resistor sized from the voltage of the net driving it.
pub struct LedResistor;

impl BlockDef for LedResistor {
    fn class(&self) -> &str {
        "demo.LedResistor"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let a = b.port(
            "a",
            PortModel::digital_sink(Range::new(-0.3, 5.5), Range::new(0.8, 2.0))
                .with("current_draw", Range::new(0.0, LED_CURRENT)),
        )?;
        b.port("b", PortModel::new(PortType::Passive))?;
        let drive = b.link_field(a, "voltage")?;
        b.generator(vec![drive])
    }

    fn generate(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let own_port = |name: &str| {
            b.design()
                .find_port(b.id(), name)
                .ok_or_else(|| ElabError::UnknownName {
                    path: b.path(),
                    what: "port",
                    name: name.to_string(),
                })
        };
        let (a, pin_b) = (own_port("a")?, own_port("b")?);
        let drive = b.get_range(&b.link_field(a, "voltage")?)?;
        let ohms = e12_at_least((drive.upper() - LED_VF) / LED_CURRENT);
        tracing::debug!(path = %b.path(), drive = drive.upper(), ohms, "sized LED resistor");
        b.param_with("resistance", ohms)?;
        b.footprint(Footprint {
            value: Some(format!("{ohms}")),
            ..part("R", "R_0603_1608Metric", &[("1", a), ("2", pin_b)])
        })
    }

    fn description(&self) -> &str {
        "LED series resistor, sized at generation"
    }
}

/// A bare LED.
pub struct Led;

impl BlockDef for Led {
    fn class(&self) -> &str {
        "demo.Led"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let a = b.port("a", PortModel::new(PortType::Passive))?;
        let k = b.port("k", PortModel::new(PortType::Ground))?;
        b.footprint(Footprint {
            value: Some("green".to_string()),
            ..part("D", "LED_0603_1608Metric", &[("A", a), ("K", k)])
        })
    }

    fn description(&self) -> &str {
        "0603 indicator LED"
    }
}

/// LED with its series resistor.
pub struct IndicatorLed;

impl BlockDef for IndicatorLed {
    fn class(&self) -> &str {
        "demo.IndicatorLed"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let sig = b.port("sig", PortModel::new(PortType::DigitalSink))?;
        let gnd = b.port("gnd", PortModel::new(PortType::Ground))?;
        let res = b.library_block("res", "demo.LedResistor")?;
        let led = b.library_block("led", "demo.Led")?;
        let res_a = b.child_port(res, "a")?;
        b.export(sig, res_a)?;
        let res_b = b.child_port(res, "b")?;
        let led_a = b.child_port(led, "a")?;
        b.connect(&[res_b, led_a])?;
        let led_k = b.child_port(led, "k")?;
        b.export(gnd, led_k)
    }

    fn description(&self) -> &str {
        "LED with a generated series resistor"
    }
}

/// USB-powered board blinking one LED.
pub struct Blinky;

impl BlockDef for Blinky {
    fn class(&self) -> &str {
        "demo.Blinky"
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        let usb = b.library_block("usb", "demo.UsbInput")?;
        let reg = b.library_block("reg", "power.Regulator")?;
        let mcu = b.library_block("mcu", "demo.Mcu")?;
        let led = b.library_block("led", "demo.IndicatorLed")?;

        let vbus = b.child_port(usb, "vbus")?;
        let pwr_in = b.child_port(reg, "pwr_in")?;
        b.connect(&[vbus, pwr_in])?;

        let pwr_out = b.child_port(reg, "pwr_out")?;
        let mcu_pwr = b.child_port(mcu, "pwr")?;
        b.connect(&[pwr_out, mcu_pwr])?;

        let mut gnds = vec![b.child_port(usb, "gnd")?];
        for (block, port) in [(reg, "gnd"), (mcu, "gnd"), (led, "gnd")] {
            gnds.push(b.child_port(block, port)?);
        }
        b.connect(&gnds)?;

        let mcu_led = b.child_port(mcu, "led")?;
        let sig = b.child_port(led, "sig")?;
        b.connect(&[mcu_led, sig])
    }

    fn description(&self) -> &str {
        "USB-powered LED blinker"
    }
}
