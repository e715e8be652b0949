//! Capabilities: named port sets a block can promise to provide.
//!
//! A block states what it can do by implementing capabilities rather than by
//! inheriting from a base class. Each capability names the ports it requires;
//! [`BlockBuilder::implement`](crate::BlockBuilder::implement) declares any
//! that are missing and checks the types of those already declared.

use volta_ir::{PortModel, PortType, Range};

/// A capability with its own required ports.
pub trait Capability {
    /// Capability name, as listed by the library.
    fn name(&self) -> &'static str;

    /// Ports the capability requires, by name.
    fn ports(&self) -> Vec<(&'static str, PortModel)>;
}

/// Has an active-low reset input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resettable;

impl Capability for Resettable {
    fn name(&self) -> &'static str {
        "Resettable"
    }

    fn ports(&self) -> Vec<(&'static str, PortModel)> {
        vec![("reset", PortModel::new(PortType::DigitalSink))]
    }
}

/// Regulates an input rail into an output rail sharing a ground.
#[derive(Debug, Clone, Copy)]
pub struct PowerRail {
    /// Output voltage.
    pub output: Range,
}

impl Capability for PowerRail {
    fn name(&self) -> &'static str {
        "PowerRail"
    }

    fn ports(&self) -> Vec<(&'static str, PortModel)> {
        vec![
            ("pwr_in", PortModel::new(PortType::VoltageSink)),
            (
                "pwr_out",
                PortModel::new(PortType::VoltageSource).with("voltage_out", self.output),
            ),
            ("gnd", PortModel::new(PortType::Ground)),
        ]
    }
}
