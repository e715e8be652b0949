//! The port and link type library.
//!
//! Each [`PortType`] declares its model fields (with defaults), its bundle
//! sub-ports, the link it joins and the port type a bridge presents on the
//! inside of a block boundary. Each [`LinkType`] declares its role buckets and
//! derived fields. The derivation equations themselves live with the elaborator.

use crate::kind::Kind;
use crate::range::Range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a model field. A `Copy` mirror of [`Kind`] usable in static tables.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldKind {
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Float.
    Float,
    /// Range.
    Range,
    /// Array of integers.
    IntArray,
}

impl FieldKind {
    /// The expression kind.
    pub fn kind(self) -> Kind {
        match self {
            FieldKind::Bool => Kind::Bool,
            FieldKind::Int => Kind::Int,
            FieldKind::Float => Kind::Float,
            FieldKind::Range => Kind::Range,
            FieldKind::IntArray => Kind::array_of(Kind::Int),
        }
    }
}

/// Value a port field takes when its declaration does not provide one.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FieldDefault {
    /// Left for the solver or an explicit assignment.
    Symbolic,
    /// A boolean.
    Bool(bool),
    /// A range.
    Range(Range),
    /// An empty integer array.
    EmptyArray,
}

/// A model field of a port or link type.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Kind.
    pub kind: FieldKind,
    /// Default when undeclared.
    pub default: FieldDefault,
}

const fn field(name: &'static str, kind: FieldKind, default: FieldDefault) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        default,
    }
}

const fn range(name: &'static str, default: Range) -> FieldSpec {
    field(name, FieldKind::Range, FieldDefault::Range(default))
}

const fn flag(name: &'static str, default: bool) -> FieldSpec {
    field(name, FieldKind::Bool, FieldDefault::Bool(default))
}

const fn derived(name: &'static str, kind: FieldKind) -> FieldSpec {
    field(name, kind, FieldDefault::Symbolic)
}

/// A concrete port type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum PortType {
    /// Power output.
    VoltageSource,
    /// Power input.
    VoltageSink,
    /// Ground connection.
    Ground,
    /// Ground reference (the zero-volt source of a ground net).
    GroundReference,
    /// Digital output.
    DigitalSource,
    /// Digital input.
    DigitalSink,
    /// Bidirectional digital pin.
    DigitalBidir,
    /// Untyped electrical terminal.
    Passive,
    /// I2C controller bundle.
    I2cController,
    /// I2C target bundle.
    I2cTarget,
    /// I2C pull-up resistor pair.
    I2cPullup,
    /// SPI controller bundle.
    SpiController,
    /// SPI peripheral bundle.
    SpiPeripheral,
    /// UART bundle.
    UartPort,
    /// CAN logic-side controller bundle.
    CanController,
    /// CAN transceiver logic-side bundle.
    CanTransceiver,
}

const VOLTAGE_SOURCE: &[FieldSpec] = &[
    range("voltage_out", Range::ZERO),
    range("current_limits", Range::ALL),
];

const VOLTAGE_SINK: &[FieldSpec] = &[
    range("voltage_limits", Range::ALL),
    range("current_draw", Range::ZERO),
];

const DIGITAL_SOURCE: &[FieldSpec] = &[
    range("voltage_out", Range::ZERO),
    range("current_limits", Range::ALL),
    range("output_thresholds", Range::ALL),
    flag("high_driver", true),
    flag("low_driver", true),
    flag("pullup_capable", false),
    flag("pulldown_capable", false),
    flag("bridged_internal", false),
];

const DIGITAL_SINK: &[FieldSpec] = &[
    range("voltage_limits", Range::ALL),
    range("current_draw", Range::ZERO),
    range("input_thresholds", Range::EMPTY),
    flag("pullup_capable", false),
    flag("pulldown_capable", false),
    flag("bridged_internal", false),
];

const DIGITAL_BIDIR: &[FieldSpec] = &[
    range("voltage_limits", Range::ALL),
    range("current_draw", Range::ZERO),
    range("voltage_out", Range::ZERO),
    range("current_limits", Range::ALL),
    range("input_thresholds", Range::EMPTY),
    range("output_thresholds", Range::ALL),
    flag("pullup_capable", false),
    flag("pulldown_capable", false),
    flag("bridged_internal", false),
];

const PASSIVE: &[FieldSpec] = &[derived("current_draw", FieldKind::Range)];

const I2C_CONTROLLER: &[FieldSpec] = &[
    range("frequency", Range::ZERO),
    flag("has_pullup", false),
];

const I2C_TARGET: &[FieldSpec] = &[
    range("frequency_limit", Range::ALL),
    field("addresses", FieldKind::IntArray, FieldDefault::EmptyArray),
];

const SPI_CONTROLLER: &[FieldSpec] = &[range("frequency", Range::ZERO)];

const SPI_PERIPHERAL: &[FieldSpec] = &[range("frequency_limit", Range::ALL)];

const UART_PORT: &[FieldSpec] = &[
    range("baud", Range::ZERO),
    range("baud_limit", Range::ALL),
];

const I2C_CONTROLLER_SUBS: &[(&str, PortType)] = &[
    ("scl", PortType::DigitalSource),
    ("sda", PortType::DigitalBidir),
];
const I2C_TARGET_SUBS: &[(&str, PortType)] = &[
    ("scl", PortType::DigitalSink),
    ("sda", PortType::DigitalBidir),
];
const I2C_PULLUP_SUBS: &[(&str, PortType)] = &[
    ("scl", PortType::DigitalSource),
    ("sda", PortType::DigitalSource),
];
const SPI_CONTROLLER_SUBS: &[(&str, PortType)] = &[
    ("sck", PortType::DigitalSource),
    ("mosi", PortType::DigitalSource),
    ("miso", PortType::DigitalSink),
];
const SPI_PERIPHERAL_SUBS: &[(&str, PortType)] = &[
    ("sck", PortType::DigitalSink),
    ("mosi", PortType::DigitalSink),
    ("miso", PortType::DigitalBidir),
];
const UART_SUBS: &[(&str, PortType)] = &[
    ("tx", PortType::DigitalSource),
    ("rx", PortType::DigitalSink),
];
const CAN_CONTROLLER_SUBS: &[(&str, PortType)] = &[
    ("txd", PortType::DigitalSource),
    ("rxd", PortType::DigitalSink),
];
const CAN_TRANSCEIVER_SUBS: &[(&str, PortType)] = &[
    ("txd", PortType::DigitalSink),
    ("rxd", PortType::DigitalSource),
];

impl PortType {
    /// Every port type, in declaration order.
    pub const ALL: [PortType; 16] = [
        PortType::VoltageSource,
        PortType::VoltageSink,
        PortType::Ground,
        PortType::GroundReference,
        PortType::DigitalSource,
        PortType::DigitalSink,
        PortType::DigitalBidir,
        PortType::Passive,
        PortType::I2cController,
        PortType::I2cTarget,
        PortType::I2cPullup,
        PortType::SpiController,
        PortType::SpiPeripheral,
        PortType::UartPort,
        PortType::CanController,
        PortType::CanTransceiver,
    ];

    /// Type name as used in messages.
    pub fn name(self) -> &'static str {
        match self {
            PortType::VoltageSource => "VoltageSource",
            PortType::VoltageSink => "VoltageSink",
            PortType::Ground => "Ground",
            PortType::GroundReference => "GroundReference",
            PortType::DigitalSource => "DigitalSource",
            PortType::DigitalSink => "DigitalSink",
            PortType::DigitalBidir => "DigitalBidir",
            PortType::Passive => "Passive",
            PortType::I2cController => "I2cController",
            PortType::I2cTarget => "I2cTarget",
            PortType::I2cPullup => "I2cPullup",
            PortType::SpiController => "SpiController",
            PortType::SpiPeripheral => "SpiPeripheral",
            PortType::UartPort => "UartPort",
            PortType::CanController => "CanController",
            PortType::CanTransceiver => "CanTransceiver",
        }
    }

    /// Model fields with defaults.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            PortType::VoltageSource | PortType::GroundReference => VOLTAGE_SOURCE,
            PortType::VoltageSink | PortType::Ground => VOLTAGE_SINK,
            PortType::DigitalSource => DIGITAL_SOURCE,
            PortType::DigitalSink => DIGITAL_SINK,
            PortType::DigitalBidir => DIGITAL_BIDIR,
            PortType::Passive => PASSIVE,
            PortType::I2cController => I2C_CONTROLLER,
            PortType::I2cTarget => I2C_TARGET,
            PortType::SpiController => SPI_CONTROLLER,
            PortType::SpiPeripheral => SPI_PERIPHERAL,
            PortType::UartPort => UART_PORT,
            PortType::I2cPullup | PortType::CanController | PortType::CanTransceiver => &[],
        }
    }

    /// Looks up a model field.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Bundle sub-ports, empty for leaf port types.
    pub fn sub_ports(self) -> &'static [(&'static str, PortType)] {
        match self {
            PortType::I2cController => I2C_CONTROLLER_SUBS,
            PortType::I2cTarget => I2C_TARGET_SUBS,
            PortType::I2cPullup => I2C_PULLUP_SUBS,
            PortType::SpiController => SPI_CONTROLLER_SUBS,
            PortType::SpiPeripheral => SPI_PERIPHERAL_SUBS,
            PortType::UartPort => UART_SUBS,
            PortType::CanController => CAN_CONTROLLER_SUBS,
            PortType::CanTransceiver => CAN_TRANSCEIVER_SUBS,
            _ => &[],
        }
    }

    /// Default a bundle imposes on a field of each of its sub-ports, replacing
    /// the sub-port type's own default.
    pub fn sub_port_default(self, field: &str) -> Option<FieldDefault> {
        match (self, field) {
            (PortType::I2cPullup, "high_driver" | "low_driver") => Some(FieldDefault::Bool(false)),
            (PortType::I2cPullup, "pullup_capable") => Some(FieldDefault::Bool(true)),
            _ => None,
        }
    }

    /// Returns `true` for bundle types.
    pub fn is_bundle(self) -> bool {
        !self.sub_ports().is_empty()
    }

    /// The link a net of this port type forms.
    pub fn link_type(self) -> LinkType {
        match self {
            PortType::VoltageSource | PortType::VoltageSink => LinkType::Voltage,
            PortType::Ground | PortType::GroundReference => LinkType::Ground,
            PortType::DigitalSource | PortType::DigitalSink | PortType::DigitalBidir => {
                LinkType::Digital
            }
            PortType::Passive => LinkType::Passive,
            PortType::I2cController | PortType::I2cTarget | PortType::I2cPullup => LinkType::I2c,
            PortType::SpiController | PortType::SpiPeripheral => LinkType::Spi,
            PortType::UartPort => LinkType::Uart,
            PortType::CanController | PortType::CanTransceiver => LinkType::Can,
        }
    }

    /// Type of the link-facing port of the bridge used when a port of this
    /// type is exported to several interior ports.
    pub fn bridge_inner(self) -> Option<PortType> {
        Some(match self {
            PortType::VoltageSink => PortType::VoltageSource,
            PortType::VoltageSource => PortType::VoltageSink,
            PortType::Ground => PortType::GroundReference,
            PortType::GroundReference => PortType::Ground,
            PortType::DigitalSink => PortType::DigitalSource,
            PortType::DigitalSource => PortType::DigitalSink,
            PortType::DigitalBidir => PortType::DigitalBidir,
            PortType::Passive => PortType::Passive,
            PortType::I2cTarget => PortType::I2cController,
            PortType::I2cController => PortType::I2cTarget,
            _ => return None,
        })
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many ports a role bucket accepts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Multiplicity {
    /// At most one port.
    Single,
    /// Any number of ports.
    Many,
}

/// A role bucket of a link.
#[derive(Clone, Copy, Debug)]
pub struct RoleSpec {
    /// Role name.
    pub name: &'static str,
    /// Port type accepted.
    pub port_type: PortType,
    /// Capacity.
    pub multiplicity: Multiplicity,
}

const fn one(name: &'static str, port_type: PortType) -> RoleSpec {
    RoleSpec {
        name,
        port_type,
        multiplicity: Multiplicity::Single,
    }
}

const fn many(name: &'static str, port_type: PortType) -> RoleSpec {
    RoleSpec {
        name,
        port_type,
        multiplicity: Multiplicity::Many,
    }
}

/// A link type: the per-net aggregator for one family of port types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LinkType {
    /// Power net.
    Voltage,
    /// Ground net.
    Ground,
    /// Digital signal net.
    Digital,
    /// Untyped net.
    Passive,
    /// I2C bus.
    I2c,
    /// SPI bus.
    Spi,
    /// UART connection.
    Uart,
    /// CAN logic connection.
    Can,
}

const VOLTAGE_ROLES: &[RoleSpec] = &[
    one("source", PortType::VoltageSource),
    many("sinks", PortType::VoltageSink),
];
const GROUND_ROLES: &[RoleSpec] = &[
    one("reference", PortType::GroundReference),
    many("gnds", PortType::Ground),
];
const DIGITAL_ROLES: &[RoleSpec] = &[
    many("sources", PortType::DigitalSource),
    many("sinks", PortType::DigitalSink),
    many("bidirs", PortType::DigitalBidir),
];
const PASSIVE_ROLES: &[RoleSpec] = &[many("passives", PortType::Passive)];
const I2C_ROLES: &[RoleSpec] = &[
    one("pull", PortType::I2cPullup),
    one("controller", PortType::I2cController),
    many("targets", PortType::I2cTarget),
];
const SPI_ROLES: &[RoleSpec] = &[
    one("controller", PortType::SpiController),
    many("peripherals", PortType::SpiPeripheral),
];
const UART_ROLES: &[RoleSpec] = &[one("a", PortType::UartPort), one("b", PortType::UartPort)];
const CAN_ROLES: &[RoleSpec] = &[
    one("controller", PortType::CanController),
    one("transceiver", PortType::CanTransceiver),
];

const VOLTAGE_LINK: &[FieldSpec] = &[
    derived("voltage", FieldKind::Range),
    derived("voltage_limits", FieldKind::Range),
    derived("current_drawn", FieldKind::Range),
    derived("current_limits", FieldKind::Range),
];
const GROUND_LINK: &[FieldSpec] = &[
    derived("voltage", FieldKind::Range),
    derived("voltage_limits", FieldKind::Range),
    derived("current_drawn", FieldKind::Range),
];
const DIGITAL_LINK: &[FieldSpec] = &[
    derived("voltage", FieldKind::Range),
    derived("voltage_limits", FieldKind::Range),
    derived("current_drawn", FieldKind::Range),
    derived("current_limits", FieldKind::Range),
    derived("output_thresholds", FieldKind::Range),
    derived("input_thresholds", FieldKind::Range),
    derived("pullup_capable", FieldKind::Bool),
    derived("pulldown_capable", FieldKind::Bool),
    derived("has_high_driver", FieldKind::Bool),
    derived("has_low_driver", FieldKind::Bool),
];
const I2C_LINK: &[FieldSpec] = &[
    derived("addresses", FieldKind::IntArray),
    derived("has_pull", FieldKind::Bool),
];
const SPI_LINK: &[FieldSpec] = &[derived("frequency", FieldKind::Range)];
const UART_LINK: &[FieldSpec] = &[
    derived("a_baud", FieldKind::Range),
    derived("b_baud", FieldKind::Range),
];

impl LinkType {
    /// Link type name as used in messages.
    pub fn name(self) -> &'static str {
        match self {
            LinkType::Voltage => "VoltageLink",
            LinkType::Ground => "GroundLink",
            LinkType::Digital => "DigitalLink",
            LinkType::Passive => "PassiveLink",
            LinkType::I2c => "I2cLink",
            LinkType::Spi => "SpiLink",
            LinkType::Uart => "UartLink",
            LinkType::Can => "CanLink",
        }
    }

    /// Role buckets, in allocation order.
    pub fn roles(self) -> &'static [RoleSpec] {
        match self {
            LinkType::Voltage => VOLTAGE_ROLES,
            LinkType::Ground => GROUND_ROLES,
            LinkType::Digital => DIGITAL_ROLES,
            LinkType::Passive => PASSIVE_ROLES,
            LinkType::I2c => I2C_ROLES,
            LinkType::Spi => SPI_ROLES,
            LinkType::Uart => UART_ROLES,
            LinkType::Can => CAN_ROLES,
        }
    }

    /// Derived link fields.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            LinkType::Voltage => VOLTAGE_LINK,
            LinkType::Ground => GROUND_LINK,
            LinkType::Digital => DIGITAL_LINK,
            LinkType::I2c => I2C_LINK,
            LinkType::Spi => SPI_LINK,
            LinkType::Uart => UART_LINK,
            LinkType::Passive | LinkType::Can => &[],
        }
    }

    /// Looks up a derived field.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Returns `true` if ports of `port_type` can join this link.
    pub fn accepts(self, port_type: PortType) -> bool {
        self.roles().iter().any(|r| r.port_type == port_type)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
