//! Port prototypes: a port type plus explicit field initializers.

use crate::expr::Expr;
use crate::range::Range;
use crate::types::PortType;
use serde::{Deserialize, Serialize};

/// A port declaration: its type and the fields it sets explicitly.
///
/// Fields not listed take the type's defaults. Prototypes are also what
/// `adapt_to` binds to an adapter's arguments, by field name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortModel {
    /// Port type.
    pub ptype: PortType,
    /// Explicit initializers, in declaration order.
    pub inits: Vec<(String, Expr)>,
    /// Fields left symbolic regardless of the type default.
    pub empty: Vec<String>,
}

impl PortModel {
    /// A prototype with every field at its default.
    pub fn new(ptype: PortType) -> Self {
        Self {
            ptype,
            inits: Vec::new(),
            empty: Vec::new(),
        }
    }

    /// Sets `field` to `value`, replacing an earlier initializer.
    pub fn with(mut self, field: &str, value: impl Into<Expr>) -> Self {
        let value = value.into();
        self.empty.retain(|f| f != field);
        match self.inits.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => self.inits.push((field.to_string(), value)),
        }
        self
    }

    /// Leaves `field` symbolic instead of defaulting it.
    pub fn without_default(mut self, field: &str) -> Self {
        self.inits.retain(|(name, _)| name != field);
        if !self.empty.iter().any(|f| f == field) {
            self.empty.push(field.to_string());
        }
        self
    }

    /// A prototype with every range and flag field left symbolic.
    pub fn empty(ptype: PortType) -> Self {
        ptype
            .fields()
            .iter()
            .fold(Self::new(ptype), |m, f| m.without_default(f.name))
    }

    /// The initializer for `field`, if any.
    pub fn init(&self, field: &str) -> Option<&Expr> {
        self.inits
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, e)| e)
    }

    /// Power input with the given limits and draw.
    pub fn voltage_sink(voltage_limits: Range, current_draw: Range) -> Self {
        Self::new(PortType::VoltageSink)
            .with("voltage_limits", voltage_limits)
            .with("current_draw", current_draw)
    }

    /// Power output with the given voltage and current limits.
    pub fn voltage_source(voltage_out: Range, current_limits: Range) -> Self {
        Self::new(PortType::VoltageSource)
            .with("voltage_out", voltage_out)
            .with("current_limits", current_limits)
    }

    /// A push-pull digital output driving both levels.
    pub fn push_pull(voltage_out: Range, output_thresholds: Range) -> Self {
        Self::new(PortType::DigitalSource)
            .with("voltage_out", voltage_out)
            .with("output_thresholds", output_thresholds)
    }

    /// An open-drain output that only drives low.
    pub fn open_drain(output_thresholds: Range) -> Self {
        Self::new(PortType::DigitalSource)
            .with("output_thresholds", output_thresholds)
            .with("high_driver", false)
            .with("low_driver", true)
    }

    /// A pull-up resistor to `voltage_out`.
    pub fn pull_up(voltage_out: Range) -> Self {
        Self::new(PortType::DigitalSource)
            .with("voltage_out", voltage_out)
            .with("high_driver", false)
            .with("low_driver", false)
            .with("pullup_capable", true)
    }

    /// A pull-down resistor.
    pub fn pull_down() -> Self {
        Self::new(PortType::DigitalSource)
            .with("high_driver", false)
            .with("low_driver", false)
            .with("pulldown_capable", true)
    }

    /// A digital input with limits and thresholds.
    pub fn digital_sink(voltage_limits: Range, input_thresholds: Range) -> Self {
        Self::new(PortType::DigitalSink)
            .with("voltage_limits", voltage_limits)
            .with("input_thresholds", input_thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn with_replaces_previous_init() {
        let m = PortModel::new(PortType::VoltageSink)
            .with("current_draw", Range::new(0.0, 0.1))
            .with("current_draw", Range::new(0.0, 0.2));
        assert_eq!(m.inits.len(), 1);
        assert_eq!(
            m.init("current_draw").and_then(Expr::as_literal),
            Some(&Value::Range(Range::new(0.0, 0.2)))
        );
    }

    #[test]
    fn open_drain_drives_low_only() {
        let m = PortModel::open_drain(Range::new(0.0, 3.3));
        assert_eq!(m.init("high_driver").and_then(Expr::as_literal), Some(&Value::Bool(false)));
        assert_eq!(m.init("low_driver").and_then(Expr::as_literal), Some(&Value::Bool(true)));
    }

    #[test]
    fn empty_clears_all_defaults() {
        let m = PortModel::empty(PortType::VoltageSink);
        assert!(m.inits.is_empty());
        assert_eq!(m.empty, ["voltage_limits", "current_draw"]);
        let m = m.with("current_draw", Range::ZERO);
        assert_eq!(m.empty, ["voltage_limits"]);
    }
}
