//! Digital signal nets: sources, sinks and bidirectional pins.
//!
//! Bidirectional pins count as both drivers and loads. Driver checks are
//! waived on nets containing the link-facing port of a bridge, since the
//! real drivers sit on the other side of the boundary.

use volta_ir::{Expr, Kind, LinkId};

use super::{require, role, role_array, set};
use crate::context::ElaborationContext;
use crate::error::ElabError;

const SOURCES: &[&str] = &["sources"];
const BIDIRS: &[&str] = &["bidirs"];
const DRIVERS: &[&str] = &["sources", "bidirs"];
const LOADS: &[&str] = &["sinks", "bidirs"];
const ALL: &[&str] = &["sources", "sinks", "bidirs"];

pub(super) fn derive(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    let has_bidir = !role(ctx, link, "bidirs").is_empty();
    let has_driver = has_bidir || !role(ctx, link, "sources").is_empty();

    let voltage = role_array(ctx, link, BIDIRS, "voltage_out", Kind::Range)?
        .hull_all()?
        .hull(&role_array(ctx, link, SOURCES, "voltage_out", Kind::Range)?.hull_all()?)?;
    set(ctx, link, "voltage", voltage)?;
    let limits = role_array(ctx, link, LOADS, "voltage_limits", Kind::Range)?.intersection()?;
    set(ctx, link, "voltage_limits", limits)?;
    let drawn = role_array(ctx, link, LOADS, "current_draw", Kind::Range)?.sum()?;
    set(ctx, link, "current_drawn", drawn)?;
    let current_limits = role_array(ctx, link, DRIVERS, "current_limits", Kind::Range)?.intersection()?;
    set(ctx, link, "current_limits", current_limits)?;
    let output = role_array(ctx, link, DRIVERS, "output_thresholds", Kind::Range)?.intersection()?;
    set(ctx, link, "output_thresholds", output)?;
    let input = role_array(ctx, link, LOADS, "input_thresholds", Kind::Range)?.hull_all()?;
    set(ctx, link, "input_thresholds", input)?;
    let pullup = role_array(ctx, link, ALL, "pullup_capable", Kind::Bool)?.any()?;
    set(ctx, link, "pullup_capable", pullup)?;
    let pulldown = role_array(ctx, link, ALL, "pulldown_capable", Kind::Bool)?.any()?;
    set(ctx, link, "pulldown_capable", pulldown)?;
    let high = role_array(ctx, link, SOURCES, "high_driver", Kind::Bool)?
        .any()?
        .or(&Expr::from(has_bidir))?;
    set(ctx, link, "has_high_driver", high)?;
    let low = role_array(ctx, link, SOURCES, "low_driver", Kind::Bool)?
        .any()?
        .or(&Expr::from(has_bidir))?;
    set(ctx, link, "has_low_driver", low)?;

    let voltage = ctx.link_param(link, "voltage")?;
    let overvoltage = ctx.link_param(link, "voltage_limits")?.contains(&voltage)?;
    require(ctx, link, overvoltage, "overvoltage")?;
    let drawn = ctx.link_param(link, "current_drawn")?;
    let overcurrent = ctx.link_param(link, "current_limits")?.contains(&drawn)?;
    require(ctx, link, overcurrent, "overcurrent")?;
    let input = ctx.link_param(link, "input_thresholds")?;
    let thresholds = ctx.link_param(link, "output_thresholds")?.contains(&input)?;
    require(ctx, link, thresholds, "incompatible digital thresholds")?;
    require(ctx, link, Expr::from(has_driver), "requires connected source or bidir")?;

    let bridged = role_array(ctx, link, ALL, "bridged_internal", Kind::Bool)?.any()?;
    let high = ctx.link_param(link, "has_high_driver")?;
    let low = ctx.link_param(link, "has_low_driver")?;
    let pullup = ctx.link_param(link, "pullup_capable")?;
    let pulldown = ctx.link_param(link, "pulldown_capable")?;
    let needs_low = bridged.or(&high.implies(&low.or(&pulldown)?)?)?;
    require(ctx, link, needs_low, "requires low driver or pulldown")?;
    let needs_high = bridged.or(&low.implies(&high.or(&pullup)?)?)?;
    require(ctx, link, needs_high, "requires high driver or pullup")?;

    let highs = role_array(ctx, link, SOURCES, "high_driver", Kind::Bool)?;
    let lows = role_array(ctx, link, SOURCES, "low_driver", Kind::Bool)?;
    let one = Expr::from(1i64);
    let conflict = highs
        .count()?
        .gt(&one)?
        .implies(&lows.any()?.not()?)?
        .and(&lows.count()?.gt(&one)?.implies(&highs.any()?.not()?)?)?;
    require(ctx, link, conflict, "conflicting source drivers")
}
