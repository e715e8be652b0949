//! Power nets: one source, any number of sinks.

use volta_ir::{Expr, Kind, LinkId};

use super::{require, role, role_array, set};
use crate::context::ElaborationContext;
use crate::error::ElabError;

pub(super) fn derive(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    let source = role(ctx, link, "source").first().copied();
    if let Some(source) = source {
        let voltage = ctx.port_field(source, "voltage_out")?;
        let limits = ctx.port_field(source, "current_limits")?;
        set(ctx, link, "voltage", voltage)?;
        set(ctx, link, "current_limits", limits)?;
    }
    let voltage_limits = role_array(ctx, link, &["sinks"], "voltage_limits", Kind::Range)?.intersection()?;
    set(ctx, link, "voltage_limits", voltage_limits)?;
    let current_drawn = role_array(ctx, link, &["sinks"], "current_draw", Kind::Range)?.sum()?;
    set(ctx, link, "current_drawn", current_drawn)?;

    require(ctx, link, Expr::from(source.is_some()), "requires a connected source")?;
    let voltage = ctx.link_param(link, "voltage")?;
    let overvoltage = ctx.link_param(link, "voltage_limits")?.contains(&voltage)?;
    require(ctx, link, overvoltage, "overvoltage")?;
    let drawn = ctx.link_param(link, "current_drawn")?;
    let overcurrent = ctx.link_param(link, "current_limits")?.contains(&drawn)?;
    require(ctx, link, overcurrent, "overcurrent")
}
