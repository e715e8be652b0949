//! Ground nets. The reference is optional; without one the net sits at 0 V.

use volta_ir::{Expr, Kind, LinkId, Range};

use super::{require, role, role_array, set};
use crate::context::ElaborationContext;
use crate::error::ElabError;

pub(super) fn derive(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    let reference = role(ctx, link, "reference").first().copied();
    let voltage = match reference {
        Some(r) => ctx.port_field(r, "voltage_out")?,
        None => Expr::from(Range::ZERO),
    };
    set(ctx, link, "voltage", voltage)?;
    let limits = role_array(ctx, link, &["gnds"], "voltage_limits", Kind::Range)?.intersection()?;
    set(ctx, link, "voltage_limits", limits)?;
    let drawn = role_array(ctx, link, &["gnds"], "current_draw", Kind::Range)?.sum()?;
    set(ctx, link, "current_drawn", drawn)?;

    let voltage = ctx.link_param(link, "voltage")?;
    let overvoltage = ctx.link_param(link, "voltage_limits")?.contains(&voltage)?;
    require(ctx, link, overvoltage, "overvoltage")?;
    if let Some(r) = reference {
        let drawn = ctx.link_param(link, "current_drawn")?;
        let overcurrent = ctx.port_field(r, "current_limits")?.contains(&drawn)?;
        require(ctx, link, overcurrent, "overcurrent")?;
    }
    Ok(())
}
