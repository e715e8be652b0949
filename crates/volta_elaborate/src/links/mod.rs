//! Link derivations.
//!
//! Each link type computes its fields from the model fields of the ports in
//! its role buckets and declares the requirements that make the net valid.
//! Derivations are plain assignments and requirements in the design, so a
//! link's values are a pure function of its ports' values.

mod bundles;
mod digital;
mod ground;
mod voltage;

pub(crate) use bundles::sub_link_plan;

use volta_ir::{Expr, Kind, LinkId, LinkType, Owner, PortId};

use crate::context::ElaborationContext;
use crate::error::ElabError;

/// Adds the derivations of `link` to the design.
pub fn derive(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    match ctx.design.links[link].ltype {
        LinkType::Voltage => voltage::derive(ctx, link),
        LinkType::Ground => ground::derive(ctx, link),
        LinkType::Digital => digital::derive(ctx, link),
        LinkType::I2c => bundles::derive_i2c(ctx, link),
        LinkType::Spi => bundles::derive_spi(ctx, link),
        LinkType::Uart => bundles::derive_uart(ctx, link),
        LinkType::Passive | LinkType::Can => Ok(()),
    }
}

fn role(ctx: &ElaborationContext<'_>, link: LinkId, name: &str) -> Vec<PortId> {
    ctx.design.links[link].role(name).to_vec()
}

/// Field `field` of every port in `role`, as an array expression.
fn role_array(
    ctx: &ElaborationContext<'_>,
    link: LinkId,
    roles: &[&str],
    field: &str,
    kind: Kind,
) -> Result<Expr, ElabError> {
    let mut items = Vec::new();
    for name in roles {
        for port in ctx.design.links[link].role(name) {
            items.push(ctx.port_field(*port, field)?);
        }
    }
    Ok(Expr::array(kind, items)?)
}

fn set(
    ctx: &mut ElaborationContext<'_>,
    link: LinkId,
    field: &str,
    expr: Expr,
) -> Result<(), ElabError> {
    let param = ctx.design.links[link]
        .field(field)
        .ok_or_else(|| ElabError::UnknownName {
            path: ctx.design.link_path(link),
            what: "field",
            name: field.to_string(),
        })?;
    ctx.assign(param, expr)
}

fn require(
    ctx: &mut ElaborationContext<'_>,
    link: LinkId,
    expr: Expr,
    message: &str,
) -> Result<(), ElabError> {
    ctx.require(Owner::Link(link), expr, message)
}
