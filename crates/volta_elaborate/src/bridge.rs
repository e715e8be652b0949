//! Bridges.
//!
//! A boundary port shared by several interior ports cannot be a plain export,
//! so the block gets a bridge: `outer` is exported to the boundary port and
//! `inner` (the complementary type) joins the interior net. The equations
//! carry link values across in both directions so the exterior sees the
//! aggregate of the interior ports and the interior sees the exterior supply.

use volta_ir::{BlockId, BlockKind, Expr, PortId, PortModel, PortType, Range};

use crate::connect;
use crate::context::ElaborationContext;
use crate::error::ElabError;

/// Inserts a bridge for `exterior` into `block` and returns its link-facing
/// port.
pub fn insert(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    exterior: PortId,
) -> Result<PortId, ElabError> {
    let ptype = ctx.design.ports[exterior].ptype;
    let inner_type = ptype.bridge_inner().ok_or_else(|| ElabError::InvalidConnection {
        path: ctx.design.port_path(exterior),
        reason: format!("{ptype} ports cannot be bridged to several interior ports"),
    })?;
    let base = format!("{}_bridge", connect::relative_name(ctx, block, exterior));
    let name = ctx.unique_child_name(block, &base);
    let bridge = ctx.alloc_block(Some(block), &name, &format!("bridge.{ptype}"), BlockKind::Bridge)?;
    let outer = ctx.declare_port(bridge, "outer", &PortModel::new(ptype), false)?;
    let inner = ctx.declare_port(bridge, "inner", &PortModel::new(inner_type), false)?;
    equations(ctx, ptype, outer, inner)?;
    connect::export(ctx, exterior, outer);
    tracing::debug!(path = %ctx.design.block_path(bridge), ptype = %ptype, "inserted bridge");
    Ok(inner)
}

/// `outer.<field> := link(inner).<link_field>` for each pair.
fn outward(
    ctx: &mut ElaborationContext<'_>,
    outer: PortId,
    inner: PortId,
    pairs: &[(&str, &str)],
) -> Result<(), ElabError> {
    for (field, link_field) in pairs {
        let expr = ctx.link_field(inner, link_field)?;
        ctx.assign_field(outer, field, expr)?;
    }
    Ok(())
}

/// `inner.<field> := link(outer).<link_field>` for each pair.
fn inward(
    ctx: &mut ElaborationContext<'_>,
    outer: PortId,
    inner: PortId,
    pairs: &[(&str, &str)],
) -> Result<(), ElabError> {
    outward(ctx, inner, outer, pairs)
}

fn fixed(ctx: &mut ElaborationContext<'_>, port: PortId, fields: &[(&str, Expr)]) -> Result<(), ElabError> {
    for (field, expr) in fields {
        ctx.assign_field(port, field, expr.clone())?;
    }
    Ok(())
}

/// Marks the inner port of a digital bridge so driver checks on the interior
/// net are waived, and keeps it from contributing pulls of its own.
fn digital_inner(ctx: &mut ElaborationContext<'_>, inner: PortId) -> Result<(), ElabError> {
    fixed(
        ctx,
        inner,
        &[
            ("pullup_capable", Expr::from(false)),
            ("pulldown_capable", Expr::from(false)),
            ("bridged_internal", Expr::from(true)),
        ],
    )
}

fn equations(
    ctx: &mut ElaborationContext<'_>,
    ptype: PortType,
    outer: PortId,
    inner: PortId,
) -> Result<(), ElabError> {
    match ptype {
        PortType::VoltageSink | PortType::Ground => {
            outward(
                ctx,
                outer,
                inner,
                &[("current_draw", "current_drawn"), ("voltage_limits", "voltage_limits")],
            )?;
            inward(ctx, outer, inner, &[("voltage_out", "voltage")])?;
            fixed(ctx, inner, &[("current_limits", Expr::from(Range::ALL))])
        }
        PortType::VoltageSource => {
            outward(
                ctx,
                outer,
                inner,
                &[("voltage_out", "voltage"), ("current_limits", "current_limits")],
            )?;
            inward(ctx, outer, inner, &[("current_draw", "current_drawn")])?;
            fixed(ctx, inner, &[("voltage_limits", Expr::from(Range::ALL))])
        }
        PortType::GroundReference => {
            outward(ctx, outer, inner, &[("voltage_out", "voltage")])?;
            inward(ctx, outer, inner, &[("current_draw", "current_drawn")])?;
            fixed(ctx, inner, &[("voltage_limits", Expr::from(Range::ALL))])
        }
        PortType::DigitalSink => {
            outward(
                ctx,
                outer,
                inner,
                &[
                    ("voltage_limits", "voltage_limits"),
                    ("current_draw", "current_drawn"),
                    ("input_thresholds", "input_thresholds"),
                    ("pullup_capable", "pullup_capable"),
                    ("pulldown_capable", "pulldown_capable"),
                ],
            )?;
            inward(
                ctx,
                outer,
                inner,
                &[
                    ("voltage_out", "voltage"),
                    ("output_thresholds", "output_thresholds"),
                    ("high_driver", "has_high_driver"),
                    ("low_driver", "has_low_driver"),
                ],
            )?;
            fixed(ctx, inner, &[("current_limits", Expr::from(Range::ALL))])?;
            digital_inner(ctx, inner)
        }
        PortType::DigitalSource => {
            outward(
                ctx,
                outer,
                inner,
                &[
                    ("voltage_out", "voltage"),
                    ("current_limits", "current_limits"),
                    ("output_thresholds", "output_thresholds"),
                    ("high_driver", "has_high_driver"),
                    ("low_driver", "has_low_driver"),
                    ("pullup_capable", "pullup_capable"),
                    ("pulldown_capable", "pulldown_capable"),
                ],
            )?;
            inward(ctx, outer, inner, &[("current_draw", "current_drawn")])?;
            fixed(
                ctx,
                inner,
                &[
                    ("voltage_limits", Expr::from(Range::ALL)),
                    ("input_thresholds", Expr::from(Range::EMPTY)),
                ],
            )?;
            digital_inner(ctx, inner)
        }
        PortType::DigitalBidir => {
            outward(
                ctx,
                outer,
                inner,
                &[
                    ("voltage_out", "voltage"),
                    ("current_draw", "current_drawn"),
                    ("voltage_limits", "voltage_limits"),
                    ("current_limits", "current_limits"),
                    ("output_thresholds", "output_thresholds"),
                    ("input_thresholds", "input_thresholds"),
                    ("pullup_capable", "pullup_capable"),
                    ("pulldown_capable", "pulldown_capable"),
                ],
            )?;
            fixed(
                ctx,
                inner,
                &[
                    ("voltage_limits", Expr::from(Range::ALL)),
                    ("current_limits", Expr::from(Range::ALL)),
                ],
            )?;
            digital_inner(ctx, inner)
        }
        PortType::I2cTarget => {
            sub_bridges(ctx, outer, inner)?;
            outward(ctx, outer, inner, &[("addresses", "addresses")])?;
            inward(ctx, outer, inner, &[("has_pullup", "has_pull")])
        }
        PortType::I2cController => {
            sub_bridges(ctx, outer, inner)?;
            outward(ctx, outer, inner, &[("has_pullup", "has_pull")])?;
            inward(ctx, outer, inner, &[("addresses", "addresses")])
        }
        _ => Ok(()),
    }
}

fn sub_bridges(ctx: &mut ElaborationContext<'_>, outer: PortId, inner: PortId) -> Result<(), ElabError> {
    let pairs: Vec<(PortId, PortType, PortId)> = ctx.design.ports[outer]
        .sub_ports
        .iter()
        .filter_map(|(name, o)| {
            let i = ctx.design.ports[inner].sub_port(name)?;
            Some((*o, ctx.design.ports[*o].ptype, i))
        })
        .collect();
    for (o, ptype, i) in pairs {
        equations(ctx, ptype, o, i)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterRegistry;
    use crate::registry::LibraryRegistry;
    use volta_config::RefinementConfig;

    fn with_ctx(f: impl FnOnce(&mut ElaborationContext<'_>)) {
        let library = LibraryRegistry::new();
        let adapters = AdapterRegistry::new();
        let refinements = RefinementConfig::default();
        let mut ctx = ElaborationContext::new(&library, &adapters, &refinements);
        f(&mut ctx);
    }

    #[test]
    fn bridge_exports_outer_and_returns_inner() {
        with_ctx(|ctx| {
            let top = ctx.alloc_block(None, "", "test.Top", BlockKind::Hierarchy).unwrap();
            ctx.design.top = Some(top);
            let pwr = ctx
                .declare_port(top, "pwr", &PortModel::new(PortType::VoltageSink), false)
                .unwrap();
            let inner = insert(ctx, top, pwr).unwrap();
            assert_eq!(ctx.design.ports[inner].ptype, PortType::VoltageSource);
            let bridge = ctx.design.ports[inner].block;
            assert_eq!(ctx.design.blocks[bridge].kind, BlockKind::Bridge);
            assert_eq!(ctx.design.blocks[bridge].name, "pwr_bridge");
            let outer = ctx.design.find_port(bridge, "outer").unwrap();
            assert_eq!(ctx.design.ports[outer].export, Some(pwr));
            assert_eq!(ctx.design.ports[pwr].interior, Some(outer));
        });
    }

    #[test]
    fn bundle_bridge_pairs_sub_ports() {
        with_ctx(|ctx| {
            let top = ctx.alloc_block(None, "", "test.Top", BlockKind::Hierarchy).unwrap();
            let i2c = ctx
                .declare_port(top, "i2c", &PortModel::new(PortType::I2cTarget), false)
                .unwrap();
            let inner = insert(ctx, top, i2c).unwrap();
            let scl = ctx.design.ports[inner].sub_port("scl").unwrap();
            assert_eq!(ctx.design.ports[scl].ptype, PortType::DigitalSource);
            let bridged = ctx.field_param(scl, "bridged_internal").unwrap();
            assert_eq!(ctx.design.assign_of(bridged), Some(&Expr::from(true)));
            let outer_scl = ctx.design.ports[i2c].sub_port("scl").unwrap();
            assert!(ctx.design.ports[outer_scl].interior.is_some());
        });
    }

    #[test]
    fn unbridgeable_type_rejected() {
        with_ctx(|ctx| {
            let top = ctx.alloc_block(None, "", "test.Top", BlockKind::Hierarchy).unwrap();
            let uart = ctx
                .declare_port(top, "uart", &PortModel::new(PortType::UartPort), false)
                .unwrap();
            let err = insert(ctx, top, uart).unwrap_err();
            assert!(matches!(err, ElabError::InvalidConnection { .. }));
        });
    }
}
