//! Bus links. Their signal lines are carried by digital sub-links built from
//! the matching sub-ports of each role; the bus link itself only derives the
//! bus-level fields.

use volta_ir::{Expr, Kind, LinkId, LinkType};

use super::{require, role, role_array, set};
use crate::context::ElaborationContext;
use crate::error::ElabError;

type SubLinkPlan = &'static [(&'static str, &'static [(&'static str, &'static str)])];

/// Sub-links of a bus link: name, then the `(role, sub-port)` pairs whose
/// ports join it.
pub(crate) fn sub_link_plan(ltype: LinkType) -> SubLinkPlan {
    match ltype {
        LinkType::I2c => &[
            (
                "scl",
                &[("pull", "scl"), ("controller", "scl"), ("targets", "scl")],
            ),
            (
                "sda",
                &[("pull", "sda"), ("controller", "sda"), ("targets", "sda")],
            ),
        ],
        LinkType::Spi => &[
            ("sck", &[("controller", "sck"), ("peripherals", "sck")]),
            ("mosi", &[("controller", "mosi"), ("peripherals", "mosi")]),
            ("miso", &[("controller", "miso"), ("peripherals", "miso")]),
        ],
        LinkType::Uart => &[
            ("a_to_b", &[("a", "tx"), ("b", "rx")]),
            ("b_to_a", &[("b", "tx"), ("a", "rx")]),
        ],
        LinkType::Can => &[
            ("txd", &[("controller", "txd"), ("transceiver", "txd")]),
            ("rxd", &[("controller", "rxd"), ("transceiver", "rxd")]),
        ],
        _ => &[],
    }
}

pub(super) fn derive_i2c(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    let pull = !role(ctx, link, "pull").is_empty();
    let controller = role(ctx, link, "controller").first().copied();

    let addresses = role_array(ctx, link, &["targets"], "addresses", Kind::array_of(Kind::Int))?.flatten()?;
    set(ctx, link, "addresses", addresses)?;
    let has_pull = match controller {
        Some(c) => Expr::from(pull).or(&ctx.port_field(c, "has_pullup")?)?,
        None => Expr::from(pull),
    };
    set(ctx, link, "has_pull", has_pull)?;

    require(ctx, link, Expr::from(controller.is_some()), "requires a connected controller")?;
    let has_pull = ctx.link_param(link, "has_pull")?;
    require(ctx, link, has_pull, "requires pullup")?;
    let unique = ctx.link_param(link, "addresses")?.all_unique()?;
    require(ctx, link, unique, "conflicting addresses on I2C bus")?;
    if let Some(c) = controller {
        let frequency = ctx.port_field(c, "frequency")?;
        let limit = role_array(ctx, link, &["targets"], "frequency_limit", Kind::Range)?.intersection()?;
        require(ctx, link, limit.contains(&frequency)?, "frequency exceeds target limits")?;
    }
    Ok(())
}

pub(super) fn derive_spi(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    let controller = role(ctx, link, "controller").first().copied();
    if let Some(c) = controller {
        let frequency = ctx.port_field(c, "frequency")?;
        set(ctx, link, "frequency", frequency)?;
    }
    require(ctx, link, Expr::from(controller.is_some()), "requires a connected controller")?;
    let frequency = ctx.link_param(link, "frequency")?;
    let limit = role_array(ctx, link, &["peripherals"], "frequency_limit", Kind::Range)?.intersection()?;
    require(ctx, link, limit.contains(&frequency)?, "frequency exceeds peripheral limits")
}

pub(super) fn derive_uart(ctx: &mut ElaborationContext<'_>, link: LinkId) -> Result<(), ElabError> {
    let (Some(a), Some(b)) = (
        role(ctx, link, "a").first().copied(),
        role(ctx, link, "b").first().copied(),
    ) else {
        return require(ctx, link, Expr::from(false), "requires two connected ports");
    };
    let a_baud = ctx.port_field(a, "baud")?;
    let b_baud = ctx.port_field(b, "baud")?;
    set(ctx, link, "a_baud", a_baud)?;
    set(ctx, link, "b_baud", b_baud)?;

    let a_baud = ctx.link_param(link, "a_baud")?;
    let b_baud = ctx.link_param(link, "b_baud")?;
    let a_to_b = ctx.port_field(b, "baud_limit")?.contains(&a_baud)?;
    require(ctx, link, a_to_b, "baud rate outside receiver limits (a to b)")?;
    let b_to_a = ctx.port_field(a, "baud_limit")?.contains(&b_baud)?;
    require(ctx, link, b_to_a, "baud rate outside receiver limits (b to a)")
}
