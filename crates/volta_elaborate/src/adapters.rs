//! Type-converting adapters.
//!
//! An adapter is a two-port block: `src` joins the net of the port being
//! adapted, `dst` is a fresh port of the requested type. Fields named in the
//! destination prototype are bound to the adapter's arguments by name; the
//! adapter's equations fill in the rest, including the current the `src`
//! side must report so that draw is conserved across the conversion.

use volta_ir::{BlockId, BlockKind, Expr, LinkType, PortId, PortModel, PortType, Range};

use crate::context::ElaborationContext;
use crate::error::ElabError;

/// The two ports of an instantiated adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterPorts {
    /// The adapter block.
    pub block: BlockId,
    /// Port joining the adapted net.
    pub src: PortId,
    /// Port of the requested type.
    pub dst: PortId,
}

/// Equations an adapter adds once its ports exist.
pub type AdapterEquations = fn(&mut ElaborationContext<'_>, AdapterPorts) -> Result<(), ElabError>;

/// A registered adapter.
#[derive(Clone)]
pub struct AdapterDef {
    /// Type of the `src` port.
    pub src: PortType,
    /// Type of the `dst` port.
    pub dst: PortType,
    /// Destination fields a prototype may set.
    pub args: &'static [&'static str],
    equations: AdapterEquations,
}

impl AdapterDef {
    /// Defines an adapter.
    pub fn new(
        src: PortType,
        dst: PortType,
        args: &'static [&'static str],
        equations: AdapterEquations,
    ) -> Self {
        Self {
            src,
            dst,
            args,
            equations,
        }
    }

    /// Class name of the adapter block.
    pub fn class(&self) -> String {
        format!("adapter.{}To{}", self.src, self.dst)
    }
}

impl std::fmt::Debug for AdapterDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterDef")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("args", &self.args)
            .finish()
    }
}

/// Adapters by port-type pair.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<AdapterDef>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard adapter set.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        for def in standard_adapters() {
            let registered = reg.register(def);
            debug_assert!(registered.is_ok(), "duplicate standard adapter: {registered:?}");
        }
        reg
    }

    /// Registers an adapter. A second adapter for the same pair is an error.
    pub fn register(&mut self, def: AdapterDef) -> Result<(), ElabError> {
        if self.find(def.src, def.dst).is_some() {
            return Err(ElabError::AmbiguousAdapter {
                src: def.src,
                dst: def.dst,
            });
        }
        self.adapters.push(def);
        Ok(())
    }

    /// The adapter for exactly this pair.
    pub fn find(&self, src: PortType, dst: PortType) -> Option<&AdapterDef> {
        self.adapters.iter().find(|a| a.src == src && a.dst == dst)
    }

    /// Adapters whose `src` can share a link with a `from` port and whose
    /// `dst` is `dst`.
    pub fn from_port(&self, from: PortType, dst: PortType) -> Vec<&AdapterDef> {
        self.adapters
            .iter()
            .filter(|a| a.src.link_type() == from.link_type() && a.dst == dst)
            .collect()
    }

    /// Adapters taking a `from` port's net into a link of type `link`.
    pub fn into_link(&self, from: PortType, link: LinkType) -> Vec<&AdapterDef> {
        self.adapters
            .iter()
            .filter(|a| a.src.link_type() == from.link_type() && a.dst.link_type() == link)
            .collect()
    }

    /// All adapters, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AdapterDef> {
        self.adapters.iter()
    }
}

/// Instantiates `def` inside `parent` with `prototype` bound to its arguments.
pub fn instantiate(
    ctx: &mut ElaborationContext<'_>,
    parent: BlockId,
    def: &AdapterDef,
    prototype: &PortModel,
    name: &str,
) -> Result<AdapterPorts, ElabError> {
    if let Some((arg, _)) = prototype
        .inits
        .iter()
        .find(|(field, _)| !def.args.contains(&field.as_str()))
    {
        return Err(ElabError::UnknownAdapterArg {
            src: def.src,
            dst: def.dst,
            arg: arg.clone(),
        });
    }
    let name = ctx.unique_child_name(parent, name);
    let block = ctx.alloc_block(Some(parent), &name, &def.class(), BlockKind::Adapter)?;
    let src = ctx.declare_port(block, "src", &PortModel::new(def.src), false)?;
    let dst_model = PortModel {
        ptype: def.dst,
        inits: prototype.inits.clone(),
        empty: prototype.empty.clone(),
    };
    let dst = ctx.declare_port(block, "dst", &dst_model, false)?;
    let ports = AdapterPorts { block, src, dst };
    (def.equations)(ctx, ports)?;
    tracing::debug!(
        path = %ctx.design.block_path(block),
        src = %def.src,
        dst = %def.dst,
        "inserted adapter"
    );
    Ok(ports)
}

const VOLTAGE_SINK_ARGS: &[&str] = &["voltage_limits", "current_draw"];
const VOLTAGE_SOURCE_ARGS: &[&str] = &["voltage_out", "current_limits"];
const DIGITAL_SOURCE_ARGS: &[&str] = &[
    "voltage_out",
    "current_limits",
    "output_thresholds",
    "high_driver",
    "low_driver",
    "pullup_capable",
    "pulldown_capable",
];
const DIGITAL_SINK_ARGS: &[&str] = &[
    "voltage_limits",
    "current_draw",
    "input_thresholds",
    "pullup_capable",
    "pulldown_capable",
];
const DIGITAL_BIDIR_ARGS: &[&str] = &[
    "voltage_limits",
    "current_draw",
    "voltage_out",
    "current_limits",
    "input_thresholds",
    "output_thresholds",
    "pullup_capable",
    "pulldown_capable",
];

/// `src.current_draw := dst.current_draw`
fn draw_from_dst_port(ctx: &mut ElaborationContext<'_>, p: AdapterPorts) -> Result<(), ElabError> {
    let draw = ctx.port_field(p.dst, "current_draw")?;
    ctx.assign_field(p.src, "current_draw", draw)
}

/// `src.current_draw := dst link current_drawn`
fn draw_from_dst_link(ctx: &mut ElaborationContext<'_>, p: AdapterPorts) -> Result<(), ElabError> {
    let drawn = ctx.link_field(p.dst, "current_drawn")?;
    ctx.assign_field(p.src, "current_draw", drawn)
}

fn rail_to_digital(ctx: &mut ElaborationContext<'_>, p: AdapterPorts) -> Result<(), ElabError> {
    let voltage = ctx.link_field(p.src, "voltage")?;
    ctx.assign_field(p.src, "voltage_limits", Expr::from(Range::ALL))?;
    ctx.assign_field(p.dst, "voltage_out", voltage.clone())?;
    let thresholds = Expr::bounds(&Expr::from(f64::NEG_INFINITY), &voltage.upper()?)?;
    ctx.assign_field(p.dst, "output_thresholds", thresholds)?;
    draw_from_dst_link(ctx, p)
}

fn rail_to_ground(ctx: &mut ElaborationContext<'_>, p: AdapterPorts) -> Result<(), ElabError> {
    let voltage = ctx.link_field(p.src, "voltage")?;
    ctx.assign_field(p.src, "voltage_limits", Expr::from(Range::ALL))?;
    ctx.assign_field(p.dst, "voltage_out", voltage)?;
    draw_from_dst_link(ctx, p)
}

fn digital_to_rail(ctx: &mut ElaborationContext<'_>, p: AdapterPorts) -> Result<(), ElabError> {
    let low = ctx.link_field(p.src, "output_thresholds")?.upper()?;
    let high = ctx.link_field(p.src, "voltage")?.upper()?;
    ctx.assign_field(p.dst, "voltage_out", Expr::bounds(&low, &high)?)?;
    draw_from_dst_link(ctx, p)
}

fn standard_adapters() -> Vec<AdapterDef> {
    vec![
        AdapterDef::new(
            PortType::Passive,
            PortType::VoltageSink,
            VOLTAGE_SINK_ARGS,
            draw_from_dst_port,
        ),
        AdapterDef::new(
            PortType::Passive,
            PortType::VoltageSource,
            VOLTAGE_SOURCE_ARGS,
            draw_from_dst_link,
        ),
        AdapterDef::new(
            PortType::Passive,
            PortType::DigitalSource,
            DIGITAL_SOURCE_ARGS,
            draw_from_dst_link,
        ),
        AdapterDef::new(
            PortType::Passive,
            PortType::DigitalSink,
            DIGITAL_SINK_ARGS,
            draw_from_dst_port,
        ),
        AdapterDef::new(
            PortType::Passive,
            PortType::DigitalBidir,
            DIGITAL_BIDIR_ARGS,
            draw_from_dst_port,
        ),
        AdapterDef::new(
            PortType::VoltageSink,
            PortType::DigitalSource,
            &["current_limits"],
            rail_to_digital,
        ),
        AdapterDef::new(
            PortType::VoltageSink,
            PortType::GroundReference,
            &[],
            rail_to_ground,
        ),
        AdapterDef::new(
            PortType::DigitalSink,
            PortType::VoltageSource,
            &["current_limits"],
            digital_to_rail,
        ),
    ]
}
