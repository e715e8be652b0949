//! Net finalization.
//!
//! When a block finishes, each pending net becomes one of:
//!
//! - an export, if it is one boundary port and one interior port of the
//!   same type;
//! - a bridge plus a link, if a boundary port is shared by interior ports;
//! - a link, otherwise. Ports whose type the link does not accept are first
//!   passed through an implicit adapter.

use volta_common::InternalError;
use volta_ir::{
    BlockId, Export, Link, LinkId, LinkType, Multiplicity, Owner, PortId, PortModel, PortType,
};

use crate::adapters::{self, AdapterDef, AdapterRegistry};
use crate::bridge;
use crate::context::ElaborationContext;
use crate::error::ElabError;
use crate::links;

/// Finalizes the pending nets of `block`.
pub fn finalize(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    nets: Vec<Vec<PortId>>,
) -> Result<(), ElabError> {
    for net in nets {
        if net.len() >= 2 {
            finalize_net(ctx, block, net)?;
        }
    }
    Ok(())
}

fn finalize_net(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    net: Vec<PortId>,
) -> Result<(), ElabError> {
    let (boundary, mut interior): (Vec<PortId>, Vec<PortId>) = net
        .into_iter()
        .partition(|p| ctx.design.ports[ctx.root_port(*p)].block == block);
    if let [first, second, ..] = boundary.as_slice() {
        return Err(ElabError::InvalidConnection {
            path: ctx.design.block_path(block),
            reason: format!(
                "boundary ports `{}` and `{}` cannot share a net",
                ctx.design.port_path(*first),
                ctx.design.port_path(*second)
            ),
        });
    }
    if let Some(&exterior) = boundary.first() {
        if let [only] = interior.as_slice() {
            if ctx.design.ports[*only].ptype == ctx.design.ports[exterior].ptype {
                export(ctx, exterior, *only);
                return Ok(());
            }
        }
        let inner = bridge::insert(ctx, block, exterior)?;
        interior.insert(0, inner);
    }
    let ltype = choose_link_type(ctx, block, &interior)?;
    let members = adapt_members(ctx, block, ltype, interior)?;
    let base = relative_name(ctx, block, members[0]);
    let name = unique_link_name(ctx, block, &base);
    create_link(ctx, block, None, &name, ltype, &members)?;
    Ok(())
}

/// Records `exterior` as standing in for `interior`, sub-port by sub-port.
///
/// Type defaults on the exterior port are dropped so the interior values
/// flow out through the export equalities.
pub fn export(ctx: &mut ElaborationContext<'_>, exterior: PortId, interior: PortId) {
    link_export(ctx, exterior, interior);
    ctx.design.exports.push(Export { exterior, interior });
    ctx.clear_defaults(exterior);
}

fn link_export(ctx: &mut ElaborationContext<'_>, exterior: PortId, interior: PortId) {
    ctx.design.ports[interior].export = Some(exterior);
    ctx.design.ports[exterior].interior = Some(interior);
    let pairs: Vec<(PortId, PortId)> = ctx.design.ports[exterior]
        .sub_ports
        .iter()
        .filter_map(|(name, ext)| Some((*ext, ctx.design.ports[interior].sub_port(name)?)))
        .collect();
    for (ext, int) in pairs {
        link_export(ctx, ext, int);
    }
}

/// Path of `port` relative to `block`, flattened into one name segment.
pub fn relative_name(ctx: &ElaborationContext<'_>, block: BlockId, port: PortId) -> String {
    let depth = ctx.design.block_path(block).segments().len();
    let path = ctx.design.port_path(port);
    path.segments()[depth..].join("_")
}

fn unique_link_name(ctx: &ElaborationContext<'_>, block: BlockId, base: &str) -> String {
    let taken = |n: &str| {
        ctx.design.blocks[block]
            .links
            .iter()
            .any(|l| ctx.design.links[*l].name == n)
    };
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|i| format!("{base}_{i}"))
        .find(|n| !taken(n))
        .unwrap_or_else(|| base.to_string())
}

/// The single adapter that brings a `from` port into a `ltype` net whose
/// ports have `types`.
///
/// Adapters whose destination would take a single-port role already held by
/// a member are skipped, so a passive joining a powered net becomes a sink.
fn implicit_adapter<'r>(
    registry: &'r AdapterRegistry,
    types: &[PortType],
    from: PortType,
    ltype: LinkType,
) -> Option<&'r AdapterDef> {
    let taken = |dst: PortType| {
        types.contains(&dst)
            && ltype
                .roles()
                .iter()
                .any(|r| r.port_type == dst && r.multiplicity == Multiplicity::Single)
    };
    let mut defs = registry
        .into_link(from, ltype)
        .into_iter()
        .filter(|d| !taken(d.dst));
    match (defs.next(), defs.next()) {
        (Some(def), None) => Some(def),
        _ => None,
    }
}

/// The link type of a net.
///
/// If every port shares one link type that is the answer. Otherwise each
/// candidate type is tried: it is viable when every port it does not accept
/// has exactly one implicit adapter into it. The viable type needing the
/// fewest adapters wins; a tie is ambiguous.
fn choose_link_type(
    ctx: &ElaborationContext<'_>,
    block: BlockId,
    members: &[PortId],
) -> Result<LinkType, ElabError> {
    let types: Vec<PortType> = members.iter().map(|p| ctx.design.ports[*p].ptype).collect();
    let first = types[0].link_type();
    if types.iter().all(|t| t.link_type() == first) {
        return Ok(first);
    }
    let mut candidates: Vec<LinkType> = Vec::new();
    for t in &types {
        if !candidates.contains(&t.link_type()) {
            candidates.push(t.link_type());
        }
    }
    let mut viable: Vec<(usize, LinkType)> = Vec::new();
    for ltype in candidates {
        let mut needed = 0;
        let ok = types.iter().all(|t| {
            if t.link_type() == ltype {
                return true;
            }
            needed += 1;
            implicit_adapter(ctx.adapters, &types, *t, ltype).is_some()
        });
        if ok {
            viable.push((needed, ltype));
        }
    }
    let Some(best) = viable.iter().map(|(n, _)| *n).min() else {
        let (a, b) = mismatched_pair(ctx, members);
        return Err(ElabError::IncompatiblePorts {
            a: ctx.design.ports[a].ptype,
            a_path: ctx.design.port_path(a),
            b: ctx.design.ports[b].ptype,
            b_path: ctx.design.port_path(b),
        });
    };
    let winners: Vec<LinkType> = viable
        .into_iter()
        .filter(|(n, _)| *n == best)
        .map(|(_, l)| l)
        .collect();
    match winners.as_slice() {
        [one] => Ok(*one),
        _ => Err(ElabError::AmbiguousLink {
            path: ctx.design.block_path(block),
            candidates: winners,
        }),
    }
}

/// The first two ports of a net that sit on different link types.
fn mismatched_pair(ctx: &ElaborationContext<'_>, members: &[PortId]) -> (PortId, PortId) {
    let first = members[0];
    let lt = ctx.design.ports[first].ptype.link_type();
    let other = members
        .iter()
        .copied()
        .find(|p| ctx.design.ports[*p].ptype.link_type() != lt)
        .unwrap_or(first);
    (first, other)
}

/// Replaces each port `ltype` does not accept with the destination port of
/// an implicit adapter; the port and the adapter's source form their own
/// link.
fn adapt_members(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    ltype: LinkType,
    members: Vec<PortId>,
) -> Result<Vec<PortId>, ElabError> {
    let registry = ctx.adapters;
    let types: Vec<PortType> = members.iter().map(|p| ctx.design.ports[*p].ptype).collect();
    let mut out = Vec::with_capacity(members.len());
    for port in members {
        let ptype = ctx.design.ports[port].ptype;
        if ptype.link_type() == ltype {
            out.push(port);
            continue;
        }
        let def = implicit_adapter(registry, &types, ptype, ltype).ok_or_else(|| {
            InternalError::new(format!("no implicit adapter from {ptype} into {ltype}"))
        })?;
        let base = relative_name(ctx, block, port);
        let adapter_name = format!("{base}_adapter");
        let ports = adapters::instantiate(ctx, block, def, &PortModel::new(def.dst), &adapter_name)?;
        let name = unique_link_name(ctx, block, &base);
        create_link(ctx, block, None, &name, ptype.link_type(), &[port, ports.src])?;
        tracing::debug!(
            path = %ctx.design.port_path(port),
            from = %ptype,
            to = %def.dst,
            "applied implicit adapter"
        );
        out.push(ports.dst);
    }
    Ok(out)
}

/// Allocates a link over `members`, its fields, its bus sub-links and its
/// derivations.
fn create_link(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    parent: Option<LinkId>,
    name: &str,
    ltype: LinkType,
    members: &[PortId],
) -> Result<LinkId, ElabError> {
    let specs = ltype.roles();
    let mut roles: Vec<(String, Vec<PortId>)> =
        specs.iter().map(|r| (r.name.to_string(), Vec::new())).collect();
    for &port in members {
        let ptype = ctx.design.ports[port].ptype;
        let slot = specs.iter().zip(&roles).position(|(r, (_, held))| {
            r.port_type == ptype && (r.multiplicity == Multiplicity::Many || held.is_empty())
        });
        let Some(slot) = slot else {
            return Err(ElabError::NoRole {
                link: ltype,
                ptype,
                path: ctx.design.port_path(port),
            });
        };
        roles[slot].1.push(port);
    }
    let link = ctx.design.links.alloc(Link {
        name: name.to_string(),
        ltype,
        block,
        parent,
        roles,
        fields: Vec::new(),
        sub_links: Vec::new(),
    });
    for spec in ltype.fields() {
        let param = ctx.new_param(Owner::Link(link), spec.name, spec.kind.kind());
        ctx.design.links[link].fields.push((spec.name.to_string(), param));
    }
    if parent.is_none() {
        ctx.design.blocks[block].links.push(link);
    }
    for &port in members {
        ctx.design.ports[port].link = Some(link);
    }
    for (sub_name, parts) in links::sub_link_plan(ltype) {
        let mut sub_members = Vec::new();
        for (role, sub_port) in parts.iter() {
            for port in ctx.design.links[link].role(role) {
                if let Some(sub) = ctx.design.ports[*port].sub_port(sub_port) {
                    sub_members.push(sub);
                }
            }
        }
        let sub_type = match sub_members.first() {
            Some(p) => ctx.design.ports[*p].ptype.link_type(),
            None => continue,
        };
        let sub = create_link(ctx, block, Some(link), sub_name, sub_type, &sub_members)?;
        ctx.design.links[link].sub_links.push((sub_name.to_string(), sub));
    }
    links::derive(ctx, link)?;
    tracing::debug!(
        path = %ctx.design.link_path(link),
        ltype = %ltype,
        members = members.len(),
        "created link"
    );
    Ok(link)
}
