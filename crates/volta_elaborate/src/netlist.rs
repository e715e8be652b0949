//! Flat netlist view of an elaborated design.
//!
//! Ports are grouped into electrical nodes with a union-find: link members,
//! exports, and the two sides of bridges and adapters all share a node. Each
//! node touching a footprint pin becomes a net; each block with a footprint
//! becomes a part with an assigned reference designator.

use std::collections::{BTreeMap, HashMap};

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use volta_common::HierPath;
use volta_ir::{BlockKind, Design, PortId};

/// A physical part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Reference designator, e.g. `R3`.
    pub refdes: String,
    /// Block path.
    pub path: HierPath,
    /// Block class.
    pub class: String,
    /// Footprint identifier.
    pub footprint: String,
    /// Manufacturer.
    pub mfr: Option<String>,
    /// Manufacturer part number.
    pub part: Option<String>,
    /// Value annotation.
    pub value: Option<String>,
}

/// A footprint pin on a net.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetPin {
    /// Reference designator of the part.
    pub refdes: String,
    /// Footprint pin name.
    pub pin: String,
    /// Port the pin is mapped to.
    pub port: HierPath,
}

/// An electrical net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    /// Net name, from the outermost link on it.
    pub name: String,
    /// Pins, sorted.
    pub pins: Vec<NetPin>,
}

/// Parts and nets of a design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Netlist {
    /// Parts in block order.
    pub parts: Vec<Part>,
    /// Nets sorted by name.
    pub nets: Vec<Net>,
}

fn index(port: PortId) -> usize {
    port.as_raw() as usize
}

/// Unions a two-sided block's ports and their sub-ports by name.
fn join_sides(design: &Design, nodes: &mut UnionFind<usize>, a: PortId, b: PortId) {
    nodes.union(index(a), index(b));
    for (name, sub) in &design.ports[a].sub_ports {
        if let Some(other) = design.ports[b].sub_port(name) {
            join_sides(design, nodes, *sub, other);
        }
    }
}

impl Netlist {
    /// Builds the netlist of `design`.
    pub fn build(design: &Design) -> Self {
        let mut nodes = UnionFind::<usize>::new(design.ports.len());
        for (_, link) in design.links.iter() {
            let mut members = link.members();
            if let Some(first) = members.next() {
                for other in members {
                    nodes.union(index(first), index(other));
                }
            }
        }
        for (id, port) in design.ports.iter() {
            if let Some(exterior) = port.export {
                nodes.union(index(id), index(exterior));
            }
        }
        for (_, block) in design.blocks.iter() {
            let (a, b) = match block.kind {
                BlockKind::Bridge => ("outer", "inner"),
                BlockKind::Adapter => ("src", "dst"),
                BlockKind::Hierarchy => continue,
            };
            let find = |name: &str| block.ports.iter().copied().find(|p| design.ports[*p].name == name);
            if let (Some(a), Some(b)) = (find(a), find(b)) {
                join_sides(design, &mut nodes, a, b);
            }
        }

        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut parts = Vec::new();
        let mut pins: BTreeMap<usize, Vec<NetPin>> = BTreeMap::new();
        for (id, block) in design.blocks.iter() {
            let Some(fp) = &block.footprint else { continue };
            let n = counters.entry(fp.refdes_prefix.clone()).or_insert(0);
            *n += 1;
            let refdes = format!("{}{}", fp.refdes_prefix, n);
            for (pin, port) in &fp.pinning {
                pins.entry(nodes.find(index(*port))).or_default().push(NetPin {
                    refdes: refdes.clone(),
                    pin: pin.clone(),
                    port: design.port_path(*port),
                });
            }
            parts.push(Part {
                refdes,
                path: design.block_path(id),
                class: block.class.clone(),
                footprint: fp.footprint.clone(),
                mfr: fp.mfr.clone(),
                part: fp.part.clone(),
                value: fp.value.clone(),
            });
        }

        // Name each node after its shallowest link.
        let mut names: HashMap<usize, (usize, String)> = HashMap::new();
        for (id, link) in design.links.iter() {
            let Some(member) = link.members().next() else { continue };
            let path = design.link_path(id);
            let depth = path.segments().len();
            let slot = names.entry(nodes.find(index(member))).or_insert((usize::MAX, String::new()));
            if depth < slot.0 {
                *slot = (depth, path.to_string());
            }
        }
        let mut nets: Vec<Net> = pins
            .into_iter()
            .map(|(node, mut pins)| {
                pins.sort();
                let name = match names.remove(&node) {
                    Some((_, name)) => name,
                    None => format!("N${}", pins[0].port),
                };
                Net { name, pins }
            })
            .collect();
        nets.sort_by(|a, b| a.name.cmp(&b.name));
        Netlist { parts, nets }
    }

    /// The net a part pin is on.
    pub fn net_of(&self, refdes: &str, pin: &str) -> Option<&Net> {
        self.nets
            .iter()
            .find(|n| n.pins.iter().any(|p| p.refdes == refdes && p.pin == pin))
    }
}
