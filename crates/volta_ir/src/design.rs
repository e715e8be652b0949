//! The elaborated design: blocks, ports, links and parameters in arenas.
//!
//! Structure is a strict tree of blocks. Ports belong to exactly one block
//! and refer to their link by handle once the enclosing block has finalized
//! its nets. Exports record which boundary port stands in for which interior
//! port; [`Design::link_of`] follows them outward.

use crate::arena::Arena;
use crate::expr::{Expr, ExprNode};
use crate::ids::{BlockId, LinkId, ParamId, PortId};
use crate::kind::Kind;
use crate::types::{LinkType, PortType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use volta_common::HierPath;

/// What a block is for.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BlockKind {
    /// A user or library block.
    Hierarchy,
    /// A bridge inserted for a boundary port shared by several interior ports.
    Bridge,
    /// A type-converting adapter.
    Adapter,
}

/// Generator lifecycle.
///
/// `Declared` once the request set is fixed, `Waiting` while the solver works
/// on it, `Resolved` when every requested value is concrete, and `Generated`
/// after the deferred body ran exactly once.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum GeneratorPhase {
    /// Requests declared.
    Declared,
    /// At least one requested value is still symbolic.
    Waiting,
    /// All requested values are concrete.
    Resolved,
    /// The deferred body has run.
    Generated,
}

/// Generator bookkeeping of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorState {
    /// Current phase.
    pub phase: GeneratorPhase,
    /// Requested expressions, fixed at declaration.
    pub requests: Vec<Expr>,
}

/// Part metadata for a leaf block that becomes a physical component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Footprint identifier, e.g. `Resistor_SMD:R_0603_1608Metric`.
    pub footprint: String,
    /// Reference-designator prefix, e.g. `R`.
    pub refdes_prefix: String,
    /// Footprint pin name to port.
    pub pinning: Vec<(String, PortId)>,
    /// Manufacturer.
    pub mfr: Option<String>,
    /// Manufacturer part number.
    pub part: Option<String>,
    /// Value annotation, e.g. `10k`.
    pub value: Option<String>,
    /// Datasheet URL.
    pub datasheet: Option<String>,
}

/// A block instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Instance name within its parent.
    pub name: String,
    /// Qualified class name of its definition.
    pub class: String,
    /// Enclosing block, `None` for the top.
    pub parent: Option<BlockId>,
    /// Role of the block.
    pub kind: BlockKind,
    /// Ports in declaration order.
    pub ports: Vec<PortId>,
    /// Sub-blocks in declaration order.
    pub children: Vec<BlockId>,
    /// Links formed inside this block.
    pub links: Vec<LinkId>,
    /// Parameters declared by the block.
    pub params: Vec<ParamId>,
    /// Part metadata, for leaf parts.
    pub footprint: Option<Footprint>,
    /// Generator state, for generator blocks.
    pub generator: Option<GeneratorState>,
    /// Capabilities the block implements.
    pub capabilities: Vec<String>,
}

/// A port instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Port {
    /// Name within its block, bundle or vector.
    pub name: String,
    /// Owning block.
    pub block: BlockId,
    /// Port type.
    pub ptype: PortType,
    /// Enclosing bundle or vector port.
    pub parent: Option<PortId>,
    /// Model fields.
    pub fields: Vec<(String, ParamId)>,
    /// Bundle sub-ports.
    pub sub_ports: Vec<(String, PortId)>,
    /// Elements, for vector ports.
    pub elements: Option<Vec<PortId>>,
    /// Link this port joined directly.
    pub link: Option<LinkId>,
    /// Boundary port this port is exported through.
    pub export: Option<PortId>,
    /// Interior port this boundary port stands in for.
    pub interior: Option<PortId>,
    /// May be left unconnected.
    pub optional: bool,
}

impl Port {
    /// The parameter of model field `name`.
    pub fn field(&self, name: &str) -> Option<ParamId> {
        lookup(&self.fields, name)
    }

    /// The bundle sub-port `name`.
    pub fn sub_port(&self, name: &str) -> Option<PortId> {
        lookup(&self.sub_ports, name)
    }

    /// Returns `true` for vector ports.
    pub fn is_vector(&self) -> bool {
        self.elements.is_some()
    }
}

/// A link instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    /// Name within its block or parent link.
    pub name: String,
    /// Link type.
    pub ltype: LinkType,
    /// Block the net was formed in.
    pub block: BlockId,
    /// Parent link, for bundle sub-links.
    pub parent: Option<LinkId>,
    /// Role buckets in the order the link type lists them.
    pub roles: Vec<(String, Vec<PortId>)>,
    /// Derived fields.
    pub fields: Vec<(String, ParamId)>,
    /// Bundle sub-links.
    pub sub_links: Vec<(String, LinkId)>,
}

impl Link {
    /// The parameter of derived field `name`.
    pub fn field(&self, name: &str) -> Option<ParamId> {
        lookup(&self.fields, name)
    }

    /// Ports in role `name`.
    pub fn role(&self, name: &str) -> &[PortId] {
        self.roles
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ports)| ports.as_slice())
            .unwrap_or(&[])
    }

    /// All member ports, role by role.
    pub fn members(&self) -> impl Iterator<Item = PortId> + '_ {
        self.roles.iter().flat_map(|(_, ports)| ports.iter().copied())
    }

    /// The bundle sub-link `name`.
    pub fn sub_link(&self, name: &str) -> Option<LinkId> {
        lookup(&self.sub_links, name)
    }
}

fn lookup<T: Copy>(entries: &[(String, T)], name: &str) -> Option<T> {
    entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
}

/// Who declared a parameter or requirement.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Owner {
    /// A block.
    Block(BlockId),
    /// A port.
    Port(PortId),
    /// A link.
    Link(LinkId),
}

/// A parameter slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Param {
    /// Name within its owner.
    pub name: String,
    /// Declaring element.
    pub owner: Owner,
    /// Kind.
    pub kind: Kind,
}

/// A mandatory boolean invariant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Require {
    /// Declaring element.
    pub owner: Owner,
    /// Boolean expression that must hold.
    pub expr: Expr,
    /// Human-readable statement of the requirement.
    pub message: String,
}

/// A boundary port standing in for an interior port.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Export {
    /// The port on the enclosing block's boundary.
    pub exterior: PortId,
    /// The sub-block (or bridge) port it stands in for.
    pub interior: PortId,
}

/// The whole design.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Design {
    /// Block instances.
    pub blocks: Arena<BlockId, Block>,
    /// Port instances.
    pub ports: Arena<PortId, Port>,
    /// Link instances.
    pub links: Arena<LinkId, Link>,
    /// Parameters.
    pub params: Arena<ParamId, Param>,
    /// Assignment per parameter.
    pub assigns: BTreeMap<ParamId, Expr>,
    /// Requirements in declaration order.
    pub requires: Vec<Require>,
    /// Exports in declaration order.
    pub exports: Vec<Export>,
    /// Top block, once instantiated.
    pub top: Option<BlockId>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hierarchical path of a block; the top block is the root path.
    pub fn block_path(&self, id: BlockId) -> HierPath {
        let mut names = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.blocks[cur].parent {
            names.push(self.blocks[cur].name.as_str());
            cur = parent;
        }
        names
            .into_iter()
            .rev()
            .fold(HierPath::root(), |path, name| path.child(name))
    }

    /// Hierarchical path of a port.
    pub fn port_path(&self, id: PortId) -> HierPath {
        let port = &self.ports[id];
        match port.parent {
            Some(parent) => self.port_path(parent).child(&port.name),
            None => self.block_path(port.block).child(&port.name),
        }
    }

    /// Hierarchical path of a link.
    pub fn link_path(&self, id: LinkId) -> HierPath {
        let link = &self.links[id];
        match link.parent {
            Some(parent) => self.link_path(parent).child(&link.name),
            None => self.block_path(link.block).child(&link.name),
        }
    }

    /// Hierarchical path of a parameter or requirement owner.
    pub fn owner_path(&self, owner: Owner) -> HierPath {
        match owner {
            Owner::Block(b) => self.block_path(b),
            Owner::Port(p) => self.port_path(p),
            Owner::Link(l) => self.link_path(l),
        }
    }

    /// Hierarchical path of a parameter.
    pub fn param_path(&self, id: ParamId) -> HierPath {
        let param = &self.params[id];
        self.owner_path(param.owner).child(&param.name)
    }

    /// The link a port participates in, following exports outward.
    pub fn link_of(&self, port: PortId) -> Option<LinkId> {
        let mut cur = port;
        loop {
            let p = &self.ports[cur];
            if let Some(link) = p.link {
                return Some(link);
            }
            cur = p.export?;
        }
    }

    /// The outermost port standing in for `port`.
    pub fn outermost(&self, port: PortId) -> PortId {
        let mut cur = port;
        while let Some(ext) = self.ports[cur].export {
            cur = ext;
        }
        cur
    }

    /// Returns `true` if the port (or any vector element) joined a link.
    pub fn is_connected(&self, port: PortId) -> bool {
        let p = &self.ports[port];
        match &p.elements {
            Some(elements) => elements.iter().any(|e| self.is_connected(*e)),
            None => self.link_of(port).is_some(),
        }
    }

    /// Parameter of field `name` of `port`'s link, once the link exists.
    pub fn link_field(&self, port: PortId, name: &str) -> Option<ParamId> {
        self.links[self.link_of(port)?].field(name)
    }

    /// Replaces deferred link references that can now be resolved.
    pub fn resolve_expr(&self, expr: &Expr) -> Expr {
        if !expr.has_link_params() {
            return expr.clone();
        }
        expr.rewrite(&mut |e| match &e.node {
            ExprNode::LinkParam { port, field } => self
                .link_field(*port, field)
                .map(|id| Expr::param(id, e.kind.clone())),
            _ => None,
        })
    }

    /// Sets the assignment of `target`, replacing any earlier one.
    pub fn set_assign(&mut self, target: ParamId, expr: Expr) {
        self.assigns.insert(target, expr);
    }

    /// Removes the assignment of `target`.
    pub fn clear_assign(&mut self, target: ParamId) -> Option<Expr> {
        self.assigns.remove(&target)
    }

    /// The assignment of `target`.
    pub fn assign_of(&self, target: ParamId) -> Option<&Expr> {
        self.assigns.get(&target)
    }

    /// Blocks in the subtree rooted at `root`, parents before children.
    pub fn subtree(&self, root: BlockId) -> Vec<BlockId> {
        let mut out = vec![root];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.blocks[out[i]].children.iter().copied());
            i += 1;
        }
        out
    }

    /// Finds a block by hierarchical path.
    pub fn find_block(&self, path: &HierPath) -> Option<BlockId> {
        let mut cur = self.top?;
        for segment in path.segments() {
            cur = *self.blocks[cur]
                .children
                .iter()
                .find(|c| self.blocks[**c].name == *segment)?;
        }
        Some(cur)
    }

    /// Finds a port of `block` by name.
    pub fn find_port(&self, block: BlockId, name: &str) -> Option<PortId> {
        self.blocks[block]
            .ports
            .iter()
            .copied()
            .find(|p| self.ports[*p].name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(design: &mut Design, name: &str, parent: Option<BlockId>) -> BlockId {
        let id = design.blocks.alloc(Block {
            name: name.to_string(),
            class: "test.Block".to_string(),
            parent,
            kind: BlockKind::Hierarchy,
            ports: vec![],
            children: vec![],
            links: vec![],
            params: vec![],
            footprint: None,
            generator: None,
            capabilities: vec![],
        });
        if let Some(parent) = parent {
            design.blocks[parent].children.push(id);
        }
        id
    }

    fn port(design: &mut Design, block: BlockId, name: &str) -> PortId {
        let id = design.ports.alloc(Port {
            name: name.to_string(),
            block,
            ptype: PortType::VoltageSink,
            parent: None,
            fields: vec![],
            sub_ports: vec![],
            elements: None,
            link: None,
            export: None,
            interior: None,
            optional: false,
        });
        design.blocks[block].ports.push(id);
        id
    }

    #[test]
    fn paths() {
        let mut d = Design::new();
        let top = block(&mut d, "top", None);
        d.top = Some(top);
        let reg = block(&mut d, "reg", Some(top));
        let vin = port(&mut d, reg, "vin");
        assert!(d.block_path(top).is_root());
        assert_eq!(d.port_path(vin).to_string(), "reg.vin");
        assert_eq!(d.find_block(&HierPath::parse("reg")), Some(reg));
        assert_eq!(d.find_port(reg, "vin"), Some(vin));
    }

    #[test]
    fn link_of_follows_exports() {
        let mut d = Design::new();
        let top = block(&mut d, "top", None);
        let mid = block(&mut d, "mid", Some(top));
        let leaf = block(&mut d, "leaf", Some(mid));
        let outer = port(&mut d, mid, "vin");
        let inner = port(&mut d, leaf, "vin");
        d.ports[inner].export = Some(outer);
        d.ports[outer].interior = Some(inner);
        assert_eq!(d.link_of(inner), None);
        assert!(!d.is_connected(inner));

        let link = d.links.alloc(Link {
            name: "vin".to_string(),
            ltype: LinkType::Voltage,
            block: top,
            parent: None,
            roles: vec![("sinks".to_string(), vec![outer])],
            fields: vec![],
            sub_links: vec![],
        });
        d.ports[outer].link = Some(link);
        assert_eq!(d.link_of(inner), Some(link));
        assert_eq!(d.outermost(inner), outer);
        assert!(d.is_connected(inner));
    }

    #[test]
    fn resolve_link_param() {
        let mut d = Design::new();
        let top = block(&mut d, "top", None);
        let p = port(&mut d, top, "vin");
        let link = d.links.alloc(Link {
            name: "n".to_string(),
            ltype: LinkType::Voltage,
            block: top,
            parent: None,
            roles: vec![],
            fields: vec![],
            sub_links: vec![],
        });
        let voltage = d.params.alloc(Param {
            name: "voltage".to_string(),
            owner: Owner::Link(link),
            kind: Kind::Range,
        });
        d.links[link].fields.push(("voltage".to_string(), voltage));
        let e = Expr::link_param(p, "voltage", Kind::Range);
        assert_eq!(d.resolve_expr(&e), e);
        d.ports[p].link = Some(link);
        assert_eq!(d.resolve_expr(&e).as_param(), Some(voltage));
        assert_eq!(d.param_path(voltage).to_string(), "n.voltage");
    }

    #[test]
    fn subtree_is_parent_first() {
        let mut d = Design::new();
        let top = block(&mut d, "top", None);
        let a = block(&mut d, "a", Some(top));
        let b = block(&mut d, "b", Some(a));
        assert_eq!(d.subtree(top), vec![top, a, b]);
    }
}
