//! The constraint-graph snapshot handed to a solver.
//!
//! A [`ConstraintGraph`] is a flat, self-contained view of a [`Design`]: every
//! parameter with its kind and path, every assignment and requirement with
//! link references resolved, and the field-by-field equalities implied by
//! exports. Solvers see nothing else, which is what lets one run out of
//! process behind the interchange encoding.

use crate::design::Design;
use crate::expr::Expr;
use crate::ids::{ParamId, PortId};
use crate::kind::Kind;
use serde::{Deserialize, Serialize};
use volta_common::HierPath;

/// A parameter as the solver sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    /// Handle.
    pub id: ParamId,
    /// Kind.
    pub kind: Kind,
    /// Hierarchical path, for messages.
    pub path: HierPath,
}

/// `target := expr`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    /// Assigned parameter.
    pub target: ParamId,
    /// Value expression.
    pub expr: Expr,
}

/// A requirement with the path of its declaring link, block or port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphRequire {
    /// Path of the declaring element.
    pub path: HierPath,
    /// Boolean expression.
    pub expr: Expr,
    /// Human-readable statement.
    pub message: String,
}

/// Flat constraint view of a design.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintGraph {
    /// All parameters in handle order.
    pub params: Vec<ParamInfo>,
    /// Assignments in target order.
    pub assigns: Vec<Assign>,
    /// Pairs of parameters that must hold the same value.
    pub equalities: Vec<(ParamId, ParamId)>,
    /// Requirements in declaration order.
    pub requires: Vec<GraphRequire>,
}

impl ConstraintGraph {
    /// Looks up a parameter by handle.
    pub fn param(&self, id: ParamId) -> Option<&ParamInfo> {
        self.params
            .get(id.as_raw() as usize)
            .filter(|p| p.id == id)
            .or_else(|| self.params.iter().find(|p| p.id == id))
    }
}

impl Design {
    /// Snapshots the design for a solver.
    pub fn constraint_graph(&self) -> ConstraintGraph {
        let params = self
            .params
            .iter()
            .map(|(id, p)| ParamInfo {
                id,
                kind: p.kind.clone(),
                path: self.param_path(id),
            })
            .collect();
        let assigns = self
            .assigns
            .iter()
            .map(|(target, expr)| Assign {
                target: *target,
                expr: self.resolve_expr(expr),
            })
            .collect();
        let mut equalities = Vec::new();
        for export in &self.exports {
            self.export_equalities(export.exterior, export.interior, &mut equalities);
        }
        let requires = self
            .requires
            .iter()
            .map(|r| GraphRequire {
                path: self.owner_path(r.owner),
                expr: self.resolve_expr(&r.expr),
                message: r.message.clone(),
            })
            .collect();
        ConstraintGraph {
            params,
            assigns,
            equalities,
            requires,
        }
    }

    fn export_equalities(&self, exterior: PortId, interior: PortId, out: &mut Vec<(ParamId, ParamId)>) {
        let ext = &self.ports[exterior];
        let int = &self.ports[interior];
        for (name, ext_param) in &ext.fields {
            if let Some(int_param) = int.field(name) {
                out.push((*ext_param, int_param));
            }
        }
        for (name, ext_sub) in &ext.sub_ports {
            if let Some(int_sub) = int.sub_port(name) {
                self.export_equalities(*ext_sub, int_sub, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Block, BlockKind, Export, Owner, Param, Port, Require};
    use crate::ids::BlockId;
    use crate::range::Range;
    use crate::types::PortType;

    fn sink(d: &mut Design, block: BlockId, name: &str) -> PortId {
        let id = d.ports.alloc(Port {
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
        for field in ["voltage_limits", "current_draw"] {
            let p = d.params.alloc(Param {
                name: field.to_string(),
                owner: Owner::Port(id),
                kind: Kind::Range,
            });
            d.ports[id].fields.push((field.to_string(), p));
        }
        id
    }

    fn block(d: &mut Design, name: &str, parent: Option<BlockId>) -> BlockId {
        d.blocks.alloc(Block {
            name: name.to_string(),
            class: "t.B".to_string(),
            parent,
            kind: BlockKind::Hierarchy,
            ports: vec![],
            children: vec![],
            links: vec![],
            params: vec![],
            footprint: None,
            generator: None,
            capabilities: vec![],
        })
    }

    #[test]
    fn export_yields_fieldwise_equalities() {
        let mut d = Design::new();
        let top = block(&mut d, "top", None);
        let child = block(&mut d, "child", Some(top));
        let ext = sink(&mut d, top, "vin");
        let int = sink(&mut d, child, "vin");
        d.exports.push(Export {
            exterior: ext,
            interior: int,
        });
        let g = d.constraint_graph();
        assert_eq!(g.equalities.len(), 2);
        assert_eq!(g.equalities[0], (d.ports[ext].fields[0].1, d.ports[int].fields[0].1));
        assert_eq!(g.params.len(), 4);
        assert_eq!(g.params[2].path.to_string(), "child.vin.voltage_limits");
    }

    #[test]
    fn requires_carry_owner_path() {
        let mut d = Design::new();
        let top = block(&mut d, "top", None);
        let child = block(&mut d, "reg", Some(top));
        let vin = sink(&mut d, child, "vin");
        let limits = d.ports[vin].fields[0].1;
        d.set_assign(limits, Expr::from(Range::new(0.0, 3.6)));
        d.requires.push(Require {
            owner: Owner::Block(child),
            expr: Expr::param(limits, Kind::Range)
                .contains(&Expr::from(Range::exact(3.3)))
                .unwrap(),
            message: "input within limits".to_string(),
        });
        let g = d.constraint_graph();
        assert_eq!(g.requires[0].path.to_string(), "reg");
        assert_eq!(g.assigns.len(), 1);
        assert_eq!(g.param(limits).map(|p| p.kind.clone()), Some(Kind::Range));
    }
}
