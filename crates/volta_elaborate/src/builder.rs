//! The builder a block definition declares its structure through.
//!
//! Every declaration returns a stable arena handle. Connections are collected
//! into pending nets and only turned into links, exports and bridges when the
//! block finishes, so a port can join a net in several `connect` calls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use volta_common::HierPath;
use volta_ir::{
    eval, BlockId, Design, Expr, Footprint, GeneratorPhase, GeneratorState, Kind, Owner, ParamId,
    PortId, PortModel, Range, Value,
};

use crate::adapters;
use crate::block::{BlockDef, BlockRef};
use crate::capability::Capability;
use crate::connect;
use crate::context::ElaborationContext;
use crate::error::ElabError;

/// Which body of a block definition is running.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildPhase {
    /// Static structure; values are symbolic.
    Contents,
    /// Deferred structure; requested values are concrete.
    Generate {
        /// Parameters the generator requested.
        allowed: BTreeSet<ParamId>,
        /// Solved values.
        values: BTreeMap<ParamId, Value>,
    },
}

/// Declares the structure of one block instance.
pub struct BlockBuilder<'c, 'a> {
    ctx: &'c mut ElaborationContext<'a>,
    block: BlockId,
    phase: BuildPhase,
    nets: Vec<Vec<PortId>>,
}

impl<'c, 'a> BlockBuilder<'c, 'a> {
    /// Starts building `block`.
    pub fn new(ctx: &'c mut ElaborationContext<'a>, block: BlockId, phase: BuildPhase) -> Self {
        Self {
            ctx,
            block,
            phase,
            nets: Vec::new(),
        }
    }

    /// The block being built.
    pub fn id(&self) -> BlockId {
        self.block
    }

    /// Hierarchical path of the block being built.
    pub fn path(&self) -> HierPath {
        self.ctx.design.block_path(self.block)
    }

    /// The design so far.
    pub fn design(&self) -> &Design {
        &self.ctx.design
    }

    /// Declares a port that must be connected.
    pub fn port(&mut self, name: &str, model: PortModel) -> Result<PortId, ElabError> {
        self.ctx.declare_port(self.block, name, &model, false)
    }

    /// Declares a port that may be left unconnected.
    pub fn optional_port(&mut self, name: &str, model: PortModel) -> Result<PortId, ElabError> {
        self.ctx.declare_port(self.block, name, &model, true)
    }

    /// Declares a vector port; elements follow `model`.
    pub fn vector_port(&mut self, name: &str, model: PortModel) -> Result<PortId, ElabError> {
        self.ctx.declare_vector_port(self.block, name, model)
    }

    /// Appends an element to a vector port of this block or of a child.
    pub fn request(&mut self, vector: PortId) -> Result<PortId, ElabError> {
        self.check_scope(vector)?;
        self.ctx.append_element(vector)
    }

    /// Declares a parameter.
    pub fn param(&mut self, name: &str, kind: Kind) -> Result<ParamId, ElabError> {
        let design = &self.ctx.design;
        if design.blocks[self.block]
            .params
            .iter()
            .any(|p| design.params[*p].name == name)
        {
            return Err(ElabError::DuplicateName {
                path: self.path(),
                name: name.to_string(),
            });
        }
        let id = self.ctx.new_param(Owner::Block(self.block), name, kind);
        self.ctx.design.blocks[self.block].params.push(id);
        Ok(id)
    }

    /// Declares a parameter and assigns it; the kind is taken from `value`.
    pub fn param_with(&mut self, name: &str, value: impl Into<Expr>) -> Result<ParamId, ElabError> {
        let value = value.into();
        let id = self.param(name, value.kind.clone())?;
        self.ctx.assign(id, value)?;
        Ok(id)
    }

    /// A parameter as an expression.
    pub fn value(&self, param: ParamId) -> Expr {
        Expr::param(param, self.ctx.design.params[param].kind.clone())
    }

    /// Assigns a parameter.
    pub fn assign(&mut self, param: ParamId, value: impl Into<Expr>) -> Result<(), ElabError> {
        self.ctx.assign(param, value.into())
    }

    /// Assigns a model field of a port.
    pub fn assign_field(
        &mut self,
        port: PortId,
        field: &str,
        value: impl Into<Expr>,
    ) -> Result<(), ElabError> {
        self.ctx.assign_field(port, field, value.into())
    }

    /// A model field of a port.
    pub fn field(&self, port: PortId, field: &str) -> Result<Expr, ElabError> {
        self.ctx.port_field(port, field)
    }

    /// A field of the link `port` joins, resolved once the link exists.
    pub fn link_field(&self, port: PortId, field: &str) -> Result<Expr, ElabError> {
        self.ctx.link_field(port, field)
    }

    /// Declares a requirement of the block.
    pub fn require(&mut self, expr: Expr, message: &str) -> Result<(), ElabError> {
        self.ctx.require(Owner::Block(self.block), expr, message)
    }

    /// Instantiates a sub-block.
    pub fn block(&mut self, name: &str, def: impl BlockDef + 'static) -> Result<BlockId, ElabError> {
        self.block_ref(name, Arc::new(def))
    }

    /// Instantiates a shared definition as a sub-block.
    pub fn block_ref(&mut self, name: &str, def: BlockRef) -> Result<BlockId, ElabError> {
        self.ctx.instantiate(Some(self.block), name, def)
    }

    /// Instantiates a library element by qualified name.
    pub fn library_block(&mut self, name: &str, element: &str) -> Result<BlockId, ElabError> {
        let def = self.ctx.library.get_library_element(element)?;
        self.block_ref(name, def)
    }

    /// A port of a sub-block.
    pub fn child_port(&self, child: BlockId, name: &str) -> Result<PortId, ElabError> {
        let design = &self.ctx.design;
        if design.blocks[child].parent != Some(self.block) {
            return Err(ElabError::InvalidConnection {
                path: self.path(),
                reason: format!("`{}` is not a sub-block", design.block_path(child)),
            });
        }
        design.find_port(child, name).ok_or_else(|| ElabError::UnknownName {
            path: design.block_path(child),
            what: "port",
            name: name.to_string(),
        })
    }

    /// A bundle sub-port.
    pub fn sub_port(&self, port: PortId, name: &str) -> Result<PortId, ElabError> {
        let design = &self.ctx.design;
        design.ports[port].sub_port(name).ok_or_else(|| ElabError::UnknownName {
            path: design.port_path(port),
            what: "sub-port",
            name: name.to_string(),
        })
    }

    /// Puts `ports` on one net, joining any pending net one of them is on.
    ///
    /// Vector ports of sub-blocks contribute a fresh element each time.
    pub fn connect(&mut self, ports: &[PortId]) -> Result<(), ElabError> {
        let mut members = Vec::with_capacity(ports.len());
        for &port in ports {
            members.push(self.connectable(port)?);
        }
        let mut merged: Vec<PortId> = Vec::new();
        let mut rest = Vec::with_capacity(self.nets.len() + 1);
        for net in self.nets.drain(..) {
            if net.iter().any(|p| members.contains(p)) {
                merged.extend(net);
            } else {
                rest.push(net);
            }
        }
        for port in members {
            if !merged.contains(&port) {
                merged.push(port);
            }
        }
        rest.push(merged);
        self.nets = rest;
        Ok(())
    }

    /// Exports a boundary port of this block as a port of a sub-block.
    pub fn export(&mut self, exterior: PortId, interior: PortId) -> Result<(), ElabError> {
        let design = &self.ctx.design;
        if design.ports[self.ctx.root_port(exterior)].block != self.block {
            return Err(ElabError::InvalidConnection {
                path: self.path(),
                reason: format!("`{}` is not a boundary port", design.port_path(exterior)),
            });
        }
        let (a, b) = (design.ports[exterior].ptype, design.ports[interior].ptype);
        if a != b {
            return Err(ElabError::IncompatiblePorts {
                a,
                a_path: design.port_path(exterior),
                b,
                b_path: design.port_path(interior),
            });
        }
        self.connect(&[exterior, interior])
    }

    /// Converts `port` to the type of `prototype` through the registered
    /// adapter and returns the adapter's destination port.
    pub fn adapt_to(&mut self, port: PortId, prototype: PortModel) -> Result<PortId, ElabError> {
        self.check_scope(port)?;
        let src = self.ctx.design.ports[port].ptype;
        let registry = self.ctx.adapters;
        let candidates = registry.from_port(src, prototype.ptype);
        let def = match candidates.as_slice() {
            [def] => *def,
            [] => {
                return Err(ElabError::NoAdapter {
                    src,
                    dst: prototype.ptype,
                    path: self.ctx.design.port_path(port),
                })
            }
            _ => {
                return Err(ElabError::AmbiguousAdapter {
                    src,
                    dst: prototype.ptype,
                })
            }
        };
        let name = format!("{}_adapter", connect::relative_name(self.ctx, self.block, port));
        let ports = adapters::instantiate(self.ctx, self.block, def, &prototype, &name)?;
        self.connect(&[port, ports.src])?;
        Ok(ports.dst)
    }

    /// Makes this block a generator whose `generate` runs once `requests`
    /// all have concrete values.
    pub fn generator(&mut self, requests: Vec<Expr>) -> Result<(), ElabError> {
        if matches!(self.phase, BuildPhase::Generate { .. }) {
            return Err(ElabError::LateRequest {
                path: self.path(),
                reason: "requests are fixed once the generator has resolved".to_string(),
            });
        }
        let block = &mut self.ctx.design.blocks[self.block];
        if block.generator.is_some() {
            return Err(ElabError::DuplicateGenerator { path: self.path() });
        }
        block.generator = Some(GeneratorState {
            phase: GeneratorPhase::Declared,
            requests,
        });
        Ok(())
    }

    /// The concrete value of a requested expression.
    ///
    /// Only valid while generating, and only for expressions over requested
    /// parameters.
    pub fn get(&self, expr: &Expr) -> Result<Value, ElabError> {
        let BuildPhase::Generate { allowed, values } = &self.phase else {
            return Err(ElabError::SymbolicGet {
                path: self.path(),
                what: "a value before generation".to_string(),
            });
        };
        let resolved = self.ctx.design.resolve_expr(expr);
        if resolved.has_link_params() {
            return Err(ElabError::SymbolicGet {
                path: self.path(),
                what: "a field of a link that does not exist".to_string(),
            });
        }
        if let Some(late) = resolved.params().into_iter().find(|p| !allowed.contains(p)) {
            return Err(ElabError::LateRequest {
                path: self.path(),
                reason: format!("`{}` was not requested", self.ctx.design.param_path(late)),
            });
        }
        match eval(&resolved, values) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ElabError::SymbolicGet {
                path: self.path(),
                what: "a requested value".to_string(),
            }),
            Err(source) => Err(ElabError::Eval {
                path: self.path(),
                source,
            }),
        }
    }

    fn get_as<T>(
        &self,
        expr: &Expr,
        expected: Kind,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T, ElabError> {
        let value = self.get(expr)?;
        convert(&value).ok_or_else(|| ElabError::KindMismatch {
            path: self.path(),
            expected,
            found: expr.kind.clone(),
        })
    }

    /// [`get`](Self::get) for a range.
    pub fn get_range(&self, expr: &Expr) -> Result<Range, ElabError> {
        self.get_as(expr, Kind::Range, Value::as_range)
    }

    /// [`get`](Self::get) for a boolean.
    pub fn get_bool(&self, expr: &Expr) -> Result<bool, ElabError> {
        self.get_as(expr, Kind::Bool, Value::as_bool)
    }

    /// [`get`](Self::get) for an integer.
    pub fn get_int(&self, expr: &Expr) -> Result<i64, ElabError> {
        self.get_as(expr, Kind::Int, Value::as_int)
    }

    /// [`get`](Self::get) for a float.
    pub fn get_float(&self, expr: &Expr) -> Result<f64, ElabError> {
        self.get_as(expr, Kind::Float, Value::as_float)
    }

    /// Returns `true` if the port joined a link or a pending net.
    pub fn is_connected(&self, port: PortId) -> bool {
        if self.ctx.design.is_connected(port) {
            return true;
        }
        let pending = |p: PortId| self.nets.iter().any(|n| n.contains(&p));
        match &self.ctx.design.ports[port].elements {
            Some(elements) => elements.iter().any(|e| pending(*e)),
            None => pending(port),
        }
    }

    /// Implements a capability: declares its missing ports and checks the
    /// types of those already declared. Returns the ports in the
    /// capability's order.
    pub fn implement(&mut self, capability: &dyn Capability) -> Result<Vec<PortId>, ElabError> {
        let mut out = Vec::new();
        for (name, model) in capability.ports() {
            let port = match self.ctx.design.find_port(self.block, name) {
                Some(existing) => {
                    let found = self.ctx.design.ports[existing].ptype;
                    if found != model.ptype {
                        return Err(ElabError::CapabilityPort {
                            capability: capability.name(),
                            path: self.ctx.design.port_path(existing),
                            expected: model.ptype,
                            found,
                        });
                    }
                    existing
                }
                None => self.port(name, model)?,
            };
            out.push(port);
        }
        let caps = &mut self.ctx.design.blocks[self.block].capabilities;
        if !caps.iter().any(|c| c == capability.name()) {
            caps.push(capability.name().to_string());
        }
        Ok(out)
    }

    /// Attaches part metadata. Pinned ports must belong to this block.
    pub fn footprint(&mut self, footprint: Footprint) -> Result<(), ElabError> {
        for (pin, port) in &footprint.pinning {
            if self.ctx.design.ports[self.ctx.root_port(*port)].block != self.block {
                return Err(ElabError::InvalidConnection {
                    path: self.path(),
                    reason: format!(
                        "pin {pin} maps to `{}`, which is not a port of this block",
                        self.ctx.design.port_path(*port)
                    ),
                });
            }
        }
        self.ctx.design.blocks[self.block].footprint = Some(footprint);
        Ok(())
    }

    /// Turns the pending nets into links, exports and bridges.
    pub fn finish(self) -> Result<(), ElabError> {
        connect::finalize(self.ctx, self.block, self.nets)
    }

    fn check_scope(&self, port: PortId) -> Result<bool, ElabError> {
        let design = &self.ctx.design;
        let owner = design.ports[self.ctx.root_port(port)].block;
        if owner == self.block {
            Ok(true)
        } else if design.blocks[owner].parent == Some(self.block) {
            Ok(false)
        } else {
            Err(ElabError::InvalidConnection {
                path: self.path(),
                reason: format!(
                    "`{}` is not a port of this block or of a sub-block",
                    design.port_path(port)
                ),
            })
        }
    }

    /// The port that actually joins the net when `port` is connected.
    fn connectable(&mut self, port: PortId) -> Result<PortId, ElabError> {
        let boundary = self.check_scope(port)?;
        let p = &self.ctx.design.ports[port];
        if p.is_vector() {
            if boundary {
                return Err(ElabError::InvalidConnection {
                    path: self.path(),
                    reason: format!(
                        "boundary vector port `{}` can only be connected through its elements",
                        self.ctx.design.port_path(port)
                    ),
                });
            }
            return self.ctx.append_element(port);
        }
        // A boundary port may already sit on its parent's net; only its
        // inside can be taken.
        let taken = if boundary {
            p.interior.is_some()
        } else {
            p.link.is_some() || p.export.is_some()
        };
        if taken {
            return Err(ElabError::AlreadyConnected {
                path: self.ctx.design.port_path(port),
            });
        }
        Ok(port)
    }
}
