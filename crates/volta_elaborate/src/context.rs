//! Mutable elaboration state.
//!
//! [`ElaborationContext`] owns the [`Design`] under construction and carries
//! the registries every instantiation resolves through. It also tracks which
//! port fields only hold their type default (so an export can drop them in
//! favour of the interior value), the element prototypes of vector ports, the
//! definitions of generator blocks, and the stack of classes being
//! instantiated for cycle detection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use volta_common::HierPath;
use volta_config::RefinementConfig;
use volta_ir::{
    Block, BlockId, BlockKind, Design, Expr, ExprNode, FieldDefault, Kind, LinkId, Owner, Param,
    ParamId, Port, PortId, PortModel, PortType, Require, Value,
};

use crate::adapters::AdapterRegistry;
use crate::block::BlockRef;
use crate::builder::{BlockBuilder, BuildPhase};
use crate::error::ElabError;
use crate::registry::LibraryRegistry;

/// Mutable state carried through recursive elaboration.
pub struct ElaborationContext<'a> {
    /// The design being built.
    pub design: Design,
    /// Block classes.
    pub library: &'a LibraryRegistry,
    /// Registered adapters.
    pub adapters: &'a AdapterRegistry,
    /// Per-design refinements of abstract blocks.
    pub refinements: &'a RefinementConfig,
    /// Parameters whose assignment is only the port type's default.
    defaulted: HashSet<ParamId>,
    /// Element prototypes of vector ports.
    vector_models: HashMap<PortId, PortModel>,
    /// Definitions of generator blocks, kept for their deferred phase.
    defs: HashMap<BlockId, BlockRef>,
    /// Classes currently being instantiated.
    elab_stack: Vec<String>,
}

impl<'a> ElaborationContext<'a> {
    /// Creates a context with an empty design.
    pub fn new(
        library: &'a LibraryRegistry,
        adapters: &'a AdapterRegistry,
        refinements: &'a RefinementConfig,
    ) -> Self {
        Self {
            design: Design::new(),
            library,
            adapters,
            refinements,
            defaulted: HashSet::new(),
            vector_models: HashMap::new(),
            defs: HashMap::new(),
            elab_stack: Vec::new(),
        }
    }

    /// Instantiates `def` as `name` inside `parent` (or as the top block)
    /// and runs its `contents`.
    pub fn instantiate(
        &mut self,
        parent: Option<BlockId>,
        name: &str,
        def: BlockRef,
    ) -> Result<BlockId, ElabError> {
        let path = match parent {
            Some(p) => self.design.block_path(p).child(name),
            None => HierPath::root(),
        };
        let def = self.library.resolve(def, &path, self.refinements)?;
        self.push_elab_stack(def.class(), &path)?;
        let result = self.build_block(parent, name, &def);
        self.pop_elab_stack();
        let block = result?;
        tracing::debug!(%path, class = def.class(), "instantiated block");
        Ok(block)
    }

    fn build_block(
        &mut self,
        parent: Option<BlockId>,
        name: &str,
        def: &BlockRef,
    ) -> Result<BlockId, ElabError> {
        let block = self.alloc_block(parent, name, def.class(), BlockKind::Hierarchy)?;
        if parent.is_none() {
            self.design.top = Some(block);
        }
        let mut b = BlockBuilder::new(self, block, BuildPhase::Contents);
        def.contents(&mut b)?;
        b.finish()?;
        if self.design.blocks[block].generator.is_some() {
            self.defs.insert(block, Arc::clone(def));
        }
        Ok(block)
    }

    /// Pushes a class onto the instantiation stack, failing on recursion.
    pub fn push_elab_stack(&mut self, class: &str, path: &HierPath) -> Result<(), ElabError> {
        if self.elab_stack.iter().any(|c| c == class) {
            return Err(ElabError::CircularInstantiation {
                class: class.to_string(),
                path: path.clone(),
            });
        }
        self.elab_stack.push(class.to_string());
        Ok(())
    }

    /// Pops the most recent class from the instantiation stack.
    pub fn pop_elab_stack(&mut self) {
        self.elab_stack.pop();
    }

    /// The definition of a generator block.
    pub fn generator_def(&self, block: BlockId) -> Option<BlockRef> {
        self.defs.get(&block).cloned()
    }

    /// Allocates an empty block.
    pub fn alloc_block(
        &mut self,
        parent: Option<BlockId>,
        name: &str,
        class: &str,
        kind: BlockKind,
    ) -> Result<BlockId, ElabError> {
        if let Some(p) = parent {
            let taken = self.design.blocks[p]
                .children
                .iter()
                .any(|c| self.design.blocks[*c].name == name);
            if taken {
                return Err(ElabError::DuplicateName {
                    path: self.design.block_path(p),
                    name: name.to_string(),
                });
            }
        }
        let id = self.design.blocks.alloc(Block {
            name: name.to_string(),
            class: class.to_string(),
            parent,
            kind,
            ports: Vec::new(),
            children: Vec::new(),
            links: Vec::new(),
            params: Vec::new(),
            footprint: None,
            generator: None,
            capabilities: Vec::new(),
        });
        if let Some(p) = parent {
            self.design.blocks[p].children.push(id);
        }
        Ok(id)
    }

    /// A name for a new child of `block`, suffixed if `base` is taken.
    pub fn unique_child_name(&self, block: BlockId, base: &str) -> String {
        let taken = |n: &str| {
            self.design.blocks[block]
                .children
                .iter()
                .any(|c| self.design.blocks[*c].name == n)
        };
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{base}_{i}"))
            .find(|n| !taken(n))
            .unwrap_or_else(|| base.to_string())
    }

    /// Declares a top-level port of `block`.
    pub fn declare_port(
        &mut self,
        block: BlockId,
        name: &str,
        model: &PortModel,
        optional: bool,
    ) -> Result<PortId, ElabError> {
        if self.design.find_port(block, name).is_some() {
            return Err(ElabError::DuplicateName {
                path: self.design.block_path(block),
                name: name.to_string(),
            });
        }
        let id = self.new_port(block, None, name, model, None)?;
        self.design.ports[id].optional = optional;
        self.design.blocks[block].ports.push(id);
        Ok(id)
    }

    /// Declares a vector port of `block` whose elements follow `model`.
    pub fn declare_vector_port(
        &mut self,
        block: BlockId,
        name: &str,
        model: PortModel,
    ) -> Result<PortId, ElabError> {
        if self.design.find_port(block, name).is_some() {
            return Err(ElabError::DuplicateName {
                path: self.design.block_path(block),
                name: name.to_string(),
            });
        }
        let id = self.design.ports.alloc(Port {
            name: name.to_string(),
            block,
            ptype: model.ptype,
            parent: None,
            fields: Vec::new(),
            sub_ports: Vec::new(),
            elements: Some(Vec::new()),
            link: None,
            export: None,
            interior: None,
            optional: true,
        });
        self.vector_models.insert(id, model);
        self.design.blocks[block].ports.push(id);
        Ok(id)
    }

    /// Appends a fresh element to a vector port.
    pub fn append_element(&mut self, vector: PortId) -> Result<PortId, ElabError> {
        let model = self.vector_models.get(&vector).cloned().ok_or_else(|| {
            ElabError::InvalidConnection {
                path: self.design.port_path(vector),
                reason: "not a vector port".to_string(),
            }
        })?;
        let port = &self.design.ports[vector];
        let (block, index) = (port.block, port.elements.as_ref().map_or(0, Vec::len));
        let element = self.new_port(block, Some(vector), &index.to_string(), &model, None)?;
        if let Some(elements) = self.design.ports[vector].elements.as_mut() {
            elements.push(element);
        }
        Ok(element)
    }

    /// Allocates a port with its fields and bundle sub-ports.
    ///
    /// Fields take the model's initializer, else the bundle's override, else
    /// the type default. Defaults are remembered so an export can clear them.
    pub fn new_port(
        &mut self,
        block: BlockId,
        parent: Option<PortId>,
        name: &str,
        model: &PortModel,
        bundle: Option<PortType>,
    ) -> Result<PortId, ElabError> {
        let ptype = model.ptype;
        let id = self.design.ports.alloc(Port {
            name: name.to_string(),
            block,
            ptype,
            parent,
            fields: Vec::new(),
            sub_ports: Vec::new(),
            elements: None,
            link: None,
            export: None,
            interior: None,
            optional: false,
        });
        for (field, _) in &model.inits {
            if ptype.field(field).is_none() {
                return Err(ElabError::UnknownName {
                    path: self.design.port_path(id),
                    what: "field",
                    name: field.clone(),
                });
            }
        }
        for spec in ptype.fields() {
            let param = self.new_param(Owner::Port(id), spec.name, spec.kind.kind());
            self.design.ports[id].fields.push((spec.name.to_string(), param));
            if let Some(init) = model.init(spec.name) {
                self.assign(param, init.clone())?;
            } else if !model.empty.iter().any(|f| f == spec.name) {
                let default = bundle
                    .and_then(|b| b.sub_port_default(spec.name))
                    .unwrap_or(spec.default);
                if let Some(expr) = default_expr(default) {
                    self.design.set_assign(param, expr);
                    self.defaulted.insert(param);
                }
            }
        }
        for (sub, stype) in ptype.sub_ports() {
            let sub_id = self.new_port(block, Some(id), sub, &PortModel::new(*stype), Some(ptype))?;
            self.design.ports[id].sub_ports.push((sub.to_string(), sub_id));
        }
        Ok(id)
    }

    /// Allocates a parameter.
    pub fn new_param(&mut self, owner: Owner, name: &str, kind: Kind) -> ParamId {
        self.design.params.alloc(Param {
            name: name.to_string(),
            owner,
            kind,
        })
    }

    /// Assigns `expr` to `target`. A type default may be overwritten; a
    /// different explicit assignment may not.
    pub fn assign(&mut self, target: ParamId, expr: Expr) -> Result<(), ElabError> {
        let expected = &self.design.params[target].kind;
        if *expected != expr.kind {
            return Err(ElabError::KindMismatch {
                path: self.design.param_path(target),
                expected: expected.clone(),
                found: expr.kind,
            });
        }
        if !self.defaulted.contains(&target) {
            if let Some(existing) = self.design.assign_of(target) {
                if *existing != expr {
                    return Err(ElabError::DuplicateAssign {
                        path: self.design.param_path(target),
                    });
                }
            }
        }
        self.design.set_assign(target, expr);
        self.defaulted.remove(&target);
        Ok(())
    }

    /// Returns `true` if `param` holds only its type default.
    pub fn is_defaulted(&self, param: ParamId) -> bool {
        self.defaulted.contains(&param)
    }

    /// Drops default-only assignments on `port` and its sub-ports.
    pub fn clear_defaults(&mut self, port: PortId) {
        let fields: Vec<ParamId> = self.design.ports[port].fields.iter().map(|(_, p)| *p).collect();
        for param in fields {
            if self.defaulted.remove(&param) {
                self.design.clear_assign(param);
            }
        }
        let subs: Vec<PortId> = self.design.ports[port].sub_ports.iter().map(|(_, p)| *p).collect();
        for sub in subs {
            self.clear_defaults(sub);
        }
    }

    /// The parameter of field `name` of `port`.
    pub fn field_param(&self, port: PortId, name: &str) -> Result<ParamId, ElabError> {
        self.design.ports[port]
            .field(name)
            .ok_or_else(|| ElabError::UnknownName {
                path: self.design.port_path(port),
                what: "field",
                name: name.to_string(),
            })
    }

    /// Field `name` of `port` as an expression.
    pub fn port_field(&self, port: PortId, name: &str) -> Result<Expr, ElabError> {
        let param = self.field_param(port, name)?;
        Ok(Expr::param(param, self.design.params[param].kind.clone()))
    }

    /// Field `name` of whatever link `port` ends up in.
    pub fn link_field(&self, port: PortId, name: &str) -> Result<Expr, ElabError> {
        let ltype = self.design.ports[port].ptype.link_type();
        let spec = ltype.field(name).ok_or_else(|| ElabError::UnknownName {
            path: self.design.port_path(port),
            what: "link field",
            name: name.to_string(),
        })?;
        Ok(Expr::link_param(port, name, spec.kind.kind()))
    }

    /// Assigns field `name` of `port`.
    pub fn assign_field(&mut self, port: PortId, name: &str, expr: Expr) -> Result<(), ElabError> {
        let param = self.field_param(port, name)?;
        self.assign(param, expr)
    }

    /// Field `name` of `link` as an expression.
    pub fn link_param(&self, link: LinkId, name: &str) -> Result<Expr, ElabError> {
        let param = self.design.links[link]
            .field(name)
            .ok_or_else(|| ElabError::UnknownName {
                path: self.design.link_path(link),
                what: "field",
                name: name.to_string(),
            })?;
        Ok(Expr::param(param, self.design.params[param].kind.clone()))
    }

    /// Declares a requirement.
    pub fn require(
        &mut self,
        owner: Owner,
        expr: Expr,
        message: impl Into<String>,
    ) -> Result<(), ElabError> {
        if expr.kind != Kind::Bool {
            return Err(ElabError::KindMismatch {
                path: self.design.owner_path(owner),
                expected: Kind::Bool,
                found: expr.kind,
            });
        }
        self.design.requires.push(Require {
            owner,
            expr,
            message: message.into(),
        });
        Ok(())
    }

    /// The top-level port a sub-port or vector element belongs to.
    pub fn root_port(&self, port: PortId) -> PortId {
        let mut cur = port;
        while let Some(parent) = self.design.ports[cur].parent {
            cur = parent;
        }
        cur
    }
}

fn default_expr(default: FieldDefault) -> Option<Expr> {
    match default {
        FieldDefault::Symbolic => None,
        FieldDefault::Bool(b) => Some(Expr::from(b)),
        FieldDefault::Range(r) => Some(Expr::from(r)),
        FieldDefault::EmptyArray => Some(Expr {
            kind: Kind::array_of(Kind::Int),
            node: ExprNode::Literal(Value::Array(Vec::new())),
        }),
    }
}
