//! Block definitions and runners shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use volta_common::HierPath;
use volta_config::{RefinementConfig, ViolationMode};
use volta_diagnostics::{Diagnostic, DiagnosticSink, Severity};
use volta_elaborate::{
    elaborate, AdapterRegistry, BlockBuilder, BlockDef, BlockRef, ElabError, ElabOptions,
    Elaborated, LibraryRegistry,
};
use volta_ir::{Design, Expr, ParamId, PortModel, Range, Value};
use volta_solver::ConstPropSolver;

type Body = dyn Fn(&mut BlockBuilder<'_, '_>) -> Result<(), ElabError> + Send + Sync;

/// A block class made of closures.
pub struct Def {
    class: String,
    contents: Box<Body>,
    generate: Option<Box<Body>>,
    is_abstract: bool,
}

impl BlockDef for Def {
    fn class(&self) -> &str {
        &self.class
    }

    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        (self.contents)(b)
    }

    fn generate(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        match &self.generate {
            Some(generate) => generate(b),
            None => Ok(()),
        }
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

pub fn block(
    class: &str,
    contents: impl Fn(&mut BlockBuilder<'_, '_>) -> Result<(), ElabError> + Send + Sync + 'static,
) -> BlockRef {
    Arc::new(Def {
        class: class.to_string(),
        contents: Box::new(contents),
        generate: None,
        is_abstract: false,
    })
}

pub fn abstract_block(
    class: &str,
    contents: impl Fn(&mut BlockBuilder<'_, '_>) -> Result<(), ElabError> + Send + Sync + 'static,
) -> BlockRef {
    Arc::new(Def {
        class: class.to_string(),
        contents: Box::new(contents),
        generate: None,
        is_abstract: true,
    })
}

pub fn generator(
    class: &str,
    contents: impl Fn(&mut BlockBuilder<'_, '_>) -> Result<(), ElabError> + Send + Sync + 'static,
    generate: impl Fn(&mut BlockBuilder<'_, '_>) -> Result<(), ElabError> + Send + Sync + 'static,
) -> BlockRef {
    Arc::new(Def {
        class: class.to_string(),
        contents: Box::new(contents),
        generate: Some(Box::new(generate)),
        is_abstract: false,
    })
}

pub fn source(voltage: Range) -> BlockRef {
    source_limited(voltage, Range::ALL)
}

pub fn source_limited(voltage: Range, current_limits: Range) -> BlockRef {
    block("t.Source", move |b| {
        b.port("out", PortModel::voltage_source(voltage, current_limits))?;
        Ok(())
    })
}

pub fn sink(voltage_limits: Range, current_draw: Range) -> BlockRef {
    block("t.Sink", move |b| {
        b.port("pwr", PortModel::voltage_sink(voltage_limits, current_draw))?;
        Ok(())
    })
}

pub fn driver(voltage: Range, output_thresholds: Range) -> BlockRef {
    block("t.Driver", move |b| {
        b.port("out", PortModel::push_pull(voltage, output_thresholds))?;
        Ok(())
    })
}

pub fn receiver(voltage_limits: Range, input_thresholds: Range) -> BlockRef {
    block("t.Receiver", move |b| {
        b.port("in", PortModel::digital_sink(voltage_limits, input_thresholds))?;
        Ok(())
    })
}

pub fn leaf() -> BlockRef {
    block("t.Leaf", |_| Ok(()))
}

/// A top block instantiating `children` and connecting each net of
/// `(child, port)` pairs.
pub fn top(children: Vec<(&'static str, BlockRef)>, nets: Vec<Vec<(&'static str, &'static str)>>) -> BlockRef {
    block("t.Top", move |b| {
        let mut ids = Vec::new();
        for (name, def) in &children {
            ids.push((*name, b.block_ref(name, Arc::clone(def))?));
        }
        for net in &nets {
            let mut ports = Vec::new();
            for (child, port) in net {
                let id = ids
                    .iter()
                    .find(|(name, _)| name == child)
                    .map(|(_, id)| *id)
                    .expect("net names an unknown child");
                ports.push(b.child_port(id, port)?);
            }
            b.connect(&ports)?;
        }
        Ok(())
    })
}

/// A parameter of the block being built, by name.
pub fn own_param(b: &BlockBuilder<'_, '_>, name: &str) -> Expr {
    let design = b.design();
    let id = design.blocks[b.id()]
        .params
        .iter()
        .copied()
        .find(|p| design.params[*p].name == name)
        .expect("parameter declared in contents");
    b.value(id)
}

pub fn collect() -> ElabOptions {
    ElabOptions {
        mode: ViolationMode::Collect,
        ..ElabOptions::default()
    }
}

pub fn run_with(
    top: BlockRef,
    library: &LibraryRegistry,
    refinements: &RefinementConfig,
    options: ElabOptions,
) -> (Result<Elaborated, ElabError>, Vec<Diagnostic>) {
    let adapters = AdapterRegistry::standard();
    let sink = DiagnosticSink::new();
    let mut solver = ConstPropSolver::new();
    let result = elaborate(top, library, &adapters, refinements, &options, &mut solver, &sink);
    (result, sink.take_all())
}

pub fn run(top: BlockRef) -> (Result<Elaborated, ElabError>, Vec<Diagnostic>) {
    run_with(
        top,
        &LibraryRegistry::new(),
        &RefinementConfig::default(),
        ElabOptions::default(),
    )
}

/// `(path, message)` of every error diagnostic.
pub fn errors(diags: &[Diagnostic]) -> Vec<(String, String)> {
    diags
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| {
            let path = d.path.as_ref().map(ToString::to_string).unwrap_or_default();
            (path, d.message.clone())
        })
        .collect()
}

pub fn block_at(design: &Design, path: &str) -> volta_ir::BlockId {
    design
        .find_block(&HierPath::parse(path))
        .unwrap_or_else(|| panic!("no block at `{path}`"))
}

/// Field `field` of port `port` of the block at `path`.
pub fn port_field(design: &Design, path: &str, port: &str, field: &str) -> ParamId {
    let block = block_at(design, path);
    let port = design.find_port(block, port).expect("port exists");
    design.ports[port].field(field).expect("field exists")
}

pub fn range_of(elab: &Elaborated, param: ParamId) -> Range {
    match elab.resolution.get(param) {
        Some(Value::Range(r)) => *r,
        other => panic!("expected a range, found {other:?}"),
    }
}
