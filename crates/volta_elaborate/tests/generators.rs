//! The batched generator loop.

mod common;

use common::*;
use volta_common::HierPath;
use volta_config::{ElaborationConfig, RefinementConfig};
use volta_diagnostics::DiagnosticSink;
use volta_elaborate::{
    AdapterRegistry, BlockRef, ElabError, ElabOptions, Elaborator, LibraryRegistry,
};
use volta_ir::{GeneratorPhase, Kind, PortModel, Range, Value};
use volta_solver::ConstPropSolver;

fn fanout(count: i64) -> BlockRef {
    generator(
        "t.Fanout",
        move |b| {
            let n = b.param_with("count", count)?;
            let n = b.value(n);
            b.generator(vec![n])
        },
        |b| {
            let n = b.get_int(&own_param(b, "count"))?;
            for i in 0..n {
                b.block_ref(&format!("leaf{i}"), leaf())?;
            }
            Ok(())
        },
    )
}

fn chain(depth: i64) -> BlockRef {
    generator(
        &format!("t.Chain{depth}"),
        move |b| {
            let d = b.param_with("depth", depth)?;
            let d = b.value(d);
            b.generator(vec![d])
        },
        |b| {
            let d = b.get_int(&own_param(b, "depth"))?;
            if d > 0 {
                b.block_ref("next", chain(d - 1))?;
            }
            Ok(())
        },
    )
}

fn options(max_rounds: usize) -> ElabOptions {
    ElabOptions::from_config(&ElaborationConfig {
        max_rounds,
        ..ElaborationConfig::default()
    })
}

#[test]
fn independent_generators_take_one_round() {
    let design = top(
        vec![("a", fanout(1)), ("b", fanout(2)), ("c", fanout(3))],
        vec![],
    );
    let (result, _) = run(design);
    let elab = result.unwrap();
    assert_eq!(elab.generator_rounds, 1);
    for (path, expected) in [("a", 1), ("b", 2), ("c", 3)] {
        let block = &elab.design.blocks[block_at(&elab.design, path)];
        assert_eq!(block.children.len(), expected, "{path}");
        assert_eq!(
            block.generator.as_ref().map(|g| g.phase),
            Some(GeneratorPhase::Generated)
        );
    }
}

#[test]
fn dependent_chain_takes_one_round_per_link() {
    let (result, _) = run(chain(3));
    let elab = result.unwrap();
    assert_eq!(elab.generator_rounds, 4);
    assert!(elab
        .design
        .find_block(&HierPath::parse("next.next.next"))
        .is_some());
    assert!(elab
        .design
        .find_block(&HierPath::parse("next.next.next.next"))
        .is_none());
}

#[test]
fn round_limit_stops_long_chains() {
    let (result, _) = run_with(
        chain(5),
        &LibraryRegistry::new(),
        &RefinementConfig::default(),
        options(2),
    );
    assert!(matches!(result, Err(ElabError::RoundLimit { limit: 2 })));
}

#[test]
fn unresolvable_request_names_generator() {
    let stuck = generator(
        "t.Stuck",
        |b| {
            let x = b.param("x", Kind::Float)?;
            let x = b.value(x);
            b.generator(vec![x])
        },
        |_| Ok(()),
    );
    let (result, _) = run(top(vec![("gen", stuck)], vec![]));
    match result {
        Err(ElabError::Unresolvable { paths }) => assert_eq!(paths, vec![HierPath::parse("gen")]),
        other => panic!("expected unresolvable, got {other:?}"),
    }
}

#[test]
fn reading_unrequested_value_is_late() {
    let greedy = generator(
        "t.Greedy",
        |b| {
            let a = b.param_with("a", 1i64)?;
            b.param_with("b", 2i64)?;
            let a = b.value(a);
            b.generator(vec![a])
        },
        |b| {
            b.get_int(&own_param(b, "b"))?;
            Ok(())
        },
    );
    let (result, _) = run(top(vec![("gen", greedy)], vec![]));
    assert!(matches!(result, Err(ElabError::LateRequest { .. })));
}

#[test]
fn get_during_contents_is_symbolic() {
    let eager = block("t.Eager", |b| {
        let a = b.param_with("a", 1i64)?;
        b.get(&b.value(a))?;
        Ok(())
    });
    let (result, _) = run(top(vec![("x", eager)], vec![]));
    assert!(matches!(result, Err(ElabError::SymbolicGet { .. })));
}

#[test]
fn generator_reads_its_link() {
    let adaptive = generator(
        "t.Adaptive",
        |b| {
            let pwr = b.port("pwr", PortModel::voltage_sink(Range::new(0.0, 6.0), Range::ZERO))?;
            let voltage = b.link_field(pwr, "voltage")?;
            b.generator(vec![voltage])
        },
        |b| {
            let pwr = b.design().find_port(b.id(), "pwr").expect("declared in contents");
            let voltage = b.get_range(&b.link_field(pwr, "voltage")?)?;
            b.param_with("seen", voltage)?;
            Ok(())
        },
    );
    let design = top(
        vec![("src", source(Range::exact(3.3))), ("dut", adaptive)],
        vec![vec![("src", "out"), ("dut", "pwr")]],
    );
    let (result, _) = run(design);
    let elab = result.unwrap();
    let dut = block_at(&elab.design, "dut");
    let seen = elab.design.blocks[dut]
        .params
        .iter()
        .copied()
        .find(|p| elab.design.params[*p].name == "seen")
        .unwrap();
    assert_eq!(elab.resolution.get(seen), Some(&Value::Range(Range::exact(3.3))));
}

#[test]
fn generator_runs_once_when_driven_externally() {
    let library = LibraryRegistry::new();
    let adapters = AdapterRegistry::standard();
    let refinements = RefinementConfig::default();
    let mut elab = Elaborator::new(&library, &adapters, &refinements, ElabOptions::default());
    elab.instantiate_top(fanout(2)).unwrap();

    let mut solver = ConstPropSolver::new();
    let resolution = elab.solve(&mut solver).unwrap();
    let diff = elab
        .elaborate_generator(&HierPath::root(), &resolution)
        .unwrap();
    assert_eq!(diff.blocks.len(), 2);
    assert!(diff.links.is_empty());

    let again = elab.elaborate_generator(&HierPath::root(), &resolution);
    assert!(matches!(
        again,
        Err(ElabError::GeneratorState {
            found: Some(GeneratorPhase::Generated),
            ..
        })
    ));
    assert_eq!(elab.run_generators(&mut solver).unwrap(), 0);

    let sink = DiagnosticSink::new();
    assert!(elab.check(&resolution, &sink).is_clean());
}
