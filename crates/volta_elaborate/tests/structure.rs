//! Adapters, vector ports, bridges, refinement and the netlist view.

mod common;

use std::collections::BTreeMap;

use common::*;
use volta_common::HierPath;
use volta_config::RefinementConfig;
use volta_diagnostics::DiagnosticSink;
use volta_elaborate::{
    AdapterRegistry, BlockRef, ElabError, ElabOptions, Elaborator, LibraryRegistry, Netlist,
};
use volta_ir::{BlockKind, Footprint, Kind, PortModel, PortType, Range};
use volta_solver::ConstPropSolver;

fn resistor() -> BlockRef {
    block("t.Resistor", |b| {
        b.port("a", PortModel::new(PortType::Passive))?;
        Ok(())
    })
}

#[test]
fn adapter_binds_prototype_and_conserves_draw() {
    let design = block("t.Top", |b| {
        let res = b.block_ref("res", resistor())?;
        let reg = b.block_ref("reg", source(Range::exact(5.0)))?;
        let a = b.child_port(res, "a")?;
        let prototype = PortModel::new(PortType::VoltageSink)
            .with("voltage_limits", Range::new(0.0, 5.0))
            .with("current_draw", Range::new(0.0, 0.1));
        let dst = b.adapt_to(a, prototype)?;
        let out = b.child_port(reg, "out")?;
        b.connect(&[out, dst])
    });
    let (result, diags) = run(design);
    let elab = result.unwrap_or_else(|e| panic!("{e}: {:?}", errors(&diags)));
    let design = &elab.design;

    let adapter = block_at(design, "res_a_adapter");
    assert_eq!(design.blocks[adapter].kind, BlockKind::Adapter);
    let dst_draw = port_field(design, "res_a_adapter", "dst", "current_draw");
    let dst_limits = port_field(design, "res_a_adapter", "dst", "voltage_limits");
    let src_draw = port_field(design, "res_a_adapter", "src", "current_draw");
    assert_eq!(range_of(&elab, dst_draw), Range::new(0.0, 0.1));
    assert_eq!(range_of(&elab, dst_limits), Range::new(0.0, 5.0));
    assert_eq!(range_of(&elab, src_draw), range_of(&elab, dst_draw));

    let out = design.find_port(block_at(design, "reg"), "out").unwrap();
    let drawn = design.link_field(out, "current_drawn").unwrap();
    assert_eq!(range_of(&elab, drawn), Range::new(0.0, 0.1));
}

#[test]
fn adapter_for_unregistered_pair_rejected() {
    let design = block("t.Top", |b| {
        let res = b.block_ref("res", resistor())?;
        let a = b.child_port(res, "a")?;
        b.adapt_to(a, PortModel::new(PortType::UartPort))?;
        Ok(())
    });
    let (result, _) = run(design);
    assert!(matches!(
        result,
        Err(ElabError::NoAdapter {
            src: PortType::Passive,
            dst: PortType::UartPort,
            ..
        })
    ));
}

#[test]
fn vector_elements_checked_independently() {
    let hub = block("t.Hub", |b| {
        b.vector_port(
            "ins",
            PortModel::digital_sink(Range::new(-0.3, 3.6), Range::new(0.8, 2.0)),
        )?;
        Ok(())
    });
    let thresholds = Range::new(0.4, 2.9);
    let design = top(
        vec![
            ("hub", hub),
            ("d0", driver(Range::exact(3.3), thresholds)),
            ("d1", driver(Range::exact(3.3), thresholds)),
            ("d2", driver(Range::exact(5.0), thresholds)),
        ],
        vec![
            vec![("d0", "out"), ("hub", "ins")],
            vec![("d1", "out"), ("hub", "ins")],
            vec![("d2", "out"), ("hub", "ins")],
        ],
    );

    let library = LibraryRegistry::new();
    let adapters = AdapterRegistry::standard();
    let refinements = RefinementConfig::default();
    let mut elab = Elaborator::new(&library, &adapters, &refinements, collect());
    elab.instantiate_top(design).unwrap();
    let mut solver = ConstPropSolver::new();
    assert_eq!(elab.run_generators(&mut solver).unwrap(), 0);
    let resolution = elab.solve(&mut solver).unwrap();
    let sink = DiagnosticSink::new();
    let report = elab.check(&resolution, &sink);
    assert_eq!(report.violated, 1);
    assert_eq!(
        errors(&sink.take_all()),
        vec![("d2_out".to_string(), "overvoltage".to_string())]
    );

    let design = elab.design();
    let ins = design.find_port(block_at(design, "hub"), "ins").unwrap();
    let elements = design.ports[ins].elements.clone().unwrap();
    assert_eq!(elements.len(), 3);
    for element in elements {
        let link = &design.links[design.ports[element].link.unwrap()];
        assert_eq!(link.role("sinks"), &[element]);
        assert_eq!(link.role("sources").len(), 1);
    }
}

fn load(prefix: &'static str) -> BlockRef {
    block("t.Load", move |b| {
        let pwr = b.port("pwr", PortModel::voltage_sink(Range::new(0.0, 3.6), Range::new(0.0, 0.25)))?;
        b.footprint(Footprint {
            footprint: "R_0603".to_string(),
            refdes_prefix: prefix.to_string(),
            pinning: vec![("1".to_string(), pwr)],
            mfr: None,
            part: None,
            value: None,
            datasheet: None,
        })
    })
}

fn board(loads: usize) -> BlockRef {
    block("t.Board", move |b| {
        let pwr = b.port("pwr", PortModel::new(PortType::VoltageSink))?;
        let mut net = vec![pwr];
        for i in 0..loads {
            let child = b.block_ref(&format!("l{i}"), load("R"))?;
            net.push(b.child_port(child, "pwr")?);
        }
        b.connect(&net)
    })
}

fn regulator() -> BlockRef {
    block("t.Regulator", |b| {
        let out = b.port("out", PortModel::voltage_source(Range::exact(3.3), Range::ALL))?;
        b.footprint(Footprint {
            footprint: "SOT-23".to_string(),
            refdes_prefix: "U".to_string(),
            pinning: vec![("1".to_string(), out)],
            mfr: Some("Acme".to_string()),
            part: Some("LDO33".to_string()),
            value: None,
            datasheet: None,
        })
    })
}

fn powered_board(loads: usize) -> BlockRef {
    top(
        vec![("src", regulator()), ("board", board(loads))],
        vec![vec![("src", "out"), ("board", "pwr")]],
    )
}

#[test]
fn bridge_carries_values_both_ways() {
    let (result, diags) = run(powered_board(2));
    let elab = result.unwrap_or_else(|e| panic!("{e}: {:?}", errors(&diags)));
    let design = &elab.design;

    let bridge = block_at(design, "board.pwr_bridge");
    assert_eq!(design.blocks[bridge].kind, BlockKind::Bridge);

    // Sink-like fields flow outward.
    let draw = port_field(design, "board", "pwr", "current_draw");
    assert_eq!(range_of(&elab, draw), Range::new(0.0, 0.5));
    let limits = port_field(design, "board", "pwr", "voltage_limits");
    assert_eq!(range_of(&elab, limits), Range::new(0.0, 3.6));

    // Source-like fields flow inward.
    let load_pwr = design.find_port(block_at(design, "board.l0"), "pwr").unwrap();
    let voltage = design.link_field(load_pwr, "voltage").unwrap();
    assert_eq!(range_of(&elab, voltage), Range::exact(3.3));
}

/// A transmitter board: one push-pull driver and a local monitor share the
/// boundary output, so the boundary needs a bridge.
fn tx_board(voltage: f64) -> BlockRef {
    block("t.TxBoard", move |b| {
        let out = b.port("out", PortModel::new(PortType::DigitalSource))?;
        let drv = b.block_ref("drv", driver(Range::exact(voltage), Range::new(0.4, 2.9)))?;
        let mon = b.block_ref("mon", receiver(Range::new(-0.3, 3.6), Range::new(0.8, 2.0)))?;
        let net = [out, b.child_port(drv, "out")?, b.child_port(mon, "in")?];
        b.connect(&net)
    })
}

fn rx_board() -> BlockRef {
    block("t.RxBoard", |b| {
        let input = b.port("in", PortModel::new(PortType::DigitalSink))?;
        let mut net = vec![input];
        for i in 0..2 {
            let rx = b.block_ref(&format!("r{i}"), receiver(Range::new(-0.3, 3.6), Range::new(0.8, 2.0)))?;
            net.push(b.child_port(rx, "in")?);
        }
        b.connect(&net)
    })
}

fn digital_boards(voltage: f64) -> BlockRef {
    top(
        vec![("tx", tx_board(voltage)), ("rx", rx_board())],
        vec![vec![("tx", "out"), ("rx", "in")]],
    )
}

#[test]
fn digital_bridges_carry_voltage_inward() {
    let (result, diags) = run(digital_boards(3.3));
    let elab = result.unwrap_or_else(|e| panic!("{e}: {:?}", errors(&diags)));
    let design = &elab.design;
    assert_eq!(design.blocks[block_at(design, "tx.out_bridge")].kind, BlockKind::Bridge);
    assert_eq!(design.blocks[block_at(design, "rx.in_bridge")].kind, BlockKind::Bridge);

    let voltage = port_field(design, "tx", "out", "voltage_out");
    assert_eq!(range_of(&elab, voltage), Range::exact(3.3));
    let limits = port_field(design, "rx", "in", "voltage_limits");
    assert_eq!(range_of(&elab, limits), Range::new(-0.3, 3.6));

    let r1 = design.find_port(block_at(design, "rx.r1"), "in").unwrap();
    let seen = design.link_field(r1, "voltage").unwrap();
    assert_eq!(range_of(&elab, seen), Range::exact(3.3));
}

#[test]
fn overvoltage_reported_through_digital_bridges() {
    let (result, diags) = run_with(
        digital_boards(5.0),
        &LibraryRegistry::new(),
        &RefinementConfig::default(),
        collect(),
    );
    assert!(matches!(result, Err(ElabError::Violations { count: 3 })));
    let mut found = errors(&diags);
    found.sort();
    let expected: Vec<(String, String)> = ["rx.in_bridge_inner", "tx.out_bridge_inner", "tx_out"]
        .iter()
        .map(|path| (path.to_string(), "overvoltage".to_string()))
        .collect();
    assert_eq!(found, expected);
}

#[test]
fn export_with_disagreeing_fields_conflicts() {
    let board = block("t.Board", |b| {
        let pwr = b.port("pwr", PortModel::voltage_sink(Range::new(0.0, 5.0), Range::new(0.0, 0.5)))?;
        let c = b.block_ref("c", sink(Range::new(0.0, 3.6), Range::new(0.0, 0.1)))?;
        let inner = b.child_port(c, "pwr")?;
        b.connect(&[pwr, inner])
    });
    let design = top(
        vec![("src", source(Range::exact(3.3))), ("board", board)],
        vec![vec![("src", "out"), ("board", "pwr")]],
    );
    let (result, diags) = run_with(
        design,
        &LibraryRegistry::new(),
        &RefinementConfig::default(),
        collect(),
    );
    assert!(matches!(result, Err(ElabError::Violations { .. })));
    let mut conflicts: Vec<String> = errors(&diags)
        .into_iter()
        .filter(|(_, message)| message.starts_with("conflicting values"))
        .map(|(path, _)| path)
        .collect();
    conflicts.sort();
    assert_eq!(conflicts, ["board.c.pwr.current_draw", "board.c.pwr.voltage_limits"]);
}

#[test]
fn second_assignment_of_a_parameter_is_rejected() {
    let design = block("t.Top", |b| {
        let x = b.param("x", Kind::Float)?;
        b.assign(x, 1.0)?;
        b.assign(x, 2.0)
    });
    let (result, _) = run(design);
    assert!(matches!(result, Err(ElabError::DuplicateAssign { .. })));
}

#[test]
fn single_interior_port_is_exported_without_bridge() {
    let (result, _) = run(powered_board(1));
    let elab = result.unwrap();
    let design = &elab.design;
    let board = block_at(design, "board");
    assert!(design.blocks[board]
        .children
        .iter()
        .all(|c| design.blocks[*c].kind == BlockKind::Hierarchy));
    let draw = port_field(design, "board", "pwr", "current_draw");
    assert_eq!(range_of(&elab, draw), Range::new(0.0, 0.25));
}

#[test]
fn elaboration_is_deterministic() {
    let first = run(powered_board(3)).0.unwrap();
    let second = run(powered_board(3)).0.unwrap();
    assert_eq!(first.design.params.len(), second.design.params.len());
    assert_eq!(
        first.resolution.values.keys().collect::<Vec<_>>(),
        second.resolution.values.keys().collect::<Vec<_>>()
    );
    for (id, value) in &first.resolution.values {
        assert!(value.bit_eq(&second.resolution.values[id]), "{id:?} differs");
    }
    assert_eq!(Netlist::build(&first.design), Netlist::build(&second.design));
}

#[test]
fn netlist_joins_pins_across_bridges() {
    let elab = run(powered_board(2)).0.unwrap();
    let netlist = Netlist::build(&elab.design);

    let refdes: Vec<&str> = netlist.parts.iter().map(|p| p.refdes.as_str()).collect();
    assert_eq!(refdes, ["U1", "R1", "R2"]);
    assert_eq!(netlist.parts[0].part.as_deref(), Some("LDO33"));
    assert_eq!(netlist.parts[1].path, HierPath::parse("board.l0"));

    assert_eq!(netlist.nets.len(), 1);
    let net = &netlist.nets[0];
    assert_eq!(net.name, "src_out");
    let pins: Vec<(&str, &str)> = net.pins.iter().map(|p| (p.refdes.as_str(), p.pin.as_str())).collect();
    assert_eq!(pins, [("R1", "1"), ("R2", "1"), ("U1", "1")]);
    assert_eq!(netlist.net_of("R2", "1").map(|n| n.name.as_str()), Some("src_out"));
}

fn refinable_library() -> LibraryRegistry {
    let mut library = LibraryRegistry::new();
    library
        .register_ref(abstract_block("t.Supply", |b| {
            b.port("out", PortModel::new(PortType::VoltageSource))?;
            Ok(())
        }))
        .unwrap();
    for (class, volts) in [("t.Ldo", 3.3), ("t.Buck", 1.8)] {
        library
            .register_ref(block(class, move |b| {
                b.port("out", PortModel::voltage_source(Range::exact(volts), Range::ALL))?;
                Ok(())
            }))
            .unwrap();
    }
    library
}

fn supplied() -> BlockRef {
    block("t.Top", |b| {
        let reg = b.library_block("reg", "t.Supply")?;
        let load = b.block_ref("load", sink(Range::new(0.0, 3.6), Range::ZERO))?;
        let out = b.child_port(reg, "out")?;
        let pwr = b.child_port(load, "pwr")?;
        b.connect(&[out, pwr])
    })
}

fn class_at(refinements: &RefinementConfig, library: &LibraryRegistry) -> Result<String, ElabError> {
    let (result, _) = run_with(supplied(), library, refinements, ElabOptions::default());
    let elab = result?;
    let reg = block_at(&elab.design, "reg");
    Ok(elab.design.blocks[reg].class.clone())
}

#[test]
fn abstract_block_uses_default_then_refinements() {
    let mut library = refinable_library();
    let none = RefinementConfig::default();
    assert!(matches!(
        class_at(&none, &library),
        Err(ElabError::AbstractBlock { .. })
    ));

    library.register_default("t.Supply", "t.Ldo").unwrap();
    assert_eq!(class_at(&none, &library).unwrap(), "t.Ldo");

    let by_class = RefinementConfig {
        classes: BTreeMap::from([("t.Supply".to_string(), "t.Buck".to_string())]),
        ..RefinementConfig::default()
    };
    assert_eq!(class_at(&by_class, &library).unwrap(), "t.Buck");

    let by_path = RefinementConfig {
        paths: BTreeMap::from([("reg".to_string(), "t.Ldo".to_string())]),
        classes: by_class.classes.clone(),
    };
    assert_eq!(class_at(&by_path, &library).unwrap(), "t.Ldo");
}
