//! Unit tests for diagram generation

mod generators;

use std::collections::BTreeSet;

use feyncore::process::PerturbationMode;
use feyncore::{CoreError, Diagram, OrderConstraint, PdgCode, Process, Session, SessionConfig};
use generators::sm;

fn s_channel_ids(process: &Process, d: &Diagram) -> BTreeSet<PdgCode> {
    d.s_channel_legs(process.initial_legset())
        .into_iter()
        .map(|l| l.id.abs())
        .collect()
}

fn session() -> Session {
    Session::new(sm())
}

// ============================================================================
// Tree scenarios
// ============================================================================

#[test]
fn test_quark_pair_annihilation_qcd_only() {
    let s = session();
    let p = Process::new(s.model(), &[2, -2], &[1, -1])
        .unwrap()
        .with_order("QCD", OrderConstraint::AtMost(2))
        .with_order("QED", OrderConstraint::AtMost(0));
    let diagrams = s.generate_diagrams(&p).unwrap();
    assert_eq!(diagrams.len(), 1);
    assert_eq!(s_channel_ids(&p, &diagrams[0]), BTreeSet::from([21]));
    assert_eq!(diagrams[0].order("QCD"), 2);
}

#[test]
fn test_quark_pair_annihilation_all_orders() {
    let s = session();
    let p = Process::new(s.model(), &[2, -2], &[1, -1])
        .unwrap()
        .with_order("QCD", OrderConstraint::AtMost(2))
        .with_order("QED", OrderConstraint::AtMost(2));
    let diagrams = s.generate_diagrams(&p).unwrap();
    // s-channel g, a, z and t-channel w
    assert_eq!(diagrams.len(), 4);
    let s_channels: Vec<_> = diagrams
        .iter()
        .flat_map(|d| s_channel_ids(&p, d))
        .collect();
    assert_eq!(s_channels.len(), 3);
}

#[test]
fn test_gluon_fusion_to_top_pair() {
    let s = session();
    let p = Process::new(s.model(), &[21, 21], &[6, -6]).unwrap();
    let diagrams = s.generate_diagrams(&p).unwrap();
    assert_eq!(diagrams.len(), 3);
    assert!(diagrams.iter().all(|d| d.order("QCD") == 2 && d.order("QED") == 0));
    let with_gluon = diagrams
        .iter()
        .filter(|d| s_channel_ids(&p, d).contains(&21))
        .count();
    assert_eq!(with_gluon, 1);
}

#[test]
fn test_lepton_pair_annihilation() {
    let s = session();
    let p = Process::new(s.model(), &[-11, 11], &[-13, 13])
        .unwrap()
        .with_order("QED", OrderConstraint::AtMost(2));
    let diagrams = s.generate_diagrams(&p).unwrap();
    assert_eq!(diagrams.len(), 2);
    let all: BTreeSet<PdgCode> = diagrams
        .iter()
        .flat_map(|d| s_channel_ids(&p, d))
        .collect();
    assert_eq!(all, BTreeSet::from([22, 23]));
}

#[test]
fn test_bhabha_has_t_channels() {
    let s = session();
    let p = Process::new(s.model(), &[-11, 11], &[-11, 11])
        .unwrap()
        .with_order("QED", OrderConstraint::AtMost(2));
    assert_eq!(s.generate_diagrams(&p).unwrap().len(), 4);
}

#[test]
fn test_four_gluon_diagrams() {
    let s = session();
    let p = Process::new(s.model(), &[21, 21], &[21, 21]).unwrap();
    // s, t, u channel gluons and the contact vertex
    assert_eq!(s.generate_diagrams(&p).unwrap().len(), 4);
}

#[test]
fn test_every_diagram_is_well_formed() {
    let s = session();
    let p = Process::new(s.model(), &[2, -2], &[23, 22]).unwrap();
    for d in s.generate_diagrams(&p).unwrap() {
        d.check(s.model()).unwrap();
        let numbers: Vec<_> = d.external_legs().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}

// ============================================================================
// Orders and empty results
// ============================================================================

#[test]
fn test_auto_weighted_selection() {
    let p = Process::new(&sm(), &[2, -2], &[1, -1]).unwrap();
    assert_eq!(session().generate_diagrams(&p).unwrap().len(), 1);

    let config = SessionConfig {
        auto_weighted: false,
        ..SessionConfig::default()
    };
    let s = Session::with_config(sm(), config).unwrap();
    assert_eq!(s.generate_diagrams(&p).unwrap().len(), 4);
}

#[test]
fn test_weighted_bound() {
    let s = session();
    let p = Process::new(s.model(), &[2, -2], &[1, -1])
        .unwrap()
        .with_order("WEIGHTED", OrderConstraint::AtMost(2));
    let diagrams = s.generate_diagrams(&p).unwrap();
    assert_eq!(diagrams.len(), 1);
    assert_eq!(diagrams[0].weighted_order(s.model()), 2);
}

#[test]
fn test_exact_order_bound() {
    let s = session();
    let p = Process::new(s.model(), &[2, -2], &[1, -1])
        .unwrap()
        .with_order("QED", OrderConstraint::Exactly(2))
        .with_order("QCD", OrderConstraint::Exactly(0));
    assert_eq!(s.generate_diagrams(&p).unwrap().len(), 3);
}

#[test]
fn test_no_diagrams() {
    let s = session();
    let mut p = Process::new(s.model(), &[-11, 11], &[2, 2]).unwrap();
    assert!(matches!(s.generate_diagrams(&p), Err(CoreError::NoDiagrams(_))));
    p.ignore_empty = true;
    assert!(s.generate_diagrams(&p).unwrap().is_empty());
}

#[test]
fn test_unknown_order_key() {
    let s = session();
    let p = Process::new(s.model(), &[-11, 11], &[-13, 13])
        .unwrap()
        .with_order("QXD", OrderConstraint::AtMost(2));
    assert!(matches!(
        s.generate_diagrams(&p),
        Err(CoreError::OrderInconsistent(_))
    ));
}

#[test]
fn test_invalid_process() {
    let s = session();
    let p = Process::new(s.model(), &[2, -2, 21], &[1, -1]).unwrap();
    assert!(matches!(s.generate_diagrams(&p), Err(CoreError::InvalidProcess(_))));
    assert!(Process::new(s.model(), &[2], &[0]).is_err());
}

// ============================================================================
// One loop
// ============================================================================

#[test]
fn test_qcd_vertex_correction() {
    let s = session();
    let p = Process::new(s.model(), &[-11, 11], &[2, -2])
        .unwrap()
        .with_perturbation(PerturbationMode::Virt, &["QCD"]);
    let diagrams = s.generate_diagrams(&p).unwrap();
    let born: Vec<_> = diagrams.iter().filter(|d| !d.is_loop()).collect();
    let loops: Vec<_> = diagrams.iter().filter(|d| d.is_loop()).collect();
    assert_eq!(born.len(), 2);
    // gluon exchange across the photon and the z vertex
    assert_eq!(loops.len(), 2);
    for d in loops {
        let info = d.loop_info.as_ref().unwrap();
        assert!([2, -2, 21].contains(&info.loop_particle));
        assert_eq!(info.loop_vertices.len(), 3);
        assert_eq!(d.order("QCD"), 2);
    }
}

#[test]
fn test_loop_tags_are_distinct() {
    let s = session();
    let p = Process::new(s.model(), &[-11, 11], &[2, -2])
        .unwrap()
        .with_perturbation(PerturbationMode::Virt, &["QCD"]);
    let diagrams = s.generate_diagrams(&p).unwrap();
    let tags: Vec<_> = diagrams
        .iter()
        .filter_map(|d| d.loop_info.as_ref().map(|l| l.tag.clone()))
        .collect();
    let unique: BTreeSet<_> = tags.iter().cloned().collect();
    assert_eq!(tags.len(), unique.len());
}

#[test]
fn test_real_only_perturbation_has_no_loops() {
    let s = session();
    let p = Process::new(s.model(), &[-11, 11], &[2, -2])
        .unwrap()
        .with_perturbation(PerturbationMode::Real, &["QCD"]);
    assert!(s.generate_diagrams(&p).unwrap().iter().all(|d| !d.is_loop()));
}

// ============================================================================
// Multi-process
// ============================================================================

#[test]
fn test_multiprocess_skips_empty_members() {
    let s = session();
    let out = s.generate_process("e+ e- > l+ l- QED<=2").unwrap();
    // e+ e- and mu+ mu- finals; e+ mu- and mu+ e- have no diagrams
    assert_eq!(out.amplitudes.len(), 2);
    assert_eq!(out.skipped.len(), 2);
}

#[test]
fn test_multiprocess_all_empty_fails() {
    let s = session();
    assert!(matches!(
        s.generate_process("e+ e- > u u"),
        Err(CoreError::NoDiagrams(_))
    ));
}

#[test]
fn test_unknown_label() {
    let s = session();
    assert!(s.generate_process("e+ e- > zz zz").is_err());
}
