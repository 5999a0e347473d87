//! Unit tests for decay chain composition

mod generators;

use feyncore::decay_chain::compose;
use feyncore::helas::diagram_color_strings;
use feyncore::{CoreError, LegState, Process, Session};
use generators::sm;

const TOP_CHAIN: &str = "g g > t t~, (t > b w+, w+ > mu+ vm), t~ > b~ w-";

#[test]
fn test_nested_chain_final_state() {
    let s = Session::new(sm());
    let out = s.generate_process(TOP_CHAIN).unwrap();
    assert_eq!(out.amplitudes.len(), 1);
    assert!(out.skipped.is_empty());
    let amp = &out.amplitudes[0];
    assert_eq!(amp.process.final_ids(), vec![5, -13, 14, -5, -24]);
    assert_eq!(amp.n_external(), 7);
    assert_eq!(amp.diagrams.len(), 3);
    assert!(amp.is_prefix_closed());
}

#[test]
fn test_decayed_legs_become_onshell_propagators() {
    let model = sm();
    let s = Session::new(model.clone());
    let amp = s.generate_process(TOP_CHAIN).unwrap().amplitudes.remove(0);
    for d in &amp.diagrams {
        d.check(&model).unwrap();
        let mut onshell: Vec<_> = d
            .internal_legs()
            .into_iter()
            .filter(|l| l.onshell == Some(true))
            .map(|l| l.id.abs())
            .collect();
        onshell.sort_unstable();
        assert_eq!(onshell, vec![6, 6, 24]);
        assert!(d
            .external_legs()
            .iter()
            .all(|l| matches!(l.state, LegState::Initial | LegState::Final)));
    }
}

#[test]
fn test_composed_color_strings_balance() {
    let model = sm();
    let s = Session::new(model.clone());
    let amp = s.generate_process(TOP_CHAIN).unwrap().amplitudes.remove(0);
    for d in &amp.diagrams {
        for (_, cs) in diagram_color_strings(&model, d).unwrap() {
            for (index, count) in cs.index_counts() {
                if index < 0 {
                    assert_eq!(count, 2, "{}", cs);
                }
            }
        }
    }
}

#[test]
fn test_decays_keep_production_color_matrix() {
    let s = Session::new(sm());
    let bare = s.generate_process("g g > t t~").unwrap().amplitudes.remove(0);
    let chained = s.generate_process(TOP_CHAIN).unwrap().amplitudes.remove(0);
    assert_eq!(chained.color_basis.len(), bare.color_basis.len());
    assert_eq!(chained.color_matrix(3).unwrap(), bare.color_matrix(3).unwrap());
}

#[test]
fn test_proton_initial_states_with_decays() {
    let s = Session::new(sm());
    let out = s
        .generate_process("p p > t t~, (t > b w+, w+ > mu+ vm), t~ > b~ w-")
        .unwrap();
    // g g plus four light quark-antiquark pairs
    assert_eq!(out.amplitudes.len(), 5);
    assert_eq!(out.amplitudes.len() + out.skipped.len(), 45);
    for amp in &out.amplitudes {
        let mut finals = amp.process.final_ids();
        finals.sort_unstable();
        assert_eq!(finals, vec![-24, -13, -5, 5, 14]);
    }
}

#[test]
fn test_same_mother_chains_decay_separate_legs() {
    let model = sm();
    let s = Session::new(model.clone());
    let out = s
        .generate_process("u u~ > z z, z > e- e+, z > mu- mu+")
        .unwrap();
    assert_eq!(out.amplitudes.len(), 1);
    let amp = &out.amplitudes[0];
    assert_eq!(amp.process.final_ids(), vec![11, -11, 13, -13]);
    assert!(!amp.diagrams.is_empty());
    for d in &amp.diagrams {
        d.check(&model).unwrap();
        let onshell = d
            .internal_legs()
            .into_iter()
            .filter(|l| l.onshell == Some(true) && l.id == 23)
            .count();
        assert_eq!(onshell, 2);
    }
}

#[test]
fn test_compose_rejects_non_decay() {
    let model = sm();
    let s = Session::new(model.clone());
    let production = s
        .generate_amplitude(&Process::new(&model, &[21, 21], &[6, -6]).unwrap())
        .unwrap();
    let scattering = s
        .generate_amplitude(&Process::new(&model, &[2, -2], &[1, -1]).unwrap())
        .unwrap();
    assert!(matches!(
        compose(&model, &production, &[scattering]),
        Err(CoreError::IncompatibleDecay(_))
    ));
}

#[test]
fn test_unmatched_decay_is_fatal() {
    let s = Session::new(sm());
    assert!(matches!(
        s.generate_process("g g > t t~, z > e+ e-"),
        Err(CoreError::IncompatibleDecay(_))
    ));
}
