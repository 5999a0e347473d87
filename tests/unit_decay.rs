//! Unit tests for the decay engine

mod generators;

use feyncore::decay::{
    find_channels, find_decay_groups, find_particle_channels, find_stable_particles, DecayChannel,
};
use feyncore::{CancelToken, CoreError, LegSet, Model, Session, SessionConfig};
use generators::sm;

fn two_body() -> SessionConfig {
    SessionConfig {
        max_final_state_number: 2,
        ..SessionConfig::default()
    }
}

#[test]
fn test_top_decays_to_b_w() {
    let model = sm();
    let channels = find_channels(&model, 6, 2, &two_body(), &CancelToken::new()).unwrap();
    assert!(!channels.is_empty());
    let first = &channels[0];
    assert_eq!(first.final_ids, vec![5, 24]);
    assert!(first.apx_width > 0.0);
    assert!(first.apx_psarea > 0.0);
    assert_eq!(first.diagram.external_legs().len(), 3);
}

/// Mass a propagator could reach, and the mass of the legs under it
fn propagator_window(model: &Model, channel: &DecayChannel, legs: LegSet) -> (f64, f64) {
    let masses: Vec<f64> = channel.final_ids.iter().map(|&p| model.mass_value(p)).collect();
    let total: f64 = masses.iter().sum();
    let inside: f64 = legs
        .iter()
        .filter(|&n| n >= 2)
        .map(|n| masses[(n - 2) as usize])
        .sum();
    (inside, model.mass_value(channel.mother) - (total - inside))
}

#[test]
fn test_top_three_body_search() {
    let model = sm();
    let config = SessionConfig::default();
    assert_eq!(config.max_final_state_number, 3);
    let channels = find_particle_channels(&model, 6, &config, &CancelToken::new()).unwrap();
    assert_eq!(channels[0].final_ids, vec![5, 24]);
    for pair in channels.windows(2) {
        assert!(pair[0].apx_width >= pair[1].apx_width);
    }

    let top_mass = model.mass_value(6);
    let three_body: Vec<_> = channels.iter().filter(|c| c.n_final() == 3).collect();
    // radiation off the b quark survives, radiation off the top does not
    assert!(three_body.iter().any(|c| c.final_ids == vec![5, 21, 24]));
    for c in three_body {
        assert!(c.apx_width < channels[0].apx_width, "{:?}", c.final_ids);
        for leg in c.diagram.internal_legs() {
            let m = model.mass_value(leg.id);
            assert!(m < top_mass, "{:?}", c.final_ids);
            let (inside, hi) = propagator_window(&model, c, leg.legset);
            assert!(!(m > 0.0 && inside < m && m <= hi), "{:?}", c.final_ids);
        }
    }
    // b e+ ve only goes through an on-shell W
    assert!(!channels.iter().any(|c| c.final_ids == vec![-11, 5, 12]));
}

#[test]
fn test_massless_particles_have_no_channels() {
    let model = sm();
    for pdg in [21, 22, 2, 11] {
        assert!(find_channels(&model, pdg, 2, &two_body(), &CancelToken::new())
            .unwrap()
            .is_empty());
    }
}

#[test]
fn test_z_channels_are_ranked() {
    let s = Session::with_config(sm(), two_body()).unwrap();
    let channels = s.find_channels(23).unwrap();
    // five quark and six lepton flavors, top excluded by mass
    assert_eq!(channels.len(), 11);
    for pair in channels.windows(2) {
        assert!(pair[0].apx_width >= pair[1].apx_width);
    }
    assert!(channels.iter().all(|c| c.n_final() == 2));
}

#[test]
fn test_decay_table_branching_ratios() {
    let s = Session::with_config(sm(), two_body()).unwrap();
    let table = s.decay_table().unwrap();
    let top: Vec<_> = table.branching_ratios(6);
    assert_eq!(top.len(), 1);
    assert!((top[0].1 - 1.0).abs() < 1e-12);

    for pdg in table.particles() {
        let total: f64 = table.branching_ratios(pdg).iter().map(|(_, br)| br).sum();
        assert!((total - 1.0).abs() < 1e-9, "{}", pdg);
        let min_br = s.config().min_br;
        for channel in table.channels(pdg) {
            assert!(channel.apx_width > min_br * table.total_width(pdg));
        }
    }
    assert!(table.channels(22).is_empty());
}

#[test]
fn test_higgs_prefers_bottom_quarks() {
    let s = Session::with_config(sm(), two_body()).unwrap();
    let channels = s.find_channels(25).unwrap();
    assert_eq!(channels[0].final_ids, vec![-5, 5]);
    assert!(channels.iter().any(|c| c.final_ids == vec![-15, 15]));
}

#[test]
fn test_stable_particles() {
    let model = sm();
    let stable = find_stable_particles(&model, &two_body(), &CancelToken::new()).unwrap();
    for pdg in [1, 2, 5, 11, 12, 15, 21, 22] {
        assert!(stable.contains(&pdg), "{}", pdg);
    }
    for pdg in [6, 23, 24, 25] {
        assert!(!stable.contains(&pdg), "{}", pdg);
    }
    let mut sorted = stable.clone();
    sorted.sort_unstable();
    assert_eq!(stable, sorted);
}

#[test]
fn test_decay_groups_partition_massive_particles() {
    let model = sm();
    let groups = find_decay_groups(&model);
    let mut all: Vec<_> = groups.iter().flat_map(|g| g.members.clone()).collect();
    all.sort_unstable();
    let before = all.len();
    all.dedup();
    assert_eq!(all.len(), before);
    let top = groups.iter().find(|g| g.members.contains(&6)).unwrap();
    assert!(top.members.contains(&5));
    assert!(top.lightest().is_some());
}

#[test]
fn test_channel_search_overrides_group_lightest() {
    let model = sm();
    let groups = find_decay_groups(&model);
    let tau = groups.iter().find(|g| g.members.contains(&15)).unwrap();
    assert_eq!(tau.lightest(), Some(15));

    // stable with two bodies, leptonic decays through a virtual W with three
    assert!(find_stable_particles(&model, &two_body(), &CancelToken::new())
        .unwrap()
        .contains(&15));
    let config = SessionConfig::default();
    let channels = find_channels(&model, 15, 3, &config, &CancelToken::new()).unwrap();
    assert!(channels.iter().any(|c| c.final_ids == vec![-12, 11, 16]));
}

#[test]
fn test_cancelled_channel_search() {
    let model = sm();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        find_channels(&model, 23, 2, &two_body(), &cancel),
        Err(CoreError::Cancelled)
    ));
}
