//! Property tests for diagram generation

mod generators;

use std::collections::HashSet;

use feyncore::generate::diagram_label;
use feyncore::{generate_diagrams, CancelToken, SessionConfig};
use generators::{arb_process, sm};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every generated diagram passes the structural checks
    #[test]
    fn generated_diagrams_are_well_formed(process in arb_process()) {
        let model = sm();
        let diagrams = generate_diagrams(&model, &process, &SessionConfig::default(), &CancelToken::new()).unwrap();
        for d in &diagrams {
            prop_assert!(d.check(&model).is_ok(), "{:?}", d);
            let numbers: Vec<_> = d.external_legs().iter().map(|l| l.number).collect();
            prop_assert_eq!(numbers, vec![1, 2, 3, 4]);
            prop_assert!(!d.is_loop());
        }
    }

    /// Order bounds of the process hold for every diagram
    #[test]
    fn order_constraints_hold(process in arb_process()) {
        let model = sm();
        let diagrams = generate_diagrams(&model, &process, &SessionConfig::default(), &CancelToken::new()).unwrap();
        for d in &diagrams {
            for (key, constraint) in &process.orders {
                prop_assert!(constraint.is_satisfied(d.order(key)), "{} {} {}", key, constraint, d.order(key));
            }
        }
    }

    /// No two diagrams share a topology and order assignment
    #[test]
    fn diagrams_are_unique(process in arb_process()) {
        let model = sm();
        let diagrams = generate_diagrams(&model, &process, &SessionConfig::default(), &CancelToken::new()).unwrap();
        let mut seen = HashSet::new();
        for d in &diagrams {
            prop_assert!(seen.insert((diagram_label(&model, d), d.orders.clone())));
        }
    }

    /// Tightening a bound never adds diagrams
    #[test]
    fn tighter_bounds_select_subsets(process in arb_process()) {
        let model = sm();
        let config = SessionConfig { auto_weighted: false, ..SessionConfig::default() };
        let cancel = CancelToken::new();
        let mut loose = process.clone();
        loose.orders.clear();
        let all = generate_diagrams(&model, &loose, &config, &cancel).unwrap();
        let bounded = generate_diagrams(&model, &process, &config, &cancel).unwrap();
        prop_assert!(bounded.len() <= all.len());
        let labels: HashSet<_> = all.iter().map(|d| diagram_label(&model, d)).collect();
        for d in &bounded {
            prop_assert!(labels.contains(&diagram_label(&model, d)));
        }
    }
}
