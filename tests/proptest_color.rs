//! Property tests for color simplification

mod generators;

use feyncore::color::{simplify, simplify_factor};
use generators::arb_color_string;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A simplified factor is a fixed point
    #[test]
    fn simplify_is_idempotent(cs in arb_color_string()) {
        let once = simplify(&cs).unwrap();
        let twice = simplify_factor(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Contracted indices stay paired and no new external index appears
    #[test]
    fn simplified_terms_keep_index_balance(cs in arb_color_string()) {
        let external: Vec<i32> = {
            let mut v: Vec<i32> = cs.index_counts().into_keys().filter(|&i| i > 0).collect();
            v.sort_unstable();
            v
        };
        for term in simplify(&cs).unwrap() {
            let counts = term.index_counts();
            for (index, count) in &counts {
                if *index < 0 {
                    prop_assert_eq!(*count, 2, "{}", term);
                }
            }
            for index in counts.keys().filter(|&&i| i > 0) {
                prop_assert!(external.contains(index), "{}", term);
            }
        }
    }

    /// Terms of a simplified factor carry distinct color structures
    #[test]
    fn simplified_terms_are_merged(cs in arb_color_string()) {
        let terms = simplify(&cs).unwrap();
        for (i, a) in terms.iter().enumerate() {
            for b in &terms[i + 1..] {
                prop_assert!(
                    a.objects != b.objects || a.imaginary != b.imaginary || a.nc_power != b.nc_power,
                    "{} {}", a, b
                );
            }
        }
    }
}
