//! Proptest generators for feyncore data structures
//!
//! Provides `Strategy` implementations for processes over the built-in
//! Standard Model and for well-formed color strings.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use feyncore::color::{ColorObject, ColorString};
use feyncore::model::sm::standard_model;
use feyncore::{Model, OrderConstraint, PdgCode, Process};
use proptest::collection::vec;
use proptest::prelude::*;

// ============================================================================
// Model
// ============================================================================

/// The Standard Model, built once per test binary
pub fn sm() -> Arc<Model> {
    static MODEL: OnceLock<Arc<Model>> = OnceLock::new();
    MODEL
        .get_or_init(|| Arc::new(standard_model().expect("built-in model")))
        .clone()
}

// ============================================================================
// Process Generation
// ============================================================================

/// 2 → 2 processes with a handful of diagrams each
const TWO_TO_TWO: &[(&[PdgCode], &[PdgCode])] = &[
    (&[2, -2], &[1, -1]),
    (&[2, -2], &[2, -2]),
    (&[-11, 11], &[-13, 13]),
    (&[-11, 11], &[2, -2]),
    (&[21, 21], &[6, -6]),
    (&[21, 21], &[21, 21]),
    (&[2, -2], &[23, 22]),
    (&[2, 21], &[2, 21]),
    (&[2, -1], &[24, 22]),
    (&[-11, 11], &[24, -24]),
];

/// A 2 → 2 Standard Model process with optional QCD/QED bounds
pub fn arb_process() -> impl Strategy<Value = Process> {
    (
        0..TWO_TO_TWO.len(),
        proptest::option::of(0u32..=2),
        proptest::option::of(0u32..=2),
    )
        .prop_map(|(i, qcd, qed)| {
            let (initial, finals) = TWO_TO_TWO[i];
            let model = sm();
            let mut p = Process::new(&model, initial, finals).expect("valid process");
            if let Some(n) = qcd {
                p = p.with_order("QCD", OrderConstraint::AtMost(n));
            }
            if let Some(n) = qed {
                p = p.with_order("QED", OrderConstraint::AtMost(n));
            }
            p.ignore_empty = true;
            p
        })
}

/// A massive Standard Model particle code
pub fn arb_massive_particle() -> impl Strategy<Value = PdgCode> {
    prop::sample::select(vec![5, 6, 15, 23, 24, 25])
}

// ============================================================================
// Color String Generation
// ============================================================================

/// How one internal index is contracted
#[derive(Clone, Copy, Debug)]
pub enum Contraction {
    /// T(x,i,j) T(x,k,l)
    GeneratorPair,
    /// f(x,a,b) f(x,c,d)
    StructurePair,
    /// T(x,i,j) f(x,a,b)
    Mixed,
    /// T(a,i,x) T(b,x,j)
    Chain,
}

fn arb_contraction() -> impl Strategy<Value = Contraction> {
    prop_oneof![
        Just(Contraction::GeneratorPair),
        Just(Contraction::StructurePair),
        Just(Contraction::Mixed),
        Just(Contraction::Chain),
    ]
}

/// A color string whose internal indices each appear exactly twice
///
/// External indices are fresh positive numbers, so the string always
/// validates.
pub fn arb_color_string() -> impl Strategy<Value = ColorString> {
    vec(arb_contraction(), 1..=3).prop_map(|kinds| {
        let mut external = 0;
        let mut fresh = || {
            external += 1;
            external
        };
        let mut objects = Vec::new();
        for (n, kind) in kinds.into_iter().enumerate() {
            let x = -(n as i32) - 1;
            match kind {
                Contraction::GeneratorPair => {
                    objects.push(ColorObject::t(vec![x], fresh(), fresh()));
                    objects.push(ColorObject::t(vec![x], fresh(), fresh()));
                }
                Contraction::StructurePair => {
                    objects.push(ColorObject::F(x, fresh(), fresh()));
                    objects.push(ColorObject::F(x, fresh(), fresh()));
                }
                Contraction::Mixed => {
                    objects.push(ColorObject::t(vec![x], fresh(), fresh()));
                    objects.push(ColorObject::F(x, fresh(), fresh()));
                }
                Contraction::Chain => {
                    objects.push(ColorObject::t(vec![fresh()], fresh(), x));
                    objects.push(ColorObject::t(vec![fresh()], x, fresh()));
                }
            }
        }
        ColorString::from_objects(objects)
    })
}
