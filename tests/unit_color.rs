//! Unit tests for the color algebra and the color matrix

mod generators;

use feyncore::color::{simplify, simplify_factor, to_canonical_basis, ColorBasis, ColorObject, ColorString, ColorValue};
use feyncore::helas::diagram_color_strings;
use feyncore::parser::parse_color_string;
use feyncore::{Process, Session};
use generators::sm;
use num_rational::Rational64;

fn value(re: i64, denom: i64) -> ColorValue {
    ColorValue::real(Rational64::new(re, denom))
}

#[test]
fn test_fierz_identity() {
    // T(a,i,j) T(a,k,l) = 1/2 (δ(i,l) δ(k,j) - 1/Nc δ(i,j) δ(k,l))
    let lhs = parse_color_string("T(-1,1,2)*T(-1,3,4)").unwrap();
    let expected = vec![
        parse_color_string("1/2*Identity(1,4)*Identity(3,2)").unwrap(),
        parse_color_string("-1/2*Nc(-1)*Identity(1,2)*Identity(3,4)").unwrap(),
    ];
    assert_eq!(simplify(&lhs).unwrap(), simplify_factor(&expected).unwrap());
}

#[test]
fn test_quark_color_sum() {
    // δ(i,i) = Nc
    let cs = ColorString::from_objects(vec![ColorObject::Kronecker(-1, -1)]);
    let out = simplify(&cs).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].coefficient().evaluate(3), value(3, 1));
}

#[test]
fn test_structure_constant_rewritten_as_traces() {
    // f(a,b,c) T(c,i,j) = -I (T(a,b,i,j) - T(b,a,i,j))
    let cs = parse_color_string("f(1,2,-1)*T(-1,3,4)").unwrap();
    let out = simplify(&cs).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|t| t.imaginary));
    let chains: Vec<_> = out.iter().map(|t| t.objects.clone()).collect();
    assert!(chains.contains(&vec![ColorObject::t(vec![1, 2], 3, 4)]));
    assert!(chains.contains(&vec![ColorObject::t(vec![2, 1], 3, 4)]));
    let sum: Rational64 = out.iter().map(|t| t.coeff).sum();
    assert_eq!(sum, Rational64::from_integer(0));
}

#[test]
fn test_simplify_is_idempotent_on_fixed_strings() {
    for text in [
        "T(-1,1,2)*T(-1,3,4)",
        "f(1,2,-1)*f(-1,3,4)",
        "Tr(1,2,3)",
        "d(1,2,-1)*T(-1,3,4)",
    ] {
        let once = simplify(&parse_color_string(text).unwrap()).unwrap();
        let twice = simplify_factor(&once).unwrap();
        assert_eq!(once, twice, "{}", text);
    }
}

#[test]
fn test_basis_projection() {
    let mut basis = ColorBasis::new();
    basis.insert(vec![ColorObject::t(vec![1, 2], 3, 4)]);
    basis.insert(vec![ColorObject::t(vec![2, 1], 3, 4)]);
    let cs = parse_color_string("T(1,3,-1)*T(2,-1,4)").unwrap();
    let dense = to_canonical_basis(&cs, &basis, 3).unwrap();
    assert_eq!(dense, vec![value(1, 1), ColorValue::default()]);
}

// ============================================================================
// Color matrices of assembled amplitudes
// ============================================================================

#[test]
fn test_top_pair_color_matrix() {
    let s = Session::new(sm());
    let p = Process::new(s.model(), &[21, 21], &[6, -6]).unwrap();
    let amp = s.generate_amplitude(&p).unwrap();
    assert_eq!(amp.color_basis.len(), 2);
    let m = amp.color_matrix(3).unwrap();
    assert_eq!(m[0][0], value(16, 3));
    assert_eq!(m[1][1], value(16, 3));
    assert_eq!(m[0][1], value(-2, 3));
    assert_eq!(m[1][0], value(-2, 3));
}

#[test]
fn test_quark_pair_singlet_matrix() {
    let s = Session::new(sm());
    let p = Process::new(s.model(), &[-11, 11], &[2, -2]).unwrap();
    let amp = s.generate_amplitude(&p).unwrap();
    assert_eq!(amp.color_basis.len(), 1);
    assert_eq!(amp.color_matrix(3).unwrap(), vec![vec![value(3, 1)]]);
}

#[test]
fn test_diagram_color_strings_balance() {
    let model = sm();
    let s = Session::new(model.clone());
    let p = Process::new(&model, &[21, 21], &[21, 21]).unwrap();
    for d in s.generate_diagrams(&p).unwrap() {
        for (_, cs) in diagram_color_strings(&model, &d).unwrap() {
            for (index, count) in cs.index_counts() {
                if index < 0 {
                    assert_eq!(count, 2, "{}", cs);
                } else {
                    assert_eq!(count, 1, "{}", cs);
                }
            }
        }
    }
}

#[test]
fn test_model_deltas_are_fundamental() {
    let model = sm();
    // Kronecker deltas only ever join fundamental indices
    for inter in model.interactions().iter() {
        for cs in &inter.color {
            for obj in &cs.objects {
                if let ColorObject::Kronecker(a, _) = obj {
                    let pdg = inter.particles[(*a - 1) as usize];
                    assert_ne!(model.color_of(pdg), 8);
                }
            }
        }
    }
}
