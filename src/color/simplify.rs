//! Color-algebra rewrite engine
//!
//! [`simplify`] repeatedly applies the first rewrite rule that fires until no
//! rule applies, then brings each surviving term to canonical form and merges
//! like terms. Every rule removes at least one contracted index or one
//! composite tensor, so rewriting terminates.
//!
//! # Rule order
//!
//! Single-tensor rules are tried first, tensor by tensor, then Kronecker
//! substitution, then two-tensor rules over pairs in order:
//!
//! 1. `T(i,j) = δ(i,j)`, `δ(i,i) = Nc`, `T(A,i,i) = Tr(A)`
//! 2. `T(A,x,B,x,C,i,j) = ½ Tr(B) T(A,C,i,j) − ½Nc⁻¹ T(A,B,C,i,j)`
//! 3. `Tr() = Nc`, `Tr(a) = 0`, self-contractions inside a trace
//! 4. `f(a,b,c) = −2i (Tr(a,b,c) − Tr(c,b,a))`, `d(a,b,c) = 2 (Tr(a,b,c) + Tr(c,b,a))`
//! 5. sextet generators through `K6 T K6Bar`, epsilons with repeated indices vanish
//! 6. Kronecker substitution of internal indices
//! 7. generator chains, Fierz identities for `T·T`, `Tr·T`, `Tr·Tr`,
//!    `ε·ε̄` expansion and the `K6·K6Bar` contraction
//!
//! `Nc` is kept as a symbolic power until a value is substituted.

use std::collections::VecDeque;

use indexmap::IndexMap;
use num_rational::Rational64;
use num_traits::Zero;
use tracing::debug;

use super::object::ColorObject;
use super::string::{ColorCoefficient, ColorFactor, ColorString};
use crate::error::{CoreError, CoreResult};

/// Upper bound on rule applications for a single input string
pub const MAX_REWRITES: usize = 500_000;

fn half() -> ColorCoefficient {
    ColorCoefficient {
        coeff: Rational64::new(1, 2),
        imaginary: false,
        nc_power: 0,
    }
}

fn minus_half_over_nc() -> ColorCoefficient {
    ColorCoefficient {
        coeff: Rational64::new(-1, 2),
        imaginary: false,
        nc_power: -1,
    }
}

fn nc() -> ColorCoefficient {
    ColorCoefficient {
        coeff: Rational64::from_integer(1),
        imaginary: false,
        nc_power: 1,
    }
}

fn real(n: i64) -> ColorCoefficient {
    ColorCoefficient {
        coeff: Rational64::from_integer(n),
        imaginary: false,
        nc_power: 0,
    }
}

fn imag(n: i64) -> ColorCoefficient {
    ColorCoefficient {
        coeff: Rational64::from_integer(n),
        imaginary: true,
        nc_power: 0,
    }
}

fn cat(parts: &[&[i32]]) -> Vec<i32> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

/// Build a term from `base` by dropping the tensors at `remove`, inserting
/// `insert` at the position of the first removed tensor and scaling by `coeff`
fn replace(
    base: &ColorString,
    remove: &[usize],
    insert: Vec<ColorObject>,
    coeff: ColorCoefficient,
) -> ColorString {
    let at = remove.iter().copied().min().unwrap_or(base.objects.len());
    let mut objects = Vec::with_capacity(base.objects.len() + insert.len());
    let mut pending = Some(insert);
    for (pos, obj) in base.objects.iter().enumerate() {
        if pos == at {
            if let Some(new) = pending.take() {
                objects.extend(new);
            }
        }
        if !remove.contains(&pos) {
            objects.push(obj.clone());
        }
    }
    if let Some(new) = pending {
        objects.extend(new);
    }
    ColorString {
        objects,
        ..base.clone()
    }
    .with_coefficient(&coeff)
}

/// Position pair of the first index occurring twice in `seq`
fn repeated_pair(seq: &[i32]) -> Option<(usize, usize)> {
    for p in 0..seq.len() {
        for q in (p + 1)..seq.len() {
            if seq[p] == seq[q] {
                return Some((p, q));
            }
        }
    }
    None
}

// ============================================================================
// SINGLE-TENSOR RULES
// ============================================================================

fn rewrite_single(cs: &ColorString, pos: usize) -> Option<ColorFactor> {
    let obj = &cs.objects[pos];
    match obj {
        ColorObject::T { adjoint, i, j } if adjoint.is_empty() => {
            if i == j {
                Some(vec![replace(cs, &[pos], vec![], nc())])
            } else {
                Some(vec![replace(
                    cs,
                    &[pos],
                    vec![ColorObject::Kronecker(*i, *j)],
                    ColorCoefficient::one(),
                )])
            }
        }
        ColorObject::T { adjoint, i, j } if i == j => Some(vec![replace(
            cs,
            &[pos],
            vec![ColorObject::Tr(adjoint.clone())],
            ColorCoefficient::one(),
        )]),
        ColorObject::T { adjoint, i, j } => {
            let (p, q) = repeated_pair(adjoint)?;
            let (a, b, c) = (&adjoint[..p], &adjoint[p + 1..q], &adjoint[q + 1..]);
            Some(vec![
                replace(
                    cs,
                    &[pos],
                    vec![
                        ColorObject::t(cat(&[a, c]), *i, *j),
                        ColorObject::Tr(b.to_vec()),
                    ],
                    half(),
                ),
                replace(
                    cs,
                    &[pos],
                    vec![ColorObject::t(cat(&[a, b, c]), *i, *j)],
                    minus_half_over_nc(),
                ),
            ])
        }
        ColorObject::Tr(adjoint) if adjoint.is_empty() => {
            Some(vec![replace(cs, &[pos], vec![], nc())])
        }
        ColorObject::Tr(adjoint) if adjoint.len() == 1 => Some(vec![]),
        ColorObject::Tr(adjoint) => {
            let (p, q) = repeated_pair(adjoint)?;
            let (a, b, c) = (&adjoint[..p], &adjoint[p + 1..q], &adjoint[q + 1..]);
            Some(vec![
                replace(
                    cs,
                    &[pos],
                    vec![ColorObject::Tr(b.to_vec()), ColorObject::Tr(cat(&[c, a]))],
                    half(),
                ),
                replace(
                    cs,
                    &[pos],
                    vec![ColorObject::Tr(cat(&[b, c, a]))],
                    minus_half_over_nc(),
                ),
            ])
        }
        ColorObject::Kronecker(i, j) if i == j => Some(vec![replace(cs, &[pos], vec![], nc())]),
        ColorObject::F(a, b, c) => Some(vec![
            replace(cs, &[pos], vec![ColorObject::Tr(vec![*a, *b, *c])], imag(-2)),
            replace(cs, &[pos], vec![ColorObject::Tr(vec![*c, *b, *a])], imag(2)),
        ]),
        ColorObject::D(a, b, c) => Some(vec![
            replace(cs, &[pos], vec![ColorObject::Tr(vec![*a, *b, *c])], real(2)),
            replace(cs, &[pos], vec![ColorObject::Tr(vec![*c, *b, *a])], real(2)),
        ]),
        ColorObject::Epsilon(a, b, c) | ColorObject::EpsilonBar(a, b, c)
            if a == b || b == c || a == c =>
        {
            Some(vec![])
        }
        ColorObject::T6 { a, m, n } => {
            let x = cs.fresh_index();
            let (y, z) = (x - 1, x - 2);
            Some(vec![replace(
                cs,
                &[pos],
                vec![
                    ColorObject::K6 { m: *m, i: x, j: y },
                    ColorObject::t(vec![*a], y, z),
                    ColorObject::K6Bar { m: *n, i: z, j: x },
                ],
                real(2),
            )])
        }
        _ => None,
    }
}

/// Replace `δ(x, y)` with an internal `x` (or `y`) by renaming that index elsewhere
fn substitute_kronecker(cs: &ColorString, pos: usize) -> Option<ColorFactor> {
    let ColorObject::Kronecker(i, j) = cs.objects[pos] else {
        return None;
    };
    let (from, to) = if i < 0 {
        (i, j)
    } else if j < 0 {
        (j, i)
    } else {
        return None;
    };
    let rest = replace(cs, &[pos], vec![], ColorCoefficient::one());
    Some(vec![rest.map_indices(|k| if k == from { to } else { k })])
}

// ============================================================================
// TWO-TENSOR RULES
// ============================================================================

fn rewrite_pair(cs: &ColorString, p: usize, q: usize) -> Option<ColorFactor> {
    let (op, oq) = (&cs.objects[p], &cs.objects[q]);
    match (op, oq) {
        (
            ColorObject::T {
                adjoint: a1,
                i: i1,
                j: j1,
            },
            ColorObject::T {
                adjoint: a2,
                i: i2,
                j: j2,
            },
        ) => {
            // Chain through a shared fundamental index
            if *j1 < 0 && j1 == i2 {
                return Some(vec![replace(
                    cs,
                    &[p, q],
                    vec![ColorObject::t(cat(&[a1, a2]), *i1, *j2)],
                    ColorCoefficient::one(),
                )]);
            }
            if *j2 < 0 && j2 == i1 {
                return Some(vec![replace(
                    cs,
                    &[p, q],
                    vec![ColorObject::t(cat(&[a2, a1]), *i2, *j1)],
                    ColorCoefficient::one(),
                )]);
            }
            // Fierz on a shared adjoint index
            let (x1, x2) = shared_adjoint(a1, a2)?;
            let (a, b) = (&a1[..x1], &a1[x1 + 1..]);
            let (c, d) = (&a2[..x2], &a2[x2 + 1..]);
            Some(vec![
                replace(
                    cs,
                    &[p, q],
                    vec![
                        ColorObject::t(cat(&[a, d]), *i1, *j2),
                        ColorObject::t(cat(&[c, b]), *i2, *j1),
                    ],
                    half(),
                ),
                replace(
                    cs,
                    &[p, q],
                    vec![
                        ColorObject::t(cat(&[a, b]), *i1, *j1),
                        ColorObject::t(cat(&[c, d]), *i2, *j2),
                    ],
                    minus_half_over_nc(),
                ),
            ])
        }
        (ColorObject::Tr(tr), ColorObject::T { adjoint, i, j })
        | (ColorObject::T { adjoint, i, j }, ColorObject::Tr(tr)) => {
            let (xt, xg) = shared_adjoint(tr, adjoint)?;
            let (a, b) = (&tr[..xt], &tr[xt + 1..]);
            let (c, d) = (&adjoint[..xg], &adjoint[xg + 1..]);
            Some(vec![
                replace(
                    cs,
                    &[p, q],
                    vec![ColorObject::t(cat(&[c, b, a, d]), *i, *j)],
                    half(),
                ),
                replace(
                    cs,
                    &[p, q],
                    vec![
                        ColorObject::Tr(cat(&[b, a])),
                        ColorObject::t(cat(&[c, d]), *i, *j),
                    ],
                    minus_half_over_nc(),
                ),
            ])
        }
        (ColorObject::Tr(t1), ColorObject::Tr(t2)) => {
            let (x1, x2) = shared_adjoint(t1, t2)?;
            let (a, b) = (&t1[..x1], &t1[x1 + 1..]);
            let (c, d) = (&t2[..x2], &t2[x2 + 1..]);
            Some(vec![
                replace(cs, &[p, q], vec![ColorObject::Tr(cat(&[b, a, d, c]))], half()),
                replace(
                    cs,
                    &[p, q],
                    vec![ColorObject::Tr(cat(&[b, a])), ColorObject::Tr(cat(&[d, c]))],
                    minus_half_over_nc(),
                ),
            ])
        }
        (ColorObject::Epsilon(a, b, c), ColorObject::EpsilonBar(d, e, f))
        | (ColorObject::EpsilonBar(d, e, f), ColorObject::Epsilon(a, b, c)) => {
            let lower = [*a, *b, *c];
            let upper = [*d, *e, *f];
            if !lower.iter().any(|x| *x < 0 && upper.contains(x)) {
                return None;
            }
            const PERMS: [([usize; 3], i64); 6] = [
                ([0, 1, 2], 1),
                ([1, 2, 0], 1),
                ([2, 0, 1], 1),
                ([0, 2, 1], -1),
                ([2, 1, 0], -1),
                ([1, 0, 2], -1),
            ];
            Some(
                PERMS
                    .iter()
                    .map(|(perm, sign)| {
                        let deltas = (0..3)
                            .map(|k| ColorObject::Kronecker(lower[k], upper[perm[k]]))
                            .collect();
                        replace(cs, &[p, q], deltas, real(*sign))
                    })
                    .collect(),
            )
        }
        (ColorObject::K6 { m: m1, i, j }, ColorObject::K6Bar { m: m2, i: k, j: l })
        | (ColorObject::K6Bar { m: m2, i: k, j: l }, ColorObject::K6 { m: m1, i, j })
            if *m1 < 0 && m1 == m2 =>
        {
            Some(vec![
                replace(
                    cs,
                    &[p, q],
                    vec![ColorObject::Kronecker(*l, *i), ColorObject::Kronecker(*k, *j)],
                    half(),
                ),
                replace(
                    cs,
                    &[p, q],
                    vec![ColorObject::Kronecker(*k, *i), ColorObject::Kronecker(*l, *j)],
                    half(),
                ),
            ])
        }
        _ => None,
    }
}

/// Positions of the first internal index shared by two adjoint lists
fn shared_adjoint(a: &[i32], b: &[i32]) -> Option<(usize, usize)> {
    a.iter().enumerate().find_map(|(pa, x)| {
        if *x >= 0 {
            return None;
        }
        b.iter().position(|y| y == x).map(|pb| (pa, pb))
    })
}

/// Apply the highest-priority rule that fires, or `None` when `cs` is irreducible
pub fn simplify_step(cs: &ColorString) -> Option<ColorFactor> {
    for pos in 0..cs.objects.len() {
        if let Some(out) = rewrite_single(cs, pos) {
            return Some(out);
        }
    }
    for pos in 0..cs.objects.len() {
        if let Some(out) = substitute_kronecker(cs, pos) {
            return Some(out);
        }
    }
    for p in 0..cs.objects.len() {
        for q in (p + 1)..cs.objects.len() {
            if let Some(out) = rewrite_pair(cs, p, q) {
                return Some(out);
            }
        }
    }
    None
}

// ============================================================================
// CANONICAL FORM
// ============================================================================

/// Sort key that ignores the names of internal indices
fn masked_key(obj: &ColorObject) -> (&'static str, Vec<(bool, i32)>) {
    let idx = obj
        .indices()
        .into_iter()
        .map(|i| if i > 0 { (false, i) } else { (true, 0) })
        .collect();
    (obj.name(), idx)
}

fn rotate_trace(adjoint: &[i32]) -> Vec<i32> {
    let n = adjoint.len();
    (0..n)
        .map(|s| {
            let mut rot = adjoint[s..].to_vec();
            rot.extend_from_slice(&adjoint[..s]);
            rot
        })
        .min_by(|x, y| {
            let kx: Vec<(bool, i32)> = x.iter().map(|i| (*i < 0, if *i > 0 { *i } else { 0 })).collect();
            let ky: Vec<(bool, i32)> = y.iter().map(|i| (*i < 0, if *i > 0 { *i } else { 0 })).collect();
            kx.cmp(&ky).then_with(|| y.cmp(x))
        })
        .unwrap_or_default()
}

/// Sort three indices, returning the permutation sign
fn sort3(mut v: [i32; 3]) -> ([i32; 3], i64) {
    let mut sign = 1;
    for a in 0..3 {
        for b in 0..(2 - a) {
            if v[b] > v[b + 1] {
                v.swap(b, b + 1);
                sign = -sign;
            }
        }
    }
    (v, sign)
}

fn normalize_object(obj: &ColorObject) -> (ColorObject, i64) {
    match obj {
        ColorObject::Tr(adjoint) => (ColorObject::Tr(rotate_trace(adjoint)), 1),
        ColorObject::Epsilon(a, b, c) => {
            let ([x, y, z], s) = sort3([*a, *b, *c]);
            (ColorObject::Epsilon(x, y, z), s)
        }
        ColorObject::EpsilonBar(a, b, c) => {
            let ([x, y, z], s) = sort3([*a, *b, *c]);
            (ColorObject::EpsilonBar(x, y, z), s)
        }
        ColorObject::K6 { m, i, j } => (
            ColorObject::K6 {
                m: *m,
                i: (*i).min(*j),
                j: (*i).max(*j),
            },
            1,
        ),
        ColorObject::K6Bar { m, i, j } => (
            ColorObject::K6Bar {
                m: *m,
                i: (*i).min(*j),
                j: (*i).max(*j),
            },
            1,
        ),
        _ => (obj.clone(), 1),
    }
}

/// Canonical form of an irreducible string: tensors sorted, traces rotated,
/// epsilons ordered (with sign) and internal indices relabelled `-1, -2, ...`
/// by first appearance
pub fn normalize(cs: &ColorString) -> ColorString {
    let mut current = cs.clone();
    for _ in 0..16 {
        let mut sign = 1;
        let mut objects: Vec<ColorObject> = current
            .objects
            .iter()
            .map(|o| {
                let (n, s) = normalize_object(o);
                sign *= s;
                n
            })
            .collect();
        objects.sort_by(|x, y| masked_key(x).cmp(&masked_key(y)).then_with(|| y.cmp(x)));

        let mut relabel: Vec<(i32, i32)> = Vec::new();
        for idx in objects.iter().flat_map(|o| o.indices()) {
            if idx < 0 && !relabel.iter().any(|(from, _)| *from == idx) {
                let to = -(relabel.len() as i32) - 1;
                relabel.push((idx, to));
            }
        }
        let lookup = |i: i32| {
            relabel
                .iter()
                .find(|(from, _)| *from == i)
                .map(|(_, to)| *to)
                .unwrap_or(i)
        };
        let next = ColorString {
            coeff: current.coeff * Rational64::from_integer(sign),
            objects: objects.iter().map(|o| o.map_indices(lookup)).collect(),
            ..current.clone()
        };
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Sum terms with identical tensor structure and drop zeros
pub fn merge_terms(terms: impl IntoIterator<Item = ColorString>) -> ColorFactor {
    let mut merged: IndexMap<(Vec<ColorObject>, bool, i32), Rational64> = IndexMap::new();
    for t in terms {
        *merged
            .entry((t.objects, t.imaginary, t.nc_power))
            .or_insert_with(Rational64::zero) += t.coeff;
    }
    let mut out: ColorFactor = merged
        .into_iter()
        .filter(|(_, c)| !c.is_zero())
        .map(|((objects, imaginary, nc_power), coeff)| ColorString {
            coeff,
            imaginary,
            nc_power,
            objects,
        })
        .collect();
    out.sort_by(|x, y| {
        (&x.objects, x.nc_power, x.imaginary).cmp(&(&y.objects, y.nc_power, y.imaginary))
    });
    out
}

/// Reduce a color string to its canonical sum of irreducible terms
pub fn simplify(cs: &ColorString) -> CoreResult<ColorFactor> {
    cs.validate()?;
    let mut queue: VecDeque<ColorString> = VecDeque::from([cs.clone()]);
    let mut done = Vec::new();
    let mut steps = 0usize;

    while let Some(term) = queue.pop_front() {
        if term.is_zero() {
            continue;
        }
        match simplify_step(&term) {
            Some(next) => {
                steps += 1;
                if steps > MAX_REWRITES {
                    return Err(CoreError::ColorSyntax(format!(
                        "rewriting of {} exceeded {} steps",
                        cs, MAX_REWRITES
                    )));
                }
                queue.extend(next);
            }
            None => done.push(normalize(&term)),
        }
    }

    let result = merge_terms(done);
    debug!(input = %cs, steps, terms = result.len(), "color string simplified");
    Ok(result)
}

/// Simplify every term of a sum and merge the results
pub fn simplify_factor(factor: &[ColorString]) -> CoreResult<ColorFactor> {
    let mut all = Vec::new();
    for term in factor {
        all.extend(simplify(term)?);
    }
    Ok(merge_terms(all))
}
