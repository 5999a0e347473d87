//! Relative fermion signs
//!
//! Fermion lines are followed through the vertices (fermion slots of an
//! interaction pair up in slot order). Every open line yields a pair of
//! external legs, written (particle end, antiparticle end); the pairs are
//! sorted by their first entry and the sign is the parity of the
//! permutation that sorts the flattened list. A closed fermion loop adds a
//! factor -1.

use std::collections::HashMap;

use crate::diagram::Diagram;
use crate::error::{CoreError, CoreResult};
use crate::id::{LegNumber, LegSet};
use crate::model::Model;

/// Parity of the permutation that sorts `seq` (+1 or -1)
pub fn permutation_sign(seq: &[LegNumber]) -> i32 {
    let mut inversions = 0usize;
    for i in 0..seq.len() {
        for j in i + 1..seq.len() {
            if seq[i] > seq[j] {
                inversions += 1;
            }
        }
    }
    if inversions % 2 == 0 {
        1
    } else {
        -1
    }
}

/// Legs joined by a fermion line inside each vertex
fn vertex_pairs(model: &Model, diagram: &Diagram) -> CoreResult<HashMap<(usize, LegSet), LegSet>> {
    let n = diagram.vertices.len();
    let mut pairs = HashMap::new();
    for (i, v) in diagram.vertices.iter().enumerate() {
        let inter = model.interaction(v.interaction).ok_or_else(|| {
            CoreError::amplitude(format!("unknown interaction {}", v.interaction), vec![])
        })?;
        let slots = v.match_slots(model, inter, i + 1 == n)?;
        let fermions: Vec<LegSet> = slots
            .iter()
            .filter(|&&leg| model.is_fermion(v.legs[leg].id))
            .map(|&leg| v.legs[leg].legset)
            .collect();
        if fermions.len() % 2 != 0 {
            return Err(CoreError::amplitude(
                format!("odd number of fermions at interaction {}", inter.id),
                vec![],
            ));
        }
        for pair in fermions.chunks(2) {
            pairs.insert((i, pair[0]), pair[1]);
            pairs.insert((i, pair[1]), pair[0]);
        }
    }
    Ok(pairs)
}

/// External leg pairs joined by open fermion lines, as (first, second)
pub fn fermion_lines(model: &Model, diagram: &Diagram) -> CoreResult<Vec<(LegNumber, LegNumber)>> {
    let pairs = vertex_pairs(model, diagram)?;
    // Vertices each leg touches
    let mut touching: HashMap<LegSet, Vec<usize>> = HashMap::new();
    for &(v, leg) in pairs.keys() {
        touching.entry(leg).or_default().push(v);
    }
    let cut = diagram
        .loop_info
        .as_ref()
        .map(|l| LegSet::single(l.cut_legs.0) | LegSet::single(l.cut_legs.1))
        .unwrap_or_default();

    let mut externals: Vec<(LegSet, i32)> = diagram
        .external_legs()
        .into_iter()
        .filter(|l| model.is_fermion(l.id) && l.legset.is_disjoint(cut))
        .map(|l| (l.legset, l.id))
        .collect();
    externals.sort_by_key(|(s, _)| *s);
    let id_of: HashMap<LegSet, i32> = externals.iter().copied().collect();

    let mut done: Vec<LegSet> = Vec::new();
    let mut lines = Vec::new();
    for &(start, _) in &externals {
        if done.contains(&start) {
            continue;
        }
        let mut current = start;
        let mut vertex = touching
            .get(&start)
            .and_then(|v| v.first().copied())
            .ok_or_else(|| CoreError::amplitude(format!("fermion leg {} is unattached", start), vec![]))?;
        let end = loop {
            let next = *pairs.get(&(vertex, current)).ok_or_else(|| {
                CoreError::amplitude(format!("broken fermion line at {}", current), vec![])
            })?;
            if next.len() == 1 {
                break next;
            }
            let others = touching.get(&next).map(|v| v.as_slice()).unwrap_or(&[]);
            vertex = *others.iter().find(|&&w| w != vertex).ok_or_else(|| {
                CoreError::amplitude(format!("dangling propagator {}", next), vec![])
            })?;
            current = next;
        };
        if !cut.is_disjoint(end) {
            return Err(CoreError::amplitude(
                "open fermion line ends on the loop cut",
                vec![format!("from {}", start)],
            ));
        }
        done.push(start);
        done.push(end);
        let a = start.min_leg().unwrap_or(0);
        let b = end.min_leg().unwrap_or(0);
        let (ia, ib) = (id_of[&start], id_of.get(&end).copied().unwrap_or(0));
        let a_majorana = model.particle(ia).is_some_and(|p| p.self_antiparticle);
        let b_majorana = model.particle(ib).is_some_and(|p| p.self_antiparticle);
        let pair = match (a_majorana, b_majorana) {
            (true, true) => (a.min(b), a.max(b)),
            (false, _) if ia > 0 => (a, b),
            (false, _) => (b, a),
            (true, false) if ib > 0 => (b, a),
            (true, false) => (a, b),
        };
        lines.push(pair);
    }
    lines.sort_by_key(|p| p.0);
    Ok(lines)
}

/// Relative sign of a diagram: line parity times -1 per closed fermion loop
pub fn fermion_factor(model: &Model, diagram: &Diagram) -> CoreResult<i32> {
    let lines = fermion_lines(model, diagram)?;
    let flat: Vec<LegNumber> = lines.iter().flat_map(|(a, b)| [*a, *b]).collect();
    let mut sign = permutation_sign(&flat);
    if diagram.loop_info.as_ref().is_some_and(|l| l.fermion_loop) {
        sign = -sign;
    }
    Ok(sign)
}
