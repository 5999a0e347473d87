//! Production amplitudes with decays spliced in
//!
//! Decaying a final leg X of a production diagram with a 1 → k decay
//! diagram turns X into an on-shell propagator: the decay's root vertex
//! loses its initial leg and produces X instead, and X's momentum set
//! becomes the set of the decay products. Legs are renumbered so that the
//! final state reads (production finals without X) ++ (decay finals in
//! decay order). The composed diagrams are assembled again, so color
//! strings are rebuilt over the combined diagram with X's color index
//! shared between production and decay.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info_span};

use crate::diagram::{Diagram, Leg, LegState, Vertex};
use crate::error::{CoreError, CoreResult};
use crate::generate::generate_diagrams;
use crate::generate::partition::cartesian_product;
use crate::helas::Amplitude;
use crate::id::{LegNumber, LegSet};
use crate::model::Model;
use crate::pretty::process_string;
use crate::process::Process;
use crate::session::{CancelToken, SessionConfig};

/// New numbering of a production diagram's legs and of each decay's finals
struct Renumbering {
    /// Production leg → new number, `None` for decayed legs
    production: HashMap<LegNumber, Option<LegNumber>>,
    /// Production leg that decays → new numbers of its decay products
    decayed: HashMap<LegNumber, LegSet>,
    /// Per decay (in splice order): decay leg → new number
    decays: Vec<HashMap<LegNumber, LegNumber>>,
}

impl Renumbering {
    fn new(n_production: LegNumber, splices: &[(LegNumber, usize)]) -> Self {
        let mut production = HashMap::new();
        let mut next = 0;
        for number in 1..=n_production {
            if splices.iter().any(|(leg, _)| *leg == number) {
                production.insert(number, None);
            } else {
                next += 1;
                production.insert(number, Some(next));
            }
        }
        let mut decayed = HashMap::new();
        let mut decays = Vec::new();
        for &(leg, n_final) in splices {
            let mut map = HashMap::new();
            let mut set = LegSet::EMPTY;
            for j in 2..=(n_final as LegNumber + 1) {
                next += 1;
                map.insert(j, next);
                set.insert(next);
            }
            decayed.insert(leg, set);
            decays.push(map);
        }
        Renumbering {
            production,
            decayed,
            decays,
        }
    }

    fn production_set(&self, legset: LegSet) -> LegSet {
        legset.iter().fold(LegSet::EMPTY, |acc, n| {
            match (self.production.get(&n), self.decayed.get(&n)) {
                (Some(Some(m)), _) => acc | LegSet::single(*m),
                (_, Some(set)) => acc | *set,
                _ => acc,
            }
        })
    }

    fn decay_set(&self, decay: usize, legset: LegSet) -> LegSet {
        legset.remap(|n| self.decays[decay].get(&n).copied())
    }
}

fn relabel(leg: &Leg, legset: LegSet) -> Leg {
    Leg {
        id: leg.id,
        number: legset.min_leg().unwrap_or(0),
        state: leg.state,
        onshell: leg.onshell,
        legset,
    }
}

/// Splice decay diagrams into one production diagram
///
/// `splices` pairs production final legs with decay diagrams; each decay's
/// leg 1 must be the conjugate of the decayed leg.
fn compose_diagram(
    model: &Model,
    production: &Diagram,
    n_production: LegNumber,
    splices: &[(LegNumber, &Diagram)],
) -> CoreResult<Diagram> {
    if production.is_loop() || splices.iter().any(|(_, d)| d.is_loop()) {
        return Err(CoreError::IncompatibleDecay(
            "decays of loop diagrams are not supported".into(),
        ));
    }
    let shape: Vec<(LegNumber, usize)> = splices
        .iter()
        .map(|(leg, d)| (*leg, d.external_legs().len().saturating_sub(1)))
        .collect();
    let renumber = Renumbering::new(n_production, &shape);
    let mut vertices = Vec::new();
    let mut orders: BTreeMap<String, u32> = production.orders.clone();
    let mut symmetry = production.symmetry_factor;

    for (k, (leg, decay)) in splices.iter().enumerate() {
        let x = production
            .external_legs()
            .into_iter()
            .find(|l| l.number == *leg)
            .map(|l| l.id)
            .ok_or_else(|| CoreError::IncompatibleDecay(format!("no final leg {}", leg)))?;
        let n = decay.vertices.len();
        for (i, v) in decay.vertices.iter().enumerate() {
            let mut legs = Vec::with_capacity(v.legs.len());
            for l in &v.legs {
                if i + 1 == n && l.number == 1 && l.is_external() {
                    if model.anti(l.id) != x {
                        return Err(CoreError::IncompatibleDecay(format!(
                            "{} cannot decay as {}",
                            model.name_of(x),
                            model.name_of(model.anti(l.id))
                        )));
                    }
                    continue;
                }
                let set = renumber.decay_set(k, l.legset);
                let mut new = relabel(l, set);
                if l.is_external() {
                    new.state = LegState::Final;
                }
                legs.push(new);
            }
            if i + 1 == n {
                let set = renumber.decayed[leg];
                let mut out = Leg::internal(x, set);
                out.onshell = Some(true);
                legs.push(out);
            }
            vertices.push(Vertex {
                interaction: v.interaction,
                legs,
            });
        }
        for (key, value) in &decay.orders {
            *orders.entry(key.clone()).or_insert(0) += value;
        }
        symmetry *= decay.symmetry_factor;
    }

    for v in &production.vertices {
        let legs = v
            .legs
            .iter()
            .map(|l| {
                let set = renumber.production_set(l.legset);
                let mut new = relabel(l, set);
                if renumber.decayed.contains_key(&l.number) && l.is_external() {
                    new.state = LegState::Internal;
                    new.onshell = Some(true);
                }
                new
            })
            .collect();
        vertices.push(Vertex {
            interaction: v.interaction,
            legs,
        });
    }

    let mut diagram = Diagram::new(vertices, orders);
    diagram.symmetry_factor = symmetry;
    diagram.check(model)?;
    Ok(diagram)
}

/// The decay matching each production final leg
///
/// A leg takes the first unused chain of its particle; once every such chain
/// is used, later identical legs reuse the last one.
fn assign_decays(
    production: &Process,
    decays: &[Amplitude],
    model: &Model,
) -> CoreResult<Vec<(LegNumber, usize)>> {
    let mut assigned = Vec::new();
    let mut used = vec![false; decays.len()];
    for leg in production.legs.iter().filter(|l| !l.is_initial()) {
        let matching: Vec<usize> = decays
            .iter()
            .enumerate()
            .filter(|(_, d)| d.process.initial_ids(model).first() == Some(&leg.id))
            .map(|(k, _)| k)
            .collect();
        let choice = matching
            .iter()
            .copied()
            .find(|&k| !used[k])
            .or_else(|| matching.last().copied());
        if let Some(k) = choice {
            assigned.push((leg.number, k));
            used[k] = true;
        }
    }
    if let Some(k) = used.iter().position(|u| !u) {
        return Err(CoreError::IncompatibleDecay(format!(
            "no final-state {} to decay",
            decays[k]
                .process
                .initial_ids(model)
                .first()
                .map(|&p| model.name_of(p))
                .unwrap_or_default()
        )));
    }
    Ok(assigned)
}

/// Compose a production amplitude with decay amplitudes
///
/// Every final leg of the production whose particle matches the initial
/// particle of a decay is decayed by it. Each decay amplitude must already
/// contain its own nested decays.
pub fn compose(model: &Model, production: &Amplitude, decays: &[Amplitude]) -> CoreResult<Amplitude> {
    for d in decays {
        if !d.process.is_decay() {
            return Err(CoreError::IncompatibleDecay(format!(
                "{} is not a decay",
                process_string(model, &d.process)
            )));
        }
    }
    let assigned = assign_decays(&production.process, decays, model)?;
    let n_production = production.process.legs.len() as LegNumber;

    // Composed process legs
    let mut initial = Vec::new();
    let mut finals = Vec::new();
    for leg in production.process.legs.iter() {
        if assigned.iter().any(|(n, _)| *n == leg.number) {
            continue;
        }
        if leg.is_initial() {
            initial.push(model.anti(leg.id));
        } else {
            finals.push(leg.id);
        }
    }
    for &(_, k) in &assigned {
        finals.extend(decays[k].process.final_ids());
    }
    let mut process = Process::new(model, &initial, &finals)?;
    process.orders = production.process.orders.clone();
    process.forbidden_particles = production.process.forbidden_particles.clone();
    process.forbidden_s_channels = production.process.forbidden_s_channels.clone();
    process.forbidden_onshell_s_channels = production.process.forbidden_onshell_s_channels.clone();
    process.required_s_channels = production.process.required_s_channels.clone();
    process.ignore_empty = production.process.ignore_empty;

    let choices: Vec<Vec<&Diagram>> = assigned
        .iter()
        .map(|&(_, k)| decays[k].diagrams.iter().collect())
        .collect();
    let mut diagrams = Vec::new();
    for prod in &production.diagrams {
        for pick in cartesian_product(&choices) {
            let splices: Vec<(LegNumber, &Diagram)> = assigned
                .iter()
                .zip(pick)
                .map(|(&(leg, _), d)| (leg, d))
                .collect();
            diagrams.push(compose_diagram(model, prod, n_production, &splices)?);
        }
    }
    debug!(
        production = production.diagrams.len(),
        composed = diagrams.len(),
        "decays composed"
    );
    Amplitude::assemble(model, &process, diagrams)
}

/// Generate a process and its decay chains, recursively, and compose them
pub fn generate_with_decays(
    model: &Model,
    process: &Process,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Amplitude> {
    let span = info_span!("generate_with_decays", process = %process_string(model, process));
    let _guard = span.enter();

    let mut core = process.clone();
    core.decay_chains.clear();
    let diagrams = generate_diagrams(model, &core, config, cancel)?;
    let production = Amplitude::assemble(model, &core, diagrams)?;
    if process.decay_chains.is_empty() {
        return Ok(production);
    }
    let decays = process
        .decay_chains
        .iter()
        .map(|d| generate_with_decays(model, d, config, cancel))
        .collect::<CoreResult<Vec<_>>>()?;
    compose(model, &production, &decays)
}
