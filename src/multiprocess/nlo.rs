//! Real-emission companions of NLO processes
//!
//! A real-emission process adds one particle of the perturbed sector to the
//! final state of its born process, with one more power of every perturbed
//! coupling. Each pair of legs that can come from a single splitting is an
//! [`FksPair`]; replacing the pair by its mother gives the reduced born,
//! and the pair is kept only when that reduced process has diagrams.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::diagram::{Leg, LegState};
use crate::error::CoreResult;
use crate::generate::{generate_diagrams, generate_tree_diagrams};
use crate::helas::Amplitude;
use crate::id::{InteractionId, LegNumber, PdgCode};
use crate::model::Model;
use crate::process::{OrderConstraint, Process};
use crate::session::{CancelToken, SessionConfig};

/// Two legs of a real-emission process joined by one splitting
#[derive(Clone, Debug, PartialEq)]
pub struct FksPair {
    pub i: LegNumber,
    pub j: LegNumber,
    /// Code of the combined leg, in diagram convention
    pub mother: PdgCode,
    pub interaction: InteractionId,
    /// Leg `j` is a massless color octet, so the pair has a soft limit
    pub soft: bool,
    /// The process with legs `i` and `j` replaced by the mother
    pub reduced_born: Process,
}

/// A real-emission process with its born companion
#[derive(Clone, Debug)]
pub struct RealEmission {
    pub born: Process,
    pub amplitude: Amplitude,
    pub pairs: Vec<FksPair>,
}

/// Particles that may be emitted: those of the perturbing interactions
fn emittable(model: &Model, orders: &[String]) -> Vec<PdgCode> {
    let mut seen = HashSet::new();
    for inter in model.interactions().iter() {
        if inter.is_perturbating(orders) {
            seen.extend(inter.particles.iter().copied());
        }
    }
    let mut out: Vec<PdgCode> = model.all_pdgs().into_iter().filter(|p| seen.contains(p)).collect();
    out.sort_unstable();
    out
}

/// Largest order of every key among the born diagrams, or the process bounds
/// when no born diagram exists
fn born_orders(
    model: &Model,
    born: &Process,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<BTreeMap<String, u32>> {
    let diagrams = generate_tree_diagrams(model, born, config, cancel)?;
    let mut out = BTreeMap::new();
    for key in model.order_keys() {
        let value = if diagrams.is_empty() {
            born.orders.get(&key).and_then(|c| c.upper_bound()).unwrap_or(0)
        } else {
            diagrams.iter().map(|d| d.order(&key)).max().unwrap_or(0)
        };
        out.insert(key, value);
    }
    Ok(out)
}

/// Real-emission processes of `born`, one per distinct final multiset
pub fn real_emission_processes(
    model: &Model,
    born: &Process,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<Process>> {
    let Some(pert) = &born.perturbation else {
        return Ok(Vec::new());
    };
    let bounds = born_orders(model, born, config, cancel)?;
    let initial = born.initial_ids(model);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for p in emittable(model, &pert.orders) {
        let mut finals = born.final_ids();
        finals.push(p);
        let mut key = finals.clone();
        key.sort_unstable();
        if !seen.insert(key) {
            continue;
        }
        let mut real = Process::new(model, &initial, &finals)?;
        for (k, v) in &bounds {
            let extra = u32::from(pert.orders.contains(k));
            real.orders.insert(k.clone(), OrderConstraint::AtMost(v + extra));
        }
        real.forbidden_particles = born.forbidden_particles.clone();
        real.forbidden_s_channels = born.forbidden_s_channels.clone();
        real.forbidden_onshell_s_channels = born.forbidden_onshell_s_channels.clone();
        real.ignore_empty = true;
        out.push(real);
    }
    Ok(out)
}

/// Replace legs `i < j` by one leg of code `mother` (diagram convention)
/// numbered `i`
fn reduce(model: &Model, real: &Process, i: LegNumber, j: LegNumber, mother: PdgCode) -> CoreResult<Process> {
    let mut initial = Vec::new();
    let mut finals = Vec::new();
    for leg in real.legs.iter() {
        if leg.number == j {
            continue;
        }
        let id = if leg.number == i { mother } else { leg.id };
        if leg.is_initial() {
            initial.push(model.anti(id));
        } else {
            finals.push(id);
        }
    }
    let mut reduced = Process::new(model, &initial, &finals)?;
    reduced.orders = real.orders.clone();
    reduced.forbidden_particles = real.forbidden_particles.clone();
    reduced.ignore_empty = true;
    Ok(reduced)
}

fn is_soft(model: &Model, pdg: PdgCode) -> bool {
    model.color_of(pdg) == 8 && model.mass_value(pdg) == 0.0
}

/// Splitting pairs of a real-emission process
///
/// `j` is always a final leg; `i` is a final leg with a smaller number or
/// an initial leg. Initial-state splittings keep the mother on the initial
/// side.
pub fn fks_pairs(
    model: &Model,
    real: &Process,
    perturbed: &[String],
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<FksPair>> {
    let legs: Vec<&Leg> = real.legs.iter().collect();
    let mut pairs = Vec::new();
    for lj in legs.iter().filter(|l| l.state == LegState::Final) {
        for li in legs.iter().filter(|l| l.number < lj.number) {
            let mut ids = vec![li.id, lj.id];
            ids.sort_unstable();
            for &(mother, inter) in model.vertices_to1(&ids) {
                let perturbing = model
                    .interaction(inter)
                    .is_some_and(|x| x.is_perturbating(perturbed));
                if !perturbing {
                    continue;
                }
                cancel.check()?;
                let reduced = reduce(model, real, li.number, lj.number, mother)?;
                if reduced.validate(model).is_err() {
                    continue;
                }
                if generate_tree_diagrams(model, &reduced, config, cancel)?.is_empty() {
                    continue;
                }
                pairs.push(FksPair {
                    i: li.number,
                    j: lj.number,
                    mother,
                    interaction: inter,
                    soft: is_soft(model, lj.id),
                    reduced_born: reduced,
                });
            }
        }
    }
    Ok(pairs)
}

/// Real emissions of `born` with diagrams, each with its FKS pairs
pub fn generate_real_emissions(
    model: &Model,
    born: &Process,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<RealEmission>> {
    let perturbed = born
        .perturbation
        .as_ref()
        .map(|p| p.orders.clone())
        .unwrap_or_default();
    let mut out = Vec::new();
    for real in real_emission_processes(model, born, config, cancel)? {
        let diagrams = generate_diagrams(model, &real, config, cancel)?;
        if diagrams.is_empty() {
            continue;
        }
        let pairs = fks_pairs(model, &real, &perturbed, config, cancel)?;
        let amplitude = Amplitude::assemble(model, &real, diagrams)?;
        out.push(RealEmission {
            born: born.clone(),
            amplitude,
            pairs,
        });
    }
    debug!(reals = out.len(), "real emissions generated");
    Ok(out)
}
