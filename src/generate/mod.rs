//! Diagram generation
//!
//! Tree diagrams come from the bottom-up subtree table in [`table`]; one-loop
//! diagrams from cutting the loop open in [`loops`]. The entry point
//! [`generate_diagrams`] runs both and then applies the constraints that can
//! only be checked on whole diagrams: exact and lower order bounds, the
//! minimal-WEIGHTED selection, required s-channels and off-shell marks.

pub mod canonical;
mod loops;
pub mod partition;
mod table;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, info_span};

pub use canonical::{diagram_label, TreeLabel};

use crate::diagram::Diagram;
use crate::error::{CoreError, CoreResult};
use crate::helas::Amplitude;
use crate::id::{LegSet, PdgCode};
use crate::model::Model;
use crate::pretty::process_string;
use crate::process::{Process, WEIGHTED};
use crate::session::{CancelToken, Session, SessionConfig};
use table::{OrderBudget, TreeRules, TreeTable};

fn both_orientations(model: &Model, codes: &[PdgCode]) -> HashSet<PdgCode> {
    codes.iter().flat_map(|&p| [p, model.anti(p)]).collect()
}

/// Legs joining loop cut halves never count as s-channel propagators
fn cut_legset(diagram: &Diagram) -> LegSet {
    diagram
        .loop_info
        .as_ref()
        .map(|l| LegSet::single(l.cut_legs.0) | LegSet::single(l.cut_legs.1))
        .unwrap_or_default()
}

/// Tree diagrams satisfying the order constraints, sorted by
/// (canonical label, orders)
pub fn generate_tree_diagrams(
    model: &Model,
    process: &Process,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<Diagram>> {
    let rules = TreeRules {
        budget: OrderBudget::from_constraints(model, &process.orders),
        forbidden: both_orientations(model, &process.forbidden_particles),
        forbidden_s: both_orientations(model, &process.forbidden_s_channels),
        initial: process.initial_legset(),
    };
    let raw = TreeTable::new(model, &rules).build(&process.legs, cancel)?;
    let n_raw = raw.len();

    let mut labelled: BTreeMap<(TreeLabel, BTreeMap<String, u32>), Diagram> = BTreeMap::new();
    for d in raw {
        d.check(model)?;
        let key = (diagram_label(model, &d), d.orders.clone());
        labelled.entry(key).or_insert(d);
    }
    let mut diagrams: Vec<Diagram> = labelled.into_values().collect();

    diagrams.retain(|d| {
        process.orders.iter().all(|(key, c)| {
            let value = if key == WEIGHTED {
                d.weighted_order(model)
            } else {
                d.order(key)
            };
            c.is_satisfied(value)
        })
    });

    if process.orders.is_empty() && config.auto_weighted {
        if let Some(min) = diagrams.iter().map(|d| d.weighted_order(model)).min() {
            diagrams.retain(|d| d.weighted_order(model) == min);
            debug!(weighted = min, "kept minimal WEIGHTED diagrams");
        }
    }
    debug!(raw = n_raw, kept = diagrams.len(), "tree diagrams");
    Ok(diagrams)
}

/// One-loop diagrams for the perturbation of `process`, given its born
/// diagrams
pub fn generate_loop_diagrams(
    model: &Model,
    process: &Process,
    born: &[Diagram],
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<Diagram>> {
    loops::generate_loop_diagrams(model, process, born, config, cancel)
}

/// Drop diagrams missing a required s-channel and mark forbidden on-shell
/// s-channel propagators
fn apply_s_channel_constraints(model: &Model, process: &Process, diagrams: &mut Vec<Diagram>) {
    let initial = process.initial_legset();
    let required = &process.required_s_channels;
    diagrams.retain(|d| {
        let cut = cut_legset(d);
        let s_ids: Vec<PdgCode> = d
            .s_channel_legs(initial)
            .into_iter()
            .filter(|l| l.legset.is_disjoint(cut))
            .map(|l| l.id)
            .collect();
        required
            .iter()
            .all(|&r| s_ids.iter().any(|&id| id == r || id == model.anti(r)))
    });

    let offshell = both_orientations(model, &process.forbidden_onshell_s_channels);
    if offshell.is_empty() {
        return;
    }
    for d in diagrams.iter_mut() {
        let cut = cut_legset(d);
        let marked: HashSet<LegSet> = d
            .s_channel_legs(initial)
            .into_iter()
            .filter(|l| l.legset.is_disjoint(cut) && offshell.contains(&l.id))
            .map(|l| l.legset)
            .collect();
        for v in &mut d.vertices {
            for leg in &mut v.legs {
                if !leg.is_external() && marked.contains(&leg.legset) {
                    leg.onshell = Some(false);
                }
            }
        }
    }
}

/// Every diagram of `process`: born diagrams, then one-loop diagrams when a
/// virtual correction is requested
///
/// Fails with `NoDiagrams` when nothing survives, unless the process sets
/// `ignore_empty`.
pub fn generate_diagrams(
    model: &Model,
    process: &Process,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<Diagram>> {
    let name = process_string(model, process);
    let span = info_span!("generate_diagrams", process = %name);
    let _guard = span.enter();

    process.validate(model)?;
    let mut diagrams = generate_tree_diagrams(model, process, config, cancel)?;
    let n_born = diagrams.len();
    if let Some(pert) = &process.perturbation {
        if pert.mode.wants_virtual() {
            let loops = generate_loop_diagrams(model, process, &diagrams, config, cancel)?;
            diagrams.extend(loops);
        }
    }
    apply_s_channel_constraints(model, process, &mut diagrams);

    if diagrams.is_empty() && !process.ignore_empty {
        return Err(CoreError::NoDiagrams(name));
    }
    info!(
        born = diagrams.iter().filter(|d| !d.is_loop()).count(),
        loops = diagrams.iter().filter(|d| d.is_loop()).count(),
        generated_born = n_born,
        "diagrams generated"
    );
    Ok(diagrams)
}

impl Session {
    pub fn generate_diagrams(&self, process: &Process) -> CoreResult<Vec<Diagram>> {
        generate_diagrams(self.model(), process, self.config(), self.cancel_token())
    }

    /// Generate and assemble in one step
    pub fn generate_amplitude(&self, process: &Process) -> CoreResult<Amplitude> {
        let diagrams = self.generate_diagrams(process)?;
        Amplitude::assemble(self.model(), process, diagrams)
    }
}
