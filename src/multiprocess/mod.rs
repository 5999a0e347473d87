//! Multi-process expansion
//!
//! A [`ProcessDefinition`] may use multi-particle labels (`p`, `j`, `l+`, ...)
//! anywhere a particle is expected. [`expand_definition`] turns it into the
//! concrete processes it stands for: the cartesian product of the label
//! choices, with one process kept per unordered (initial, final) multiset,
//! and decay chains expanded the same way. Members that fail validation are
//! dropped with a warning. [`generate_multiprocess`] runs
//! each of them, skipping those without diagrams.

pub mod nlo;

use std::collections::{BTreeMap, HashSet};

use tracing::{info, info_span, warn};

pub use nlo::{fks_pairs, real_emission_processes, FksPair, RealEmission};

use crate::ast::ProcessDefinition;
use crate::decay_chain::generate_with_decays;
use crate::error::{CoreError, CoreResult};
use crate::generate::partition::cartesian_product;
use crate::helas::Amplitude;
use crate::id::PdgCode;
use crate::pretty::process_string;
use crate::process::Process;
use crate::session::Session;

fn resolve_all(session: &Session, labels: &[String]) -> CoreResult<Vec<Vec<PdgCode>>> {
    labels.iter().map(|l| session.resolve_label(l)).collect()
}

fn resolve_flat(session: &Session, labels: &[String]) -> CoreResult<Vec<PdgCode>> {
    let mut out = Vec::new();
    for codes in resolve_all(session, labels)? {
        for c in codes {
            if !out.contains(&c) {
                out.push(c);
            }
        }
    }
    Ok(out)
}

/// Sorted initial and final codes, the identity of a process under crossing
/// of identical legs
fn multiset_key(initial: &[PdgCode], finals: &[PdgCode]) -> (Vec<PdgCode>, Vec<PdgCode>) {
    let mut i = initial.to_vec();
    let mut f = finals.to_vec();
    i.sort_unstable();
    f.sort_unstable();
    (i, f)
}

/// Concrete processes a definition stands for, in expansion order
///
/// Fails with the first validation error only when no member is valid.
pub fn expand_definition(session: &Session, def: &ProcessDefinition) -> CoreResult<Vec<Process>> {
    let model = session.model();
    let initial = resolve_all(session, &def.initial)?;
    let finals = resolve_all(session, &def.finals)?;
    let n_initial = initial.len();

    let forbidden = resolve_flat(session, &def.forbidden_particles)?;
    let onshell = resolve_flat(session, &def.forbidden_onshell_s_channels)?;
    let forbidden_s = resolve_flat(session, &def.forbidden_s_channels)?;
    let required = resolve_flat(session, &def.required_s_channels)?;
    let orders: BTreeMap<_, _> = def.orders.iter().cloned().collect();

    let mut decay_choices = Vec::with_capacity(def.decays.len());
    for d in &def.decays {
        let expanded = expand_definition(session, d)?;
        if expanded.iter().any(|p| !p.is_decay()) {
            return Err(CoreError::InvalidProcess(format!(
                "decay chain `{}` must have one initial particle",
                d
            )));
        }
        decay_choices.push(expanded);
    }
    let decay_combinations = cartesian_product(&decay_choices);

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut rejected = None;
    let mut slots = initial;
    slots.extend(finals);
    for choice in cartesian_product(&slots) {
        let (ini, fin) = choice.split_at(n_initial);
        if !seen.insert(multiset_key(ini, fin)) {
            continue;
        }
        let mut process = Process::new(model, ini, fin)?;
        process.orders = orders.clone();
        process.forbidden_particles = forbidden.clone();
        process.forbidden_onshell_s_channels = onshell.clone();
        process.forbidden_s_channels = forbidden_s.clone();
        process.required_s_channels = required.clone();
        process.perturbation = def.perturbation.clone();
        for decays in &decay_combinations {
            let mut p = process.clone();
            p.decay_chains = decays.clone();
            match p.validate(model) {
                Ok(()) => out.push(p),
                Err(e) => {
                    warn!(
                        process = %process_string(model, &p),
                        error = %e,
                        "skipping invalid process"
                    );
                    rejected.get_or_insert(e);
                }
            }
        }
    }
    match rejected {
        Some(e) if out.is_empty() => Err(e),
        _ => Ok(out),
    }
}

/// Everything generated for one definition
#[derive(Clone, Debug, Default)]
pub struct MultiProcessOutput {
    pub amplitudes: Vec<Amplitude>,
    pub real_emissions: Vec<RealEmission>,
    /// Expanded processes without diagrams
    pub skipped: Vec<Process>,
}

/// Generate and assemble every process of a definition
///
/// Members without diagrams are skipped with a warning; the call fails with
/// `NoDiagrams` only when every member is empty.
pub fn generate_multiprocess(
    session: &Session,
    def: &ProcessDefinition,
) -> CoreResult<MultiProcessOutput> {
    let span = info_span!("generate_multiprocess", definition = %def);
    let _guard = span.enter();
    let model = session.model();
    let mut output = MultiProcessOutput::default();

    for process in expand_definition(session, def)? {
        session.cancel_token().check()?;
        match generate_with_decays(model, &process, session.config(), session.cancel_token()) {
            Ok(amp) => output.amplitudes.push(amp),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "skipping process");
                output.skipped.push(process);
                continue;
            }
            Err(e) => return Err(e),
        }
        if process.perturbation.as_ref().is_some_and(|p| p.mode.wants_real()) {
            output.real_emissions.extend(nlo::generate_real_emissions(
                model,
                &process,
                session.config(),
                session.cancel_token(),
            )?);
        }
    }
    if output.amplitudes.is_empty() {
        return Err(CoreError::NoDiagrams(def.to_string()));
    }
    info!(
        amplitudes = output.amplitudes.len(),
        skipped = output.skipped.len(),
        real_emissions = output.real_emissions.len(),
        "multiprocess generated"
    );
    Ok(output)
}

impl Session {
    /// Parse, expand and generate a textual process definition
    pub fn generate_process(&self, text: &str) -> CoreResult<MultiProcessOutput> {
        let def = self.parse_process(text)?;
        generate_multiprocess(self, &def)
    }

    pub fn expand_process(&self, text: &str) -> CoreResult<Vec<Process>> {
        let def = self.parse_process(text)?;
        expand_definition(self, &def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sm::standard_model;
    use std::sync::Arc;

    fn session() -> Session {
        Session::new(Arc::new(standard_model().unwrap()))
    }

    #[test]
    fn test_multiset_key_ignores_order() {
        assert_eq!(multiset_key(&[2, -2], &[1, -1]), multiset_key(&[-2, 2], &[-1, 1]));
    }

    #[test]
    fn test_crossing_duplicates_removed() {
        let s = session();
        let processes = s.expand_process("e+ e- > l+ l-").unwrap();
        assert_eq!(processes.len(), 4);
        let processes = s.expand_process("j j > a a").unwrap();
        // unordered pairs of the jet content
        let n = s.multiparticles().get("j").unwrap().len();
        assert_eq!(processes.len(), n * (n + 1) / 2);
    }

    #[test]
    fn test_decay_choices_multiply() {
        let s = session();
        let processes = s.expand_process("u u~ > w+ w-, w+ > l+ vl").unwrap();
        // 2 charged leptons x 3 neutrinos
        assert_eq!(processes.len(), 6);
        assert!(processes.iter().all(|p| p.decay_chains.len() == 1));
    }

    #[test]
    fn test_invalid_members_are_skipped() {
        let s = session();
        let processes = s.expand_process("p p > e+ e- / u").unwrap();
        // pairs of g d s c and their antiquarks
        assert_eq!(processes.len(), 28);
        for p in &processes {
            assert!(p.legs.iter().all(|l| l.id.abs() != 2));
        }
        assert!(matches!(
            s.expand_process("u u~ > e+ e- / u"),
            Err(CoreError::InvalidProcess(_))
        ));
    }
}
