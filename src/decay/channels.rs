//! Decay channel search
//!
//! Candidate final states of a 1 → N decay are the multisets of N model
//! codes that are kinematically open and conserve charge. Each tree diagram
//! of such a final state is one channel, ranked by its approximate width.
//! Three-body and larger diagrams are skipped when a propagator can go on
//! shell, or is as heavy as the mother: both are counted by a shorter chain.

use std::cmp::Ordering;

use num_rational::Rational64;
use num_traits::Zero;
use tracing::{debug, warn};

use super::matrix_element::{apx_matrix_element_sq, legset_mass};
use super::phase_space::apx_psarea;
use crate::diagram::Diagram;
use crate::error::{CoreError, CoreResult};
use crate::generate::generate_tree_diagrams;
use crate::id::PdgCode;
use crate::model::Model;
use crate::process::Process;
use crate::session::{CancelToken, SessionConfig};

/// One way a particle decays
#[derive(Clone, Debug)]
pub struct DecayChannel {
    pub mother: PdgCode,
    /// Final-state codes in leg order (legs 2, 3, ...)
    pub final_ids: Vec<PdgCode>,
    pub diagram: Diagram,
    pub apx_psarea: f64,
    pub apx_matrix_element_sq: f64,
    pub apx_width: f64,
}

impl DecayChannel {
    pub fn n_final(&self) -> usize {
        self.final_ids.len()
    }
}

/// Descending width, then final-state codes
pub(crate) fn rank(a: &DecayChannel, b: &DecayChannel) -> Ordering {
    b.apx_width
        .total_cmp(&a.apx_width)
        .then_with(|| a.final_ids.cmp(&b.final_ids))
}

/// Multisets of `n` codes from `codes` (sorted, with repetition)
fn multisets(codes: &[PdgCode], n: usize) -> Vec<Vec<PdgCode>> {
    let mut out = Vec::new();
    let mut stack: Vec<(usize, Vec<PdgCode>)> = vec![(0, Vec::new())];
    while let Some((start, current)) = stack.pop() {
        if current.len() == n {
            out.push(current);
            continue;
        }
        for i in (start..codes.len()).rev() {
            let mut next = current.clone();
            next.push(codes[i]);
            stack.push((i, next));
        }
    }
    out
}

/// Symmetry factor Π n_i! of identical final particles
fn identical_factor(finals: &[PdgCode]) -> f64 {
    let mut factor = 1.0;
    let mut run = 1;
    for w in finals.windows(2) {
        if w[0] == w[1] {
            run += 1;
            factor *= run as f64;
        } else {
            run = 1;
        }
    }
    factor
}

/// A propagator that can reach its mass shell
fn has_onshell_propagator(
    model: &Model,
    diagram: &Diagram,
    mother_mass: f64,
    masses: &[f64],
) -> bool {
    let total: f64 = masses.iter().sum();
    diagram.internal_legs().into_iter().any(|leg| {
        let m = model.mass_value(leg.id);
        let inside = legset_mass(masses, leg.legset);
        let hi = mother_mass - (total - inside);
        m > 0.0 && inside < m && m <= hi
    })
}

/// A propagator at least as heavy as the mother, i.e. the mother radiating
/// before a shorter decay
fn has_radiating_mother(model: &Model, diagram: &Diagram, mother_mass: f64) -> bool {
    diagram
        .internal_legs()
        .into_iter()
        .any(|leg| model.mass_value(leg.id) >= mother_mass)
}

/// Decay channels of `pdg` into exactly `n` particles, ranked by width
pub fn find_channels(
    model: &Model,
    pdg: PdgCode,
    n: usize,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<DecayChannel>> {
    let mother_mass = model.mass_value(pdg);
    if mother_mass <= 0.0 || n < 2 {
        return Ok(Vec::new());
    }
    let charge = model.charge_of(pdg);
    let mut codes = model.all_pdgs();
    codes.sort_unstable();
    let mut channels = Vec::new();

    for finals in multisets(&codes, n) {
        cancel.check()?;
        let masses: Vec<f64> = finals.iter().map(|&p| model.mass_value(p)).collect();
        if masses.iter().sum::<f64>() >= mother_mass {
            continue;
        }
        let q = finals
            .iter()
            .fold(Rational64::zero(), |acc, &p| acc + model.charge_of(p));
        if q != charge {
            continue;
        }
        let mut process = Process::new(model, &[pdg], &finals)?;
        process.ignore_empty = true;
        process.validate(model)?;
        let diagrams = generate_tree_diagrams(model, &process, config, cancel).map_err(|e| {
            match e {
                CoreError::Cancelled => e,
                other => CoreError::ChannelGenerationFailed {
                    pdg,
                    reason: other.to_string(),
                },
            }
        })?;
        let psarea = apx_psarea(mother_mass, &masses);
        for d in diagrams {
            if n > 2
                && (has_onshell_propagator(model, &d, mother_mass, &masses)
                    || has_radiating_mother(model, &d, mother_mass))
            {
                continue;
            }
            let me = match apx_matrix_element_sq(model, &d, mother_mass, &masses) {
                Ok(me) => me,
                Err(CoreError::IncompatibleDecay(reason)) => {
                    warn!(mother = %model.name_of(pdg), %reason, "channel dropped");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let width = psarea * me / (2.0 * mother_mass) / identical_factor(&finals);
            channels.push(DecayChannel {
                mother: pdg,
                final_ids: finals.clone(),
                diagram: d,
                apx_psarea: psarea,
                apx_matrix_element_sq: me,
                apx_width: width,
            });
        }
    }
    channels.sort_by(rank);
    debug!(
        mother = %model.name_of(pdg),
        n,
        channels = channels.len(),
        "channels found"
    );
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multisets() {
        let sets = multisets(&[1, 2, 3], 2);
        assert_eq!(sets.len(), 6);
        assert_eq!(sets[0], vec![1, 1]);
        assert!(sets.contains(&vec![2, 3]));
        assert_eq!(multisets(&[1, 2, 3, 4], 3).len(), 20);
    }

    #[test]
    fn test_identical_factor() {
        assert_eq!(identical_factor(&[1, 2]), 1.0);
        assert_eq!(identical_factor(&[1, 1]), 2.0);
        assert_eq!(identical_factor(&[2, 2, 2]), 6.0);
    }
}
