//! Decay engine
//!
//! Approximate widths rank the decay channels of unstable particles:
//! `apx_width = apx_psarea · apx_matrix_element_sq / 2M`. They are used to
//! order and threshold channels, never as physical widths.
//!
//! [`find_all_channels`] searches every massive particle, then repeatedly
//! drops channels below `min_br` times the particle's total width and
//! recomputes the total, until nothing more is dropped.

mod channels;
mod groups;
pub mod matrix_element;
pub mod phase_space;

use indexmap::IndexMap;
use tracing::{info, info_span};

pub use channels::{find_channels, DecayChannel};
pub use groups::{find_decay_groups, find_stable_particles, DecayGroup};

use crate::error::CoreResult;
use crate::id::PdgCode;
use crate::model::Model;
use crate::session::{CancelToken, Session, SessionConfig};

/// Ranked channels of every unstable particle
#[derive(Clone, Debug, Default)]
pub struct DecayTable {
    channels: IndexMap<PdgCode, Vec<DecayChannel>>,
}

impl DecayTable {
    pub fn channels(&self, pdg: PdgCode) -> &[DecayChannel] {
        self.channels.get(&pdg).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Particles with at least one channel, in search order
    pub fn particles(&self) -> impl Iterator<Item = PdgCode> + '_ {
        self.channels.keys().copied()
    }

    pub fn total_width(&self, pdg: PdgCode) -> f64 {
        self.channels(pdg).iter().map(|c| c.apx_width).sum()
    }

    /// (final state, branching ratio) in channel order
    pub fn branching_ratios(&self, pdg: PdgCode) -> Vec<(Vec<PdgCode>, f64)> {
        let total = self.total_width(pdg);
        if total <= 0.0 {
            return Vec::new();
        }
        self.channels(pdg)
            .iter()
            .map(|c| (c.final_ids.clone(), c.apx_width / total))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Drop channels under `min_br` of the running total until stable
fn threshold(channels: &mut Vec<DecayChannel>, min_br: f64, max_iterations: usize) {
    for _ in 0..max_iterations.max(1) {
        let total: f64 = channels.iter().map(|c| c.apx_width).sum();
        let before = channels.len();
        channels.retain(|c| c.apx_width > min_br * total);
        if channels.len() == before {
            break;
        }
    }
}

/// Channels of `pdg` with 2 up to `max_final_state_number` final particles,
/// thresholded and sorted by descending width
pub fn find_particle_channels(
    model: &Model,
    pdg: PdgCode,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<DecayChannel>> {
    let mut all = Vec::new();
    for n in 2..=config.max_final_state_number {
        all.extend(find_channels(model, pdg, n, config, cancel)?);
    }
    threshold(&mut all, config.min_br, config.max_width_iterations);
    all.sort_by(channels::rank);
    Ok(all)
}

/// Decay table of every massive particle of the model
pub fn find_all_channels(
    model: &Model,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<DecayTable> {
    let span = info_span!("find_all_channels", model = model.name());
    let _guard = span.enter();
    let mut table = DecayTable::default();
    for p in model.particles().iter() {
        let pdg = p.pdg_code;
        if model.mass_value(pdg) <= 0.0 {
            continue;
        }
        let channels = find_particle_channels(model, pdg, config, cancel)?;
        if channels.is_empty() {
            continue;
        }
        info!(
            particle = %model.name_of(pdg),
            channels = channels.len(),
            width = channels.iter().map(|c| c.apx_width).sum::<f64>(),
            "decays"
        );
        table.channels.insert(pdg, channels);
    }
    Ok(table)
}

impl Session {
    pub fn find_channels(&self, pdg: PdgCode) -> CoreResult<Vec<DecayChannel>> {
        find_particle_channels(self.model(), pdg, self.config(), self.cancel_token())
    }

    pub fn decay_table(&self) -> CoreResult<DecayTable> {
        find_all_channels(self.model(), self.config(), self.cancel_token())
    }

    pub fn stable_particles(&self) -> CoreResult<Vec<PdgCode>> {
        find_stable_particles(self.model(), self.config(), self.cancel_token())
    }
}
