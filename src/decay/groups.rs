//! Decay groups and stable particles
//!
//! Two massive particles share a decay group when they meet in an
//! interaction whose other legs are all lighter than the heavier of the
//! two. Groups are kept in a union-find over particle positions. The
//! lightest member of a group cannot decay through the interactions that
//! formed the group; whether it decays at all is settled by the channel
//! search, which [`find_stable_particles`] runs group by group.

use std::collections::BTreeMap;

use egglog_union_find::UnionFind;
use tracing::debug;

use super::channels::find_channels;
use crate::error::CoreResult;
use crate::id::PdgCode;
use crate::model::Model;
use crate::session::{CancelToken, SessionConfig};

/// A set of particles linked by decay-relevant interactions
#[derive(Clone, Debug, PartialEq)]
pub struct DecayGroup {
    /// Positive codes, ascending mass then code
    pub members: Vec<PdgCode>,
}

impl DecayGroup {
    pub fn lightest(&self) -> Option<PdgCode> {
        self.members.first().copied()
    }
}

/// Partition of the massive particles into decay groups
pub fn find_decay_groups(model: &Model) -> Vec<DecayGroup> {
    let massive: Vec<PdgCode> = model
        .particles()
        .iter()
        .map(|p| p.pdg_code)
        .filter(|&p| model.mass_value(p) > 0.0)
        .collect();
    let position = |pdg: PdgCode| massive.iter().position(|&p| p == pdg.abs());

    let mut uf: UnionFind<usize> = UnionFind::default();
    for i in 0..massive.len() {
        uf.find(i);
    }
    for inter in model.interactions().iter() {
        let parts = &inter.particles;
        for (a, &pa) in parts.iter().enumerate() {
            for (b, &pb) in parts.iter().enumerate().skip(a + 1) {
                let (Some(ia), Some(ib)) = (position(pa), position(pb)) else {
                    continue;
                };
                let heavier = model.mass_value(pa).max(model.mass_value(pb));
                let others_lighter = parts
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != a && *k != b)
                    .all(|(_, &p)| model.mass_value(p) < heavier);
                if others_lighter {
                    let (ra, rb) = (uf.find(ia), uf.find(ib));
                    if ra != rb {
                        uf.union(ra, rb);
                    }
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<PdgCode>> = BTreeMap::new();
    for (i, &p) in massive.iter().enumerate() {
        groups.entry(uf.find(i)).or_default().push(p);
    }
    let mut out: Vec<DecayGroup> = groups
        .into_values()
        .map(|mut members| {
            members.sort_by(|a, b| {
                model
                    .mass_value(*a)
                    .total_cmp(&model.mass_value(*b))
                    .then(a.cmp(b))
            });
            DecayGroup { members }
        })
        .collect();
    out.sort_by_key(|g| g.lightest());
    debug!(groups = out.len(), "decay groups");
    out
}

/// Whether `pdg` has a channel with 2 up to `max_final_state_number` bodies
fn has_channel(
    model: &Model,
    pdg: PdgCode,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<bool> {
    for n in 2..=config.max_final_state_number {
        if !find_channels(model, pdg, n, config, cancel)?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Particles with no open decay channel up to `max_final_state_number`
/// bodies, massless ones included; positive codes, ascending
///
/// Massive particles are searched group by group, lightest member first.
/// The group only predicts the outcome: a lightest member with an open
/// channel still decays, a heavier member without one is still stable.
pub fn find_stable_particles(
    model: &Model,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<PdgCode>> {
    let mut stable: Vec<PdgCode> = model
        .particles()
        .iter()
        .map(|p| p.pdg_code)
        .filter(|&p| model.mass_value(p) <= 0.0)
        .collect();
    for group in find_decay_groups(model) {
        let lightest = group.lightest();
        for &pdg in &group.members {
            let decays = has_channel(model, pdg, config, cancel)?;
            let predicted_stable = Some(pdg) == lightest;
            if decays == predicted_stable {
                debug!(
                    particle = %model.name_of(pdg),
                    decays,
                    "decay group prediction overridden by channel search"
                );
            }
            if !decays {
                stable.push(pdg);
            }
        }
    }
    stable.sort_unstable();
    Ok(stable)
}
