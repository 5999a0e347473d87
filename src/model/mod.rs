//! Physics object model
//!
//! A [`Model`] is built once through [`ModelBuilder`], which checks every
//! particle and interaction and the invariants spanning them, then derives
//! the lookup dictionaries the diagram generator runs on:
//!
//! - `ref_dict_to0`: sorted particle codes of a full vertex → interaction ids
//! - `ref_dict_to1`: sorted codes of all but one slot → (code of the combined
//!   leg, interaction id)
//!
//! After `build` the model is immutable and is shared behind an `Arc`.

pub mod interaction;
pub mod particle;
pub mod sm;

use std::collections::{BTreeSet, HashMap};
use std::ops::Deref;

use indexmap::IndexMap;
use num_rational::Rational64;
use num_traits::Zero;
use tracing::debug;

pub use interaction::Interaction;
pub use particle::{Particle, ZERO};

use crate::color::{ColorObject, ColorString};
use crate::error::{CoreError, CoreResult};
use crate::id::{InteractionId, PdgCode};

/// An entity with a validation contract
pub trait PhysicsObject {
    /// Human-readable entity name used in error messages
    const KIND: &'static str;

    /// Check the entity's own invariants
    fn validate(&self) -> CoreResult<()>;
}

/// Insertion-ordered list that only accepts valid entries
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsList<T: PhysicsObject> {
    items: Vec<T>,
}

impl<T: PhysicsObject> PhysicsList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Validate and append
    pub fn push(&mut self, item: T) -> CoreResult<()> {
        if let Err(e) = item.validate() {
            debug!(kind = T::KIND, error = %e, "rejected list entry");
            return Err(e);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: PhysicsObject> Default for PhysicsList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PhysicsObject> Deref for PhysicsList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: PhysicsObject> TryFrom<Vec<T>> for PhysicsList<T> {
    type Error = CoreError;

    fn try_from(items: Vec<T>) -> CoreResult<Self> {
        let mut list = PhysicsList::new();
        for item in items {
            list.push(item)?;
        }
        Ok(list)
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Validated, immutable particle physics model
#[derive(Clone, Debug)]
pub struct Model {
    name: String,
    particles: PhysicsList<Particle>,
    interactions: PhysicsList<Interaction>,
    parameters: IndexMap<String, f64>,
    couplings: IndexMap<String, f64>,
    order_hierarchy: IndexMap<String, u32>,

    particle_index: HashMap<PdgCode, usize>,
    name_index: HashMap<String, PdgCode>,
    interaction_index: HashMap<InteractionId, usize>,
    ref_dict_to0: HashMap<Vec<PdgCode>, Vec<InteractionId>>,
    ref_dict_to1: HashMap<Vec<PdgCode>, Vec<(PdgCode, InteractionId)>>,
}

impl Model {
    pub fn builder(name: &str) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn particles(&self) -> &PhysicsList<Particle> {
        &self.particles
    }

    pub fn interactions(&self) -> &PhysicsList<Interaction> {
        &self.interactions
    }

    pub fn parameters(&self) -> &IndexMap<String, f64> {
        &self.parameters
    }

    pub fn couplings(&self) -> &IndexMap<String, f64> {
        &self.couplings
    }

    pub fn order_hierarchy(&self) -> &IndexMap<String, u32> {
        &self.order_hierarchy
    }

    /// Particle of either orientation of `pdg`
    pub fn particle(&self, pdg: PdgCode) -> Option<&Particle> {
        self.particle_index
            .get(&pdg.abs())
            .map(|&i| &self.particles[i])
    }

    pub fn has_particle(&self, pdg: PdgCode) -> bool {
        pdg != 0 && self.particle(pdg).is_some_and(|p| pdg > 0 || !p.self_antiparticle)
    }

    pub fn interaction(&self, id: InteractionId) -> Option<&Interaction> {
        self.interaction_index
            .get(&id)
            .map(|&i| &self.interactions[i])
    }

    /// Resolve a particle or antiparticle name to its code
    pub fn pdg_by_name(&self, name: &str) -> Option<PdgCode> {
        self.name_index.get(name).copied()
    }

    pub fn name_of(&self, pdg: PdgCode) -> String {
        self.particle(pdg)
            .map(|p| p.name_of(pdg).to_string())
            .unwrap_or_else(|| pdg.to_string())
    }

    pub fn anti(&self, pdg: PdgCode) -> PdgCode {
        self.particle(pdg).map(|p| p.anti_pdg(pdg)).unwrap_or(-pdg)
    }

    pub fn color_of(&self, pdg: PdgCode) -> i32 {
        self.particle(pdg).map(|p| p.color_of(pdg)).unwrap_or(1)
    }

    pub fn charge_of(&self, pdg: PdgCode) -> Rational64 {
        self.particle(pdg)
            .map(|p| p.charge_of(pdg))
            .unwrap_or_else(Rational64::zero)
    }

    pub fn spin_of(&self, pdg: PdgCode) -> i32 {
        self.particle(pdg).map(|p| p.spin).unwrap_or(1)
    }

    pub fn is_fermion(&self, pdg: PdgCode) -> bool {
        self.particle(pdg).is_some_and(|p| p.is_fermion())
    }

    /// Numerical mass (0 for `ZERO` or an unknown symbol)
    pub fn mass_value(&self, pdg: PdgCode) -> f64 {
        self.particle(pdg)
            .and_then(|p| self.parameters.get(&p.mass))
            .copied()
            .unwrap_or(0.0)
            .abs()
    }

    pub fn width_value(&self, pdg: PdgCode) -> f64 {
        self.particle(pdg)
            .and_then(|p| self.parameters.get(&p.width))
            .copied()
            .unwrap_or(0.0)
            .abs()
    }

    pub fn coupling_value(&self, name: &str) -> f64 {
        self.couplings.get(name).copied().unwrap_or(0.0)
    }

    /// Weight of an order key in the WEIGHTED sum (1 when not listed)
    pub fn hierarchy_weight(&self, key: &str) -> u32 {
        self.order_hierarchy.get(key).copied().unwrap_or(1)
    }

    /// Every order key used by some interaction, sorted
    pub fn order_keys(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .interactions
            .iter()
            .flat_map(|i| i.orders.keys())
            .collect();
        keys.into_iter().cloned().collect()
    }

    /// Largest number of particles in a vertex
    pub fn max_arity(&self) -> usize {
        self.interactions.iter().map(|i| i.arity()).max().unwrap_or(0)
    }

    /// Every particle and antiparticle code of the model
    pub fn all_pdgs(&self) -> Vec<PdgCode> {
        let mut out = Vec::new();
        for p in self.particles.iter() {
            out.push(p.pdg_code);
            if !p.self_antiparticle {
                out.push(-p.pdg_code);
            }
        }
        out
    }

    pub fn ref_dict_to0(&self) -> &HashMap<Vec<PdgCode>, Vec<InteractionId>> {
        &self.ref_dict_to0
    }

    pub fn ref_dict_to1(&self) -> &HashMap<Vec<PdgCode>, Vec<(PdgCode, InteractionId)>> {
        &self.ref_dict_to1
    }

    /// Interactions closing the sorted code multiset `ids`
    pub fn vertices_to0(&self, ids: &[PdgCode]) -> &[InteractionId] {
        self.ref_dict_to0
            .get(ids)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// (combined leg code, interaction) pairs for the sorted multiset `ids`
    pub fn vertices_to1(&self, ids: &[PdgCode]) -> &[(PdgCode, InteractionId)] {
        self.ref_dict_to1
            .get(ids)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects model content and validates it as a whole in [`build`](Self::build)
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    pub name: String,
    pub particles: PhysicsList<Particle>,
    pub interactions: PhysicsList<Interaction>,
    pub parameters: IndexMap<String, f64>,
    pub couplings: IndexMap<String, f64>,
    pub order_hierarchy: IndexMap<String, u32>,
}

impl ModelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_particle(&mut self, particle: Particle) -> CoreResult<()> {
        self.particles.push(particle)
    }

    pub fn add_interaction(&mut self, interaction: Interaction) -> CoreResult<()> {
        self.interactions.push(interaction)
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) {
        self.parameters.insert(name.to_string(), value);
    }

    pub fn set_coupling(&mut self, name: &str, value: f64) {
        self.couplings.insert(name.to_string(), value);
    }

    pub fn set_order_weight(&mut self, key: &str, weight: u32) {
        self.order_hierarchy.insert(key.to_string(), weight);
    }

    /// Check cross-entity invariants and derive the lookup tables
    pub fn build(self) -> CoreResult<Model> {
        let mut particle_index = HashMap::new();
        let mut name_index = HashMap::new();
        for (i, p) in self.particles.iter().enumerate() {
            if particle_index.insert(p.pdg_code, i).is_some() {
                return Err(CoreError::ModelConsistency(format!(
                    "duplicate pdg code {}",
                    p.pdg_code
                )));
            }
            for (name, code) in [(&p.name, p.pdg_code), (&p.antiname, p.anti_pdg(p.pdg_code))] {
                if let Some(prev) = name_index.insert(name.clone(), code) {
                    if prev != code {
                        return Err(CoreError::ModelConsistency(format!(
                            "particle name {} is used twice",
                            name
                        )));
                    }
                }
            }
            for symbol in [&p.mass, &p.width] {
                if symbol != ZERO && !self.parameters.contains_key(symbol) {
                    return Err(CoreError::ModelConsistency(format!(
                        "parameter {} of particle {} is not defined",
                        symbol, p.name
                    )));
                }
            }
        }

        let lookup = |pdg: PdgCode| -> Option<&Particle> {
            particle_index.get(&pdg.abs()).map(|&i| &self.particles[i])
        };

        let mut interactions = Vec::with_capacity(self.interactions.len());
        let mut interaction_index = HashMap::new();
        for (pos, inter) in self.interactions.iter().enumerate() {
            if interaction_index.insert(inter.id, pos).is_some() {
                return Err(CoreError::ModelConsistency(format!(
                    "duplicate interaction id {}",
                    inter.id
                )));
            }
            let mut charge = Rational64::zero();
            for &pdg in &inter.particles {
                let p = lookup(pdg).ok_or_else(|| {
                    CoreError::ModelConsistency(format!(
                        "interaction {} uses unknown particle {}",
                        inter.id, pdg
                    ))
                })?;
                if pdg < 0 && p.self_antiparticle {
                    return Err(CoreError::ModelConsistency(format!(
                        "interaction {} uses the negative code of self-conjugate {}",
                        inter.id, p.name
                    )));
                }
                charge += p.charge_of(pdg);
            }
            if !charge.is_zero() {
                return Err(CoreError::ModelConsistency(format!(
                    "interaction {} does not conserve charge ({})",
                    inter.id, charge
                )));
            }
            for name in inter.coupling_names() {
                if !self.couplings.contains_key(name) {
                    return Err(CoreError::ModelConsistency(format!(
                        "coupling {} of interaction {} is not defined",
                        name, inter.id
                    )));
                }
            }
            let mut inter = inter.clone();
            let slot_color = |slot: i32| {
                let pdg = inter.particles[(slot - 1) as usize];
                lookup(pdg).map(|p| p.color_of(pdg)).unwrap_or(1)
            };
            let colors: Vec<ColorString> = inter
                .color
                .iter()
                .map(|cs| resolve_adjoint_identities(cs, slot_color))
                .collect();
            inter.color = colors;
            interactions.push(inter);
        }

        let mut order_hierarchy = self.order_hierarchy.clone();
        for inter in &interactions {
            for key in inter.orders.keys() {
                order_hierarchy.entry(key.clone()).or_insert(1);
            }
        }

        let mut ref_dict_to0: HashMap<Vec<PdgCode>, Vec<InteractionId>> = HashMap::new();
        let mut ref_dict_to1: HashMap<Vec<PdgCode>, Vec<(PdgCode, InteractionId)>> =
            HashMap::new();
        for inter in &interactions {
            ref_dict_to0
                .entry(inter.sorted_ids())
                .or_default()
                .push(inter.id);
            for slot in 0..inter.particles.len() {
                let mut rest = inter.particles.clone();
                let remaining = rest.remove(slot);
                rest.sort_unstable();
                let anti = lookup(remaining)
                    .map(|p| p.anti_pdg(remaining))
                    .unwrap_or(-remaining);
                let entry = ref_dict_to1.entry(rest).or_default();
                if !entry.contains(&(anti, inter.id)) {
                    entry.push((anti, inter.id));
                }
            }
        }

        debug!(
            model = %self.name,
            particles = self.particles.len(),
            interactions = interactions.len(),
            "model built"
        );

        Ok(Model {
            name: self.name,
            particles: self.particles,
            interactions: PhysicsList::try_from(interactions)?,
            parameters: self.parameters,
            couplings: self.couplings,
            order_hierarchy,
            particle_index,
            name_index,
            interaction_index,
            ref_dict_to0,
            ref_dict_to1,
        })
    }
}

/// `Identity(a, b)` between two octets is `2 Tr(a, b)`
fn resolve_adjoint_identities(cs: &ColorString, slot_color: impl Fn(i32) -> i32) -> ColorString {
    let mut out = ColorString {
        objects: Vec::with_capacity(cs.objects.len()),
        ..cs.clone()
    };
    for obj in &cs.objects {
        match obj {
            ColorObject::Kronecker(a, b) if *a > 0 && *b > 0 && slot_color(*a) == 8 => {
                out.objects.push(ColorObject::Tr(vec![*a, *b]));
                out = out.scale(Rational64::from_integer(2));
            }
            other => out.objects.push(other.clone()),
        }
    }
    out
}
