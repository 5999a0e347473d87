//! Scattering and decay process definitions
//!
//! A [`Process`] holds its external legs in diagram convention (initial
//! legs already flipped to their antiparticle) together with the
//! constraints the generator applies. It does not hold the model; every
//! operation that needs particle data takes a `&Model`.

use std::collections::BTreeMap;
use std::fmt;

use crate::diagram::{Leg, LegState};
use crate::error::{CoreError, CoreResult};
use crate::id::{LegNumber, LegSet, PdgCode, MAX_LEGS};
use crate::model::{Model, PhysicsList};

/// Pseudo order key constraining Σ weight(key) · order(key)
pub const WEIGHTED: &str = "WEIGHTED";

/// A bound on one coupling order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderConstraint {
    /// `KEY==n`
    Exactly(u32),
    /// `KEY=n` or `KEY<=n`
    AtMost(u32),
    /// `KEY>n`
    MoreThan(u32),
}

impl OrderConstraint {
    /// Largest value allowed, if bounded
    pub fn upper_bound(&self) -> Option<u32> {
        match self {
            OrderConstraint::Exactly(n) | OrderConstraint::AtMost(n) => Some(*n),
            OrderConstraint::MoreThan(_) => None,
        }
    }

    pub fn is_satisfied(&self, value: u32) -> bool {
        match self {
            OrderConstraint::Exactly(n) => value == *n,
            OrderConstraint::AtMost(n) => value <= *n,
            OrderConstraint::MoreThan(n) => value > *n,
        }
    }
}

impl fmt::Display for OrderConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderConstraint::Exactly(n) => write!(f, "=={}", n),
            OrderConstraint::AtMost(n) => write!(f, "<={}", n),
            OrderConstraint::MoreThan(n) => write!(f, ">{}", n),
        }
    }
}

/// Which part of an NLO correction is requested
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PerturbationMode {
    Virt,
    Real,
    All,
}

impl PerturbationMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "virt" => Some(PerturbationMode::Virt),
            "real" => Some(PerturbationMode::Real),
            "all" => Some(PerturbationMode::All),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PerturbationMode::Virt => "virt",
            PerturbationMode::Real => "real",
            PerturbationMode::All => "all",
        }
    }

    pub fn wants_virtual(&self) -> bool {
        matches!(self, PerturbationMode::Virt | PerturbationMode::All)
    }

    pub fn wants_real(&self) -> bool {
        matches!(self, PerturbationMode::Real | PerturbationMode::All)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Perturbation {
    pub mode: PerturbationMode,
    pub orders: Vec<String>,
}

/// A single (non-multi) process
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    pub legs: PhysicsList<Leg>,
    pub orders: BTreeMap<String, OrderConstraint>,
    /// Never appear as propagators (`/`)
    pub forbidden_particles: Vec<PdgCode>,
    /// Diagrams with these s-channel propagators are dropped (`$$`)
    pub forbidden_s_channels: Vec<PdgCode>,
    /// These s-channel propagators are kept but must stay off shell (`$`)
    pub forbidden_onshell_s_channels: Vec<PdgCode>,
    /// Each must appear as an s-channel propagator (`> x >`)
    pub required_s_channels: Vec<PdgCode>,
    pub perturbation: Option<Perturbation>,
    pub decay_chains: Vec<Process>,
    /// Return an empty list instead of failing with `NoDiagrams`
    pub ignore_empty: bool,
}

impl Process {
    /// Build the legs from physical particle codes: initial legs are
    /// numbered first and stored as their antiparticle
    pub fn new(model: &Model, initial: &[PdgCode], finals: &[PdgCode]) -> CoreResult<Self> {
        let n_legs = initial.len() + finals.len();
        if n_legs > MAX_LEGS as usize {
            return Err(CoreError::InvalidProcess(format!(
                "{} external legs, at most {} are supported",
                n_legs, MAX_LEGS
            )));
        }
        let mut legs = PhysicsList::new();
        let mut number: LegNumber = 0;
        for &pdg in initial {
            number += 1;
            legs.push(Leg::external(model.anti(pdg), number, LegState::Initial))
                .map_err(|e| CoreError::InvalidProcess(e.to_string()))?;
        }
        for &pdg in finals {
            number += 1;
            legs.push(Leg::external(pdg, number, LegState::Final))
                .map_err(|e| CoreError::InvalidProcess(e.to_string()))?;
        }
        Ok(Process {
            legs,
            orders: BTreeMap::new(),
            forbidden_particles: Vec::new(),
            forbidden_s_channels: Vec::new(),
            forbidden_onshell_s_channels: Vec::new(),
            required_s_channels: Vec::new(),
            perturbation: None,
            decay_chains: Vec::new(),
            ignore_empty: false,
        })
    }

    pub fn with_order(mut self, key: &str, constraint: OrderConstraint) -> Self {
        self.orders.insert(key.to_string(), constraint);
        self
    }

    pub fn with_perturbation(mut self, mode: PerturbationMode, orders: &[&str]) -> Self {
        self.perturbation = Some(Perturbation {
            mode,
            orders: orders.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_decay(mut self, decay: Process) -> Self {
        self.decay_chains.push(decay);
        self
    }

    pub fn n_initial(&self) -> usize {
        self.legs.iter().filter(|l| l.is_initial()).count()
    }

    pub fn n_final(&self) -> usize {
        self.legs.len() - self.n_initial()
    }

    pub fn is_decay(&self) -> bool {
        self.n_initial() == 1
    }

    /// Physical codes of the incoming particles
    pub fn initial_ids(&self, model: &Model) -> Vec<PdgCode> {
        self.legs
            .iter()
            .filter(|l| l.is_initial())
            .map(|l| model.anti(l.id))
            .collect()
    }

    pub fn final_ids(&self) -> Vec<PdgCode> {
        self.legs
            .iter()
            .filter(|l| !l.is_initial())
            .map(|l| l.id)
            .collect()
    }

    /// Leg numbers of the initial state
    pub fn initial_legset(&self) -> LegSet {
        self.legs
            .iter()
            .filter(|l| l.is_initial())
            .map(|l| l.number)
            .collect()
    }

    /// Check the process against the model before generation
    pub fn validate(&self, model: &Model) -> CoreResult<()> {
        let n_initial = self.n_initial();
        if !(1..=2).contains(&n_initial) {
            return Err(CoreError::InvalidProcess(format!(
                "{} initial-state particles",
                n_initial
            )));
        }
        if self.n_final() == 0 || self.legs.len() < 3 {
            return Err(CoreError::InvalidProcess(
                "a process needs at least three external legs".into(),
            ));
        }
        for (i, leg) in self.legs.iter().enumerate() {
            if leg.number as usize != i + 1 {
                return Err(CoreError::InvalidProcess(format!(
                    "leg {} is out of order",
                    leg.number
                )));
            }
            if leg.is_initial() && i >= n_initial {
                return Err(CoreError::InvalidProcess(
                    "initial-state legs must come first".into(),
                ));
            }
            if !model.has_particle(leg.id) {
                return Err(CoreError::InvalidProcess(format!(
                    "unknown particle {}",
                    leg.id
                )));
            }
            if self
                .forbidden_particles
                .iter()
                .any(|&f| f == leg.id || model.anti(f) == leg.id)
            {
                return Err(CoreError::InvalidProcess(format!(
                    "external particle {} is forbidden",
                    model.name_of(leg.id)
                )));
            }
        }
        for list in [
            &self.forbidden_particles,
            &self.forbidden_s_channels,
            &self.forbidden_onshell_s_channels,
            &self.required_s_channels,
        ] {
            if let Some(bad) = list.iter().find(|&&p| !model.has_particle(p)) {
                return Err(CoreError::InvalidProcess(format!(
                    "unknown particle {}",
                    bad
                )));
            }
        }
        for &req in &self.required_s_channels {
            let banned = |list: &[PdgCode]| list.iter().any(|&f| f == req || model.anti(f) == req);
            if banned(&self.forbidden_particles) || banned(&self.forbidden_s_channels) {
                return Err(CoreError::InvalidProcess(format!(
                    "{} is both required and forbidden",
                    model.name_of(req)
                )));
            }
        }

        let keys = model.order_keys();
        for key in self.orders.keys() {
            if key != WEIGHTED && !keys.contains(key) {
                return Err(CoreError::OrderInconsistent(format!(
                    "unknown coupling order {}",
                    key
                )));
            }
        }
        if let Some(pert) = &self.perturbation {
            if pert.orders.is_empty() {
                return Err(CoreError::OrderInconsistent(
                    "perturbation without coupling orders".into(),
                ));
            }
            for key in &pert.orders {
                if !keys.contains(key) {
                    return Err(CoreError::OrderInconsistent(format!(
                        "unknown perturbation order {}",
                        key
                    )));
                }
            }
        }
        for decay in &self.decay_chains {
            decay.validate(model)?;
            if !decay.is_decay() {
                return Err(CoreError::InvalidProcess(
                    "decay chains must have one initial particle".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sm::standard_model;

    #[test]
    fn test_initial_legs_are_flipped() {
        let model = standard_model().unwrap();
        let p = Process::new(&model, &[-11, 11], &[13, -13]).unwrap();
        assert_eq!(p.legs[0].id, 11);
        assert_eq!(p.legs[1].id, -11);
        assert_eq!(p.initial_ids(&model), vec![-11, 11]);
        assert_eq!(p.final_ids(), vec![13, -13]);
        assert_eq!(p.initial_legset(), LegSet::from_iter([1, 2]));
        p.validate(&model).unwrap();
    }

    #[test]
    fn test_order_constraints() {
        assert!(OrderConstraint::AtMost(2).is_satisfied(2));
        assert!(!OrderConstraint::Exactly(2).is_satisfied(1));
        assert!(OrderConstraint::MoreThan(0).is_satisfied(1));
        assert_eq!(OrderConstraint::MoreThan(3).upper_bound(), None);
        assert_eq!(OrderConstraint::Exactly(3).to_string(), "==3");
    }

    #[test]
    fn test_unknown_order_key() {
        let model = standard_model().unwrap();
        let p = Process::new(&model, &[1, -1], &[1, -1])
            .unwrap()
            .with_order("QXD", OrderConstraint::AtMost(1));
        assert!(matches!(
            p.validate(&model),
            Err(CoreError::OrderInconsistent(_))
        ));
    }

    #[test]
    fn test_too_many_initial_legs() {
        let model = standard_model().unwrap();
        let p = Process::new(&model, &[1, -1, 21], &[1]).unwrap();
        assert!(matches!(p.validate(&model), Err(CoreError::InvalidProcess(_))));
    }

    #[test]
    fn test_leg_count_limit() {
        let model = standard_model().unwrap();
        let p = Process::new(&model, &[21, 21], &[21; 62]).unwrap();
        assert_eq!(p.legs.len(), MAX_LEGS as usize);
        assert_eq!(p.legs[63].legset, LegSet::single(MAX_LEGS));
        assert!(matches!(
            Process::new(&model, &[21, 21], &[21; 63]),
            Err(CoreError::InvalidProcess(_))
        ));
    }

    #[test]
    fn test_forbidden_external() {
        let model = standard_model().unwrap();
        let mut p = Process::new(&model, &[-11, 11], &[22, 22]).unwrap();
        p.forbidden_particles.push(22);
        assert!(matches!(p.validate(&model), Err(CoreError::InvalidProcess(_))));
    }
}
