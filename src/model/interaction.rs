//! Interaction vertices

use std::collections::BTreeMap;

use super::PhysicsObject;
use crate::color::ColorString;
use crate::error::{CoreError, CoreResult};
use crate::id::{InteractionId, PdgCode};

/// A model vertex
///
/// `particles` lists the participating particles in the all-outgoing
/// convention; color strings index them by 1-based position. `couplings`
/// maps a (color index, Lorentz index) pair to a coupling name.
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    pub id: InteractionId,
    pub particles: Vec<PdgCode>,
    pub color: Vec<ColorString>,
    pub lorentz: Vec<String>,
    pub couplings: BTreeMap<(usize, usize), String>,
    pub orders: BTreeMap<String, u32>,
}

impl Interaction {
    pub fn new(
        id: InteractionId,
        particles: Vec<PdgCode>,
        color: Vec<ColorString>,
        lorentz: Vec<String>,
        couplings: BTreeMap<(usize, usize), String>,
        orders: BTreeMap<String, u32>,
    ) -> CoreResult<Self> {
        let inter = Interaction {
            id,
            particles,
            color,
            lorentz,
            couplings,
            orders,
        };
        inter.validate()?;
        Ok(inter)
    }

    pub fn arity(&self) -> usize {
        self.particles.len()
    }

    /// Particle codes in ascending order (key of the to0 dictionary)
    pub fn sorted_ids(&self) -> Vec<PdgCode> {
        let mut ids = self.particles.clone();
        ids.sort_unstable();
        ids
    }

    pub fn order(&self, key: &str) -> u32 {
        self.orders.get(key).copied().unwrap_or(0)
    }

    /// True when any of `keys` has a positive power in this vertex
    pub fn is_perturbating(&self, keys: &[String]) -> bool {
        keys.iter().any(|k| self.order(k) > 0)
    }

    /// (Lorentz structure, coupling) pairs attached to a color structure
    pub fn lorentz_couplings(&self, color_index: usize) -> Vec<(String, String)> {
        self.couplings
            .iter()
            .filter(|((c, _), _)| *c == color_index)
            .map(|((_, l), name)| (self.lorentz[*l].clone(), name.clone()))
            .collect()
    }

    /// Every coupling name used by this vertex
    pub fn coupling_names(&self) -> impl Iterator<Item = &str> {
        self.couplings.values().map(|s| s.as_str())
    }
}

impl PhysicsObject for Interaction {
    const KIND: &'static str = "interaction";

    fn validate(&self) -> CoreResult<()> {
        if self.id == 0 {
            return Err(CoreError::invalid_attribute(
                "id",
                "interaction id 0 is reserved",
            ));
        }
        if self.particles.len() < 3 {
            return Err(CoreError::invalid_attribute(
                "particles",
                format!("interaction {} needs at least three particles", self.id),
            ));
        }
        if self.particles.contains(&0) {
            return Err(CoreError::invalid_attribute("particles", "pdg code 0"));
        }
        if self.color.is_empty() || self.lorentz.is_empty() {
            return Err(CoreError::invalid_attribute(
                "color",
                format!("interaction {} needs color and Lorentz structures", self.id),
            ));
        }
        for cs in &self.color {
            cs.validate()?;
            if let Some(bad) = cs
                .external_indices()
                .into_iter()
                .find(|i| *i as usize > self.particles.len())
            {
                return Err(CoreError::invalid_attribute(
                    "color",
                    format!("index {} exceeds the {} particles of interaction {}", bad, self.particles.len(), self.id),
                ));
            }
        }
        if self.couplings.is_empty() {
            return Err(CoreError::invalid_attribute(
                "couplings",
                format!("interaction {} has no coupling", self.id),
            ));
        }
        for (c, l) in self.couplings.keys() {
            if *c >= self.color.len() || *l >= self.lorentz.len() {
                return Err(CoreError::invalid_attribute(
                    "couplings",
                    format!("key ({}, {}) out of range in interaction {}", c, l, self.id),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorObject;

    fn qqg() -> Interaction {
        Interaction::new(
            7,
            vec![-1, 1, 21],
            vec![ColorString::from_objects(vec![ColorObject::t(vec![3], 2, 1)])],
            vec!["FFV1".into()],
            BTreeMap::from([((0, 0), "GC_11".to_string())]),
            BTreeMap::from([("QCD".to_string(), 1)]),
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let i = qqg();
        assert_eq!(i.sorted_ids(), vec![-1, 1, 21]);
        assert_eq!(i.order("QCD"), 1);
        assert_eq!(i.order("QED"), 0);
        assert!(i.is_perturbating(&["QCD".to_string()]));
        assert_eq!(
            i.lorentz_couplings(0),
            vec![("FFV1".to_string(), "GC_11".to_string())]
        );
    }

    #[test]
    fn test_coupling_key_out_of_range() {
        let mut i = qqg();
        i.couplings.insert((1, 0), "GC_X".into());
        assert!(i.validate().is_err());
    }

    #[test]
    fn test_color_index_out_of_range() {
        let mut i = qqg();
        i.color = vec![ColorString::from_objects(vec![ColorObject::t(vec![4], 2, 1)])];
        assert!(i.validate().is_err());
    }
}
