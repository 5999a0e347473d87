//! Approximate squared matrix elements of decay diagrams
//!
//! Each vertex contributes Σ|g|² over its couplings times a spin factor:
//! M² for the structures whose amplitude grows with the momenta (FFV, FFS,
//! VVV, SSV), 1 otherwise. Each propagator of mass m and width Γ carrying
//! the legs S contributes 1/((μ² − m²)² + (mΓ)²), where μ = M − Σ m_i over
//! the final legs outside S is the largest invariant mass S can reach.

use crate::diagram::Diagram;
use crate::error::{CoreError, CoreResult};
use crate::id::LegSet;
use crate::model::Model;

/// M² or 1 depending on the sorted 2J+1 values of the vertex
fn spin_factor(model: &Model, particles: &[i32], mother_mass: f64) -> CoreResult<f64> {
    let mut spins: Vec<i32> = particles.iter().map(|&p| model.spin_of(p)).collect();
    if let Some(&bad) = particles.iter().find(|&&p| model.spin_of(p) > 3) {
        return Err(CoreError::IncompatibleDecay(format!(
            "no approximate matrix element for spin {}/2 particle {}",
            model.spin_of(bad) - 1,
            model.name_of(bad)
        )));
    }
    spins.sort_unstable();
    let grows = matches!(
        spins.as_slice(),
        [2, 2, 3] | [1, 2, 2] | [3, 3, 3] | [1, 1, 3]
    );
    Ok(if grows { mother_mass * mother_mass } else { 1.0 })
}

/// Approximate |M|² of a 1 → N diagram
///
/// Leg 1 is the decaying particle; `final_masses[i]` is the mass of leg
/// `i + 2`.
pub fn apx_matrix_element_sq(
    model: &Model,
    diagram: &Diagram,
    mother_mass: f64,
    final_masses: &[f64],
) -> CoreResult<f64> {
    let mut me = 1.0;
    for v in &diagram.vertices {
        let inter = model.interaction(v.interaction).ok_or_else(|| {
            CoreError::amplitude(format!("unknown interaction {}", v.interaction), vec![])
        })?;
        let g2: f64 = inter
            .coupling_names()
            .map(|c| model.coupling_value(c).powi(2))
            .sum();
        me *= g2 * spin_factor(model, &inter.particles, mother_mass)?;
    }
    let total: f64 = final_masses.iter().sum();
    for leg in diagram.internal_legs() {
        let inside = legset_mass(final_masses, leg.legset);
        let mu = mother_mass - (total - inside);
        let m = model.mass_value(leg.id);
        let gamma = model.width_value(leg.id);
        let denom = (mu * mu - m * m).powi(2) + (m * gamma).powi(2);
        if denom > 0.0 {
            me /= denom;
        } else {
            return Ok(0.0);
        }
    }
    Ok(me)
}

/// Σ m_i over the final legs in `legset` (leg i has mass `final_masses[i - 2]`)
pub(crate) fn legset_mass(final_masses: &[f64], legset: LegSet) -> f64 {
    legset
        .iter()
        .filter_map(|n| (n as usize).checked_sub(2).and_then(|i| final_masses.get(i)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sm::standard_model;

    #[test]
    fn test_spin_factor() {
        let model = standard_model().unwrap();
        // b~ t w-: FFV grows with the mass
        assert_eq!(spin_factor(&model, &[-5, 6, -24], 10.0).unwrap(), 100.0);
        // h h h
        assert_eq!(spin_factor(&model, &[25, 25, 25], 10.0).unwrap(), 1.0);
    }

    #[test]
    fn test_legset_mass() {
        let masses = [1.0, 2.0, 4.0];
        assert_eq!(legset_mass(&masses, LegSet::from_iter([2, 4])), 5.0);
        assert_eq!(legset_mass(&masses, LegSet::single(1)), 0.0);
    }
}
