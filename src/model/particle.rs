//! Particles

use num_rational::Rational64;
use num_traits::Zero;

use super::PhysicsObject;
use crate::error::{CoreError, CoreResult};
use crate::id::PdgCode;

/// Mass or width symbol meaning "exactly zero"
pub const ZERO: &str = "ZERO";

/// A particle species, stored in its particle orientation (positive PDG code)
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub pdg_code: PdgCode,
    pub name: String,
    pub antiname: String,
    /// 2J+1
    pub spin: i32,
    /// 1 singlet, ±3 (anti)triplet, ±6 (anti)sextet, 8 octet
    pub color: i32,
    pub mass: String,
    pub width: String,
    pub charge: Rational64,
    pub self_antiparticle: bool,
    pub ghost: bool,
    pub texname: String,
    pub antitexname: String,
}

impl Particle {
    /// A massless colorless scalar named `name`; refine it with the setters
    pub fn new(pdg_code: PdgCode, name: &str, antiname: &str) -> CoreResult<Self> {
        let particle = Particle {
            pdg_code,
            name: name.to_string(),
            antiname: antiname.to_string(),
            spin: 1,
            color: 1,
            mass: ZERO.to_string(),
            width: ZERO.to_string(),
            charge: Rational64::zero(),
            self_antiparticle: name == antiname,
            ghost: false,
            texname: name.to_string(),
            antitexname: antiname.to_string(),
        };
        particle.validate()?;
        Ok(particle)
    }

    pub fn set_spin(&mut self, spin: i32) -> CoreResult<()> {
        if !(1..=5).contains(&spin) {
            return Err(CoreError::invalid_attribute(
                "spin",
                format!("{} is not a valid 2J+1 value", spin),
            ));
        }
        self.spin = spin;
        Ok(())
    }

    pub fn set_color(&mut self, color: i32) -> CoreResult<()> {
        if ![1, 3, -3, 6, -6, 8].contains(&color) {
            return Err(CoreError::invalid_attribute(
                "color",
                format!("{} is not a supported representation", color),
            ));
        }
        if self.self_antiparticle && ![1, 8].contains(&color) {
            return Err(CoreError::invalid_attribute(
                "color",
                format!("self-conjugate {} cannot carry a complex representation", self.name),
            ));
        }
        self.color = color;
        Ok(())
    }

    pub fn set_mass(&mut self, mass: &str) -> CoreResult<()> {
        if mass.is_empty() {
            return Err(CoreError::invalid_attribute("mass", "empty symbol"));
        }
        self.mass = mass.to_string();
        Ok(())
    }

    pub fn set_width(&mut self, width: &str) -> CoreResult<()> {
        if width.is_empty() {
            return Err(CoreError::invalid_attribute("width", "empty symbol"));
        }
        self.width = width.to_string();
        Ok(())
    }

    pub fn set_charge(&mut self, charge: Rational64) -> CoreResult<()> {
        if self.self_antiparticle && !charge.is_zero() {
            return Err(CoreError::invalid_attribute(
                "charge",
                format!("self-conjugate {} must be neutral", self.name),
            ));
        }
        self.charge = charge;
        Ok(())
    }

    pub fn set_ghost(&mut self, ghost: bool) {
        self.ghost = ghost;
    }

    pub fn set_texnames(&mut self, texname: &str, antitexname: &str) {
        self.texname = texname.to_string();
        self.antitexname = antitexname.to_string();
    }

    pub fn is_massless(&self) -> bool {
        self.mass == ZERO
    }

    pub fn is_fermion(&self) -> bool {
        self.spin % 2 == 0
    }

    pub fn is_boson(&self) -> bool {
        !self.is_fermion()
    }

    /// Self-conjugate fermion
    pub fn is_majorana(&self) -> bool {
        self.is_fermion() && self.self_antiparticle
    }

    /// PDG code of the antiparticle of the orientation `pdg` (which must be ±pdg_code)
    pub fn anti_pdg(&self, pdg: PdgCode) -> PdgCode {
        if self.self_antiparticle {
            pdg
        } else {
            -pdg
        }
    }

    /// Name of the orientation `pdg`
    pub fn name_of(&self, pdg: PdgCode) -> &str {
        if pdg > 0 {
            &self.name
        } else {
            &self.antiname
        }
    }

    /// Color representation seen by the orientation `pdg`
    pub fn color_of(&self, pdg: PdgCode) -> i32 {
        if pdg < 0 && [3, -3, 6, -6].contains(&self.color) {
            -self.color
        } else {
            self.color
        }
    }

    pub fn charge_of(&self, pdg: PdgCode) -> Rational64 {
        if pdg < 0 {
            -self.charge
        } else {
            self.charge
        }
    }
}

impl PhysicsObject for Particle {
    const KIND: &'static str = "particle";

    fn validate(&self) -> CoreResult<()> {
        if self.pdg_code <= 0 {
            return Err(CoreError::invalid_attribute(
                "pdg_code",
                format!("{} must be a positive particle code", self.pdg_code),
            ));
        }
        if self.name.is_empty() || self.antiname.is_empty() {
            return Err(CoreError::invalid_attribute("name", "empty particle name"));
        }
        if (self.name == self.antiname) != self.self_antiparticle {
            return Err(CoreError::invalid_attribute(
                "antiname",
                format!(
                    "{}/{}: names must differ exactly when the particle is not self-conjugate",
                    self.name, self.antiname
                ),
            ));
        }
        if !(1..=5).contains(&self.spin) {
            return Err(CoreError::invalid_attribute(
                "spin",
                format!("{} is not a valid 2J+1 value", self.spin),
            ));
        }
        if ![1, 3, -3, 6, -6, 8].contains(&self.color) {
            return Err(CoreError::invalid_attribute(
                "color",
                format!("{} is not a supported representation", self.color),
            ));
        }
        if self.self_antiparticle && (![1, 8].contains(&self.color) || !self.charge.is_zero()) {
            return Err(CoreError::invalid_attribute(
                "self_antiparticle",
                format!("{} is self-conjugate but charged or complex-colored", self.name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_helpers() {
        let mut t = Particle::new(6, "t", "t~").unwrap();
        t.set_spin(2).unwrap();
        t.set_color(3).unwrap();
        t.set_charge(Rational64::new(2, 3)).unwrap();
        assert_eq!(t.name_of(-6), "t~");
        assert_eq!(t.color_of(-6), -3);
        assert_eq!(t.charge_of(-6), Rational64::new(-2, 3));
        assert_eq!(t.anti_pdg(6), -6);
        assert!(t.is_fermion());
        assert!(!t.is_majorana());
    }

    #[test]
    fn test_self_conjugate_contracts() {
        let mut g = Particle::new(21, "g", "g").unwrap();
        assert!(g.self_antiparticle);
        assert!(g.set_color(3).is_err());
        assert!(g.set_charge(Rational64::new(1, 3)).is_err());
        g.set_color(8).unwrap();
        assert_eq!(g.anti_pdg(21), 21);
    }

    #[test]
    fn test_invalid_spin_rejected() {
        let mut h = Particle::new(25, "h", "h").unwrap();
        assert!(matches!(
            h.set_spin(7),
            Err(CoreError::InvalidAttribute { .. })
        ));
        assert!(Particle::new(-5, "b", "b~").is_err());
    }
}
