//! Color strings and color factors
//!
//! A [`ColorString`] is a product of [`ColorObject`]s times a coefficient
//! `c * i^k * Nc^p` with rational `c`. The power of `Nc` stays symbolic until a
//! value is requested with [`ColorCoefficient::evaluate`].

use std::collections::HashMap;
use std::fmt;

use num_rational::Rational64;
use num_traits::{One, Signed, Zero};

use super::object::ColorObject;
use crate::error::{CoreError, CoreResult};

/// Coefficient `coeff * (imaginary ? i : 1) * Nc^nc_power`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorCoefficient {
    pub coeff: Rational64,
    pub imaginary: bool,
    pub nc_power: i32,
}

impl ColorCoefficient {
    pub fn one() -> Self {
        Self {
            coeff: Rational64::one(),
            imaginary: false,
            nc_power: 0,
        }
    }

    pub fn multiply(&self, other: &ColorCoefficient) -> ColorCoefficient {
        let mut coeff = self.coeff * other.coeff;
        if self.imaginary && other.imaginary {
            coeff = -coeff;
        }
        ColorCoefficient {
            coeff,
            imaginary: self.imaginary ^ other.imaginary,
            nc_power: self.nc_power + other.nc_power,
        }
    }

    /// Substitute a value for `Nc`
    pub fn evaluate(&self, nc: i64) -> ColorValue {
        let mut value = self.coeff;
        let base = Rational64::from_integer(nc);
        for _ in 0..self.nc_power.abs() {
            if self.nc_power > 0 {
                value *= base;
            } else {
                value /= base;
            }
        }
        if self.imaginary {
            ColorValue {
                re: Rational64::zero(),
                im: value,
            }
        } else {
            ColorValue {
                re: value,
                im: Rational64::zero(),
            }
        }
    }
}

impl Default for ColorCoefficient {
    fn default() -> Self {
        Self::one()
    }
}

/// Complex rational number produced by evaluating color coefficients
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ColorValue {
    pub re: Rational64,
    pub im: Rational64,
}

impl ColorValue {
    pub fn real(re: Rational64) -> Self {
        Self {
            re,
            im: Rational64::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    pub fn add(self, other: ColorValue) -> ColorValue {
        ColorValue {
            re: self.re + other.re,
            im: self.im + other.im,
        }
    }

    pub fn mul(self, other: ColorValue) -> ColorValue {
        ColorValue {
            re: self.re * other.re - self.im * other.im,
            im: self.re * other.im + self.im * other.re,
        }
    }

    pub fn conj(self) -> ColorValue {
        ColorValue {
            re: self.re,
            im: -self.im,
        }
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.re.is_zero(), self.im.is_zero()) {
            (_, true) => write!(f, "{}", self.re),
            (true, false) => write!(f, "{}*I", self.im),
            (false, false) => write!(f, "({}+{}*I)", self.re, self.im),
        }
    }
}

/// Product of color tensors with a coefficient
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorString {
    pub coeff: Rational64,
    pub imaginary: bool,
    pub nc_power: i32,
    pub objects: Vec<ColorObject>,
}

/// Sum of color strings
pub type ColorFactor = Vec<ColorString>;

impl ColorString {
    /// The color singlet `1`
    pub fn one() -> Self {
        Self {
            coeff: Rational64::one(),
            imaginary: false,
            nc_power: 0,
            objects: Vec::new(),
        }
    }

    pub fn from_objects(objects: Vec<ColorObject>) -> Self {
        Self {
            objects,
            ..Self::one()
        }
    }

    pub fn with_coefficient(mut self, coefficient: &ColorCoefficient) -> Self {
        let c = self.coefficient().multiply(coefficient);
        self.coeff = c.coeff;
        self.imaginary = c.imaginary;
        self.nc_power = c.nc_power;
        self
    }

    pub fn coefficient(&self) -> ColorCoefficient {
        ColorCoefficient {
            coeff: self.coeff,
            imaginary: self.imaginary,
            nc_power: self.nc_power,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coeff.is_zero()
    }

    /// True for a pure number (no tensors left)
    pub fn is_scalar(&self) -> bool {
        self.objects.is_empty()
    }

    /// Concatenate tensors and multiply coefficients; index sets must already be compatible
    pub fn multiply(&self, other: &ColorString) -> ColorString {
        let mut objects = self.objects.clone();
        objects.extend(other.objects.iter().cloned());
        ColorString {
            objects,
            ..self.clone()
        }
        .with_coefficient(&other.coefficient())
    }

    pub fn scale(&self, factor: Rational64) -> ColorString {
        ColorString {
            coeff: self.coeff * factor,
            ..self.clone()
        }
    }

    pub fn indices(&self) -> Vec<i32> {
        self.objects.iter().flat_map(|o| o.indices()).collect()
    }

    /// Occurrence count of every index
    pub fn index_counts(&self) -> HashMap<i32, usize> {
        let mut counts = HashMap::new();
        for idx in self.indices() {
            *counts.entry(idx).or_insert(0) += 1;
        }
        counts
    }

    /// External (positive) indices, sorted and deduplicated
    pub fn external_indices(&self) -> Vec<i32> {
        let mut ext: Vec<i32> = self.indices().into_iter().filter(|i| *i > 0).collect();
        ext.sort_unstable();
        ext.dedup();
        ext
    }

    /// Smallest unused internal index
    pub fn fresh_index(&self) -> i32 {
        self.indices().into_iter().filter(|i| *i < 0).min().unwrap_or(0) - 1
    }

    pub fn map_indices(&self, f: impl Fn(i32) -> i32) -> ColorString {
        ColorString {
            objects: self.objects.iter().map(|o| o.map_indices(&f)).collect(),
            ..self.clone()
        }
    }

    /// Check the contraction structure: no index is zero and every internal
    /// index appears exactly twice
    pub fn validate(&self) -> CoreResult<()> {
        for obj in &self.objects {
            let idx = obj.indices();
            if idx.contains(&0) {
                return Err(CoreError::ColorSyntax(format!(
                    "index 0 is not allowed in {}",
                    obj
                )));
            }
        }
        for (idx, count) in self.index_counts() {
            if idx < 0 && count != 2 {
                return Err(CoreError::ColorSyntax(format!(
                    "internal index {} appears {} times in {}",
                    idx, count, self
                )));
            }
        }
        Ok(())
    }

    /// Complex conjugate of the whole string
    pub fn conjugate(&self) -> ColorString {
        ColorString {
            coeff: if self.imaginary { -self.coeff } else { self.coeff },
            imaginary: self.imaginary,
            nc_power: self.nc_power,
            objects: self.objects.iter().map(|o| o.conjugate()).collect(),
        }
    }
}

impl Default for ColorString {
    fn default() -> Self {
        Self::one()
    }
}

impl fmt::Display for ColorString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factors: Vec<String> = Vec::new();
        if !self.coeff.is_one() || (self.objects.is_empty() && !self.imaginary && self.nc_power == 0)
        {
            if self.coeff.is_integer() {
                factors.push(self.coeff.to_integer().to_string());
            } else {
                let sign = if self.coeff.is_negative() { "-" } else { "" };
                factors.push(format!(
                    "{}{}/{}",
                    sign,
                    self.coeff.numer().abs(),
                    self.coeff.denom()
                ));
            }
        }
        if self.imaginary {
            factors.push("I".to_string());
        }
        if self.nc_power != 0 {
            factors.push(format!("Nc({})", self.nc_power));
        }
        factors.extend(self.objects.iter().map(|o| o.to_string()));
        write!(f, "{}", factors.join("*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_multiply_imaginary() {
        let i = ColorCoefficient {
            coeff: Rational64::one(),
            imaginary: true,
            nc_power: 1,
        };
        let sq = i.multiply(&i);
        assert_eq!(sq.coeff, Rational64::from_integer(-1));
        assert!(!sq.imaginary);
        assert_eq!(sq.nc_power, 2);
        assert_eq!(sq.evaluate(3), ColorValue::real(Rational64::from_integer(-9)));
    }

    #[test]
    fn test_validate_rejects_dangling_index() {
        let cs = ColorString::from_objects(vec![ColorObject::t(vec![-1], 1, 2)]);
        assert!(matches!(cs.validate(), Err(CoreError::ColorSyntax(_))));
    }

    #[test]
    fn test_display() {
        let cs = ColorString::from_objects(vec![
            ColorObject::t(vec![3], 2, 1),
            ColorObject::F(1, 2, -1),
        ])
        .scale(Rational64::new(-1, 2));
        assert_eq!(cs.to_string(), "-1/2*T(3,2,1)*f(1,2,-1)");
        assert_eq!(ColorString::one().to_string(), "1");
    }
}
