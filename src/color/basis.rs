//! Color basis, projection and color matrix
//!
//! A basis element is an irreducible product of tensors over the external
//! color indices of a process, in the canonical form produced by
//! [`simplify`]. Elements are interned in first-seen order.

use indexmap::IndexMap;

use super::object::ColorObject;
use super::simplify::simplify;
use super::string::{ColorCoefficient, ColorFactor, ColorString, ColorValue};
use crate::error::{CoreError, CoreResult};

/// Interned set of canonical color structures
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorBasis {
    elements: IndexMap<Vec<ColorObject>, usize>,
}

/// Offset used to move indices apart when contracting two basis elements
const RELABEL_OFFSET: i32 = 1000;

impl ColorBasis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Basis elements in interning order
    pub fn elements(&self) -> impl Iterator<Item = &[ColorObject]> {
        self.elements.keys().map(|k| k.as_slice())
    }

    pub fn index_of(&self, objects: &[ColorObject]) -> Option<usize> {
        self.elements.get(objects).copied()
    }

    /// Intern a structure, returning its index
    pub fn insert(&mut self, objects: Vec<ColorObject>) -> usize {
        let next = self.elements.len();
        *self.elements.entry(objects).or_insert(next)
    }

    /// Intern every structure of a simplified factor and return its coordinates
    pub fn extend_from_factor(&mut self, factor: &ColorFactor) -> Vec<(usize, ColorCoefficient)> {
        factor
            .iter()
            .map(|term| (self.insert(term.objects.clone()), term.coefficient()))
            .collect()
    }

    /// Coordinates of `cs` in this basis, keeping `Nc` symbolic
    ///
    /// Fails with `ColorSyntax` when a reduced term is not a basis element.
    pub fn project(&self, cs: &ColorString) -> CoreResult<Vec<(usize, ColorCoefficient)>> {
        simplify(cs)?
            .into_iter()
            .map(|term| {
                self.index_of(&term.objects)
                    .map(|idx| (idx, term.coefficient()))
                    .ok_or_else(|| {
                        CoreError::ColorSyntax(format!(
                            "structure {} is not in the color basis",
                            ColorString::from_objects(term.objects.clone())
                        ))
                    })
            })
            .collect()
    }

    /// `⟨B_i | B_j⟩` summed over all external colors, evaluated at `nc`
    pub fn color_matrix(&self, nc: i64) -> CoreResult<Vec<Vec<ColorValue>>> {
        let elements: Vec<&Vec<ColorObject>> = self.elements.keys().collect();
        let n = elements.len();
        let mut matrix = vec![vec![ColorValue::default(); n]; n];
        for i in 0..n {
            for j in i..n {
                let value = contract(elements[i], elements[j], nc)?;
                matrix[i][j] = value;
                matrix[j][i] = value.conj();
            }
        }
        Ok(matrix)
    }
}

/// Full contraction of `conj(left) * right`
fn contract(left: &[ColorObject], right: &[ColorObject], nc: i64) -> CoreResult<ColorValue> {
    let bra = ColorString::from_objects(left.to_vec())
        .conjugate()
        .map_indices(|i| {
            if i > 0 {
                -RELABEL_OFFSET - i
            } else {
                i - 2 * RELABEL_OFFSET
            }
        });
    let ket = ColorString::from_objects(right.to_vec()).map_indices(|i| {
        if i > 0 {
            -RELABEL_OFFSET - i
        } else {
            i - 3 * RELABEL_OFFSET
        }
    });
    let product = bra.multiply(&ket);
    let mut total = ColorValue::default();
    for term in simplify(&product)? {
        if !term.is_scalar() {
            return Err(CoreError::ColorSyntax(format!(
                "contraction left open indices in {}",
                term
            )));
        }
        total = total.add(term.coefficient().evaluate(nc));
    }
    Ok(total)
}

/// Dense coordinates of `cs` in `basis` at a numeric `nc`
pub fn to_canonical_basis(cs: &ColorString, basis: &ColorBasis, nc: i64) -> CoreResult<Vec<ColorValue>> {
    let mut dense = vec![ColorValue::default(); basis.len()];
    for (idx, coeff) in basis.project(cs)? {
        dense[idx] = dense[idx].add(coeff.evaluate(nc));
    }
    Ok(dense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Rational64;

    #[test]
    fn test_singlet_basis_matrix() {
        let mut basis = ColorBasis::new();
        basis.insert(vec![]);
        let m = basis.color_matrix(3).unwrap();
        assert_eq!(m, vec![vec![ColorValue::real(Rational64::from_integer(1))]]);
    }

    #[test]
    fn test_quark_pair_matrix() {
        // δ(1,2) δ(2,1) summed = Nc
        let mut basis = ColorBasis::new();
        basis.insert(vec![ColorObject::Kronecker(1, 2)]);
        let m = basis.color_matrix(3).unwrap();
        assert_eq!(m[0][0], ColorValue::real(Rational64::from_integer(3)));
    }

    #[test]
    fn test_project_unknown_structure_fails() {
        let basis = ColorBasis::new();
        let cs = ColorString::from_objects(vec![ColorObject::Kronecker(1, 2)]);
        assert!(matches!(basis.project(&cs), Err(CoreError::ColorSyntax(_))));
    }
}
