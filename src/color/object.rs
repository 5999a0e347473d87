//! Color tensors
//!
//! Index convention: positive indices are external (they label legs of an
//! interaction or a diagram), negative indices are internal and contracted.
//! In `T(a..., i, j)` the index `i` belongs to a triplet and `j` to an
//! antitriplet, so `T(A, i, x) T(B, x, j)` chains into `T(A, B, i, j)`.

use std::fmt;

/// One SU(N) color tensor
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorObject {
    /// Product of fundamental generators `(T^a1 ... T^an)_{ij}`
    T { adjoint: Vec<i32>, i: i32, j: i32 },
    /// Structure constants
    F(i32, i32, i32),
    /// Symmetric constants
    D(i32, i32, i32),
    /// Trace of a product of generators
    Tr(Vec<i32>),
    Epsilon(i32, i32, i32),
    EpsilonBar(i32, i32, i32),
    /// Fundamental Kronecker delta
    Kronecker(i32, i32),
    /// Sextet to antitriplet-pair Clebsch
    K6 { m: i32, i: i32, j: i32 },
    K6Bar { m: i32, i: i32, j: i32 },
    /// Sextet generator
    T6 { a: i32, m: i32, n: i32 },
}

impl ColorObject {
    pub fn t(adjoint: Vec<i32>, i: i32, j: i32) -> Self {
        ColorObject::T { adjoint, i, j }
    }

    /// UFO name of this tensor
    pub fn name(&self) -> &'static str {
        match self {
            ColorObject::T { .. } => "T",
            ColorObject::F(..) => "f",
            ColorObject::D(..) => "d",
            ColorObject::Tr(_) => "Tr",
            ColorObject::Epsilon(..) => "Epsilon",
            ColorObject::EpsilonBar(..) => "EpsilonBar",
            ColorObject::Kronecker(..) => "Identity",
            ColorObject::K6 { .. } => "K6",
            ColorObject::K6Bar { .. } => "K6Bar",
            ColorObject::T6 { .. } => "T6",
        }
    }

    /// Indices in argument order
    pub fn indices(&self) -> Vec<i32> {
        match self {
            ColorObject::T { adjoint, i, j } => {
                let mut out = adjoint.clone();
                out.push(*i);
                out.push(*j);
                out
            }
            ColorObject::F(a, b, c)
            | ColorObject::D(a, b, c)
            | ColorObject::Epsilon(a, b, c)
            | ColorObject::EpsilonBar(a, b, c) => vec![*a, *b, *c],
            ColorObject::Tr(adjoint) => adjoint.clone(),
            ColorObject::Kronecker(i, j) => vec![*i, *j],
            ColorObject::K6 { m, i, j } | ColorObject::K6Bar { m, i, j } => vec![*m, *i, *j],
            ColorObject::T6 { a, m, n } => vec![*a, *m, *n],
        }
    }

    /// Rebuild the tensor from a new argument list (same arity as [`indices`](Self::indices))
    pub fn with_indices(&self, idx: &[i32]) -> Self {
        match self {
            ColorObject::T { adjoint, .. } => {
                let n = adjoint.len();
                ColorObject::T {
                    adjoint: idx[..n].to_vec(),
                    i: idx[n],
                    j: idx[n + 1],
                }
            }
            ColorObject::F(..) => ColorObject::F(idx[0], idx[1], idx[2]),
            ColorObject::D(..) => ColorObject::D(idx[0], idx[1], idx[2]),
            ColorObject::Epsilon(..) => ColorObject::Epsilon(idx[0], idx[1], idx[2]),
            ColorObject::EpsilonBar(..) => ColorObject::EpsilonBar(idx[0], idx[1], idx[2]),
            ColorObject::Tr(_) => ColorObject::Tr(idx.to_vec()),
            ColorObject::Kronecker(..) => ColorObject::Kronecker(idx[0], idx[1]),
            ColorObject::K6 { .. } => ColorObject::K6 {
                m: idx[0],
                i: idx[1],
                j: idx[2],
            },
            ColorObject::K6Bar { .. } => ColorObject::K6Bar {
                m: idx[0],
                i: idx[1],
                j: idx[2],
            },
            ColorObject::T6 { .. } => ColorObject::T6 {
                a: idx[0],
                m: idx[1],
                n: idx[2],
            },
        }
    }

    /// Apply an index substitution to every argument
    pub fn map_indices(&self, f: impl Fn(i32) -> i32) -> Self {
        let idx: Vec<i32> = self.indices().into_iter().map(f).collect();
        self.with_indices(&idx)
    }

    /// Complex conjugate (hermitian generators, conjugate representations)
    pub fn conjugate(&self) -> Self {
        match self {
            ColorObject::T { adjoint, i, j } => ColorObject::T {
                adjoint: adjoint.iter().rev().copied().collect(),
                i: *j,
                j: *i,
            },
            ColorObject::Tr(adjoint) => ColorObject::Tr(adjoint.iter().rev().copied().collect()),
            ColorObject::Epsilon(a, b, c) => ColorObject::EpsilonBar(*a, *b, *c),
            ColorObject::EpsilonBar(a, b, c) => ColorObject::Epsilon(*a, *b, *c),
            ColorObject::Kronecker(i, j) => ColorObject::Kronecker(*j, *i),
            ColorObject::K6 { m, i, j } => ColorObject::K6Bar { m: *m, i: *i, j: *j },
            ColorObject::K6Bar { m, i, j } => ColorObject::K6 { m: *m, i: *i, j: *j },
            ColorObject::T6 { a, m, n } => ColorObject::T6 { a: *a, m: *n, n: *m },
            ColorObject::F(..) | ColorObject::D(..) => self.clone(),
        }
    }
}

impl fmt::Display for ColorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.indices().iter().map(|i| i.to_string()).collect();
        write!(f, "{}({})", self.name(), args.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_indices_roundtrip() {
        let t = ColorObject::t(vec![1, -2], 3, 4);
        assert_eq!(t.indices(), vec![1, -2, 3, 4]);
        assert_eq!(t.with_indices(&t.indices()), t);
        assert_eq!(t.to_string(), "T(1,-2,3,4)");
    }

    #[test]
    fn test_conjugate_is_involution() {
        let objs = vec![
            ColorObject::t(vec![1, 2], 3, 4),
            ColorObject::Tr(vec![1, 2, 3]),
            ColorObject::Epsilon(1, 2, 3),
            ColorObject::K6 { m: 1, i: 2, j: 3 },
        ];
        for o in objs {
            assert_eq!(o.conjugate().conjugate(), o);
        }
    }
}
