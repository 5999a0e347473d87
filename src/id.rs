//! ID types for feyncore
//!
//! Particles are identified by signed PDG codes, interactions by the integer id
//! the model assigns them. Momentum routing inside a diagram is tracked with
//! [`LegSet`], a bitmask over external leg numbers: the momentum carried by an
//! internal line is the sum of the external momenta whose bits are set.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Signed PDG code; antiparticles carry the negated code
pub type PdgCode = i32;

/// Interaction id as assigned by the model (0 is reserved for the identity vertex)
pub type InteractionId = u32;

/// Leg number within a diagram (external legs are numbered from 1)
pub type LegNumber = u32;

/// Largest number of external legs a [`LegSet`] can address
pub const MAX_LEGS: u32 = 64;

/// Set of external leg numbers, stored as a bitmask (bit `n-1` for leg `n`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegSet(u64);

impl LegSet {
    pub const EMPTY: LegSet = LegSet(0);

    /// The set containing a single external leg
    pub fn single(number: LegNumber) -> Self {
        debug_assert!(number >= 1 && number <= MAX_LEGS);
        LegSet(1u64 << (number - 1))
    }

    /// The set `{1, ..., n}`
    pub fn first(n: u32) -> Self {
        if n >= MAX_LEGS {
            LegSet(u64::MAX)
        } else {
            LegSet((1u64 << n) - 1)
        }
    }

    pub fn from_bits(bits: u64) -> Self {
        LegSet(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(self, number: LegNumber) -> bool {
        number >= 1 && number <= MAX_LEGS && self.0 & (1u64 << (number - 1)) != 0
    }

    pub fn is_disjoint(self, other: LegSet) -> bool {
        self.0 & other.0 == 0
    }

    pub fn is_subset(self, other: LegSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn union(self, other: LegSet) -> LegSet {
        LegSet(self.0 | other.0)
    }

    pub fn intersection(self, other: LegSet) -> LegSet {
        LegSet(self.0 & other.0)
    }

    pub fn difference(self, other: LegSet) -> LegSet {
        LegSet(self.0 & !other.0)
    }

    pub fn insert(&mut self, number: LegNumber) {
        self.0 |= LegSet::single(number).0;
    }

    pub fn remove(&mut self, number: LegNumber) {
        self.0 &= !LegSet::single(number).0;
    }

    /// Smallest leg number in the set
    pub fn min_leg(self) -> Option<LegNumber> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() + 1)
        }
    }

    /// Leg numbers in ascending order
    pub fn iter(self) -> impl Iterator<Item = LegNumber> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let n = bits.trailing_zeros();
            bits &= bits - 1;
            Some(n + 1)
        })
    }

    /// Rewrite leg numbers through `map` (numbers missing from the map are dropped)
    pub fn remap(self, map: impl Fn(LegNumber) -> Option<LegNumber>) -> LegSet {
        self.iter()
            .filter_map(map)
            .fold(LegSet::EMPTY, |acc, n| acc.union(LegSet::single(n)))
    }
}

impl BitOr for LegSet {
    type Output = LegSet;
    fn bitor(self, rhs: LegSet) -> LegSet {
        self.union(rhs)
    }
}

impl BitAnd for LegSet {
    type Output = LegSet;
    fn bitand(self, rhs: LegSet) -> LegSet {
        self.intersection(rhs)
    }
}

impl FromIterator<LegNumber> for LegSet {
    fn from_iter<I: IntoIterator<Item = LegNumber>>(iter: I) -> Self {
        iter.into_iter()
            .fold(LegSet::EMPTY, |acc, n| acc.union(LegSet::single(n)))
    }
}

impl fmt::Display for LegSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self.iter().map(|n| n.to_string()).collect();
        write!(f, "{{{}}}", numbers.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legset_basic_ops() {
        let a: LegSet = [1, 3].into_iter().collect();
        let b = LegSet::single(2);
        assert_eq!(a.len(), 2);
        assert!(a.contains(3));
        assert!(!a.contains(2));
        assert!(a.is_disjoint(b));
        assert_eq!((a | b).len(), 3);
        assert_eq!((a | b).min_leg(), Some(1));
        assert_eq!((a | b).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(LegSet::first(3), a | b);
        assert_eq!(a.to_string(), "{1,3}");
    }

    #[test]
    fn test_legset_remap() {
        let a: LegSet = [2, 4].into_iter().collect();
        let shifted = a.remap(|n| if n == 4 { None } else { Some(n + 10) });
        assert_eq!(shifted.iter().collect::<Vec<_>>(), vec![12]);
    }
}
