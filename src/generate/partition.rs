//! Combinatorial helpers: set partitions and cartesian products

use crate::id::LegSet;

/// Every partition of `set` into `min_blocks..=max_blocks` non-empty blocks
///
/// Blocks are ordered by their smallest element, and partitions come out
/// in a fixed order (restricted-growth enumeration).
pub fn set_partitions(set: LegSet, min_blocks: usize, max_blocks: usize) -> Vec<Vec<LegSet>> {
    let elements: Vec<u32> = set.iter().collect();
    let mut out = Vec::new();
    if elements.is_empty() || max_blocks == 0 {
        return out;
    }
    // Work stack of (next element index, blocks so far)
    let mut stack: Vec<(usize, Vec<LegSet>)> = vec![(1, vec![LegSet::single(elements[0])])];
    while let Some((next, blocks)) = stack.pop() {
        if next == elements.len() {
            if blocks.len() >= min_blocks {
                out.push(blocks);
            }
            continue;
        }
        let remaining = elements.len() - next;
        let e = elements[next];
        // Pushed in reverse so that the pop order matches restricted growth
        if blocks.len() < max_blocks {
            let mut with_new = blocks.clone();
            with_new.push(LegSet::single(e));
            stack.push((next + 1, with_new));
        }
        // Joining an existing block cannot reach `min_blocks` if too few elements remain
        if blocks.len() + remaining > min_blocks {
            for b in (0..blocks.len()).rev() {
                let mut joined = blocks.clone();
                joined[b].insert(e);
                stack.push((next + 1, joined));
            }
        }
    }
    out
}

/// Cartesian product of the given lists, first list varying slowest
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::with_capacity(out.len() * list.len());
        for prefix in &out {
            for item in list {
                let mut row = prefix.clone();
                row.push(item.clone());
                next.push(row);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[u32]) -> LegSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_partition_counts() {
        // Stirling numbers S(4,2) = 7, S(4,3) = 6
        let s = set(&[2, 3, 4, 5]);
        assert_eq!(set_partitions(s, 2, 2).len(), 7);
        assert_eq!(set_partitions(s, 3, 3).len(), 6);
        assert_eq!(set_partitions(s, 2, 3).len(), 13);
        assert_eq!(set_partitions(s, 1, 4).len(), 15);
    }

    #[test]
    fn test_partition_blocks_cover_set() {
        let s = set(&[1, 4, 6]);
        for p in set_partitions(s, 1, 3) {
            let union = p.iter().fold(LegSet::EMPTY, |acc, b| acc | *b);
            assert_eq!(union, s);
            let mins: Vec<u32> = p.iter().filter_map(|b| b.min_leg()).collect();
            let mut sorted = mins.clone();
            sorted.sort_unstable();
            assert_eq!(mins, sorted);
        }
    }

    #[test]
    fn test_first_partition_is_singletons_order() {
        let s = set(&[2, 3]);
        assert_eq!(set_partitions(s, 2, 2), vec![vec![set(&[2]), set(&[3])]]);
    }

    #[test]
    fn test_cartesian() {
        let p = cartesian_product(&[vec![1, 2], vec![3], vec![4, 5]]);
        assert_eq!(p.len(), 4);
        assert_eq!(p[0], vec![1, 3, 4]);
        assert_eq!(p[3], vec![2, 3, 5]);
        assert_eq!(cartesian_product::<u8>(&[]), vec![Vec::<u8>::new()]);
    }
}
