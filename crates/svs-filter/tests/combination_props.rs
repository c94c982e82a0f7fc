use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use svs_filter::combination::{CombinationGenerator, permutations};

fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

#[test]
fn pool_of_four_pairs() {
    let pool = vec!['a', 'b', 'c', 'd'];

    let unordered: Vec<Vec<char>> = CombinationGenerator::new(pool.clone(), 2, false, false).collect();
    let sets: HashSet<BTreeSet<char>> = unordered.iter().map(|t| t.iter().copied().collect()).collect();
    assert_eq!(unordered.len(), 6);
    assert_eq!(sets.len(), 6);
    assert!(sets.iter().all(|s| s.len() == 2));

    let ordered: Vec<Vec<char>> = CombinationGenerator::new(pool.clone(), 2, true, false).collect();
    assert_eq!(ordered.len(), 12);
    assert_eq!(ordered.iter().collect::<HashSet<_>>().len(), 12);
    assert!(ordered.iter().all(|t| t[0] != t[1]));

    let multisets: Vec<Vec<char>> = CombinationGenerator::new(pool, 2, false, true).collect();
    let mut sorted: Vec<Vec<char>> = multisets
        .iter()
        .map(|t| {
            let mut t = t.clone();
            t.sort();
            t
        })
        .collect();
    sorted.sort();
    sorted.dedup();
    assert_eq!(multisets.len(), 10);
    assert_eq!(sorted.len(), 10);
}

proptest! {
    #[test]
    fn counts_match_closed_forms(m in 0usize..7, n in 0usize..4) {
        let pool: Vec<usize> = (0..m).collect();
        let count = |ordered, repeat| {
            CombinationGenerator::new(pool.clone(), n, ordered, repeat).count()
        };

        let expected_unordered = if n == 0 { 1 } else { binomial(m, n) };
        let expected_multiset = if n == 0 { 1 } else { binomial(m + n - 1, n) };
        let expected_ordered: usize = if n == 0 { 1 } else if m < n { 0 } else { (m - n + 1..=m).product() };
        let expected_power = m.pow(n as u32);

        prop_assert_eq!(count(false, false), expected_unordered);
        prop_assert_eq!(count(false, true), expected_multiset);
        prop_assert_eq!(count(true, false), expected_ordered);
        prop_assert_eq!(count(true, true), expected_power);
    }

    #[test]
    fn permutations_are_distinct(len in 0usize..5) {
        let items: Vec<usize> = (0..len).collect();
        let perms = permutations(&items);
        let factorial: usize = (1..=len).product();
        prop_assert_eq!(perms.len(), factorial);
        prop_assert_eq!(perms.iter().collect::<HashSet<_>>().len(), factorial);
    }
}
