//! [`ProductCombine`] – incremental Cartesian product of upstream outputs.
//!
//! Rows are never recomputed wholesale.  Each cycle:
//!
//! 1. **Removals.** Every row containing a removed upstream value is
//!    removed, and the row is erased from the index entries of its other
//!    values.
//! 2. **Changes.** Every row containing a changed value gets a fresh copy of
//!    it and is marked changed.  Membership does not move.
//! 3. **Additions.** Only combinations containing at least one new value
//!    are generated.  For each upstream `i` the generator takes
//!
//!    ```text
//!    old(0) × … × old(i-1) × new(i) × all(i+1) × … × all(n-1)
//!    ```
//!
//!    and the union over `i` is exactly the set of new combinations, each
//!    produced once.
//!
//! The partition relies on upstream outputs being append-only: new values
//! sit after `first_added()`.  [`ChangeTrackingList`] has no other way to
//! insert, so the precondition holds for every filter output.

use std::collections::HashMap;
use std::ops::Range;

use crate::change_tracking::{ChangeTrackingList, ElemId};
use crate::filter::FilterOutput;
use crate::input::{CombineStrategy, InputSlot};
use crate::params::FilterParams;

#[derive(Debug, Default)]
pub struct ProductCombine {
    /// Upstream value → rows containing it.
    val2rows: HashMap<ElemId, Vec<ElemId>>,
}

impl ProductCombine {
    /// Rows currently indexed under the upstream value `value`.
    pub fn rows_containing(&self, value: ElemId) -> &[ElemId] {
        self.val2rows.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of upstream values with at least one indexed row.
    pub fn indexed_values(&self) -> usize {
        self.val2rows.len()
    }

    /// Erase `row` from the index entry of every member except `except`.
    fn erase_param_set(&mut self, row: ElemId, members: &[ElemId], except: ElemId) {
        for member in members.iter().filter(|m| **m != except) {
            if let Some(list) = self.val2rows.get_mut(member) {
                list.retain(|r| *r != row);
                if list.is_empty() {
                    self.val2rows.remove(member);
                }
            }
        }
    }

    fn gen_new_combinations(
        &mut self,
        inputs: &[InputSlot],
        rows: &mut ChangeTrackingList<FilterParams>,
    ) {
        let outputs: Vec<&FilterOutput> = inputs.iter().map(|s| s.filter.output()).collect();
        let n = outputs.len();

        for i in 0..n {
            let ranges: Vec<Range<usize>> = outputs
                .iter()
                .enumerate()
                .map(|(j, out)| {
                    if j < i {
                        0..out.first_added()
                    } else if j == i {
                        out.first_added()..out.num_current()
                    } else {
                        0..out.num_current()
                    }
                })
                .collect();
            if ranges.iter().any(|r| r.is_empty()) {
                continue;
            }

            let mut idx: Vec<usize> = ranges.iter().map(|r| r.start).collect();
            loop {
                let mut params = FilterParams::new();
                let mut members = Vec::with_capacity(n);
                for (j, out) in outputs.iter().enumerate() {
                    let (id, value) = out.get_current(idx[j]);
                    params.push(&inputs[j].name, Some(id), value.clone());
                    members.push(id);
                }
                let row = rows.add(params);
                for m in members {
                    self.val2rows.entry(m).or_default().push(row);
                }

                if !advance(&mut idx, &ranges) {
                    break;
                }
            }
        }
    }
}

/// Odometer step over `ranges`, last position fastest.  Returns `false`
/// once every combination has been visited.
fn advance(idx: &mut [usize], ranges: &[Range<usize>]) -> bool {
    for k in (0..idx.len()).rev() {
        idx[k] += 1;
        if idx[k] < ranges[k].end {
            return true;
        }
        idx[k] = ranges[k].start;
    }
    false
}

impl CombineStrategy for ProductCombine {
    fn name(&self) -> &'static str {
        "product"
    }

    fn combine(&mut self, inputs: &[InputSlot], rows: &mut ChangeTrackingList<FilterParams>) {
        for slot in inputs {
            for (id, _) in slot.filter.output().removed() {
                let Some(affected) = self.val2rows.remove(&id) else {
                    continue;
                };
                for row in affected {
                    let members: Vec<ElemId> = rows
                        .get(row)
                        .map(|p| p.sources().collect())
                        .unwrap_or_default();
                    self.erase_param_set(row, &members, id);
                    rows.remove(row);
                }
            }
        }

        for slot in inputs {
            for (id, value) in slot.filter.output().changed() {
                let Some(affected) = self.val2rows.get(&id) else {
                    continue;
                };
                for &row in affected {
                    if let Some(params) = rows.get_mut(row) {
                        params.refresh(id, value);
                    }
                    rows.change(row);
                }
            }
        }

        self.gen_new_combinations(inputs, rows);
    }

    fn clear(&mut self) {
        self.val2rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_every_tuple_once() {
        let ranges = [0..2, 1..3];
        let mut idx = vec![0, 1];
        let mut seen = vec![idx.clone()];
        while advance(&mut idx, &ranges) {
            seen.push(idx.clone());
        }
        assert_eq!(seen, [[0, 1], [0, 2], [1, 1], [1, 2]]);
    }

    #[test]
    fn advance_single_position() {
        let ranges = [3..4];
        let mut idx = vec![3];
        assert!(!advance(&mut idx, &ranges));
        assert_eq!(idx, [3]);
    }
}
