//! [`ConcatCombine`] – every upstream value becomes its own row.
//!
//! No joining happens: a value from upstream `a` yields the row
//! `{ a: value }`.  A reverse map from upstream value to row turns upstream
//! removals and changes into row removals and changes.

use std::collections::HashMap;

use crate::change_tracking::{ChangeTrackingList, ElemId};
use crate::input::{CombineStrategy, InputSlot};
use crate::params::FilterParams;

#[derive(Debug, Default)]
pub struct ConcatCombine {
    val2row: HashMap<ElemId, ElemId>,
}

impl CombineStrategy for ConcatCombine {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn combine(&mut self, inputs: &[InputSlot], rows: &mut ChangeTrackingList<FilterParams>) {
        for slot in inputs {
            let out = slot.filter.output();

            for (id, _) in out.removed() {
                if let Some(row) = self.val2row.remove(&id) {
                    rows.remove(row);
                }
            }

            for (id, value) in out.changed() {
                if let Some(&row) = self.val2row.get(&id) {
                    if let Some(params) = rows.get_mut(row) {
                        params.refresh(id, value);
                    }
                    rows.change(row);
                }
            }

            for (id, value) in out.added() {
                let mut params = FilterParams::new();
                params.push(&slot.name, Some(id), value.clone());
                let row = rows.add(params);
                self.val2row.insert(id, row);
            }
        }
    }

    fn clear(&mut self) {
        self.val2row.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::builtin::const_filter;
    use crate::input::FilterInput;
    use crate::value::FilterValue;

    #[test]
    fn one_row_per_upstream_value() {
        let mut input = FilterInput::concat();
        input.add_param("a", const_filter(FilterValue::from(1_i64)));
        input.add_param("b", const_filter(FilterValue::from("two")));
        input.update().unwrap();

        let rows = input.rows();
        assert_eq!(rows.num_current(), 2);
        let (_, first) = rows.get_current(0);
        let (_, second) = rows.get_current(1);
        assert_eq!(first.len(), 1);
        assert_eq!(first.typed::<i64>("a"), Ok(1));
        assert_eq!(second.typed::<String>("b"), Ok("two".to_string()));
    }

    #[test]
    fn second_update_adds_nothing_new() {
        let mut input = FilterInput::concat();
        input.add_param("a", const_filter(FilterValue::from(1_i64)));
        input.update().unwrap();
        input.clear_changes();
        input.update().unwrap();
        assert_eq!(input.rows().num_current(), 1);
        assert_eq!(input.rows().added().count(), 0);
    }
}
