//! [`FilterInput`] – turns upstream filter outputs into parameter rows.
//!
//! A filter input owns a table of named upstream [`Filter`]s and a
//! [`CombineStrategy`] deciding how their output values are joined into
//! [`FilterParams`] rows:
//!
//! | Strategy | Rows produced |
//! |---|---|
//! | [`NullCombine`] | none (filters without parameters) |
//! | [`ConcatCombine`][crate::concat::ConcatCombine] | one single-argument row per upstream value |
//! | [`ProductCombine`][crate::product::ProductCombine] | the Cartesian product of all upstream outputs |
//!
//! # Update protocol
//!
//! 1. Every upstream filter is updated, in registration order.  The first
//!    failure clears this input and is returned.
//! 2. The strategy reads every upstream's added/removed/changed views and
//!    applies the resulting row deltas.
//! 3. Only then is every upstream output committed, so no strategy ever
//!    sees a partially consumed delta.

use svs_types::SvsError;
use tracing::debug;

use crate::change_tracking::{ChangeTrackingList, SharedListener};
use crate::concat::ConcatCombine;
use crate::filter::Filter;
use crate::params::FilterParams;
use crate::product::ProductCombine;

/// One named upstream filter.
pub struct InputSlot {
    pub name: String,
    pub filter: Filter,
}

/// Joins upstream outputs into parameter rows.
///
/// Implementations keep whatever reverse index they need to translate an
/// upstream removal or change into row removals or changes.
pub trait CombineStrategy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Apply the current upstream deltas to `rows`.
    fn combine(&mut self, inputs: &[InputSlot], rows: &mut ChangeTrackingList<FilterParams>);

    /// Forget all bookkeeping.  Called when the rows are cleared.
    fn clear(&mut self) {}
}

/// Produces no rows.
#[derive(Debug, Default)]
pub struct NullCombine;

impl CombineStrategy for NullCombine {
    fn name(&self) -> &'static str {
        "null"
    }

    fn combine(&mut self, _inputs: &[InputSlot], _rows: &mut ChangeTrackingList<FilterParams>) {}
}

/// Upstream filters plus the rows combined from their outputs.
pub struct FilterInput {
    rows: ChangeTrackingList<FilterParams>,
    inputs: Vec<InputSlot>,
    strategy: Box<dyn CombineStrategy>,
}

impl FilterInput {
    pub fn with_strategy(strategy: Box<dyn CombineStrategy>) -> Self {
        Self {
            rows: ChangeTrackingList::new(),
            inputs: Vec::new(),
            strategy,
        }
    }

    pub fn null() -> Self {
        Self::with_strategy(Box::new(NullCombine))
    }

    pub fn concat() -> Self {
        Self::with_strategy(Box::new(ConcatCombine::default()))
    }

    pub fn product() -> Self {
        Self::with_strategy(Box::new(ProductCombine::default()))
    }

    /// Register an upstream filter under `name`, taking ownership of it.
    pub fn add_param(&mut self, name: &str, filter: Filter) {
        self.inputs.push(InputSlot {
            name: name.to_string(),
            filter,
        });
    }

    /// Update upstreams and recombine.  See the module docs.
    pub fn update(&mut self) -> Result<(), SvsError> {
        let mut failure = None;
        for slot in &mut self.inputs {
            if let Err(e) = slot.filter.update() {
                debug!(param = %slot.name, error = %e, "upstream filter failed");
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            self.clear();
            return Err(e);
        }

        self.strategy.combine(&self.inputs, &mut self.rows);
        debug!(
            strategy = self.strategy.name(),
            rows = self.rows.num_current(),
            added = self.rows.num_current() - self.rows.first_added(),
            removed = self.rows.num_removed(),
            changed = self.rows.num_changed(),
            "filter input combined"
        );

        for slot in &mut self.inputs {
            slot.filter.output_mut().clear_changes();
        }
        Ok(())
    }

    /// Drop every row and force every upstream output to be seen as newly
    /// added on the next update.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.strategy.clear();
        for slot in &mut self.inputs {
            slot.filter.output_mut().reset();
        }
    }

    /// Commit the row epoch.
    pub fn clear_changes(&mut self) {
        self.rows.clear_changes();
    }

    /// Mark every row as added again.
    pub fn reset(&mut self) {
        self.rows.reset();
    }

    pub fn rows(&self) -> &ChangeTrackingList<FilterParams> {
        &self.rows
    }

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn upstream_mut(&mut self, index: usize) -> Option<&mut Filter> {
        self.inputs.get_mut(index).map(|s| &mut s.filter)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn listen(&mut self, listener: SharedListener<FilterParams>) {
        self.rows.listen(listener);
    }

    pub fn unlisten(&mut self, listener: &SharedListener<FilterParams>) {
        self.rows.unlisten(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::const_filter;
    use crate::filter::Filter;
    use crate::value::FilterValue;

    #[test]
    fn null_input_produces_nothing() {
        let mut input = FilterInput::null();
        input.add_param("a", const_filter(FilterValue::from(1_i64)));
        input.update().unwrap();
        assert!(input.rows().is_empty());
    }

    #[test]
    fn upstreams_committed_after_combine() {
        let mut input = FilterInput::concat();
        input.add_param("a", const_filter(FilterValue::from(1_i64)));
        input.update().unwrap();
        let upstream: &Filter = &input.inputs()[0].filter;
        assert_eq!(upstream.output().first_added(), 1);
        assert_eq!(input.rows().num_current(), 1);
    }

    #[test]
    fn clear_resets_upstreams() {
        let mut input = FilterInput::concat();
        input.add_param("a", const_filter(FilterValue::from(1_i64)));
        input.update().unwrap();
        input.clear();
        assert!(input.rows().is_empty());
        assert_eq!(input.inputs()[0].filter.output().first_added(), 0);

        input.update().unwrap();
        assert_eq!(input.rows().num_current(), 1);
    }
}
