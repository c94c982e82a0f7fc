//! [`Filter`] – one node of the evaluation graph.
//!
//! A filter owns its [`FilterInput`] (and through it every upstream filter)
//! and a [`FilterOutput`].  What it computes is delegated to a
//! [`FilterBehavior`]; the filter itself only runs the update protocol:
//!
//! 1. update the input; on failure clear the output and report the error;
//! 2. let the behaviour turn row deltas into output deltas through an
//!    [`OutputWriter`]; on failure clear the output and report the error;
//! 3. commit the input's row epoch.
//!
//! The output epoch is committed by whoever consumes it: the downstream
//! [`FilterInput`] or the command mirroring results.

use std::collections::HashMap;

use svs_types::SvsError;
use tracing::debug;

use crate::change_tracking::{ChangeTrackingList, ElemId, SharedListener};
use crate::input::FilterInput;
use crate::params::FilterParams;
use crate::value::{FilterValue, Value};

/// The values a filter produces.
pub type FilterOutput = ChangeTrackingList<FilterValue>;

/// The computation plugged into a [`Filter`].
pub trait FilterBehavior {
    /// Filter type name, used in logs.
    fn name(&self) -> &str;

    /// Turn the input's current row deltas into output deltas.
    fn update_outputs(
        &mut self,
        input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError>;

    /// Forget per-row state after the output has been cleared.
    fn reset(&mut self) {}
}

/// Write access to a filter's output that also records which input row
/// each output value came from.
pub struct OutputWriter<'a> {
    output: &'a mut FilterOutput,
    origins: &'a mut HashMap<ElemId, ElemId>,
}

impl OutputWriter<'_> {
    /// Add a value, remembering the input row it was computed from.
    pub fn add(&mut self, value: FilterValue, origin: Option<ElemId>) -> ElemId {
        let id = self.output.add(value);
        if let Some(row) = origin {
            self.origins.insert(id, row);
        }
        id
    }

    pub fn remove(&mut self, id: ElemId) {
        self.origins.remove(&id);
        self.output.remove(id);
    }

    pub fn change(&mut self, id: ElemId) {
        self.output.change(id);
    }

    /// Replace the payload of `id`, marking it changed when it differs.
    pub fn set(&mut self, id: ElemId, value: impl Into<Value>) -> bool {
        let differs = match self.output.get_mut(id) {
            Some(v) => v.set(value),
            None => false,
        };
        if differs {
            self.output.change(id);
        }
        differs
    }

    pub fn get(&self, id: ElemId) -> Option<&FilterValue> {
        self.output.get(id)
    }

    pub fn output(&self) -> &FilterOutput {
        self.output
    }
}

/// A node of the evaluation graph.  See the module docs.
pub struct Filter {
    input: FilterInput,
    output: FilterOutput,
    /// Output value → input row it was computed from.
    origins: HashMap<ElemId, ElemId>,
    behavior: Box<dyn FilterBehavior>,
    status: String,
}

impl Filter {
    pub fn new(input: FilterInput, behavior: Box<dyn FilterBehavior>) -> Self {
        Self {
            input,
            output: FilterOutput::new(),
            origins: HashMap::new(),
            behavior,
            status: String::new(),
        }
    }

    /// Bring the output up to date with the input.
    ///
    /// # Errors
    ///
    /// Whatever error made the input or the behaviour fail.  The output is
    /// empty afterwards and every input row will be recomputed next time.
    pub fn update(&mut self) -> Result<(), SvsError> {
        if let Err(e) = self.input.update() {
            self.fail(&e);
            return Err(e);
        }

        let mut writer = OutputWriter {
            output: &mut self.output,
            origins: &mut self.origins,
        };
        if let Err(e) = self.behavior.update_outputs(&self.input, &mut writer) {
            self.fail(&e);
            return Err(e);
        }

        self.input.clear_changes();
        self.status = "success".to_string();
        Ok(())
    }

    fn fail(&mut self, e: &SvsError) {
        debug!(filter = self.behavior.name(), error = %e, "filter update failed");
        self.status = e.to_string();
        self.output.clear();
        self.origins.clear();
        self.input.reset();
        self.behavior.reset();
    }

    pub fn output(&self) -> &FilterOutput {
        &self.output
    }

    /// Direct access to the output.
    ///
    /// Consumers use it to commit the output epoch.  Source filters (see
    /// [`crate::builtin::source_filter`]) are fed through it.
    pub fn output_mut(&mut self) -> &mut FilterOutput {
        &mut self.output
    }

    pub fn input(&self) -> &FilterInput {
        &self.input
    }

    /// Mutable access to the upstream filter registered at `index`.
    pub fn upstream_mut(&mut self, index: usize) -> Option<&mut Filter> {
        self.input.upstream_mut(index)
    }

    /// Id of the input row an output value was computed from.
    pub fn output_origin(&self, output: ElemId) -> Option<ElemId> {
        self.origins.get(&output).copied()
    }

    /// The input row an output value was computed from, if any.
    pub fn output_params(&self, output: ElemId) -> Option<&FilterParams> {
        let row = self.origins.get(&output)?;
        self.input.rows().get(*row)
    }

    /// Observe row-level changes of this filter's input.
    pub fn listen_for_input(&mut self, listener: SharedListener<FilterParams>) {
        self.input.listen(listener);
    }

    pub fn unlisten_for_input(&mut self, listener: &SharedListener<FilterParams>) {
        self.input.unlisten(listener);
    }

    /// `"success"` after a good update, the error text after a failed one,
    /// empty before the first update.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn type_name(&self) -> &str {
        self.behavior.name()
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("type", &self.behavior.name())
            .field("input", &self.input.strategy_name())
            .field("outputs", &self.output.num_current())
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{const_filter, source_filter};

    /// Doubles the integer argument `a`.
    struct Double {
        row2out: HashMap<ElemId, ElemId>,
    }

    impl FilterBehavior for Double {
        fn name(&self) -> &str {
            "double"
        }

        fn update_outputs(
            &mut self,
            input: &FilterInput,
            out: &mut OutputWriter<'_>,
        ) -> Result<(), SvsError> {
            let rows = input.rows();
            for (row, _) in rows.removed() {
                if let Some(o) = self.row2out.remove(&row) {
                    out.remove(o);
                }
            }
            for (row, params) in rows.changed() {
                let v = params.typed::<i64>("a")?;
                if let Some(&o) = self.row2out.get(&row) {
                    out.set(o, v * 2);
                }
            }
            for (row, params) in rows.added() {
                let v = params.typed::<i64>("a")?;
                let o = out.add(FilterValue::from(v * 2), Some(row));
                self.row2out.insert(row, o);
            }
            Ok(())
        }

        fn reset(&mut self) {
            self.row2out.clear();
        }
    }

    fn double_of(upstream: Filter) -> Filter {
        let mut input = FilterInput::concat();
        input.add_param("a", upstream);
        Filter::new(
            input,
            Box::new(Double {
                row2out: HashMap::new(),
            }),
        )
    }

    #[test]
    fn update_maps_rows_to_outputs() {
        let mut f = double_of(const_filter(FilterValue::from(21_i64)));
        f.update().unwrap();
        assert_eq!(f.status(), "success");
        let (id, v) = f.output().get_current(0);
        assert_eq!(v.get::<i64>(), Some(42));
        let params = f.output_params(id).unwrap();
        assert_eq!(params.typed::<i64>("a"), Ok(21));
    }

    #[test]
    fn upstream_change_propagates_as_output_change() {
        let mut f = double_of(source_filter());
        let src = f.upstream_mut(0).unwrap().output_mut();
        let v = src.add(FilterValue::from(1_i64));
        f.update().unwrap();
        f.output_mut().clear_changes();

        let src = f.upstream_mut(0).unwrap().output_mut();
        src.get_mut(v).unwrap().set(5_i64);
        src.change(v);
        f.update().unwrap();

        assert_eq!(f.output().num_changed(), 1);
        let (_, changed) = f.output().get_changed(0);
        assert_eq!(changed.get::<i64>(), Some(10));
    }

    #[test]
    fn type_mismatch_clears_output_and_recovers() {
        let mut f = double_of(source_filter());
        let src = f.upstream_mut(0).unwrap().output_mut();
        src.add(FilterValue::from(1_i64));
        let bad = src.add(FilterValue::from("oops"));
        let err = f.update().unwrap_err();
        assert!(matches!(err, SvsError::TypeMismatch { .. }));
        assert!(f.output().is_empty());
        assert!(f.status().contains("wrong type"));

        f.upstream_mut(0).unwrap().output_mut().remove(bad);
        f.update().unwrap();
        assert_eq!(f.output().num_current(), 1);
        assert_eq!(f.output().get_current(0).1.get::<i64>(), Some(2));
    }
}
