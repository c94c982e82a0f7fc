//! [`FilterParams`] – one row of named arguments for a filter.

use svs_types::SvsError;

use crate::change_tracking::ElemId;
use crate::value::{FilterValue, FromValue};

/// One named argument.
///
/// `source` is the id of the upstream output value this argument mirrors,
/// or `None` for arguments built by hand.  Combination strategies use it to
/// find the rows an upstream change or removal affects.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub source: Option<ElemId>,
    pub value: FilterValue,
}

/// Ordered `(name, value)` pairs.  Names are not required to be unique;
/// lookups return the first match.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    entries: Vec<Param>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, source: Option<ElemId>, value: FilterValue) {
        self.entries.push(Param {
            name: name.to_string(),
            source,
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&Param> {
        self.entries.first()
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.entries.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Typed lookup of a required argument.
    ///
    /// # Errors
    ///
    /// [`SvsError::MissingParam`] when no argument is called `name`,
    /// [`SvsError::TypeMismatch`] when it holds something other than a `T`.
    pub fn typed<T: FromValue>(&self, name: &str) -> Result<T, SvsError> {
        let value = self
            .get(name)
            .ok_or_else(|| SvsError::MissingParam(name.to_string()))?;
        value.get::<T>().ok_or_else(|| SvsError::TypeMismatch {
            param: name.to_string(),
            expected: T::TYPE_NAME.to_string(),
        })
    }

    /// Ids of the upstream values this row was built from, in order.
    pub fn sources(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.entries.iter().filter_map(|p| p.source)
    }

    /// Overwrite every argument mirroring `source` with a fresh copy of
    /// `value`.  Returns whether any argument matched.
    pub fn refresh(&mut self, source: ElemId, value: &FilterValue) -> bool {
        let mut hit = false;
        for p in self.entries.iter_mut().filter(|p| p.source == Some(source)) {
            p.value = value.clone();
            hit = true;
        }
        hit
    }
}
