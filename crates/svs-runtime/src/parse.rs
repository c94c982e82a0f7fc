//! Filter specs in working memory → [`Filter`] trees.
//!
//! A spec is either a constant, which becomes a `const` filter, or an
//! identifier:
//!
//! ```text
//! (F1 ^type intersect_select
//!     ^a A1            (A1 ^type node ^id cup)
//!     ^b B1)           (B1 ^type node ^id table)
//! ```
//!
//! `^type` names the filter, `^input-type concat` asks for a concatenating
//! input instead of the default Cartesian product (any other value keeps the
//! product), `^status` and `^result`
//! belong to the command and are ignored, and every other attribute is a
//! parameter whose value is parsed recursively.  `type combine` is handled
//! here and yields a pass-through over a concatenating input.

use svs_filter::builtin::{const_filter, passthru_filter};
use svs_filter::{Filter, FilterInput, FilterTable, FilterValue};
use svs_types::SvsError;
use tracing::debug;

use crate::wm::{Symbol, WorkingMemory};

/// Attributes owned by the command rather than the spec.
pub const RESERVED_ATTRS: [&str; 2] = ["status", "result"];

enum InputKind {
    Product,
    Concat,
}

/// Build the filter described by `spec`.
///
/// # Errors
///
/// [`SvsError::FilterSyntax`] for malformed specs and
/// [`SvsError::UnknownFilterType`] for types the table cannot build.  Every
/// partially built filter is dropped before returning.
pub fn parse_filter_spec(
    wm: &WorkingMemory,
    spec: &Symbol,
    table: &FilterTable,
) -> Result<Filter, SvsError> {
    let root = match spec {
        Symbol::Int(i) => return Ok(const_filter(FilterValue::from(*i))),
        Symbol::Float(f) => return Ok(const_filter(FilterValue::from(*f))),
        Symbol::Str(s) => return Ok(const_filter(FilterValue::from(s.as_str()))),
        Symbol::Id(id) => *id,
    };
    if !wm.exists(root) {
        return Err(SvsError::FilterSyntax(format!("{root} does not exist")));
    }

    let mut filter_type = None;
    let mut input_kind = None;
    let mut params = Vec::new();

    for w in wm.children(root) {
        match w.attr.as_str() {
            "type" => {
                let t = w.value.as_str().ok_or_else(|| {
                    SvsError::FilterSyntax(format!("{root} ^type must be a string"))
                })?;
                if filter_type.replace(t).is_some() {
                    return Err(SvsError::FilterSyntax(format!("{root} has two ^type")));
                }
            }
            "input-type" => {
                input_kind = Some(match w.value.as_str() {
                    Some("concat") => InputKind::Concat,
                    Some("product") => InputKind::Product,
                    _ => {
                        debug!(root = %root, value = %w.value, "unrecognised ^input-type, using product");
                        InputKind::Product
                    }
                });
            }
            a if RESERVED_ATTRS.contains(&a) => {}
            name => params.push((name, &w.value)),
        }
    }

    let filter_type =
        filter_type.ok_or_else(|| SvsError::FilterSyntax(format!("{root} has no ^type")))?;

    let mut input = if filter_type == "combine" {
        FilterInput::concat()
    } else {
        match input_kind {
            Some(InputKind::Concat) => FilterInput::concat(),
            Some(InputKind::Product) => FilterInput::product(),
            None if params.is_empty() => FilterInput::null(),
            None => FilterInput::product(),
        }
    };
    for (name, value) in params {
        input.add_param(name, parse_filter_spec(wm, value, table)?);
    }

    if filter_type == "combine" {
        return Ok(passthru_filter(input));
    }
    table
        .make_filter(filter_type, input)
        .ok_or_else(|| SvsError::UnknownFilterType(filter_type.to_string()))
}
