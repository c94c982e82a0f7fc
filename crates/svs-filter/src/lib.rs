//! `svs-filter` – incremental filter evaluation for the spatial-visual
//! system.
//!
//! Queries about the scene are compiled into a tree of [`Filter`]s.  Each
//! cycle a filter only recomputes what its inputs reported as added,
//! removed or changed since the last cycle.
//!
//! # Modules
//!
//! - [`change_tracking`] – [`ChangeTrackingList`]: the delta-carrying list
//!   every filter input and output is built on.
//! - [`value`] – [`FilterValue`] and the closed [`Value`] payload enum.
//! - [`params`] – [`FilterParams`]: one row of named arguments.
//! - [`input`] – [`FilterInput`]: joins upstream outputs into rows using a
//!   [`concat`] or [`product`] strategy.
//! - [`filter`] – [`Filter`] and the [`FilterBehavior`] plug-in trait.
//! - [`builtin`] – the stock filters (`node`, `position`, `intersect`, …).
//! - [`table`] – [`FilterTable`]: filter registry and relation evaluation.
//! - [`combination`] – tuple enumeration for relation predicates.
//! - [`relation`] – time-interval relation tables.

pub mod builtin;
pub mod change_tracking;
pub mod combination;
pub mod concat;
pub mod filter;
pub mod input;
pub mod params;
pub mod product;
pub mod relation;
pub mod table;
pub mod value;

pub use change_tracking::{ChangeTrackingList, CtListListener, ElemId, SharedListener};
pub use filter::{Filter, FilterBehavior, FilterOutput, OutputWriter};
pub use input::{CombineStrategy, FilterInput, InputSlot};
pub use params::FilterParams;
pub use relation::{Relation, RelationTable};
pub use table::{FilterTable, FilterTableEntry};
pub use value::{FilterValue, NodeRef, Value};
