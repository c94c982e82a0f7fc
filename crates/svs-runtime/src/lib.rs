//! `svs-runtime` – connects the filter pipeline to its host.
//!
//! Agents post commands into a working-memory graph; this crate turns them
//! into filter trees, drives one evaluation pass per cycle, and writes the
//! results back.
//!
//! # Modules
//!
//! - [`wm`] – [`WorkingMemory`][wm::WorkingMemory]: the identifier/attribute
//!   graph commands are read from and results written to.
//! - [`parse`] – [`parse_filter_spec`][parse::parse_filter_spec]: builds a
//!   [`Filter`][svs_filter::Filter] tree from a spec subtree.
//! - [`command`] – the [`Command`][command::Command] trait and the
//!   [`CommandTable`][command::CommandTable] registry.
//! - [`extract`] – [`ExtractCommand`][extract::ExtractCommand]: evaluates a
//!   spec and mirrors output deltas under `^result`.
//! - [`svs`] – [`Svs`][svs::Svs]: owns the scene, the tables and the dirty
//!   gate, and runs the cycle.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   `tracing` subscriber.

pub mod command;
pub mod extract;
pub mod parse;
pub mod svs;
pub mod telemetry;
pub mod wm;

pub use command::{Command, CommandContext, CommandTable};
pub use extract::ExtractCommand;
pub use parse::parse_filter_spec;
pub use svs::{SceneUpdate, Svs, SvsConfig};
pub use telemetry::{LogFormat, init_tracing};
pub use wm::{Identifier, Symbol, WmeId, WorkingMemory};
