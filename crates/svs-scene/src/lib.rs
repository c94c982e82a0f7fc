//! `svs-scene` – the scene graph collaborator of the spatial-visual system.
//!
//! The filter pipeline never does geometry itself.  It asks this crate for
//! the nodes that currently exist and calls the pure predicates registered
//! here when it needs a spatial answer.
//!
//! # Modules
//!
//! - [`aabb`] – [`Aabb`][aabb::Aabb]: axis-aligned bounding boxes and the
//!   overlap/containment tests every predicate is built from.
//! - [`scene`] – [`Scene`][scene::Scene]: named, versioned nodes.  Every
//!   geometry mutation bumps the node's version so that filters holding a
//!   reference can tell the node moved.
//! - [`predicates`] – pure relation functions
//!   (`(scene, ordered node arguments) -> bool`) consumed by the filter
//!   table's relation cache.

pub mod aabb;
pub mod predicates;
pub mod scene;

pub use aabb::Aabb;
pub use scene::{Scene, SceneNode, SharedScene};
