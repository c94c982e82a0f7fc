//! [`Scene`] – named, versioned scene nodes.
//!
//! The scene is the only geometry state the filter pipeline reads.  Nodes
//! are addressed by name (the symbol agents use in working memory) or by
//! [`NodeId`] (what the relation cache stores).  Each geometry change bumps
//! the node's `version`; filters compare versions between cycles instead of
//! registering callbacks on the node.
//!
//! # Example
//!
//! ```rust
//! use svs_scene::{Aabb, Scene};
//! use svs_types::Vec3;
//!
//! let mut scene = Scene::new();
//! let unit = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
//! scene.add_node("box1", unit).unwrap();
//!
//! let v0 = scene.node("box1").unwrap().version;
//! scene.set_bounds("box1", unit.translated(Vec3::new(1.0, 0.0, 0.0))).unwrap();
//! assert!(scene.node("box1").unwrap().version > v0);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use svs_types::{NodeId, SvsError};
use tracing::debug;

use crate::aabb::Aabb;

/// A scene shared between the command layer and the filters that read it.
///
/// The pipeline is single-threaded, so plain `Rc<RefCell<_>>` is enough.
pub type SharedScene = Rc<RefCell<Scene>>;

/// One object in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub bounds: Aabb,
    /// Incremented on every geometry change.
    pub version: u64,
}

/// Flat collection of scene nodes in insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    next_id: u64,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a scene for sharing with filters.
    pub fn shared(self) -> SharedScene {
        Rc::new(RefCell::new(self))
    }

    /// Add a node.
    ///
    /// # Errors
    ///
    /// Returns [`SvsError::DuplicateNode`] when a node with `name` exists.
    pub fn add_node(&mut self, name: &str, bounds: Aabb) -> Result<NodeId, SvsError> {
        if self.node(name).is_some() {
            return Err(SvsError::DuplicateNode(name.to_string()));
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        debug!(node = name, %id, "scene node added");
        self.nodes.push(SceneNode {
            id,
            name: name.to_string(),
            bounds,
            version: 0,
        });
        Ok(id)
    }

    /// Remove a node, returning its id.
    pub fn remove_node(&mut self, name: &str) -> Result<NodeId, SvsError> {
        let pos = self
            .nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| SvsError::NodeNotFound(name.to_string()))?;
        let node = self.nodes.remove(pos);
        debug!(node = name, id = %node.id, "scene node removed");
        Ok(node.id)
    }

    /// Replace a node's bounds and bump its version.
    pub fn set_bounds(&mut self, name: &str, bounds: Aabb) -> Result<NodeId, SvsError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| SvsError::NodeNotFound(name.to_string()))?;
        node.bounds = bounds;
        node.version += 1;
        Ok(node.id)
    }

    /// Look a node up by name.
    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Look a node up by id.
    pub fn node_by_id(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
