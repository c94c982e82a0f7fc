use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier of a scene node.
///
/// Assigned by the scene when the node is created and never reused, so a
/// relation tuple recorded at one timestamp can be compared with one
/// recorded later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A point or direction in 3-D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Error type shared by the scene, the filter pipeline and the command layer.
///
/// None of these are fatal: a filter that fails simply withholds its output
/// for the cycle and the owning command reports the message as its status.
/// Caller-contract violations (removing an element a list does not hold)
/// are panics, not variants of this type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SvsError {
    #[error("incorrect filter syntax: {0}")]
    FilterSyntax(String),

    #[error("unknown filter type '{0}'")]
    UnknownFilterType(String),

    #[error("parameter '{param}' has the wrong type, expected {expected}")]
    TypeMismatch { param: String, expected: String },

    #[error("missing parameter '{0}'")]
    MissingParam(String),

    #[error("scene node '{0}' not found")]
    NodeNotFound(String),

    #[error("scene node '{0}' already exists")]
    DuplicateNode(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(7).to_string(), "n7");
    }

    #[test]
    fn vec3_distance_is_euclidean() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn vec3_add() {
        let v = Vec3::new(1.0, 2.0, 3.0) + Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(v, Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn svs_error_serialization_roundtrip() {
        let err = SvsError::TypeMismatch {
            param: "a".to_string(),
            expected: "node".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: SvsError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn svs_error_display() {
        let err = SvsError::NodeNotFound("box1".to_string());
        assert!(err.to_string().contains("box1"));

        let err2 = SvsError::FilterSyntax("missing type".to_string());
        assert!(err2.to_string().starts_with("incorrect filter syntax"));
    }
}
