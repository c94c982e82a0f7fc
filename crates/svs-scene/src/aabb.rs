//! Axis-aligned bounding boxes.
//!
//! Every scene node is approximated by one [`Aabb`].  The relation
//! predicates in [`crate::predicates`] reduce to the tests defined here.
//!
//! # Example
//!
//! ```rust
//! use svs_scene::Aabb;
//! use svs_types::Vec3;
//!
//! let table = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 1.0));
//! let cup = Aabb::new(Vec3::new(0.5, 0.5, 1.0), Vec3::new(0.8, 0.8, 1.3));
//!
//! assert!(table.overlaps(&cup));
//! assert!(!table.contains_box(&cup));
//! ```

use serde::{Deserialize, Serialize};
use svs_types::Vec3;

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from its two opposite corners.
    ///
    /// The constructor normalises the corners so that `min ≤ max` per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// A box of the given half-extents centred on `centre`.
    pub fn around(centre: Vec3, half: Vec3) -> Self {
        Self::new(
            Vec3::new(centre.x - half.x, centre.y - half.y, centre.z - half.z),
            Vec3::new(centre.x + half.x, centre.y + half.y, centre.z + half.z),
        )
    }

    /// Return the centre point of the box.
    pub fn centre(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// The same box moved by `offset`.
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// True when `other` lies entirely inside this box (boundaries included).
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// True when `other` overlaps (intersects or touches) this box.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}
