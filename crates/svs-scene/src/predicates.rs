//! Pure spatial relation predicates.
//!
//! Each predicate takes the scene and an ordered argument list and returns
//! whether the relation holds.  Arity is fixed per predicate; a call with the
//! wrong number of arguments returns `false`.

use crate::scene::{Scene, SceneNode};

/// Signature shared by every relation predicate.
pub type Predicate = fn(&Scene, &[&SceneNode]) -> bool;

/// `intersect(a, b)`: the bounding boxes overlap.  Symmetric.
pub fn intersect(_scene: &Scene, args: &[&SceneNode]) -> bool {
    match args {
        [a, b] => a.bounds.overlaps(&b.bounds),
        _ => false,
    }
}

/// `contain(a, b)`: `b` lies entirely inside `a`.
pub fn contain(_scene: &Scene, args: &[&SceneNode]) -> bool {
    match args {
        [a, b] => a.bounds.contains_box(&b.bounds),
        _ => false,
    }
}

/// `above(a, b)`: `a` sits at or above the top face of `b` and their
/// footprints overlap in x/y.
pub fn above(_scene: &Scene, args: &[&SceneNode]) -> bool {
    match args {
        [a, b] => {
            let (ab, bb) = (&a.bounds, &b.bounds);
            ab.min.z >= bb.max.z
                && ab.min.x <= bb.max.x
                && ab.max.x >= bb.min.x
                && ab.min.y <= bb.max.y
                && ab.max.y >= bb.min.y
        }
        _ => false,
    }
}

/// Distance between the centres of two nodes.
pub fn centre_distance(a: &SceneNode, b: &SceneNode) -> f64 {
    a.bounds.centre().distance(&b.bounds.centre())
}
