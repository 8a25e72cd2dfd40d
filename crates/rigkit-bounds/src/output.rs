//! Output descriptors: the derived bound records consumed by the format
//! codec collaborator.

use crate::shape::CollisionFlags;
use rigkit_math::{Point3, Transform34, Vec3};
use serde::{Deserialize, Serialize};

/// Shape kind tag on a derived bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    /// Axis-aligned box.
    Box,
    /// Sphere.
    Sphere,
    /// Cylinder along local Y.
    Cylinder,
    /// Capsule along local Y.
    Capsule,
    /// Thin disc along local Y.
    Disc,
    /// Infinite plane.
    Plane,
    /// Triangle mesh.
    Mesh,
    /// Triangle mesh with embedded primitives.
    Bvh,
    /// Composite of child bounds.
    Composite,
}

/// A derived bound: one shape with every quantity the runtime record
/// stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    /// Shape kind.
    pub kind: BoundKind,
    /// Minimum corner of the local-space extent.
    pub extent_min: Vec3,
    /// Maximum corner of the local-space extent.
    pub extent_max: Vec3,
    /// Center of the enclosing (culling) sphere.
    pub centroid: Point3,
    /// Radius of the enclosing sphere around `centroid`.
    pub radius_around_centroid: f64,
    /// Enclosed volume.
    pub volume: f64,
    /// Center of gravity.
    pub cg: Point3,
    /// Diagonal inertia per unit mass (divided by volume for meshes and
    /// composites).
    pub inertia: Vec3,
    /// Collision skin distance.
    pub margin: f64,
    /// Material index, when the shape carries a single material.
    pub material: Option<u32>,
    /// The transform this bound keeps after building. At the root the
    /// builder bakes the translation into `centroid`/`cg` and zeroes it
    /// here; inside a composite it is the child transform unchanged.
    pub transform: Transform34,
    /// Children, for composites; `None` entries are shapes that failed
    /// validation and were skipped during aggregation. Order matches
    /// the input children exactly.
    pub children: Vec<BoundChild>,
}

/// One composite child slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundChild {
    /// The child bound, or `None` for a skipped/padding slot.
    pub bound: Option<Bound>,
    /// Transform into the composite frame.
    pub transform: Transform34,
    /// Collision type bits.
    pub type_flags: Option<CollisionFlags>,
    /// Collision include bits.
    pub include_flags: Option<CollisionFlags>,
}

impl Bound {
    /// The child's center of gravity mapped into the composite frame.
    pub fn cg_world(child: &BoundChild) -> Option<Point3> {
        child
            .bound
            .as_ref()
            .map(|b| child.transform.apply_point(&b.cg))
    }
}
