#![warn(missing_docs)]

//! Bound asset builder for the rigkit pipeline.
//!
//! Takes a scene shape (primitive, mesh, or composite hierarchy) and
//! derives everything the runtime's bound records store: extents,
//! culling sphere, volume, center of gravity, diagonal inertia per unit
//! mass, and the per-kind collision margin. Failures stay local: a bad
//! shape produces one warning and a `None` slot, and composite
//! aggregation skips the hole.

mod builder;
mod error;
mod margins;
mod output;
mod shape;

pub use builder::{build_bound, BuildContext};
pub use error::BoundError;
pub use margins::{
    box_margin, capsule_margin, cylinder_margin, disc_margin, BVH_MARGIN, MESH_MARGIN,
};
pub use output::{Bound, BoundChild, BoundKind};
pub use shape::{CollisionFlags, MaterialInfo, Shape, ShapeNode};
