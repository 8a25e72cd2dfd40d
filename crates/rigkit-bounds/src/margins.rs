//! Collision-margin calibration per shape kind.
//!
//! These rules reproduce the runtime's narrow-phase expectations; they
//! are not geometric derivations. In particular the disc margin is half
//! the disc thickness, a runtime requirement that looks wrong on paper
//! but must be kept.

use rigkit_math::{tol, Vec3};

/// Margin for a mesh (geometry) bound.
pub const MESH_MARGIN: f64 = tol::MARGIN_FLOOR;

/// Margin for a BVH bound.
pub const BVH_MARGIN: f64 = tol::DEFAULT_MARGIN;

/// Box margin: an eighth of the smallest extent, capped at the default
/// skin.
pub fn box_margin(extents: &Vec3) -> f64 {
    let min_extent = extents.x.min(extents.y).min(extents.z);
    tol::DEFAULT_MARGIN.min(min_extent / 8.0)
}

/// Cylinder margin: a quarter of the tighter of radius and half-length,
/// capped at the default skin.
pub fn cylinder_margin(radius: f64, length: f64) -> f64 {
    tol::DEFAULT_MARGIN.min(radius.min(length / 2.0) / 4.0)
}

/// Capsule margin: the cap radius.
pub fn capsule_margin(radius: f64) -> f64 {
    radius
}

/// Disc margin: half the thickness.
pub fn disc_margin(length: f64) -> f64 {
    length / 2.0
}
