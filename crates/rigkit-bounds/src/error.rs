//! Error types for the bound builder.
//!
//! These never propagate past a single shape: the builder converts each
//! one into a warning naming the offending scene object and emits a
//! `None` slot instead.

use thiserror::Error;

/// Why a shape could not be turned into a bound.
#[derive(Error, Debug)]
pub enum BoundError {
    /// Malformed mesh geometry.
    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] rigkit_mesh::MeshError),

    /// A dimension is non-finite or non-positive where it must be.
    #[error("invalid {what}: {value}")]
    InvalidDimension {
        /// Which dimension was bad.
        what: &'static str,
        /// The offending value.
        value: f64,
    },

    /// The shape has no material assigned.
    #[error("no collision material assigned")]
    NoMaterial,

    /// The assigned material index does not exist in the material table.
    #[error("unknown material index {0}")]
    UnknownMaterial(u32),

    /// A non-collision material is used on a collision shape.
    #[error("material \"{0}\" is not a collision material")]
    NonCollisionMaterial(String),

    /// More than one material on a shape kind that stores a single one.
    #[error("{0} materials on a single-material shape")]
    MultipleMaterials(usize),

    /// A plane outside a composite; planes are only valid as composite
    /// children.
    #[error("plane bounds are only valid inside a composite")]
    PlaneOutsideComposite,
}
