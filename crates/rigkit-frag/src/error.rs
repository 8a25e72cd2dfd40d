//! Error types for the fragment builder.

use thiserror::Error;

/// Malformed top-level fragment input. Per-shape problems never land
/// here; they become warnings and skipped slots.
#[derive(Error, Debug)]
pub enum FragError {
    /// The skeleton has no bones.
    #[error("fragment skeleton has no bones")]
    EmptySkeleton,

    /// The per-bone physics array does not match the skeleton.
    #[error("bone property count {got} does not match skeleton bone count {expected}")]
    BonePropsMismatch {
        /// Number of bones in the skeleton.
        expected: usize,
        /// Number of per-bone property entries supplied.
        got: usize,
    },

    /// A collision references a bone outside the skeleton.
    #[error("collision \"{name}\" references bone index {bone} of {len}")]
    CollisionBoneOutOfRange {
        /// Collision identifier.
        name: String,
        /// The offending bone index.
        bone: usize,
        /// Number of bones in the skeleton.
        len: usize,
    },

    /// No bone produced a physics group, so there is nothing to build.
    #[error("no bone is flagged for physics; fragment would be empty")]
    NoPhysicsBones,

    /// More groups than the 8-bit group index can address.
    #[error("{0} groups exceed the 255-group limit")]
    TooManyGroups(usize),
}
