#![warn(missing_docs)]

//! Fragment physics LOD builder.
//!
//! A fragment is an articulated, breakable asset: a skeleton, a
//! collision bound per physics bone, and a physics LOD describing rigid
//! groups, their children, the links joints split them into, and the
//! aggregate archetype the simulator spawns. This crate turns an
//! authored snapshot (skeleton + per-bone physics properties + built
//! bounds) into that LOD, with the deterministic ordering the runtime
//! format requires: children, composite slots, and link attachments are
//! parallel arrays and must stay index-aligned.

mod builder;
mod error;
mod input;
mod output;

pub use builder::build_fragment;
pub use error::FragError;
pub use input::{BoneCollision, ChildMeshRef, FragBone, FragInput, GroupProps};
pub use output::{
    Archetype, ChildDrawable, CompositeSlots, Damping, FragFlags, Fragment, GlassWindow,
    GroupFlags, PhysicsChild, PhysicsGroup, PhysicsLod, NO_PARENT_GROUP,
};
