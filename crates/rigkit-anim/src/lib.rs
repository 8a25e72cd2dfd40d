#![warn(missing_docs)]

//! F-curves and animation retargeting.
//!
//! An action is a flat set of scalar F-curves addressed by data path
//! and array index. Retargeting rewrites the paths for a new target
//! (another skeleton, a camera, or drawable geometry) and remaps the
//! keyframe values through the bone-space change, staging every edit
//! and committing in a single pass so no partially-remapped action is
//! ever observable.

mod curve;
mod error;
mod path;
mod retarget;

pub use curve::{Action, FCurve, Keyframe};
pub use error::AnimError;
pub use path::{BoneRef, Channel, DataPath};
pub use retarget::{retarget, RetargetContext, TargetDesc};
