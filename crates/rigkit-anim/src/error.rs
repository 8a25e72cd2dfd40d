//! Error types for the retargeter.

use thiserror::Error;

/// Structurally malformed animation input.
///
/// Per-curve problems (unresolvable bones, unrecognized paths, camera
/// channels on a non-camera target) are warnings and mutes, never
/// errors; an error here means the action itself is inconsistent and
/// nothing was committed.
#[derive(Error, Debug)]
pub enum AnimError {
    /// The component curves of one vector or quaternion property
    /// disagree on keyframe count, so no per-keyframe remap exists.
    #[error("curves for bone \"{bone}\" channel {channel} have mismatched keyframe counts")]
    KeyframeCountMismatch {
        /// Name (or `#<tag>` form) of the bone whose curves disagree.
        bone: String,
        /// The affected channel.
        channel: String,
    },
}
