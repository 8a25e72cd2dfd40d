//! Data-path parsing.
//!
//! Recognized forms:
//! `pose.bones["<name>"].<prop>`, `pose.bones["#<tag>"].<prop>` with
//! prop one of location / rotation_quaternion / scale, bare `location`
//! and `rotation_quaternion` for camera channels, and `uv`-prefixed
//! paths for drawable geometry.

use serde::{Deserialize, Serialize};

/// How a pose-bone path qualifies its bone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoneRef {
    /// Qualified by bone name.
    Name(String),
    /// Qualified by numeric tag, the `#<tag>` form.
    Tag(u16),
}

/// The animated property of a pose-bone or camera path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Translation, 3 components.
    Location,
    /// Rotation quaternion, 4 components in (w, x, y, z) order.
    RotationQuaternion,
    /// Per-axis scale, 3 components.
    Scale,
}

impl Channel {
    /// The path spelling of this channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Location => "location",
            Channel::RotationQuaternion => "rotation_quaternion",
            Channel::Scale => "scale",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "location" => Some(Channel::Location),
            "rotation_quaternion" => Some(Channel::RotationQuaternion),
            "scale" => Some(Channel::Scale),
            _ => None,
        }
    }
}

/// A parsed data path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataPath {
    /// A pose-bone channel.
    PoseBone {
        /// The qualified bone.
        bone: BoneRef,
        /// The animated property.
        channel: Channel,
    },
    /// A bare camera channel (`location` or `rotation_quaternion`).
    Camera {
        /// The animated property.
        channel: Channel,
    },
    /// A drawable-geometry UV channel; carried through verbatim.
    Uv,
    /// Anything else. Unrecognized curves are muted with a warning.
    Unrecognized,
}

impl DataPath {
    /// Parse `path`. Never fails; unknown forms land in
    /// [`DataPath::Unrecognized`].
    pub fn parse(path: &str) -> Self {
        if let Some(rest) = path.strip_prefix("pose.bones[\"") {
            if let Some((qualifier, prop)) = rest.split_once("\"].") {
                let Some(channel) = Channel::parse(prop) else {
                    return DataPath::Unrecognized;
                };
                let bone = match qualifier.strip_prefix('#') {
                    Some(digits) => match digits.parse::<u16>() {
                        Ok(tag) => BoneRef::Tag(tag),
                        Err(_) => return DataPath::Unrecognized,
                    },
                    None => BoneRef::Name(qualifier.to_string()),
                };
                return DataPath::PoseBone { bone, channel };
            }
            return DataPath::Unrecognized;
        }
        if let Some(channel) = Channel::parse(path) {
            // Scale is a pose-bone property only; bare "scale" is not
            // a camera channel.
            if channel != Channel::Scale {
                return DataPath::Camera { channel };
            }
        }
        if path.starts_with("uv") {
            return DataPath::Uv;
        }
        DataPath::Unrecognized
    }

    /// Spell a pose-bone path for `bone` and `channel`.
    pub fn pose_bone(bone: &BoneRef, channel: Channel) -> String {
        match bone {
            BoneRef::Name(name) => format!("pose.bones[\"{name}\"].{}", channel.as_str()),
            BoneRef::Tag(tag) => format!("pose.bones[\"#{tag}\"].{}", channel.as_str()),
        }
    }
}
