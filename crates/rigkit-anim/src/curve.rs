//! The F-curve data model.

use serde::{Deserialize, Serialize};

/// One keyframe of a scalar channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in frames.
    pub time: f64,
    /// Channel value at `time`.
    pub value: f64,
}

/// One scalar animation channel.
///
/// Vector and quaternion properties are split across several curves
/// sharing a data path, distinguished by `array_index` (x/y/z for
/// vectors, w/x/y/z for quaternions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FCurve {
    /// Data path addressing the animated property.
    pub data_path: String,
    /// Component index within the addressed property.
    pub array_index: usize,
    /// Keyframes in time order.
    pub keyframes: Vec<Keyframe>,
    /// A muted curve keeps its data but is not evaluated.
    pub muted: bool,
}

impl FCurve {
    /// An unmuted curve over `keyframes`.
    pub fn new(data_path: &str, array_index: usize, keyframes: Vec<Keyframe>) -> Self {
        Self {
            data_path: data_path.to_string(),
            array_index,
            keyframes,
            muted: false,
        }
    }
}

/// A named set of F-curves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    /// Action name, used in warnings.
    pub name: String,
    /// The curves, in authored order.
    pub curves: Vec<FCurve>,
}

impl Action {
    /// An action named `name` over `curves`.
    pub fn new(name: &str, curves: Vec<FCurve>) -> Self {
        Self {
            name: name.to_string(),
            curves,
        }
    }
}
