//! Input snapshot for a fragment build pass.
//!
//! The builder receives everything it needs as explicit values; it
//! reads no ambient scene state and mutates nothing it does not own.

use crate::output::GroupFlags;
use rigkit_bounds::Bound;
use rigkit_math::{Transform34, Vec3};
use rigkit_skeleton::Skeleton;
use serde::{Deserialize, Serialize};

/// Authored physics properties of one group, copied onto the output
/// group record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProps {
    /// Bit-packed behavior flags.
    pub flags: GroupFlags,
    /// Breaking strength.
    pub strength: f64,
    /// Joint stiffness.
    pub joint_stiffness: f64,
    /// Rotation speed parameter.
    pub rotation_speed: f64,
    /// Rotation strength parameter.
    pub rotation_strength: f64,
    /// Minimum force that damages this group.
    pub min_damage_force: f64,
    /// Health pool consumed by damage.
    pub damage_health: f64,
    /// Weapon damage scale.
    pub weapon_scale: f64,
    /// Melee damage scale.
    pub melee_scale: f64,
    /// Index into the glass-window table, for shatterable groups.
    pub glass_window_index: Option<u8>,
}

impl Default for GroupProps {
    fn default() -> Self {
        Self {
            flags: GroupFlags::empty(),
            strength: 100.0,
            joint_stiffness: 0.0,
            rotation_speed: 0.0,
            rotation_strength: 0.0,
            min_damage_force: 100.0,
            damage_health: 1000.0,
            weapon_scale: 1.0,
            melee_scale: 1.0,
            glass_window_index: None,
        }
    }
}

/// Per-bone physics authoring data, parallel to the skeleton's bones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FragBone {
    /// Whether this bone participates in physics at all.
    pub use_physics: bool,
    /// Whether a cloth mesh hangs off this bone. A cloth-only bone
    /// still creates a group, just no collision child.
    pub has_cloth: bool,
    /// Group properties for the group this bone creates.
    pub group: GroupProps,
    /// Overrides the computed parent group index when set.
    pub parent_override: Option<u8>,
}

/// One collision bound attached to a bone: a composite child of the
/// fragment's bound composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneCollision {
    /// Identifier used in warnings.
    pub name: String,
    /// Index of the owning bone.
    pub bone_index: usize,
    /// The built bound, in child-local space.
    pub bound: Bound,
    /// Transform of this child into the composite frame.
    pub transform: Transform34,
    /// Authored mass.
    pub mass: f64,
}

/// A "child mesh" flagged drawable for one bone's group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildMeshRef {
    /// Index of the bone whose group receives the drawable.
    pub bone_index: usize,
    /// Opaque reference into the host's drawable table.
    pub drawable: u32,
}

/// Complete input snapshot for [`build_fragment`](crate::build_fragment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragInput {
    /// Fragment name; the archetype inherits it.
    pub name: String,
    /// The skeleton.
    pub skeleton: Skeleton,
    /// Per-bone physics data, parallel to `skeleton.bones`.
    pub bones: Vec<FragBone>,
    /// Pristine collision children, in authored composite order.
    pub collisions: Vec<BoneCollision>,
    /// Damaged-variant collision children, or empty when the fragment
    /// has no damaged state.
    pub damaged_collisions: Vec<BoneCollision>,
    /// Child-mesh drawables for pristine groups.
    pub drawables: Vec<ChildMeshRef>,
    /// Child-mesh drawables for the hi-LOD variant; when non-empty a
    /// hi-LOD physics record is emitted that borrows the pristine child
    /// list and substitutes these references.
    pub hi_drawables: Vec<ChildMeshRef>,
    /// User-supplied offset added to the root link's center of gravity.
    pub unbroken_cg_offset: Vec3,
}

impl FragInput {
    /// A minimal input for `skeleton` with default per-bone data.
    pub fn new(name: &str, skeleton: Skeleton) -> Self {
        let bones = vec![FragBone::default(); skeleton.len()];
        Self {
            name: name.to_string(),
            skeleton,
            bones,
            collisions: Vec::new(),
            damaged_collisions: Vec::new(),
            drawables: Vec::new(),
            hi_drawables: Vec::new(),
            unbroken_cg_offset: Vec3::zeros(),
        }
    }
}
