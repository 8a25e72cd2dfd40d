//! Output descriptors: the physics LOD record the codec collaborator
//! serializes.

use bitflags::bitflags;
use rigkit_bounds::Bound;
use rigkit_math::{Transform34, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Parent index of a group with no parent.
pub const NO_PARENT_GROUP: u8 = 255;

bitflags! {
    /// Group behavior bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GroupFlags: u16 {
        /// The group detaches when its parent breaks.
        const DISAPPEARS_WHEN_DEAD = 1 << 0;
        /// The group takes melee damage.
        const MELEE_DAMAGEABLE = 1 << 1;
        /// The group shatters as glass.
        const GLASS = 1 << 2;
    }
}

impl Serialize for GroupFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for GroupFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

bitflags! {
    /// Fragment-level flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FragFlags: u16 {
        /// More than one link: the fragment articulates at runtime.
        const ARTICULATED = 1 << 0;
        /// A damaged bound set is present.
        const HAS_DAMAGED = 1 << 1;
        /// At least one group shatters as glass.
        const HAS_GLASS = 1 << 2;
    }
}

impl Serialize for FragFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for FragFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

/// One rigid cluster of physics children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsGroup {
    /// Group name (the owning bone's name).
    pub name: String,
    /// Index of the parent group, or [`NO_PARENT_GROUP`].
    pub parent_group_index: u8,
    /// Index of the owning bone in the skeleton.
    pub bone_index: usize,
    /// Behavior flags.
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
    /// Glass-window table index for shatterable groups.
    pub glass_window_index: Option<u8>,
    /// Sum of the pristine masses of this group's children.
    pub total_mass: f64,
}

/// The drawable attached to a physics child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDrawable {
    /// Opaque reference into the host's drawable table.
    pub drawable: u32,
    /// Bound-to-bone offset: composite transform times the inverse
    /// bone world transform.
    pub frag_bound_matrix: Transform34,
    /// When several children share a group, the group's first drawable
    /// also carries its siblings' bound matrices.
    pub frag_extra_bound_matrices: Vec<Transform34>,
}

/// One physics participant: a collision bound on one bone, with its
/// optional damaged variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsChild {
    /// Tag of the owning bone.
    pub bone_tag: u16,
    /// Index of the owning group.
    pub group_index: u8,
    /// Mass of the pristine bound (0 for a damaged-only pairing).
    pub pristine_mass: f64,
    /// Mass of the damaged bound (borrows the pristine mass when no
    /// damaged bound exists).
    pub damaged_mass: f64,
    /// Bound inertia times mass; `w` stores volume times mass.
    pub inertia: Vec4,
    /// Damaged-bound inertia times damaged mass, same layout.
    pub damaged_inertia: Vec4,
    /// Drawable for the pristine state, on the first child of a group.
    pub drawable: Option<ChildDrawable>,
    /// Drawable for the damaged state.
    pub damaged_drawable: Option<ChildDrawable>,
}

/// The composite slot arrays of a physics LOD. Both arrays have the
/// same length; a slot is `None` where the corresponding state has no
/// bound (padding introduced by the pristine/damaged merge).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeSlots {
    /// Pristine bounds with their composite transforms.
    pub pristine: Vec<Option<(Bound, Transform34)>>,
    /// Damaged bounds with their composite transforms.
    pub damaged: Vec<Option<(Bound, Transform34)>>,
}

/// Aggregate archetype record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    /// Archetype name (the fragment name).
    pub name: String,
    /// Total mass.
    pub mass: f64,
    /// `1 / mass`, or 0 when massless.
    pub mass_inv: f64,
    /// Aggregate diagonal inertia about the root CoG, per unit mass.
    pub inertia: Vec3,
    /// Component-wise reciprocal of `inertia` (0 where a component is 0).
    pub inertia_inv: Vec3,
}

/// The six damping tuples of a physics LOD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damping {
    /// Constant linear damping.
    pub linear_c: Vec3,
    /// Velocity-proportional linear damping.
    pub linear_v: Vec3,
    /// Velocity-squared linear damping.
    pub linear_v2: Vec3,
    /// Constant angular damping.
    pub angular_c: Vec3,
    /// Velocity-proportional angular damping.
    pub angular_v: Vec3,
    /// Velocity-squared angular damping.
    pub angular_v2: Vec3,
}

impl Default for Damping {
    fn default() -> Self {
        Self {
            linear_c: Vec3::from_element(0.02),
            linear_v: Vec3::from_element(0.02),
            linear_v2: Vec3::from_element(0.01),
            angular_c: Vec3::from_element(0.02),
            angular_v: Vec3::from_element(0.02),
            angular_v2: Vec3::from_element(0.01),
        }
    }
}

/// A fully populated physics LOD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsLod {
    /// Pristine archetype.
    pub archetype: Archetype,
    /// Damaged archetype, when a damaged bound set exists.
    pub damaged_archetype: Option<Archetype>,
    /// Groups, ordered so parents precede children.
    pub groups: Vec<PhysicsGroup>,
    /// Children, ordered to match the composite slots.
    pub children: Vec<PhysicsChild>,
    /// Composite slot arrays, index-aligned with `children` on the
    /// pristine side.
    pub composite: CompositeSlots,
    /// One link attachment per child, index-aligned with `children`.
    pub link_attachments: Vec<Transform34>,
    /// Smallest angular inertia (largest / 10000 by convention).
    pub smallest_ang_inertia: f64,
    /// Largest angular inertia component across all children.
    pub largest_ang_inertia: f64,
    /// The root link's center of gravity.
    pub root_cg_offset: Vec3,
    /// The user-supplied unbroken CoG offset, echoed into the record.
    pub unbroken_cg_offset: Vec3,
    /// Damping tuples.
    pub damping: Damping,
}

/// Glass-window bookkeeping for shatterable groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlassWindow {
    /// Index of the shatterable group.
    pub group_index: u8,
    /// Index into the host's glass-window table.
    pub window_index: u8,
}

/// The complete fragment build output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Fragment name.
    pub name: String,
    /// Fragment-level flags.
    pub flags: FragFlags,
    /// The physics LOD.
    pub physics: PhysicsLod,
    /// Hi-LOD variant: the same children with substituted drawable
    /// references, when hi-LOD drawables were supplied.
    pub hi_physics: Option<PhysicsLod>,
    /// Glass windows referenced by shatterable groups.
    pub glass_windows: Vec<GlassWindow>,
}
