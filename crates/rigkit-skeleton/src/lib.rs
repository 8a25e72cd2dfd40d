#![warn(missing_docs)]

//! Skeleton data for the rigkit fragment and animation engines.
//!
//! A skeleton is a flat bone arena: bones refer to each other through
//! parent indices, never pointers. Bone tags are 16-bit hashes of the
//! uppercased bone name (the root bone always carries tag 0), and joint
//! limits on a bone mark it as a joint boundary for link classification.

use bitflags::bitflags;
use rigkit_math::{Quat, Transform, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parent index of a root bone.
pub const NO_PARENT: i32 = -1;

/// A malformed bone arena.
#[derive(Error, Debug)]
pub enum SkeletonError {
    /// A bone's parent index is out of range or does not precede the
    /// bone; ancestor walks require parents-before-children ordering.
    #[error("bone {bone} (\"{name}\") has invalid parent index {parent}")]
    InvalidParent {
        /// Index of the offending bone.
        bone: usize,
        /// Name of the offending bone.
        name: String,
        /// The parent index it carries.
        parent: i32,
    },
}

bitflags! {
    /// Per-bone flag bits carried into the runtime skeleton.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BoneFlags: u32 {
        /// The bone has rotation limits (a rotational joint).
        const HAS_ROTATE_LIMITS = 1 << 0;
        /// The bone has translation limits (a prismatic joint).
        const HAS_TRANSLATE_LIMITS = 1 << 1;
        /// At least one bone lists this bone as its parent.
        const HAS_CHILD = 1 << 2;
    }
}

impl Serialize for BoneFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for BoneFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

/// Axis-aligned limit range on a joint channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    /// Per-axis minimum.
    pub min: Vec3,
    /// Per-axis maximum.
    pub max: Vec3,
}

/// The rest (bind) transform of a bone in its parent's space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestTransform {
    /// Position relative to the parent bone.
    pub position: Vec3,
    /// Rotation relative to the parent bone.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for RestTransform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl RestTransform {
    /// The rest transform as a 4×4 matrix.
    pub fn to_transform(&self) -> Transform {
        Transform::from_parts(self.position, self.rotation, self.scale)
    }
}

/// One bone of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name; tags are derived from it.
    pub name: String,
    /// Index of the parent bone, or [`NO_PARENT`].
    pub parent_index: i32,
    /// Rest transform in the parent's space.
    pub rest: RestTransform,
    /// 16-bit runtime tag. 0 for the root bone.
    pub tag: u16,
    /// Flag bits.
    pub flags: BoneFlags,
    /// Optional translation limits; presence implies a joint.
    pub translation_limit: Option<JointLimit>,
    /// Optional rotation limits; presence implies a joint.
    pub rotation_limit: Option<JointLimit>,
}

impl Bone {
    /// Whether any joint limit is present on this bone.
    pub fn has_joint(&self) -> bool {
        self.translation_limit.is_some() || self.rotation_limit.is_some()
    }
}

/// A flat, ordered bone arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Bones in skeleton order; parents always precede children.
    pub bones: Vec<Bone>,
}

impl Skeleton {
    /// Build a skeleton from bones, assigning tags and the HAS_CHILD /
    /// limit flags. Bone 0 (and any other parentless bone) gets tag 0.
    ///
    /// Every parent index must be [`NO_PARENT`] or refer to an earlier
    /// bone; anything else (out of range, self, forward, or a cycle)
    /// is rejected.
    pub fn new(mut bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        for (i, bone) in bones.iter().enumerate() {
            if bone.parent_index != NO_PARENT
                && !(0..i as i32).contains(&bone.parent_index)
            {
                return Err(SkeletonError::InvalidParent {
                    bone: i,
                    name: bone.name.clone(),
                    parent: bone.parent_index,
                });
            }
        }
        let mut has_child = vec![false; bones.len()];
        for bone in &bones {
            if bone.parent_index >= 0 {
                has_child[bone.parent_index as usize] = true;
            }
        }
        for (i, bone) in bones.iter_mut().enumerate() {
            bone.tag = if bone.parent_index == NO_PARENT {
                0
            } else {
                bone_tag(&bone.name)
            };
            bone.flags.set(BoneFlags::HAS_CHILD, has_child[i]);
            bone.flags
                .set(BoneFlags::HAS_ROTATE_LIMITS, bone.rotation_limit.is_some());
            bone.flags.set(
                BoneFlags::HAS_TRANSLATE_LIMITS,
                bone.translation_limit.is_some(),
            );
        }
        Ok(Self { bones })
    }

    /// Number of bones.
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether the skeleton has no bones.
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Index of the bone carrying `tag`, if any.
    pub fn bone_by_tag(&self, tag: u16) -> Option<usize> {
        self.bones.iter().position(|b| b.tag == tag)
    }

    /// Index of the bone named `name`, if any.
    pub fn bone_by_name(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// The rest transform of bone `index` in skeleton (world) space.
    pub fn world_rest(&self, index: usize) -> Transform {
        let mut chain = Vec::new();
        let mut current = index as i32;
        while current >= 0 {
            chain.push(current as usize);
            current = self.bones[current as usize].parent_index;
        }
        let mut world = Transform::identity();
        for &i in chain.iter().rev() {
            world = world.then(&self.bones[i].rest.to_transform());
        }
        world
    }

    /// Walk ancestors of `index` (excluding itself), nearest first.
    pub fn ancestors(&self, index: usize) -> AncestorIter<'_> {
        AncestorIter {
            skeleton: self,
            current: self.bones[index].parent_index,
        }
    }
}

/// Iterator over a bone's ancestors, nearest first.
pub struct AncestorIter<'a> {
    skeleton: &'a Skeleton,
    current: i32,
}

impl Iterator for AncestorIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current < 0 {
            return None;
        }
        let i = self.current as usize;
        self.current = self.skeleton.bones[i].parent_index;
        Some(i)
    }
}

/// 16-bit tag of a bone name.
///
/// The uppercased name is folded through an ELF-style hash: each
/// character shifts the running value left by 4 bits, the high nibble is
/// XOR-folded back down on overflow, and the result is reduced as
/// `(h % 0xFE8F) + 0x170`. Root bones bypass this and carry tag 0.
pub fn bone_tag(name: &str) -> u16 {
    let mut h: u32 = 0;
    for ch in name.to_uppercase().chars() {
        h = (h << 4).wrapping_add(ch as u32);
        let x = h & 0xF000_0000;
        if x != 0 {
            h ^= x >> 24;
        }
        h &= !x;
    }
    ((h % 0xFE8F) + 0x170) as u16
}

/// Convenience constructor for a bone with defaults everywhere.
pub fn bone(name: &str, parent_index: i32) -> Bone {
    Bone {
        name: name.to_string(),
        parent_index,
        rest: RestTransform::default(),
        tag: 0,
        flags: BoneFlags::empty(),
        translation_limit: None,
        rotation_limit: None,
    }
}
