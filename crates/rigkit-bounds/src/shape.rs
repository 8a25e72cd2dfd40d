//! Input shape model consumed by the bound builder.

use bitflags::bitflags;
use rigkit_math::{Point3, Transform34, Vec3};
use rigkit_mesh::TriMesh;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Collision category bits carried on composite children. The
    /// builder passes them through untouched; they select which runtime
    /// probes a child participates in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CollisionFlags: u32 {
        /// Static map geometry.
        const MAP = 1 << 0;
        /// Vehicle chassis collision.
        const VEHICLE = 1 << 1;
        /// Ped capsule collision.
        const PED = 1 << 2;
        /// Ragdoll bounds.
        const RAGDOLL = 1 << 3;
        /// Prop objects.
        const OBJECT = 1 << 4;
        /// Weapon test probes.
        const TEST_WEAPON = 1 << 5;
        /// Camera test probes.
        const TEST_CAMERA = 1 << 6;
        /// AI test probes.
        const TEST_AI = 1 << 7;
        /// Script test probes.
        const TEST_SCRIPT = 1 << 8;
        /// River/water volumes.
        const RIVER = 1 << 9;
        /// Foliage.
        const PLANT = 1 << 10;
        /// Breakable glass.
        const GLASS = 1 << 11;
    }
}

impl Serialize for CollisionFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for CollisionFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

/// One entry of the caller's material table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    /// Display name, used in warnings.
    pub name: String,
    /// Whether the material participates in collision. Non-collision
    /// materials on a collision shape fail validation.
    pub is_collision: bool,
}

/// A shape and its parameters.
///
/// Cylinders, discs, and capsules run along their local Y axis;
/// `length` on a capsule excludes the two hemispherical caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Shape {
    /// Axis-aligned box between `min` and `max` in local space.
    Box {
        /// Minimum corner.
        min: Vec3,
        /// Maximum corner.
        max: Vec3,
    },
    /// Sphere centered at the local origin.
    Sphere {
        /// Sphere radius.
        radius: f64,
    },
    /// Cylinder along local Y, centered at the origin.
    Cylinder {
        /// Cylinder radius.
        radius: f64,
        /// Cylinder length.
        length: f64,
    },
    /// Capsule along local Y, centered at the origin.
    Capsule {
        /// Cap radius.
        radius: f64,
        /// Tip-to-tip length minus both cap radii.
        length: f64,
    },
    /// Thin disc along local Y, centered at the origin. The stored
    /// thickness doubles as the collision margin.
    Disc {
        /// Disc radius.
        radius: f64,
        /// Disc thickness.
        length: f64,
    },
    /// Infinite plane; only valid as a composite child.
    Plane {
        /// A point on the plane.
        point: Point3,
        /// Plane normal.
        normal: Vec3,
    },
    /// Triangle mesh (geometry-type bound).
    Mesh {
        /// The triangle soup.
        mesh: TriMesh,
    },
    /// BVH bound: a triangle mesh plus embedded primitive children that
    /// the culling sphere must also cover.
    Bvh {
        /// The triangle soup.
        mesh: TriMesh,
        /// Embedded non-triangle primitives, each with a transform into
        /// the BVH frame.
        prims: Vec<ShapeNode>,
    },
    /// Composite of child shapes, each with its own transform into the
    /// composite frame.
    Composite {
        /// Ordered children; order is preserved in the output.
        children: Vec<ShapeNode>,
    },
}

/// A shape instance in the scene graph handed to the builder: the shape
/// itself plus its transform, material, and collision bitsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeNode {
    /// Caller-supplied identifier; every warning names it.
    pub name: String,
    /// The shape and its parameters.
    pub shape: Shape,
    /// Transform into the parent composite frame (or the scene frame at
    /// the root).
    pub transform: Transform34,
    /// Material index into the build context's table. Meshes may
    /// instead carry per-triangle materials.
    pub material: Option<u32>,
    /// Collision type bits, passed through to the output.
    pub type_flags: Option<CollisionFlags>,
    /// Collision include bits, passed through to the output.
    pub include_flags: Option<CollisionFlags>,
}

impl ShapeNode {
    /// A node with identity transform and no material or flags.
    pub fn bare(name: &str, shape: Shape) -> Self {
        Self {
            name: name.to_string(),
            shape,
            transform: Transform34::identity(),
            material: None,
            type_flags: None,
            include_flags: None,
        }
    }

    /// Same as [`bare`](Self::bare) with a material index.
    pub fn with_material(name: &str, shape: Shape, material: u32) -> Self {
        Self {
            material: Some(material),
            ..Self::bare(name, shape)
        }
    }
}
