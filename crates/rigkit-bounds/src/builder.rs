//! Shape dispatch and composite aggregation.

use crate::error::BoundError;
use crate::margins::{box_margin, capsule_margin, cylinder_margin, disc_margin, BVH_MARGIN, MESH_MARGIN};
use crate::output::{Bound, BoundChild, BoundKind};
use crate::shape::{MaterialInfo, Shape, ShapeNode};
use nalgebra::Matrix3;
use rand::Rng;
use rigkit_math::{tol, Point3, Transform34, Vec3, WarningSink};
use rigkit_mesh::{enclosing_sphere, mass_properties, TriMesh};
use std::f64::consts::PI;

/// Caller-supplied context for a build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Material table the shapes index into.
    pub materials: Vec<MaterialInfo>,
}

impl BuildContext {
    /// A context with a single collision material at index 0.
    pub fn single_collision(name: &str) -> Self {
        Self {
            materials: vec![MaterialInfo {
                name: name.to_string(),
                is_collision: true,
            }],
        }
    }
}

/// Build the derived bound for a root scene shape.
///
/// Root primitives get their transform's translation baked into
/// `centroid` and `cg` (the stored transform keeps only the rotation,
/// which is surfaced as a warning when it is not the identity). Returns
/// `None` after emitting one warning if the shape fails validation.
pub fn build_bound<R, S>(
    node: &ShapeNode,
    ctx: &BuildContext,
    sink: &mut S,
    rng: &mut R,
) -> Option<Bound>
where
    R: Rng + ?Sized,
    S: WarningSink,
{
    let mut bound = build_node(node, ctx, sink, rng, false)?;
    if bound.kind != BoundKind::Composite {
        let t = node.transform.translation_part();
        bound.centroid += t;
        bound.cg += t;
        bound.transform = node.transform.with_translation(Vec3::zeros());
        if !node.transform.to_transform().is_rotation_identity(tol::LINEAR) {
            sink.warning(format!(
                "{}: root primitive has a non-identity rotation and no composite parent; \
                 the rotation is kept on the bound",
                node.name
            ));
        }
    }
    Some(bound)
}

/// Build one node, converting any failure into a single warning plus
/// `None`.
fn build_node<R, S>(
    node: &ShapeNode,
    ctx: &BuildContext,
    sink: &mut S,
    rng: &mut R,
    in_composite: bool,
) -> Option<Bound>
where
    R: Rng + ?Sized,
    S: WarningSink,
{
    match build_node_inner(node, ctx, sink, rng, in_composite) {
        Ok(bound) => Some(bound),
        Err(err) => {
            sink.warning(format!("{}: {err}", node.name));
            None
        }
    }
}

fn build_node_inner<R, S>(
    node: &ShapeNode,
    ctx: &BuildContext,
    sink: &mut S,
    rng: &mut R,
    in_composite: bool,
) -> Result<Bound, BoundError>
where
    R: Rng + ?Sized,
    S: WarningSink,
{
    match &node.shape {
        Shape::Box { min, max } => {
            let extents = max - min;
            for (k, label) in ["box width", "box depth", "box height"].iter().enumerate() {
                check_dimension(label, extents[k])?;
            }
            check_material(node, ctx)?;
            let center = Point3::from((min + max) / 2.0);
            Ok(Bound {
                kind: BoundKind::Box,
                extent_min: *min,
                extent_max: *max,
                centroid: center,
                radius_around_centroid: extents.norm() / 2.0,
                volume: extents.x * extents.y * extents.z,
                cg: center,
                inertia: Vec3::new(
                    (extents.y * extents.y + extents.z * extents.z) / 12.0,
                    (extents.z * extents.z + extents.x * extents.x) / 12.0,
                    (extents.x * extents.x + extents.y * extents.y) / 12.0,
                ),
                margin: box_margin(&extents),
                material: node.material,
                transform: node.transform,
                children: Vec::new(),
            })
        }
        Shape::Sphere { radius } => {
            check_dimension("sphere radius", *radius)?;
            check_material(node, ctx)?;
            let r = *radius;
            Ok(Bound {
                kind: BoundKind::Sphere,
                extent_min: Vec3::new(-r, -r, -r),
                extent_max: Vec3::new(r, r, r),
                centroid: Point3::origin(),
                radius_around_centroid: r,
                volume: 4.0 / 3.0 * PI * r * r * r,
                cg: Point3::origin(),
                inertia: Vec3::from_element(2.0 * r * r / 5.0),
                margin: r,
                material: node.material,
                transform: node.transform,
                children: Vec::new(),
            })
        }
        Shape::Cylinder { radius, length } => {
            check_dimension("cylinder radius", *radius)?;
            check_dimension("cylinder length", *length)?;
            check_material(node, ctx)?;
            let (r, l) = (*radius, *length);
            Ok(Bound {
                kind: BoundKind::Cylinder,
                extent_min: Vec3::new(-r, -l / 2.0, -r),
                extent_max: Vec3::new(r, l / 2.0, r),
                centroid: Point3::origin(),
                radius_around_centroid: (r * r + l * l / 4.0).sqrt(),
                volume: PI * r * r * l,
                cg: Point3::origin(),
                inertia: cylinder_inertia(r, l),
                margin: cylinder_margin(r, l),
                material: node.material,
                transform: node.transform,
                children: Vec::new(),
            })
        }
        Shape::Disc { radius, length } => {
            check_dimension("disc radius", *radius)?;
            check_dimension("disc thickness", *length)?;
            check_material(node, ctx)?;
            let (r, l) = (*radius, *length);
            Ok(Bound {
                kind: BoundKind::Disc,
                extent_min: Vec3::new(-r, -l / 2.0, -r),
                extent_max: Vec3::new(r, l / 2.0, r),
                centroid: Point3::origin(),
                radius_around_centroid: r,
                volume: PI * r * r * l,
                cg: Point3::origin(),
                inertia: cylinder_inertia(r, l),
                margin: disc_margin(l),
                material: node.material,
                transform: node.transform,
                children: Vec::new(),
            })
        }
        Shape::Capsule { radius, length } => {
            check_dimension("capsule radius", *radius)?;
            check_dimension("capsule length", *length)?;
            check_material(node, ctx)?;
            let (r, l) = (*radius, *length);
            Ok(Bound {
                kind: BoundKind::Capsule,
                extent_min: Vec3::new(-r, -(l / 2.0 + r), -r),
                extent_max: Vec3::new(r, l / 2.0 + r, r),
                centroid: Point3::origin(),
                radius_around_centroid: l / 2.0 + r,
                volume: PI * r * r * l + 4.0 / 3.0 * PI * r * r * r,
                cg: Point3::origin(),
                inertia: capsule_inertia(r, l),
                margin: capsule_margin(r),
                material: node.material,
                transform: node.transform,
                children: Vec::new(),
            })
        }
        Shape::Plane { point, normal } => {
            if !in_composite {
                return Err(BoundError::PlaneOutsideComposite);
            }
            check_dimension("plane normal length", normal.norm())?;
            check_material(node, ctx)?;
            Ok(Bound {
                kind: BoundKind::Plane,
                extent_min: Vec3::zeros(),
                extent_max: Vec3::zeros(),
                centroid: *point,
                radius_around_centroid: 0.0,
                volume: 0.0,
                cg: *point,
                inertia: Vec3::zeros(),
                margin: tol::DEFAULT_MARGIN,
                material: node.material,
                transform: node.transform,
                children: Vec::new(),
            })
        }
        Shape::Mesh { mesh } => {
            check_mesh(mesh)?;
            check_mesh_materials(node, mesh, ctx)?;
            let mut bound = mesh_bound(mesh, rng);
            bound.material = node.material;
            bound.transform = node.transform;
            Ok(bound)
        }
        Shape::Bvh { mesh, prims } => {
            check_mesh(mesh)?;
            check_mesh_materials(node, mesh, ctx)?;
            let mut bound = mesh_bound(mesh, rng);
            bound.kind = BoundKind::Bvh;
            bound.margin = BVH_MARGIN;
            let mut sphere = rigkit_mesh::Sphere {
                center: bound.centroid,
                radius: bound.radius_around_centroid,
            };
            for prim in prims {
                grow_over_primitive(&mut sphere, prim);
            }
            bound.centroid = sphere.center;
            bound.radius_around_centroid = sphere.radius;
            bound.material = node.material;
            bound.transform = node.transform;
            Ok(bound)
        }
        Shape::Composite { children } => {
            let built: Vec<BoundChild> = children
                .iter()
                .map(|child| BoundChild {
                    bound: build_node(child, ctx, sink, rng, true),
                    transform: child.transform,
                    type_flags: child.type_flags,
                    include_flags: child.include_flags,
                })
                .collect();
            Ok(aggregate_composite(built, node.transform))
        }
    }
}

fn cylinder_inertia(r: f64, l: f64) -> Vec3 {
    let transverse = l * l / 12.0 + r * r / 4.0;
    Vec3::new(transverse, r * r / 2.0, transverse)
}

fn capsule_inertia(r: f64, l: f64) -> Vec3 {
    let transverse = (5.0 * l * l * l + 20.0 * l * l * r + 45.0 * l * r * r + 32.0 * r * r * r)
        / (60.0 * l + 80.0 * r);
    let axial = r * r * (15.0 * l + 16.0 * r) / (30.0 * l + 40.0 * r);
    Vec3::new(transverse, axial, transverse)
}

fn check_dimension(what: &'static str, value: f64) -> Result<(), BoundError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BoundError::InvalidDimension { what, value });
    }
    Ok(())
}

fn check_mesh(mesh: &TriMesh) -> Result<(), BoundError> {
    if mesh.indices.is_empty() {
        return Err(rigkit_mesh::MeshError::EmptyIndexBuffer.into());
    }
    for (i, p) in mesh.positions.iter().enumerate() {
        if !p.coords.iter().all(|c| c.is_finite()) {
            return Err(rigkit_mesh::MeshError::NonFinitePosition(i).into());
        }
    }
    Ok(())
}

fn check_material(node: &ShapeNode, ctx: &BuildContext) -> Result<(), BoundError> {
    let index = node.material.ok_or(BoundError::NoMaterial)?;
    let info = ctx
        .materials
        .get(index as usize)
        .ok_or(BoundError::UnknownMaterial(index))?;
    if !info.is_collision {
        return Err(BoundError::NonCollisionMaterial(info.name.clone()));
    }
    Ok(())
}

/// Meshes may carry per-triangle materials instead of a single index;
/// every one must resolve to a collision material.
fn check_mesh_materials(
    node: &ShapeNode,
    mesh: &TriMesh,
    ctx: &BuildContext,
) -> Result<(), BoundError> {
    match &mesh.materials {
        Some(per_tri) => {
            let mut seen: Vec<u32> = per_tri.to_vec();
            seen.sort_unstable();
            seen.dedup();
            for &index in &seen {
                let info = ctx
                    .materials
                    .get(index as usize)
                    .ok_or(BoundError::UnknownMaterial(index))?;
                if !info.is_collision {
                    return Err(BoundError::NonCollisionMaterial(info.name.clone()));
                }
            }
            Ok(())
        }
        None => check_material(node, ctx),
    }
}

fn mesh_bound<R: Rng + ?Sized>(mesh: &TriMesh, rng: &mut R) -> Bound {
    let props = mass_properties(mesh);
    let sphere = enclosing_sphere(&mesh.positions, rng);
    let (extent_min, extent_max) = mesh
        .aabb()
        .map(|(min, max)| (min.coords, max.coords))
        .unwrap_or((Vec3::zeros(), Vec3::zeros()));
    Bound {
        kind: BoundKind::Mesh,
        extent_min,
        extent_max,
        centroid: sphere.center,
        radius_around_centroid: sphere.radius,
        volume: props.volume,
        cg: props.cg,
        inertia: props.inertia,
        margin: MESH_MARGIN,
        material: None,
        transform: Transform34::identity(),
        children: Vec::new(),
    }
}

/// Grow a BVH culling sphere over one embedded primitive: far corners
/// for boxes, the surface for spheres, and the endpoint cap spheres for
/// capsules and cylinders.
fn grow_over_primitive(sphere: &mut rigkit_mesh::Sphere, prim: &ShapeNode) {
    let t = &prim.transform;
    match &prim.shape {
        Shape::Box { min, max } => {
            for corner in box_corners(min, max) {
                sphere.grow_to_include(&t.apply_point(&corner), 0.0);
            }
        }
        Shape::Sphere { radius } => {
            sphere.grow_to_include(&t.apply_point(&Point3::origin()), *radius);
        }
        Shape::Capsule { radius, length } | Shape::Cylinder { radius, length } => {
            for sign in [-1.0, 1.0] {
                let end = Point3::new(0.0, sign * length / 2.0, 0.0);
                sphere.grow_to_include(&t.apply_point(&end), *radius);
            }
        }
        // Other kinds never occur inside a BVH.
        _ => {}
    }
}

fn box_corners(min: &Vec3, max: &Vec3) -> [Point3; 8] {
    let mut corners = [Point3::origin(); 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        *corner = Point3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
    }
    corners
}

/// Aggregate built children into a composite bound.
///
/// Null children are skipped everywhere; child order is preserved so
/// downstream index-aligned arrays (physics children, link attachments)
/// stay valid.
fn aggregate_composite(children: Vec<BoundChild>, transform: Transform34) -> Bound {
    let live: Vec<(&BoundChild, &Bound)> = children
        .iter()
        .filter_map(|c| c.bound.as_ref().map(|b| (c, b)))
        .collect();

    let mut volume = 0.0;
    let mut cg_acc = Vec3::zeros();
    let mut centroid_acc = Vec3::zeros();
    for (child, bound) in &live {
        volume += bound.volume;
        cg_acc += child.transform.apply_point(&bound.cg).coords * bound.volume;
        centroid_acc += child.transform.apply_point(&bound.centroid).coords;
    }
    let centroid = if live.is_empty() {
        Point3::origin()
    } else {
        Point3::from(centroid_acc / live.len() as f64)
    };
    let cg = if volume > 0.0 {
        Point3::from(cg_acc / volume)
    } else {
        centroid
    };

    let mut extent_min = Vec3::from_element(f64::INFINITY);
    let mut extent_max = Vec3::from_element(f64::NEG_INFINITY);
    let mut radius = 0.0_f64;
    let mut inertia_acc = Vec3::zeros();
    for (child, bound) in &live {
        for corner in box_corners(&bound.extent_min, &bound.extent_max) {
            let p = child.transform.apply_point(&corner);
            for k in 0..3 {
                extent_min[k] = extent_min[k].min(p[k]);
                extent_max[k] = extent_max[k].max(p[k]);
            }
        }
        let child_centroid = child.transform.apply_point(&bound.centroid);
        radius = radius.max((child_centroid - centroid).norm() + bound.radius_around_centroid);

        // Parallel-axis shift of the child's diagonal inertia about the
        // composite CoG. The diagonal is taken after rotating into the
        // composite frame; off-diagonal terms are dropped by convention.
        let r = child.transform.linear_part();
        let rotated = (r * Matrix3::from_diagonal(&bound.inertia) * r.transpose()).diagonal();
        let d = child.transform.apply_point(&bound.cg) - cg;
        let shift = Vec3::new(
            d.y * d.y + d.z * d.z,
            d.z * d.z + d.x * d.x,
            d.x * d.x + d.y * d.y,
        );
        inertia_acc += (rotated + shift) * bound.volume;
    }
    if live.is_empty() {
        extent_min = Vec3::zeros();
        extent_max = Vec3::zeros();
    }
    let inertia = if volume > 0.0 {
        inertia_acc / volume
    } else {
        Vec3::zeros()
    };

    Bound {
        kind: BoundKind::Composite,
        extent_min,
        extent_max,
        centroid,
        radius_around_centroid: radius,
        volume,
        cg,
        inertia,
        margin: 0.0,
        material: None,
        transform,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::CollisionFlags;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rigkit_math::CollectSink;

    fn build(node: &ShapeNode) -> (Option<Bound>, CollectSink) {
        let ctx = BuildContext::single_collision("concrete");
        let mut sink = CollectSink::default();
        let mut rng = StdRng::seed_from_u64(11);
        let bound = build_bound(node, &ctx, &mut sink, &mut rng);
        (bound, sink)
    }

    fn unit_box(name: &str) -> ShapeNode {
        ShapeNode::with_material(
            name,
            Shape::Box {
                min: Vec3::new(-0.5, -0.5, -0.5),
                max: Vec3::new(0.5, 0.5, 0.5),
            },
            0,
        )
    }

    #[test]
    fn test_single_box_scenario() {
        // Box from (-1,-1,-1) to (1,1,1).
        let node = ShapeNode::with_material(
            "crate",
            Shape::Box {
                min: Vec3::new(-1.0, -1.0, -1.0),
                max: Vec3::new(1.0, 1.0, 1.0),
            },
            0,
        );
        let (bound, sink) = build(&node);
        let b = bound.unwrap();
        assert!(sink.warnings.is_empty());
        assert_relative_eq!(b.volume, 8.0, epsilon = 1e-12);
        assert_relative_eq!(b.cg.coords.norm(), 0.0, epsilon = 1e-12);
        for k in 0..3 {
            assert_relative_eq!(b.inertia[k], 2.0 / 3.0, epsilon = 1e-12);
        }
        assert_relative_eq!(b.margin, 0.04);
        assert_relative_eq!(b.radius_around_centroid, 3.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_capsule_scenario() {
        let node = ShapeNode::with_material(
            "limb",
            Shape::Capsule {
                radius: 0.5,
                length: 2.0,
            },
            0,
        );
        let (bound, _) = build(&node);
        let b = bound.unwrap();
        assert_relative_eq!(b.radius_around_centroid, 1.5);
        assert_relative_eq!(
            b.volume,
            PI * 0.25 * 2.0 + 4.0 / 3.0 * PI * 0.125,
            epsilon = 1e-12
        );
        assert_relative_eq!(b.margin, 0.5);
    }

    #[test]
    fn test_sphere_closed_form() {
        let node = ShapeNode::with_material("ball", Shape::Sphere { radius: 2.0 }, 0);
        let (bound, _) = build(&node);
        let b = bound.unwrap();
        assert_relative_eq!(b.volume, 4.0 / 3.0 * PI * 8.0, epsilon = 1e-12);
        for k in 0..3 {
            assert_relative_eq!(b.inertia[k], 2.0 * 4.0 / 5.0, epsilon = 1e-12);
        }
        assert_relative_eq!(b.margin, 2.0);
    }

    #[test]
    fn test_cylinder_closed_form_sweep() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..32 {
            let r = rng.gen_range(0.05..3.0);
            let l = rng.gen_range(0.05..5.0);
            let node = ShapeNode::with_material(
                "cyl",
                Shape::Cylinder {
                    radius: r,
                    length: l,
                },
                0,
            );
            let (bound, _) = build(&node);
            let b = bound.unwrap();
            assert_relative_eq!(b.volume, PI * r * r * l, max_relative = 1e-6);
            assert_relative_eq!(
                b.inertia.x,
                l * l / 12.0 + r * r / 4.0,
                max_relative = 1e-6
            );
            assert_relative_eq!(b.inertia.y, r * r / 2.0, max_relative = 1e-6);
            assert_relative_eq!(
                b.radius_around_centroid,
                (r * r + l * l / 4.0).sqrt(),
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn test_box_closed_form_sweep() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..32 {
            let min = Vec3::new(
                rng.gen_range(-3.0..0.0),
                rng.gen_range(-3.0..0.0),
                rng.gen_range(-3.0..0.0),
            );
            let ext = Vec3::new(
                rng.gen_range(0.05..4.0),
                rng.gen_range(0.05..4.0),
                rng.gen_range(0.05..4.0),
            );
            let max = min + ext;
            let node = ShapeNode::with_material("box", Shape::Box { min, max }, 0);
            let (bound, _) = build(&node);
            let b = bound.unwrap();
            assert_relative_eq!(b.volume, ext.x * ext.y * ext.z, max_relative = 1e-6);
            assert_relative_eq!(
                b.inertia.x,
                (ext.y * ext.y + ext.z * ext.z) / 12.0,
                max_relative = 1e-6
            );
            assert_relative_eq!(
                b.inertia.y,
                (ext.z * ext.z + ext.x * ext.x) / 12.0,
                max_relative = 1e-6
            );
            assert_relative_eq!(
                b.inertia.z,
                (ext.x * ext.x + ext.y * ext.y) / 12.0,
                max_relative = 1e-6
            );
            assert_relative_eq!(b.radius_around_centroid, ext.norm() / 2.0, max_relative = 1e-6);
            assert_relative_eq!(b.margin, f64::min(0.04, ext.min() / 8.0), max_relative = 1e-6);
            let center = Point3::from(min + ext / 2.0);
            assert_relative_eq!((b.cg - center).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sphere_closed_form_sweep() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..32 {
            let r = rng.gen_range(0.05..3.0);
            let node = ShapeNode::with_material("ball", Shape::Sphere { radius: r }, 0);
            let (bound, _) = build(&node);
            let b = bound.unwrap();
            assert_relative_eq!(b.volume, 4.0 / 3.0 * PI * r * r * r, max_relative = 1e-6);
            for k in 0..3 {
                assert_relative_eq!(b.inertia[k], 2.0 * r * r / 5.0, max_relative = 1e-6);
            }
            assert_relative_eq!(b.radius_around_centroid, r, max_relative = 1e-6);
            assert_relative_eq!(b.margin, r, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_capsule_closed_form_sweep() {
        let mut rng = StdRng::seed_from_u64(29);
        for _ in 0..32 {
            let r = rng.gen_range(0.05..2.0);
            let l = rng.gen_range(0.05..5.0);
            let node = ShapeNode::with_material(
                "caps",
                Shape::Capsule {
                    radius: r,
                    length: l,
                },
                0,
            );
            let (bound, _) = build(&node);
            let b = bound.unwrap();
            assert_relative_eq!(
                b.volume,
                PI * r * r * l + 4.0 / 3.0 * PI * r * r * r,
                max_relative = 1e-6
            );
            let transverse = (5.0 * l * l * l + 20.0 * l * l * r + 45.0 * l * r * r
                + 32.0 * r * r * r)
                / (60.0 * l + 80.0 * r);
            assert_relative_eq!(b.inertia.x, transverse, max_relative = 1e-6);
            assert_relative_eq!(b.inertia.z, transverse, max_relative = 1e-6);
            assert_relative_eq!(
                b.inertia.y,
                r * r * (15.0 * l + 16.0 * r) / (30.0 * l + 40.0 * r),
                max_relative = 1e-6
            );
            assert_relative_eq!(b.radius_around_centroid, l / 2.0 + r, max_relative = 1e-6);
            assert_relative_eq!(b.margin, r, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_disc_closed_form_sweep() {
        let mut rng = StdRng::seed_from_u64(31);
        for _ in 0..32 {
            let r = rng.gen_range(0.5..3.0);
            let l = rng.gen_range(0.02..0.4);
            let node = ShapeNode::with_material(
                "wheel",
                Shape::Disc {
                    radius: r,
                    length: l,
                },
                0,
            );
            let (bound, _) = build(&node);
            let b = bound.unwrap();
            assert_relative_eq!(b.volume, PI * r * r * l, max_relative = 1e-6);
            assert_relative_eq!(
                b.inertia.x,
                l * l / 12.0 + r * r / 4.0,
                max_relative = 1e-6
            );
            assert_relative_eq!(b.inertia.y, r * r / 2.0, max_relative = 1e-6);
            assert_relative_eq!(b.radius_around_centroid, r, max_relative = 1e-6);
            assert_relative_eq!(b.margin, l / 2.0, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_disc_margin_rule() {
        let node = ShapeNode::with_material(
            "wheel",
            Shape::Disc {
                radius: 0.4,
                length: 0.1,
            },
            0,
        );
        let (bound, _) = build(&node);
        let b = bound.unwrap();
        assert_relative_eq!(b.margin, 0.05);
        assert_relative_eq!(b.radius_around_centroid, 0.4);
        assert_relative_eq!(b.volume, PI * 0.16 * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_cube_mesh_agrees_with_box() {
        let mesh = cube_mesh(1.0);
        let node = ShapeNode::with_material("hull", Shape::Mesh { mesh }, 0);
        let (bound, _) = build(&node);
        let b = bound.unwrap();
        assert_relative_eq!(b.volume, 8.0, epsilon = 1e-4);
        for k in 0..3 {
            assert_relative_eq!(b.inertia[k], 2.0 / 3.0, epsilon = 1e-3);
        }
        assert_relative_eq!(b.margin, 0.025);
        assert_relative_eq!(b.cg.coords.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_box_composite_scenario() {
        let mut a = unit_box("a");
        a.transform = Transform34::from_translation(Vec3::new(-1.0, 0.0, 0.0));
        let mut b = unit_box("b");
        b.transform = Transform34::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let node = ShapeNode::bare(
            "pair",
            Shape::Composite {
                children: vec![a, b],
            },
        );
        let (bound, sink) = build(&node);
        let c = bound.unwrap();
        assert!(sink.warnings.is_empty());
        assert_relative_eq!(c.volume, 2.0, epsilon = 1e-12);
        assert_relative_eq!(c.cg.coords.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.inertia.x, 1.0 / 6.0, epsilon = 1e-12);
        // Transverse axes pick up the parallel-axis unit offsets.
        assert_relative_eq!(c.inertia.y, 1.0 / 6.0 + 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.inertia.z, 1.0 / 6.0 + 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.margin, 0.0);
        assert_relative_eq!(c.extent_min.x, -1.5, epsilon = 1e-12);
        assert_relative_eq!(c.extent_max.x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_composite_skips_failed_child() {
        let bad = ShapeNode::with_material("bad", Shape::Sphere { radius: -1.0 }, 0);
        let good = unit_box("good");
        let node = ShapeNode::bare(
            "mixed",
            Shape::Composite {
                children: vec![bad, good],
            },
        );
        let (bound, sink) = build(&node);
        let c = bound.unwrap();
        assert_eq!(sink.warnings.len(), 1);
        assert!(sink.warnings[0].starts_with("bad:"));
        assert_eq!(c.children.len(), 2);
        assert!(c.children[0].bound.is_none());
        assert!(c.children[1].bound.is_some());
        assert_relative_eq!(c.volume, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_only_valid_in_composite() {
        let plane = ShapeNode::with_material(
            "ground",
            Shape::Plane {
                point: Point3::origin(),
                normal: Vec3::new(0.0, 0.0, 1.0),
            },
            0,
        );
        let (bound, sink) = build(&plane);
        assert!(bound.is_none());
        assert_eq!(sink.warnings.len(), 1);

        let node = ShapeNode::bare(
            "world",
            Shape::Composite {
                children: vec![ShapeNode::with_material(
                    "ground",
                    Shape::Plane {
                        point: Point3::origin(),
                        normal: Vec3::new(0.0, 0.0, 1.0),
                    },
                    0,
                )],
            },
        );
        let (bound, sink) = build(&node);
        assert!(bound.unwrap().children[0].bound.is_some());
        assert!(sink.warnings.is_empty());
    }

    #[test]
    fn test_missing_material_warns() {
        let node = ShapeNode::bare(
            "bare",
            Shape::Sphere { radius: 1.0 },
        );
        let (bound, sink) = build(&node);
        assert!(bound.is_none());
        assert_eq!(sink.warnings.len(), 1);
        assert!(sink.warnings[0].contains("material"));
    }

    #[test]
    fn test_non_collision_material_warns() {
        let ctx = BuildContext {
            materials: vec![MaterialInfo {
                name: "emissive_glow".into(),
                is_collision: false,
            }],
        };
        let node = ShapeNode::with_material("lamp", Shape::Sphere { radius: 1.0 }, 0);
        let mut sink = CollectSink::default();
        let mut rng = StdRng::seed_from_u64(1);
        let bound = build_bound(&node, &ctx, &mut sink, &mut rng);
        assert!(bound.is_none());
        assert!(sink.warnings[0].contains("emissive_glow"));
    }

    #[test]
    fn test_root_translation_baked() {
        let mut node = unit_box("offset");
        node.transform = Transform34::from_translation(Vec3::new(3.0, 0.0, 0.0));
        let (bound, sink) = build(&node);
        let b = bound.unwrap();
        assert!(sink.warnings.is_empty());
        assert_relative_eq!(b.cg.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(b.centroid.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(b.transform.translation_part().norm(), 0.0);
    }

    #[test]
    fn test_root_rotation_warns() {
        let mut node = unit_box("tilted");
        let rot = nalgebra::Rotation3::from_axis_angle(&nalgebra::Vector3::z_axis(), 0.5);
        node.transform = Transform34::from_parts(rot.into_inner(), Vec3::zeros());
        let (bound, sink) = build(&node);
        assert!(bound.is_some());
        assert_eq!(sink.warnings.len(), 1);
        assert!(sink.warnings[0].contains("rotation"));
    }

    #[test]
    fn test_bvh_sphere_growth() {
        let mesh = cube_mesh(0.5);
        let mut far_sphere = ShapeNode::with_material("orb", Shape::Sphere { radius: 0.25 }, 0);
        far_sphere.transform = Transform34::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let node = ShapeNode::with_material(
            "bvh",
            Shape::Bvh {
                mesh,
                prims: vec![far_sphere],
            },
            0,
        );
        let (bound, _) = build(&node);
        let b = bound.unwrap();
        assert_eq!(b.kind, BoundKind::Bvh);
        assert_relative_eq!(b.margin, 0.04);
        // The sphere at x = 5 with radius 0.25 must be inside.
        let d = (Point3::new(5.0, 0.0, 0.0) - b.centroid).norm() + 0.25;
        assert!(b.radius_around_centroid >= d - 1e-9);
    }

    #[test]
    fn test_empty_mesh_warns() {
        let mesh = TriMesh {
            positions: vec![Point3::origin()],
            indices: Vec::new(),
            colors: None,
            materials: None,
        };
        let node = ShapeNode::with_material("empty", Shape::Mesh { mesh }, 0);
        let (bound, sink) = build(&node);
        assert!(bound.is_none());
        assert_eq!(sink.warnings.len(), 1);
    }

    #[test]
    fn test_composite_flags_passthrough() {
        let mut child = unit_box("flagged");
        child.type_flags = Some(CollisionFlags::MAP | CollisionFlags::TEST_WEAPON);
        child.include_flags = Some(CollisionFlags::all());
        let node = ShapeNode::bare(
            "comp",
            Shape::Composite {
                children: vec![child],
            },
        );
        let (bound, _) = build(&node);
        let c = bound.unwrap();
        assert_eq!(
            c.children[0].type_flags,
            Some(CollisionFlags::MAP | CollisionFlags::TEST_WEAPON)
        );
        // Flag bitsets survive serialization.
        let json = serde_json::to_string(&c).unwrap();
        let back: Bound = serde_json::from_str(&json).unwrap();
        assert_eq!(back.children[0].type_flags, c.children[0].type_flags);
        assert_eq!(back.children[0].include_flags, Some(CollisionFlags::all()));
    }

    #[test]
    fn test_bound_serde_round_trip() {
        let node = ShapeNode::with_material(
            "caps",
            Shape::Capsule {
                radius: 0.5,
                length: 2.0,
            },
            0,
        );
        let (bound, _) = build(&node);
        let bound = bound.unwrap();
        let json = serde_json::to_string(&bound).unwrap();
        let back: Bound = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bound);
    }

    fn cube_mesh(half: f64) -> TriMesh {
        let h = half;
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let positions = vec![
            p(-h, -h, -h),
            p(h, -h, -h),
            p(h, h, -h),
            p(-h, h, -h),
            p(-h, -h, h),
            p(h, -h, h),
            p(h, h, h),
            p(-h, h, h),
        ];
        let indices = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        TriMesh::new(positions, indices).unwrap()
    }
}
