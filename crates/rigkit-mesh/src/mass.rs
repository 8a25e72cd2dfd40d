//! Constant-density mass properties of a triangle soup.
//!
//! Volume and center of gravity come from signed tetrahedra against the
//! origin. Inertia uses the exact tetrahedron second moments (Tonon's
//! formulas) accumulated per triangle about the center of gravity. Only
//! the diagonal of the tensor is retained; the runtime's bound format
//! stores diagonal inertia per unit mass.

use crate::TriMesh;
use rigkit_math::{Point3, Vec3};

/// Mass properties of a triangle mesh under unit density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshMassProps {
    /// Enclosed volume.
    pub volume: f64,
    /// Center of gravity.
    pub cg: Point3,
    /// Diagonal of the inertia tensor about `cg`, per unit mass.
    pub inertia: Vec3,
}

/// Compute volume, center of gravity, and diagonal inertia for `mesh`.
///
/// For a closed oriented manifold the CoG is the volume-weighted mean of
/// tetrahedron centroids; for an open or non-manifold soup it falls back
/// to the area-weighted mean of triangle centroids. Inertia is always
/// the tetrahedron accumulation about the CoG, normalized by volume;
/// a zero-volume soup yields zero inertia.
pub fn mass_properties(mesh: &TriMesh) -> MeshMassProps {
    let vol_signed: f64 = mesh.signed_volume();
    let volume = vol_signed.abs();

    let cg = if mesh.is_solid() && vol_signed.abs() > 0.0 {
        // Tetrahedron centroid is (0 + v0 + v1 + v2) / 4, weighted by
        // the tetrahedron's signed volume.
        let mut acc = Vec3::zeros();
        for i in 0..mesh.num_triangles() {
            let [a, b, c] = mesh.triangle(i);
            let sv = a.coords.dot(&b.coords.cross(&c.coords)) / 6.0;
            acc += (a.coords + b.coords + c.coords) / 4.0 * sv;
        }
        Point3::from(acc / vol_signed)
    } else {
        area_weighted_centroid(mesh)
    };

    let inertia = if volume > 0.0 {
        let mut ixx = 0.0;
        let mut iyy = 0.0;
        let mut izz = 0.0;
        for i in 0..mesh.num_triangles() {
            let a = mesh.triangle(i)[0] - cg;
            let b = mesh.triangle(i)[1] - cg;
            let c = mesh.triangle(i)[2] - cg;
            let sv = a.dot(&b.cross(&c)) / 6.0;
            let sx = second_moment(a.x, b.x, c.x);
            let sy = second_moment(a.y, b.y, c.y);
            let sz = second_moment(a.z, b.z, c.z);
            ixx += sv * (sy + sz) / 10.0;
            iyy += sv * (sz + sx) / 10.0;
            izz += sv * (sx + sy) / 10.0;
        }
        // Signed accumulation cancels the winding sign on division;
        // clamp residual negatives from cancellation noise.
        Vec3::new(
            (ixx / vol_signed).max(0.0),
            (iyy / vol_signed).max(0.0),
            (izz / vol_signed).max(0.0),
        )
    } else {
        Vec3::zeros()
    };

    MeshMassProps {
        volume,
        cg,
        inertia,
    }
}

/// Σᵢ xᵢ² + Σᵢ<ⱼ xᵢxⱼ over the three triangle corners. The fourth
/// tetrahedron vertex sits at the origin and contributes nothing.
fn second_moment(x0: f64, x1: f64, x2: f64) -> f64 {
    x0 * x0 + x1 * x1 + x2 * x2 + x0 * x1 + x0 * x2 + x1 * x2
}

fn area_weighted_centroid(mesh: &TriMesh) -> Point3 {
    let mut acc = Vec3::zeros();
    let mut total_area = 0.0;
    for i in 0..mesh.num_triangles() {
        let [a, b, c] = mesh.triangle(i);
        let area = (b - a).cross(&(c - a)).norm() / 2.0;
        acc += (a.coords + b.coords + c.coords) / 3.0 * area;
        total_area += area;
    }
    if total_area > 0.0 {
        Point3::from(acc / total_area)
    } else {
        Point3::origin()
    }
}
