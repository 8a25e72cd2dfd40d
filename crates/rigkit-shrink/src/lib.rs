#![warn(missing_docs)]

//! Mesh shrink: inset vertex generation for collision meshes.
//!
//! The runtime stores collision meshes with a margin skin; the stored
//! vertices must sit *inside* the authored surface by that margin so the
//! inflated shape reproduces the original. This engine displaces every
//! vertex inward along a normal blended from its 1-ring of faces, checks
//! the displaced set for self-intersection, and halves the margin until
//! an attempt survives.

use rigkit_math::{tol, Point3, Vec3};
use rigkit_mesh::{triangle_adjacency, TriMesh, NO_NEIGHBOR};

/// Result of a shrink pass.
#[derive(Debug, Clone)]
pub struct ShrinkResult {
    /// The inset vertex set, parallel to the input positions.
    pub positions: Vec<Point3>,
    /// The margin the reported vertices were inset by, clamped to the
    /// runtime floor of 0.025.
    pub margin: f64,
    /// False when every attempt self-intersected and the original
    /// positions were reported unchanged.
    pub converged: bool,
}

/// Shrink `mesh` inward by at most `desired_margin`.
///
/// The starting margin is `min(desired, 0.04, smallest half-extent)`;
/// each failed attempt halves it, giving up below 1e-6. The "pick the
/// displacement farthest from the original vertex" rule in the corner
/// handling is a runtime convention; do not replace it with an
/// average.
pub fn shrink(mesh: &TriMesh, desired_margin: f64) -> ShrinkResult {
    let half_extent = mesh
        .aabb()
        .map(|(min, max)| {
            let he = (max - min) / 2.0;
            he.x.min(he.y).min(he.z)
        })
        .unwrap_or(tol::DEFAULT_MARGIN);

    let mut margin = desired_margin.min(tol::DEFAULT_MARGIN).min(half_extent);
    let adjacency = triangle_adjacency(mesh);
    let rings = vertex_rings(mesh, &adjacency);

    while margin >= tol::SHRINK_MIN_MARGIN {
        if let Some(positions) = try_shrink(mesh, &rings, margin) {
            return ShrinkResult {
                positions,
                margin: margin.max(tol::MARGIN_FLOOR),
                converged: true,
            };
        }
        margin /= 2.0;
    }

    ShrinkResult {
        positions: mesh.positions.clone(),
        margin: tol::MARGIN_FLOOR,
        converged: false,
    }
}

/// The 1-ring of faces around each vertex: the vertex's own face first,
/// then the neighbors reached by walking the adjacency table around the
/// vertex (both directions when a boundary interrupts the walk).
fn vertex_rings(mesh: &TriMesh, adjacency: &[[i32; 3]]) -> Vec<Vec<usize>> {
    let mut first_face = vec![None; mesh.positions.len()];
    for (t, tri) in mesh.indices.iter().enumerate() {
        for &v in tri {
            let slot = &mut first_face[v as usize];
            if slot.is_none() {
                *slot = Some(t);
            }
        }
    }

    let mut rings = Vec::with_capacity(mesh.positions.len());
    for (v, start) in first_face.iter().enumerate() {
        let Some(start) = *start else {
            rings.push(Vec::new());
            continue;
        };
        let mut ring = vec![start];
        // Forward: cross the edge leaving the vertex; backward: cross
        // the edge arriving at it.
        for leaving in [true, false] {
            let mut current = start;
            loop {
                let Some(corner) = corner_of(mesh, current, v as u32) else {
                    break;
                };
                let edge = if leaving { corner } else { (corner + 2) % 3 };
                let next = adjacency[current][edge];
                if next == NO_NEIGHBOR {
                    break;
                }
                let next = next as usize;
                if ring.contains(&next) {
                    break;
                }
                ring.push(next);
                current = next;
            }
        }
        rings.push(ring);
    }
    rings
}

fn corner_of(mesh: &TriMesh, face: usize, vertex: u32) -> Option<usize> {
    mesh.indices[face].iter().position(|&i| i == vertex)
}

fn try_shrink(mesh: &TriMesh, rings: &[Vec<usize>], margin: f64) -> Option<Vec<Point3>> {
    let normals: Vec<Vec3> = (0..mesh.num_triangles())
        .map(|t| mesh.face_normal(t))
        .collect();

    let mut shrunk = mesh.positions.clone();
    for (v, ring) in rings.iter().enumerate() {
        let displacement = match ring.len() {
            0 => Vec3::zeros(),
            1 => -margin * normals[ring[0]],
            2 => {
                let own = normals[ring[0]];
                let other = normals[ring[1]];
                let cross = own.cross(&other);
                if cross.norm_squared() < 0.1 {
                    // Nearly coplanar pair: the own normal is enough.
                    -margin * own
                } else {
                    // Wide corner: a virtual normal spans the missing
                    // third direction.
                    let virtual_n = cross / cross.norm();
                    corner_displacement(&[own, other, virtual_n], margin)
                }
            }
            _ => {
                let ring_normals: Vec<Vec3> = ring.iter().map(|&f| normals[f]).collect();
                corner_displacement(&ring_normals, margin)
            }
        };
        shrunk[v] += displacement;
    }

    if self_intersects(mesh, &shrunk) {
        None
    } else {
        Some(shrunk)
    }
}

/// Displacement for a vertex surrounded by `normals` (the own face's
/// normal first). Starts from the averaged normal, then searches every
/// normal triple for a well-conditioned weighted normal, keeping the
/// candidate that moves the vertex farthest.
fn corner_displacement(normals: &[Vec3], margin: f64) -> Vec3 {
    let mut avg = Vec3::zeros();
    for n in normals {
        avg += n;
    }
    let len = avg.norm();
    if len > 0.0 {
        avg /= len;
    }
    let mut best = -margin * avg;
    let mut best_dist = best.norm();

    for i in 0..normals.len() {
        for j in (i + 1)..normals.len() {
            for k in (j + 1)..normals.len() {
                let (n1, n2, n3) = (normals[i], normals[j], normals[k]);
                let d = n1.dot(&n2.cross(&n3));
                if d.abs() <= 0.25 {
                    continue;
                }
                let weighted = (n2.cross(&n3) + n3.cross(&n1) + n1.cross(&n2)) / d;
                let candidate = -margin * weighted;
                let dist = candidate.norm();
                if dist > best_dist {
                    best = candidate;
                    best_dist = dist;
                }
            }
        }
    }
    best
}

/// Does any original→shrunk vertex segment cross a face that does not
/// touch that vertex? Both the original and the shrunk face positions
/// are tested.
fn self_intersects(mesh: &TriMesh, shrunk: &[Point3]) -> bool {
    for v in 0..mesh.positions.len() {
        let origin = mesh.positions[v];
        let dir = shrunk[v] - origin;
        let len = dir.norm();
        if len <= 0.0 {
            continue;
        }
        for (t, tri) in mesh.indices.iter().enumerate() {
            if tri.contains(&(v as u32)) {
                continue;
            }
            let orig_tri = mesh.triangle(t);
            let shrunk_tri = [
                shrunk[tri[0] as usize],
                shrunk[tri[1] as usize],
                shrunk[tri[2] as usize],
            ];
            for candidate in [&orig_tri, &shrunk_tri] {
                if let Some(hit) = segment_triangle(&origin, &dir, candidate) {
                    if hit <= 1.0 {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Möller–Trumbore. Returns the ray parameter of the hit (`0..` along
/// `dir`), or `None` when the segment misses or runs parallel.
fn segment_triangle(origin: &Point3, dir: &Vec3, tri: &[Point3; 3]) -> Option<f64> {
    const EPS: f64 = 1e-12;
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - tri[0];
    let u = s.dot(&p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&q) * inv;
    if t < EPS {
        return None;
    }
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(half: f64) -> TriMesh {
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

    #[test]
    fn test_cube_shrinks_inward() {
        let mesh = cube(1.0);
        let result = shrink(&mesh, 0.04);
        assert!(result.converged);
        // Every shrunk vertex stays inside the original hull and moves
        // strictly inward.
        for (orig, new) in mesh.positions.iter().zip(&result.positions) {
            assert!(new.coords.norm() < orig.coords.norm());
            for k in 0..3 {
                assert!(new[k].abs() <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_cube_corner_distance() {
        // At a box corner the weighted-normal rule moves the vertex by
        // margin along each axis, not by margin along the diagonal.
        let mesh = cube(1.0);
        let m = 0.04;
        let result = shrink(&mesh, m);
        for (orig, new) in mesh.positions.iter().zip(&result.positions) {
            for k in 0..3 {
                assert_relative_eq!(new[k].abs(), orig[k].abs() - m, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_margin_reported_with_floor() {
        let mesh = cube(1.0);
        let result = shrink(&mesh, 0.001);
        // A 1e-3 margin succeeds immediately but reports the floor.
        assert!(result.converged);
        assert_relative_eq!(result.margin, 0.025);
    }

    #[test]
    fn test_margin_capped_by_half_extent() {
        let mesh = cube(0.01);
        let result = shrink(&mesh, 0.04);
        // Starting margin is the 0.01 half-extent (or a halving of it),
        // never the requested 0.04.
        for p in &result.positions {
            for k in 0..3 {
                assert!(p[k].abs() <= 0.01 + 1e-9);
            }
        }
    }

    #[test]
    fn test_no_segment_crosses_nonincident_face() {
        let mesh = cube(1.0);
        let result = shrink(&mesh, 0.04);
        assert!(result.converged);
        assert!(!self_intersects(&mesh, &result.positions));
    }

    #[test]
    fn test_segment_triangle_hit() {
        let tri = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let t = segment_triangle(
            &Point3::new(0.0, 0.0, 1.0),
            &Vec3::new(0.0, 0.0, -2.0),
            &tri,
        );
        assert_relative_eq!(t.unwrap(), 0.5, epsilon = 1e-12);
        let miss = segment_triangle(
            &Point3::new(5.0, 0.0, 1.0),
            &Vec3::new(0.0, 0.0, -2.0),
            &tri,
        );
        assert!(miss.is_none());
    }
}
