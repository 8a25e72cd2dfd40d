#![warn(missing_docs)]

//! Triangle-mesh geometry for the rigkit asset engines.
//!
//! Provides the mesh container consumed by the bound builder and the
//! shrink engine, plus the pure geometric queries the pipeline needs:
//! closed-manifold detection, signed-tetrahedron mass properties, the
//! smallest enclosing sphere (Welzl), and triangle adjacency.

mod adjacency;
mod error;
mod mass;
mod sphere;

pub use adjacency::{triangle_adjacency, NO_NEIGHBOR};
pub use error::MeshError;
pub use mass::{mass_properties, MeshMassProps};
pub use sphere::{aabb_sphere, enclosing_sphere, Sphere};

use rigkit_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An indexed triangle mesh in local space.
///
/// Positions are widened to `f64` at construction; the input descriptor
/// from the scene collaborator is `f32`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriMesh {
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Triangle list, three vertex indices per face.
    pub indices: Vec<[u32; 3]>,
    /// Optional per-vertex RGBA8 colors, parallel to `positions`.
    pub colors: Option<Vec<[u8; 4]>>,
    /// Optional per-triangle material indices, parallel to `indices`.
    pub materials: Option<Vec<u32>>,
}

impl TriMesh {
    /// Build a mesh from positions and a flat triangle index list.
    pub fn new(positions: Vec<Point3>, indices: Vec<[u32; 3]>) -> Result<Self, MeshError> {
        let mesh = Self {
            positions,
            indices,
            colors: None,
            materials: None,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Build a mesh from the raw scene descriptor: a dense `f32` position
    /// array (`x0 y0 z0 x1 ...`) and a flat `u32` triangle index array.
    pub fn from_raw(positions: &[f32], indices: &[u32]) -> Result<Self, MeshError> {
        if positions.len() % 3 != 0 {
            return Err(MeshError::RaggedPositions(positions.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(indices.len()));
        }
        let positions: Vec<Point3> = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64))
            .collect();
        let indices: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::new(positions, indices)
    }

    fn validate(&self) -> Result<(), MeshError> {
        if self.indices.is_empty() {
            return Err(MeshError::EmptyIndexBuffer);
        }
        let n = self.positions.len() as u32;
        for tri in &self.indices {
            for &i in tri {
                if i >= n {
                    return Err(MeshError::IndexOutOfBounds { index: i, len: n });
                }
            }
        }
        for (i, p) in self.positions.iter().enumerate() {
            if !p.coords.iter().all(|c| c.is_finite()) {
                return Err(MeshError::NonFinitePosition(i));
            }
        }
        Ok(())
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// The three corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.indices[i];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Unit normal of triangle `i`, or zero for a degenerate face.
    pub fn face_normal(&self, i: usize) -> Vec3 {
        let [a, b, c] = self.triangle(i);
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len > 0.0 {
            n / len
        } else {
            Vec3::zeros()
        }
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    pub fn aabb(&self) -> Option<(Point3, Point3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions[1..] {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        Some((min, max))
    }

    /// Signed volume: Σ v₀·(v₁×v₂)/6 over all triangles. Positive for a
    /// closed mesh with outward (right-handed) winding.
    pub fn signed_volume(&self) -> f64 {
        self.indices
            .iter()
            .map(|&[a, b, c]| {
                let v0 = self.positions[a as usize].coords;
                let v1 = self.positions[b as usize].coords;
                let v2 = self.positions[c as usize].coords;
                v0.dot(&v1.cross(&v2)) / 6.0
            })
            .sum()
    }

    /// Enclosed volume (absolute value of [`signed_volume`](Self::signed_volume)).
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Whether the mesh is a closed manifold: every undirected edge is
    /// shared by exactly two faces. Boundary edges (one face) and
    /// non-manifold edges (three or more) both disqualify it.
    pub fn is_solid(&self) -> bool {
        if self.indices.is_empty() {
            return false;
        }
        let mut edge_faces: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        for &[a, b, c] in &self.indices {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let key = if u < v { (u, v) } else { (v, u) };
                *edge_faces.entry(key).or_insert(0) += 1;
            }
        }
        edge_faces.values().all(|&count| count == 2)
    }
}


#[cfg(test)]
mod tests {
    use super::test_meshes::cube;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_volume() {
        let m = cube(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(m.volume(), 8.0, epsilon = 1e-12);
        assert!(m.signed_volume() > 0.0);
    }

    #[test]
    fn test_cube_is_solid() {
        let m = cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(m.is_solid());
    }

    #[test]
    fn test_open_cube_is_not_solid() {
        let mut m = cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        m.indices.pop();
        assert!(!m.is_solid());
    }

    #[test]
    fn test_mesh_equality_and_serde_round_trip() {
        let mut m = cube(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        m.materials = Some(vec![0; m.indices.len()]);
        let json = serde_json::to_string(&m).unwrap();
        let back: TriMesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        let mut other = m.clone();
        other.positions[0].x += 0.25;
        assert_ne!(other, m);
    }

    #[test]
    fn test_from_raw() {
        let m = TriMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        )
        .unwrap();
        assert_eq!(m.num_triangles(), 1);
        assert_relative_eq!(m.face_normal(0).z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_raw_rejects_bad_index() {
        let err = TriMesh::from_raw(&[0.0, 0.0, 0.0], &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_rejects_nan_position() {
        let err = TriMesh::from_raw(
            &[f32::NAN, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::NonFinitePosition(0)));
    }

    #[test]
    fn test_empty_index_buffer_rejected() {
        let err = TriMesh::from_raw(&[0.0, 0.0, 0.0], &[]).unwrap_err();
        assert!(matches!(err, MeshError::EmptyIndexBuffer));
    }

    #[test]
    fn test_aabb() {
        let m = cube(Point3::new(-2.0, 0.0, 1.0), Point3::new(3.0, 4.0, 5.0));
        let (min, max) = m.aabb().unwrap();
        assert_relative_eq!(min.x, -2.0);
        assert_relative_eq!(max.z, 5.0);
    }
}
