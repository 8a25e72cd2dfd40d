//! Triangle adjacency over shared edges.

use crate::TriMesh;
use std::collections::BTreeMap;

/// Sentinel neighbor index for a boundary edge.
pub const NO_NEIGHBOR: i32 = -1;

/// For each triangle, the indices of its three edge neighbors, or
/// [`NO_NEIGHBOR`] where the edge has no partner.
///
/// Entry `k` of a triangle's row is the neighbor across the edge from
/// corner `k` to corner `k + 1`. A neighbor is the triangle carrying the
/// same two vertices as a directed edge in the opposite order, which is
/// how consistently wound meshes share edges. When more than one face
/// claims the same directed edge (non-manifold input), the lowest face
/// index wins, keeping the table deterministic.
pub fn triangle_adjacency(mesh: &TriMesh) -> Vec<[i32; 3]> {
    let mut directed: BTreeMap<(u32, u32), i32> = BTreeMap::new();
    for (t, &[a, b, c]) in mesh.indices.iter().enumerate() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            directed.entry((u, v)).or_insert(t as i32);
        }
    }

    let mut adjacency = vec![[NO_NEIGHBOR; 3]; mesh.num_triangles()];
    for (t, &[a, b, c]) in mesh.indices.iter().enumerate() {
        for (k, (u, v)) in [(a, b), (b, c), (c, a)].into_iter().enumerate() {
            if let Some(&other) = directed.get(&(v, u)) {
                if other != t as i32 {
                    adjacency[t][k] = other;
                }
            }
        }
    }
    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::cube;
    use rigkit_math::Point3;

    #[test]
    fn test_cube_fully_matched() {
        let m = cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let adj = triangle_adjacency(&m);
        for row in &adj {
            for &n in row {
                assert_ne!(n, NO_NEIGHBOR);
            }
        }
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let m = cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let adj = triangle_adjacency(&m);
        for (t, row) in adj.iter().enumerate() {
            for &n in row {
                assert!(adj[n as usize].contains(&(t as i32)));
            }
        }
    }

    #[test]
    fn test_open_fan_has_boundary() {
        // Two triangles sharing one edge; the outer edges are boundary.
        let m = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();
        let adj = triangle_adjacency(&m);
        assert_eq!(adj[0], [NO_NEIGHBOR, NO_NEIGHBOR, 1]);
        assert_eq!(adj[1], [0, NO_NEIGHBOR, NO_NEIGHBOR]);
    }
}
