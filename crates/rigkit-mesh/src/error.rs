//! Error types for mesh construction.

use thiserror::Error;

/// Errors produced while building a [`TriMesh`](crate::TriMesh) from
/// raw scene data.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Position array length is not a multiple of 3.
    #[error("Position array length {0} is not a multiple of 3")]
    RaggedPositions(usize),

    /// Index array length is not a multiple of 3.
    #[error("Index array length {0} is not a multiple of 3")]
    RaggedIndices(usize),

    /// A triangle references a vertex past the end of the position array.
    #[error("Vertex index {index} out of bounds for {len} vertices")]
    IndexOutOfBounds {
        /// The offending index.
        index: u32,
        /// Number of vertices in the mesh.
        len: u32,
    },

    /// A vertex position contains NaN or infinity.
    #[error("Vertex {0} has a non-finite position")]
    NonFinitePosition(usize),

    /// The mesh has no triangles.
    #[error("Mesh has a zero-length index buffer")]
    EmptyIndexBuffer,
}
