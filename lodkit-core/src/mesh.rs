//! Mesh data structures and functionality

use crate::{Point3f, Vector3f};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Maximum number of UV channels a mesh can carry
pub const MAX_UV_CHANNELS: usize = 8;

/// Maximum number of vertex color channels a mesh can carry
pub const MAX_COLOR_CHANNELS: usize = 8;

/// Primitive topology of a mesh.
///
/// Import splits mixed-topology geometry into one mesh per kind; the
/// simplifier only acts on `Triangles` and passes everything else through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Triangles,
    Lines,
    Points,
    Mixed,
}

/// A single bone → vertex influence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

/// A skeleton bone with its vertex influences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Mesh space → bone space bind transform
    pub offset_matrix: Matrix4<f32>,
    pub weights: Vec<VertexWeight>,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset_matrix: Matrix4::identity(),
            weights: Vec::new(),
        }
    }
}

/// One UV channel.
///
/// `components` is 2 or 3; coordinates always store three floats and the
/// third is ignored when `components == 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvChannel {
    pub components: u8,
    pub coords: Vec<[f32; 3]>,
}

impl UvChannel {
    /// A 2-component channel from plain (u, v) pairs
    pub fn from_uvs(uvs: Vec<[f32; 2]>) -> Self {
        Self {
            components: 2,
            coords: uvs.into_iter().map(|[u, v]| [u, v, 0.0]).collect(),
        }
    }
}

/// Tangent-space basis vectors; tangents and bitangents are always paired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangentBasis {
    pub tangents: Vec<Vector3f>,
    pub bitangents: Vec<Vector3f>,
}

/// A mesh with per-vertex attributes, an index buffer, and optional
/// skinning data.
///
/// All per-vertex arrays that are present have the same length as
/// `positions`, every index is below that length, and every bone weight
/// references a live vertex. The simplifier preserves these invariants
/// across destructive rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
    pub tangent_basis: Option<TangentBasis>,
    pub uv_channels: Vec<UvChannel>,
    pub color_channels: Vec<Vec<[f32; 4]>>,
    /// Vertex indices; grouped as triangles when `primitive_kind` is
    /// `Triangles`, as pairs for `Lines`, single for `Points`.
    pub indices: Vec<u32>,
    pub primitive_kind: PrimitiveKind,
    /// Index into the owning scene's material table
    pub material_index: u32,
    pub bones: Vec<Bone>,
}

impl Mesh {
    /// Create a new empty triangle mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
            normals: None,
            tangent_basis: None,
            uv_channels: Vec::new(),
            color_channels: Vec::new(),
            indices: Vec::new(),
            primitive_kind: PrimitiveKind::Triangles,
            material_index: 0,
            bones: Vec::new(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles (zero for non-triangle meshes)
    pub fn triangle_count(&self) -> usize {
        if self.primitive_kind == PrimitiveKind::Triangles {
            self.indices.len() / 3
        } else {
            0
        }
    }

    /// Check if the mesh has no geometry
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_tangents(&self) -> bool {
        self.tangent_basis.is_some()
    }

    /// Check the cross-array invariants: parallel attribute lengths,
    /// index bounds, and bone weight bounds.
    pub fn is_well_formed(&self) -> bool {
        let v = self.positions.len();
        if let Some(normals) = &self.normals {
            if normals.len() != v {
                return false;
            }
        }
        if let Some(basis) = &self.tangent_basis {
            if basis.tangents.len() != v || basis.bitangents.len() != v {
                return false;
            }
        }
        if self.uv_channels.iter().any(|ch| ch.coords.len() != v) {
            return false;
        }
        if self.color_channels.iter().any(|ch| ch.len() != v) {
            return false;
        }
        if self.indices.iter().any(|&i| i as usize >= v) {
            return false;
        }
        if self.primitive_kind == PrimitiveKind::Triangles && !self.indices.len().is_multiple_of(3)
        {
            return false;
        }
        self.bones
            .iter()
            .flat_map(|b| &b.weights)
            .all(|w| (w.vertex_id as usize) < v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new("tri");
        mesh.positions = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
        ];
        mesh.indices = vec![0, 1, 2];
        mesh
    }

    #[test]
    fn counts() {
        let mesh = triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.is_empty());
        assert!(Mesh::new("empty").is_empty());
    }

    #[test]
    fn non_triangle_meshes_report_zero_triangles() {
        let mut mesh = triangle();
        mesh.primitive_kind = PrimitiveKind::Points;
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn well_formed_detects_short_attribute_arrays() {
        let mut mesh = triangle();
        assert!(mesh.is_well_formed());

        mesh.normals = Some(vec![Vector3f::new(0.0, 0.0, 1.0); 2]);
        assert!(!mesh.is_well_formed());

        mesh.normals = Some(vec![Vector3f::new(0.0, 0.0, 1.0); 3]);
        assert!(mesh.is_well_formed());
    }

    #[test]
    fn well_formed_detects_out_of_range_indices() {
        let mut mesh = triangle();
        mesh.indices = vec![0, 1, 3];
        assert!(!mesh.is_well_formed());
    }

    #[test]
    fn well_formed_detects_dangling_bone_weights() {
        let mut mesh = triangle();
        let mut bone = Bone::new("root");
        bone.weights.push(VertexWeight {
            vertex_id: 7,
            weight: 1.0,
        });
        mesh.bones.push(bone);
        assert!(!mesh.is_well_formed());
    }

    #[test]
    fn uv_channel_from_pairs() {
        let channel = UvChannel::from_uvs(vec![[0.25, 0.75]]);
        assert_eq!(channel.components, 2);
        assert_eq!(channel.coords, vec![[0.25, 0.75, 0.0]]);
    }
}
