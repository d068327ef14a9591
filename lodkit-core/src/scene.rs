//! Scene: the root container the LOD pipeline transforms

use crate::{EmbeddedTexture, Material, Mesh};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// A node in the scene hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub transform: Matrix4<f32>,
    /// Indices into the scene's mesh table
    pub mesh_indices: Vec<u32>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            mesh_indices: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// A complete in-memory scene.
///
/// The scene exclusively owns its meshes, materials, embedded textures,
/// and node hierarchy. `Clone` is a deep copy; the LOD orchestrator clones
/// the source scene once per ratio and mutates only the clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub embedded_textures: Vec<EmbeddedTexture>,
    pub root: Node,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            materials: Vec::new(),
            embedded_textures: Vec::new(),
            root: Node::new("root"),
        }
    }

    /// Resolve a material texture path to an embedded texture index.
    ///
    /// `"*N"` paths resolve by index; any other path resolves when its
    /// leaf name matches an embedded texture's filename. Returns `None`
    /// for external file references.
    pub fn lookup_embedded(&self, path: &str) -> Option<usize> {
        if let Some(index_str) = path.strip_prefix('*') {
            let index: usize = index_str.parse().ok()?;
            return (index < self.embedded_textures.len()).then_some(index);
        }
        let leaf = leaf_name(path);
        self.embedded_textures.iter().position(|texture| {
            texture
                .filename
                .as_deref()
                .is_some_and(|filename| leaf_name(filename) == leaf)
        })
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Final path component, treating both separators as such
pub fn leaf_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
