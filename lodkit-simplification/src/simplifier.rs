//! Attribute-aware edge collapse simplification
//!
//! Wraps the meshopt edge-collapse kernel with the bookkeeping a full
//! scene mesh needs: every optional per-vertex attribute is interleaved
//! into one wide record so that a single remap pass after simplification
//! compacts positions, normals, tangents, UV channels, color channels,
//! and bone weights in lockstep.
//!
//! The kernel itself only ever sees two compact views of the mesh: a
//! tightly packed float3 position array (the kernel rejects position
//! strides above 256 bytes, which the wide record exceeds) and a
//! weighted attribute bundle of at most 32 components. All three views
//! share vertex identity by index.

use lodkit_core::{
    Mesh, Point3f, PrimitiveKind, TangentBasis, UvChannel, Vector3f, MAX_COLOR_CHANNELS,
    MAX_UV_CHANNELS,
};
use meshopt::{SimplifyOptions, VertexDataAdapter};

/// Kernel limit on the number of attribute components
const MAX_KERNEL_ATTRIBUTES: usize = 32;

/// Relative error target passed to the kernel
const TARGET_ERROR: f32 = 0.01;

/// Overdraw optimizer threshold: accept up to 5% worse vertex-cache
/// efficiency in exchange for less overdraw
const OVERDRAW_THRESHOLD: f32 = 1.05;

/// Quadric weight of the primary UV channel
const PRIMARY_UV_WEIGHT: f32 = 1.5;

/// Quadric weight of secondary UV channels
const SECONDARY_UV_WEIGHT: f32 = 0.8;

/// Quadric weight of normal components
const NORMAL_WEIGHT: f32 = 0.5;

/// Remap table entry for vertices no longer referenced
const UNUSED: u32 = u32::MAX;

const POSITION_STRIDE: usize = 3 * std::mem::size_of::<f32>();

/// Outcome of one [`simplify`] call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimplifyResult {
    pub original_triangles: u32,
    pub simplified_triangles: u32,
    /// Scalar error reported by the kernel (relative to mesh extents)
    pub error: f32,
}

// ============================================================
// Mesh layout and the interleaved vertex record
// ============================================================

/// Which optional attribute arrays a mesh carries
#[derive(Debug, Clone, Default)]
struct MeshLayout {
    has_normals: bool,
    has_tangents: bool,
    /// Component count (2 or 3) per present UV channel
    uv_components: Vec<u8>,
    color_channels: usize,
}

fn detect_layout(mesh: &Mesh) -> MeshLayout {
    MeshLayout {
        has_normals: mesh.normals.is_some(),
        has_tangents: mesh.tangent_basis.is_some(),
        uv_components: mesh
            .uv_channels
            .iter()
            .take(MAX_UV_CHANNELS)
            .map(|channel| channel.components)
            .collect(),
        color_channels: mesh.color_channels.len().min(MAX_COLOR_CHANNELS),
    }
}

/// Fixed wide vertex record covering the maximum channel counts.
///
/// Used only for the compaction step; never handed to the kernel.
#[derive(Debug, Clone, Copy)]
struct PackedVertex {
    position: [f32; 3],
    normal: [f32; 3],
    tangent: [f32; 3],
    bitangent: [f32; 3],
    uv: [[f32; 3]; MAX_UV_CHANNELS],
    color: [[f32; 4]; MAX_COLOR_CHANNELS],
}

impl PackedVertex {
    const ZERO: PackedVertex = PackedVertex {
        position: [0.0; 3],
        normal: [0.0; 3],
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
        uv: [[0.0; 3]; MAX_UV_CHANNELS],
        color: [[0.0; 4]; MAX_COLOR_CHANNELS],
    };
}

fn pack_vertices(mesh: &Mesh) -> Vec<PackedVertex> {
    let vertex_count = mesh.positions.len();
    let mut vertices = vec![PackedVertex::ZERO; vertex_count];

    for (i, vertex) in vertices.iter_mut().enumerate() {
        let p = mesh.positions[i];
        vertex.position = [p.x, p.y, p.z];

        if let Some(normals) = &mesh.normals {
            let n = normals[i];
            vertex.normal = [n.x, n.y, n.z];
        }
        if let Some(basis) = &mesh.tangent_basis {
            let t = basis.tangents[i];
            let b = basis.bitangents[i];
            vertex.tangent = [t.x, t.y, t.z];
            vertex.bitangent = [b.x, b.y, b.z];
        }
        for (channel, slot) in mesh.uv_channels.iter().zip(vertex.uv.iter_mut()) {
            *slot = channel.coords[i];
        }
        for (channel, slot) in mesh.color_channels.iter().zip(vertex.color.iter_mut()) {
            *slot = channel[i];
        }
    }

    vertices
}

/// Rebuild the mesh attribute arrays from the compacted record buffer,
/// restoring exactly the layout detected before simplification.
fn unpack_vertices(mesh: &mut Mesh, vertices: &[PackedVertex], layout: &MeshLayout) {
    mesh.positions = vertices
        .iter()
        .map(|v| Point3f::new(v.position[0], v.position[1], v.position[2]))
        .collect();

    mesh.normals = layout.has_normals.then(|| {
        vertices
            .iter()
            .map(|v| Vector3f::new(v.normal[0], v.normal[1], v.normal[2]))
            .collect()
    });

    mesh.tangent_basis = layout.has_tangents.then(|| TangentBasis {
        tangents: vertices
            .iter()
            .map(|v| Vector3f::new(v.tangent[0], v.tangent[1], v.tangent[2]))
            .collect(),
        bitangents: vertices
            .iter()
            .map(|v| Vector3f::new(v.bitangent[0], v.bitangent[1], v.bitangent[2]))
            .collect(),
    });

    mesh.uv_channels = layout
        .uv_components
        .iter()
        .enumerate()
        .map(|(channel, &components)| UvChannel {
            components,
            coords: vertices.iter().map(|v| v.uv[channel]).collect(),
        })
        .collect();

    mesh.color_channels = (0..layout.color_channels)
        .map(|channel| vertices.iter().map(|v| v.color[channel]).collect())
        .collect();
}

fn extract_positions(vertices: &[PackedVertex]) -> Vec<f32> {
    let mut positions = Vec::with_capacity(vertices.len() * 3);
    for vertex in vertices {
        positions.extend_from_slice(&vertex.position);
    }
    positions
}

// ============================================================
// Attribute bundle for quality-guided collapse
// ============================================================

/// Compact attribute array handed to the attribute-aware kernel variant
#[derive(Debug, Default)]
struct KernelAttributes {
    data: Vec<f32>,
    weights: Vec<f32>,
    /// Components per vertex; zero means positions-only simplification
    components: usize,
}

impl KernelAttributes {
    fn stride_bytes(&self) -> usize {
        self.components * std::mem::size_of::<f32>()
    }
}

/// Attribute budget: two floats per UV channel in channel order while the
/// budget allows, then three floats for normals if the remainder suffices.
/// The primary UV channel is weighted highest so collapses preferentially
/// preserve the main texture mapping, then shape, then secondary UVs.
fn build_kernel_attributes(vertices: &[PackedVertex], layout: &MeshLayout) -> KernelAttributes {
    let mut uv_channels = 0;
    while uv_channels < layout.uv_components.len()
        && (uv_channels + 1) * 2 <= MAX_KERNEL_ATTRIBUTES
    {
        uv_channels += 1;
    }
    let use_normals = layout.has_normals && uv_channels * 2 + 3 <= MAX_KERNEL_ATTRIBUTES;
    let components = uv_channels * 2 + if use_normals { 3 } else { 0 };

    let mut attributes = KernelAttributes {
        components,
        ..Default::default()
    };
    if components == 0 {
        return attributes;
    }

    attributes.data.reserve(vertices.len() * components);
    for vertex in vertices {
        for uv in &vertex.uv[..uv_channels] {
            attributes.data.extend_from_slice(&uv[..2]);
        }
        if use_normals {
            attributes.data.extend_from_slice(&vertex.normal);
        }
    }

    for channel in 0..uv_channels {
        let weight = if channel == 0 {
            PRIMARY_UV_WEIGHT
        } else {
            SECONDARY_UV_WEIGHT
        };
        attributes.weights.extend_from_slice(&[weight, weight]);
    }
    if use_normals {
        attributes.weights.extend_from_slice(&[NORMAL_WEIGHT; 3]);
    }

    attributes
}

// ============================================================
// Compaction
// ============================================================

/// Build the old→new vertex remap table in a single pass over the new
/// index buffer (first-appearance order), rewriting the indices in place.
/// Returns the table and the live vertex count.
fn build_remap(indices: &mut [u32], vertex_count: usize) -> (Vec<u32>, usize) {
    let mut remap = vec![UNUSED; vertex_count];
    let mut next = 0u32;
    for index in indices.iter_mut() {
        let slot = &mut remap[*index as usize];
        if *slot == UNUSED {
            *slot = next;
            next += 1;
        }
        *index = *slot;
    }
    (remap, next as usize)
}

/// Translate bone weight vertex ids through the remap table, dropping
/// weights whose vertex was removed. Weight order is preserved; bones
/// whose entire weight set was culled are kept with empty weights.
fn remap_bone_weights(mesh: &mut Mesh, remap: &[u32]) {
    for bone in &mut mesh.bones {
        bone.weights.retain_mut(|weight| {
            match remap.get(weight.vertex_id as usize) {
                Some(&new_id) if new_id != UNUSED => {
                    weight.vertex_id = new_id;
                    true
                }
                _ => false,
            }
        });
    }
}

// ============================================================
// Entry point
// ============================================================

/// Simplify a triangle mesh in place toward `ratio` of its triangles.
///
/// Non-triangle meshes, empty meshes, and inputs the kernel cannot accept
/// are returned unchanged; this function never fails.
pub fn simplify(mesh: &mut Mesh, ratio: f32) -> SimplifyResult {
    let original = mesh.triangle_count() as u32;
    let mut result = SimplifyResult {
        original_triangles: original,
        simplified_triangles: original,
        error: 0.0,
    };

    if mesh.primitive_kind != PrimitiveKind::Triangles
        || mesh.indices.is_empty()
        || !mesh.indices.len().is_multiple_of(3)
    {
        return result;
    }
    // The kernel indexes the position array unchecked
    let vertex_count = mesh.positions.len();
    if mesh.indices.iter().any(|&i| i as usize >= vertex_count) {
        return result;
    }

    let layout = detect_layout(mesh);
    let vertices = pack_vertices(mesh);
    let positions = extract_positions(&vertices);
    let adapter =
        match VertexDataAdapter::new(bytemuck::cast_slice(&positions), POSITION_STRIDE, 0) {
            Ok(adapter) => adapter,
            Err(_) => return result,
        };

    let target_index_count = ((mesh.indices.len() as f64 * ratio as f64) as usize / 3 * 3).max(3);

    let attributes = build_kernel_attributes(&vertices, &layout);
    let mut error = 0.0f32;
    let mut simplified = if attributes.components > 0 {
        let locks = vec![false; vertices.len()];
        meshopt::simplify_with_attributes_and_locks(
            &mesh.indices,
            &adapter,
            &attributes.data,
            &attributes.weights,
            attributes.stride_bytes(),
            &locks,
            target_index_count,
            TARGET_ERROR,
            SimplifyOptions::empty(),
            Some(&mut error),
        )
    } else {
        meshopt::simplify(
            &mesh.indices,
            &adapter,
            target_index_count,
            TARGET_ERROR,
            SimplifyOptions::empty(),
            Some(&mut error),
        )
    };

    meshopt::optimize_vertex_cache_in_place(&mut simplified, vertices.len());
    meshopt::optimize_overdraw_in_place(&mut simplified, &adapter, OVERDRAW_THRESHOLD);

    let (remap, live_count) = build_remap(&mut simplified, vertices.len());
    let mut compacted = vec![PackedVertex::ZERO; live_count];
    for (old, &new) in remap.iter().enumerate() {
        if new != UNUSED {
            compacted[new as usize] = vertices[old];
        }
    }

    remap_bone_weights(mesh, &remap);
    unpack_vertices(mesh, &compacted, &layout);
    mesh.indices = simplified;

    result.simplified_triangles = mesh.triangle_count() as u32;
    result.error = error;
    result
}
