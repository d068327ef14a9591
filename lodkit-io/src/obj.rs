//! OBJ format support
//!
//! The reader parses geometry and face statements, fan-triangulates
//! polygons, joins identical `v/vt/vn` triples into shared vertices, and
//! splits the result into one mesh per material and primitive kind, so a
//! loaded scene satisfies the invariants the simplifier relies on.
//! `mtllib` references populate the scene's material table including
//! texture slots.
//!
//! The writer emits OBJ + MTL. Embedded textures referenced by materials
//! are written to files beside the model and referenced by filename — the
//! OBJ format has no embedded-texture representation.

use lodkit_core::{
    Error, Material, Mesh, Node, Point3f, PrimitiveKind, Result, Scene, TextureData, TextureSlot,
    TextureType, UvChannel, Vector3f,
};
use lodkit_texture::pixel;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

// ============================================================
// Reader
// ============================================================

/// One corner of a face: indices into the global OBJ arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexRef {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

/// Accumulates one output mesh (one material × one primitive kind)
struct MeshBuilder {
    name: String,
    material_index: u32,
    kind: PrimitiveKind,
    lookup: HashMap<VertexRef, u32>,
    refs: Vec<VertexRef>,
    indices: Vec<u32>,
    uses_texcoords: bool,
    uses_normals: bool,
}

impl MeshBuilder {
    fn new(name: String, material_index: u32, kind: PrimitiveKind) -> Self {
        Self {
            name,
            material_index,
            kind,
            lookup: HashMap::new(),
            refs: Vec::new(),
            indices: Vec::new(),
            uses_texcoords: false,
            uses_normals: false,
        }
    }

    /// Identical v/vt/vn triples share one output vertex
    fn vertex(&mut self, vertex_ref: VertexRef) -> u32 {
        if let Some(&index) = self.lookup.get(&vertex_ref) {
            return index;
        }
        let index = self.refs.len() as u32;
        self.lookup.insert(vertex_ref, index);
        self.refs.push(vertex_ref);
        self.uses_texcoords |= vertex_ref.texcoord.is_some();
        self.uses_normals |= vertex_ref.normal.is_some();
        index
    }

    fn build(
        self,
        positions: &[Point3f],
        texcoords: &[[f32; 3]],
        texcoord_components: u8,
        normals: &[Vector3f],
    ) -> Mesh {
        let mut mesh = Mesh::new(self.name);
        mesh.primitive_kind = self.kind;
        mesh.material_index = self.material_index;
        mesh.positions = self
            .refs
            .iter()
            .map(|r| positions[r.position])
            .collect();
        if self.uses_texcoords {
            mesh.uv_channels = vec![UvChannel {
                components: texcoord_components,
                coords: self
                    .refs
                    .iter()
                    .map(|r| r.texcoord.map_or([0.0; 3], |t| texcoords[t]))
                    .collect(),
            }];
        }
        if self.uses_normals {
            mesh.normals = Some(
                self.refs
                    .iter()
                    .map(|r| r.normal.map_or_else(Vector3f::zeros, |n| normals[n]))
                    .collect(),
            );
        }
        mesh.indices = self.indices;
        mesh
    }
}

fn kind_rank(kind: PrimitiveKind) -> u8 {
    match kind {
        PrimitiveKind::Triangles => 0,
        PrimitiveKind::Lines => 1,
        PrimitiveKind::Points => 2,
        PrimitiveKind::Mixed => 3,
    }
}

fn parse_floats(line_number: usize, tokens: &[&str], out: &mut [f32]) -> Result<()> {
    for (slot, token) in out.iter_mut().zip(tokens) {
        *slot = token.parse::<f32>().map_err(|_| {
            Error::ImportFailed(format!("line {line_number}: invalid number {token:?}"))
        })?;
    }
    Ok(())
}

/// Resolve a possibly negative (relative) OBJ index to a zero-based one
fn resolve_index(line_number: usize, value: i64, count: usize) -> Result<usize> {
    let resolved = if value > 0 {
        (value - 1) as usize
    } else if value < 0 {
        let back = (-value) as usize;
        if back > count {
            return Err(Error::ImportFailed(format!(
                "line {line_number}: relative index {value} out of range"
            )));
        }
        count - back
    } else {
        return Err(Error::ImportFailed(format!(
            "line {line_number}: index 0 is not valid"
        )));
    };
    if resolved >= count {
        return Err(Error::ImportFailed(format!(
            "line {line_number}: index {value} out of range (have {count})"
        )));
    }
    Ok(resolved)
}

impl ObjReader {
    /// Read an OBJ file (plus its MTL libraries) into a scene
    pub fn read_scene(path: &Path) -> Result<Scene> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ImportFailed(format!("{}: {e}", path.display())))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));

        let mut positions: Vec<Point3f> = Vec::new();
        let mut texcoords: Vec<[f32; 3]> = Vec::new();
        let mut texcoord_components: u8 = 2;
        let mut normals: Vec<Vector3f> = Vec::new();

        let mut materials: Vec<Material> = Vec::new();
        let mut material_by_name: HashMap<String, u32> = HashMap::new();
        let mut current_material: Option<u32> = None;

        let mut builders: Vec<MeshBuilder> = Vec::new();
        let mut bucket: HashMap<(u32, u8), usize> = HashMap::new();
        let mut current_name = String::from("mesh");

        // Faces seen before any usemtl get a lazily created default
        // material so every mesh's material index stays in range.
        let mut default_material: Option<u32> = None;

        for (index, raw_line) in content.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            let rest: Vec<&str> = tokens.collect();

            match keyword {
                "v" => {
                    let mut coords = [0.0f32; 3];
                    if rest.len() < 3 {
                        return Err(Error::ImportFailed(format!(
                            "line {line_number}: vertex needs 3 coordinates"
                        )));
                    }
                    parse_floats(line_number, &rest, &mut coords)?;
                    positions.push(Point3f::new(coords[0], coords[1], coords[2]));
                }
                "vt" => {
                    let mut coords = [0.0f32; 3];
                    if rest.is_empty() {
                        return Err(Error::ImportFailed(format!(
                            "line {line_number}: texture coordinate needs at least 1 value"
                        )));
                    }
                    parse_floats(line_number, &rest, &mut coords)?;
                    if rest.len() >= 3 {
                        texcoord_components = 3;
                    }
                    texcoords.push(coords);
                }
                "vn" => {
                    let mut coords = [0.0f32; 3];
                    if rest.len() < 3 {
                        return Err(Error::ImportFailed(format!(
                            "line {line_number}: normal needs 3 coordinates"
                        )));
                    }
                    parse_floats(line_number, &rest, &mut coords)?;
                    normals.push(Vector3f::new(coords[0], coords[1], coords[2]));
                }
                "f" | "p" | "l" => {
                    if rest.is_empty() {
                        return Err(Error::ImportFailed(format!(
                            "line {line_number}: {keyword} statement without vertices"
                        )));
                    }
                    let mut corner_refs = Vec::with_capacity(rest.len());
                    for token in &rest {
                        corner_refs.push(parse_face_vertex(
                            line_number,
                            token,
                            positions.len(),
                            texcoords.len(),
                            normals.len(),
                        )?);
                    }

                    let kind = match (keyword, corner_refs.len()) {
                        ("p", _) | ("f", 1) => PrimitiveKind::Points,
                        ("l", _) | ("f", 2) => PrimitiveKind::Lines,
                        _ => PrimitiveKind::Triangles,
                    };

                    let material = match current_material {
                        Some(material) => material,
                        None => *default_material.get_or_insert_with(|| {
                            let index = materials.len() as u32;
                            materials.push(Material::new("default"));
                            index
                        }),
                    };

                    let builder_index =
                        *bucket.entry((material, kind_rank(kind))).or_insert_with(|| {
                            builders.push(MeshBuilder::new(
                                current_name.clone(),
                                material,
                                kind,
                            ));
                            builders.len() - 1
                        });
                    let builder = &mut builders[builder_index];

                    match kind {
                        PrimitiveKind::Points => {
                            for corner in corner_refs {
                                let v = builder.vertex(corner);
                                builder.indices.push(v);
                            }
                        }
                        PrimitiveKind::Lines => {
                            for pair in corner_refs.windows(2) {
                                let a = builder.vertex(pair[0]);
                                let b = builder.vertex(pair[1]);
                                builder.indices.extend_from_slice(&[a, b]);
                            }
                        }
                        _ => {
                            // Fan triangulation of polygons
                            let anchor = builder.vertex(corner_refs[0]);
                            for window in corner_refs[1..].windows(2) {
                                let b = builder.vertex(window[0]);
                                let c = builder.vertex(window[1]);
                                builder.indices.extend_from_slice(&[anchor, b, c]);
                            }
                        }
                    }
                }
                "o" | "g" => {
                    if let Some(name) = rest.first() {
                        current_name = (*name).to_string();
                    }
                }
                "usemtl" => {
                    let name = rest.first().copied().unwrap_or("default");
                    let index = *material_by_name.entry(name.to_string()).or_insert_with(|| {
                        let index = materials.len() as u32;
                        materials.push(Material::new(name));
                        index
                    });
                    current_material = Some(index);
                }
                "mtllib" => {
                    for library in &rest {
                        let library_path = base_dir.join(library);
                        if !library_path.exists() {
                            log::warn!("material library not found: {}", library_path.display());
                            continue;
                        }
                        for material in read_mtl(&library_path)? {
                            match material_by_name.get(&material.name) {
                                // A usemtl ahead of the library created a
                                // placeholder; fill it in
                                Some(&index) => materials[index as usize] = material,
                                None => {
                                    let index = materials.len() as u32;
                                    material_by_name.insert(material.name.clone(), index);
                                    materials.push(material);
                                }
                            }
                        }
                    }
                }
                // s, mg, and other statements carry no scene data we keep
                _ => {}
            }
        }

        // Sort by primitive type: triangles, then lines, then points
        let mut order: Vec<usize> = (0..builders.len()).collect();
        order.sort_by_key(|&index| kind_rank(builders[index].kind));

        let mut scene = Scene::new();
        scene.materials = materials;
        let mut builders: Vec<Option<MeshBuilder>> = builders.into_iter().map(Some).collect();
        for builder_index in order {
            let Some(builder) = builders[builder_index].take() else {
                continue;
            };
            let mesh = builder.build(&positions, &texcoords, texcoord_components, &normals);
            let mut node = Node::new(mesh.name.clone());
            node.mesh_indices.push(scene.meshes.len() as u32);
            scene.root.children.push(node);
            scene.meshes.push(mesh);
        }
        Ok(scene)
    }
}

fn parse_face_vertex(
    line_number: usize,
    token: &str,
    position_count: usize,
    texcoord_count: usize,
    normal_count: usize,
) -> Result<VertexRef> {
    let mut parts = token.split('/');
    let position_part = parts.next().unwrap_or("");
    let texcoord_part = parts.next().unwrap_or("");
    let normal_part = parts.next().unwrap_or("");

    let parse = |part: &str| -> Result<i64> {
        part.parse::<i64>().map_err(|_| {
            Error::ImportFailed(format!("line {line_number}: invalid face index {token:?}"))
        })
    };

    let position = resolve_index(line_number, parse(position_part)?, position_count)?;
    let texcoord = if texcoord_part.is_empty() {
        None
    } else {
        Some(resolve_index(line_number, parse(texcoord_part)?, texcoord_count)?)
    };
    let normal = if normal_part.is_empty() {
        None
    } else {
        Some(resolve_index(line_number, parse(normal_part)?, normal_count)?)
    };
    Ok(VertexRef {
        position,
        texcoord,
        normal,
    })
}

// ============================================================
// MTL
// ============================================================

/// MTL map directives and the texture types they populate
const MTL_MAP_KEYWORDS: [(&str, TextureType); 12] = [
    ("map_Kd", TextureType::Diffuse),
    ("map_Ks", TextureType::Specular),
    ("map_Ka", TextureType::Ambient),
    ("map_Ke", TextureType::Emissive),
    ("map_Bump", TextureType::Height),
    ("bump", TextureType::Height),
    ("norm", TextureType::Normals),
    ("map_Ns", TextureType::Shininess),
    ("map_d", TextureType::Opacity),
    ("disp", TextureType::Displacement),
    ("map_Pr", TextureType::DiffuseRoughness),
    ("map_Pm", TextureType::Metalness),
];

fn parse_color(line_number: usize, tokens: &[&str]) -> Result<[f32; 3]> {
    let mut color = [0.0f32; 3];
    if tokens.len() < 3 {
        return Err(Error::ImportFailed(format!(
            "line {line_number}: color needs 3 components"
        )));
    }
    parse_floats(line_number, tokens, &mut color)?;
    Ok(color)
}

/// Read an MTL file into materials, in definition order
pub fn read_mtl(path: &Path) -> Result<Vec<Material>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ImportFailed(format!("{}: {e}", path.display())))?;

    let mut materials: Vec<Material> = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let rest: Vec<&str> = tokens.collect();

        if keyword == "newmtl" {
            let name = rest.first().copied().unwrap_or("unnamed");
            materials.push(Material::new(name));
            continue;
        }
        let Some(material) = materials.last_mut() else {
            continue; // directives before the first newmtl
        };

        match keyword {
            "Ka" => material.ambient_color = Some(parse_color(line_number, &rest)?),
            "Kd" => material.diffuse_color = Some(parse_color(line_number, &rest)?),
            "Ks" => material.specular_color = Some(parse_color(line_number, &rest)?),
            "Ke" => material.emissive_color = Some(parse_color(line_number, &rest)?),
            "Ns" => {
                if let Some(value) = rest.first().and_then(|t| t.parse::<f32>().ok()) {
                    material.shininess = Some(value);
                }
            }
            "d" => {
                if let Some(value) = rest.first().and_then(|t| t.parse::<f32>().ok()) {
                    material.opacity = Some(value);
                }
            }
            "Tr" => {
                if let Some(value) = rest.first().and_then(|t| t.parse::<f32>().ok()) {
                    material.opacity = Some(1.0 - value);
                }
            }
            _ => {
                if let Some((_, texture_type)) = MTL_MAP_KEYWORDS
                    .iter()
                    .find(|(map_keyword, _)| *map_keyword == keyword)
                {
                    // Option flags may precede the path; the path is the
                    // final token
                    if let Some(texture_path) = rest.last() {
                        material.add_texture(*texture_type, TextureSlot::new(*texture_path));
                    }
                }
            }
        }
    }
    Ok(materials)
}

// ============================================================
// Writer
// ============================================================

fn mtl_map_keyword(texture_type: TextureType) -> Option<&'static str> {
    MTL_MAP_KEYWORDS
        .iter()
        .find(|(keyword, mapped)| *mapped == texture_type && *keyword != "bump")
        .map(|(keyword, _)| *keyword)
}

/// Write embedded textures referenced by materials to files beside the
/// model and repoint the slots at those filenames.
fn export_embedded_textures(scene: &mut Scene, model_dir: &Path) -> Result<()> {
    let mut written: HashSet<usize> = HashSet::new();

    for material in 0..scene.materials.len() {
        for texture_type in TextureType::ALL {
            let slot_count = scene.materials[material].texture_slots(texture_type).len();
            for slot in 0..slot_count {
                let raw_path = scene.materials[material].texture_slots(texture_type)[slot]
                    .path
                    .clone();
                let Some(index) = scene.lookup_embedded(&raw_path) else {
                    continue;
                };

                let filename = match scene.embedded_textures[index].filename.clone() {
                    Some(name) => name,
                    None => {
                        let texture = &mut scene.embedded_textures[index];
                        let hint = match &texture.data {
                            TextureData::Compressed(_) if !texture.format_hint.is_empty() => {
                                texture.format_hint.clone()
                            }
                            // Raw rectangles are encoded as PNG below
                            _ => "png".to_string(),
                        };
                        let name = format!("texture_{index}.{hint}");
                        texture.filename = Some(name.clone());
                        name
                    }
                };

                if written.insert(index) {
                    let texture = &scene.embedded_textures[index];
                    let bytes = match &texture.data {
                        TextureData::Compressed(bytes) => bytes.clone(),
                        TextureData::Argb8888 { .. } => {
                            let decoded = pixel::decode_embedded(texture)?;
                            pixel::encode_texture(&decoded, "png")?
                        }
                    };
                    let destination = model_dir.join(&filename);
                    std::fs::write(&destination, bytes).map_err(|e| {
                        Error::ExportFailed(format!(
                            "Cannot write {}: {e}",
                            destination.display()
                        ))
                    })?;
                }

                scene.materials[material].texture_slots_mut(texture_type)[slot].path = filename;
            }
        }
    }
    Ok(())
}

fn write_mtl(scene: &Scene) -> String {
    let mut out = String::new();
    for material in &scene.materials {
        let _ = writeln!(out, "newmtl {}", material.name);
        if let Some([r, g, b]) = material.ambient_color {
            let _ = writeln!(out, "Ka {r} {g} {b}");
        }
        if let Some([r, g, b]) = material.diffuse_color {
            let _ = writeln!(out, "Kd {r} {g} {b}");
        }
        if let Some([r, g, b]) = material.specular_color {
            let _ = writeln!(out, "Ks {r} {g} {b}");
        }
        if let Some([r, g, b]) = material.emissive_color {
            let _ = writeln!(out, "Ke {r} {g} {b}");
        }
        if let Some(shininess) = material.shininess {
            let _ = writeln!(out, "Ns {shininess}");
        }
        if let Some(opacity) = material.opacity {
            let _ = writeln!(out, "d {opacity}");
        }
        for texture_type in TextureType::ALL {
            let Some(keyword) = mtl_map_keyword(texture_type) else {
                if !material.texture_slots(texture_type).is_empty() {
                    log::debug!(
                        "material {}: {:?} slots have no MTL representation",
                        material.name,
                        texture_type
                    );
                }
                continue;
            };
            // MTL carries one map per type; extra slots are dropped
            if let Some(slot) = material.texture_slots(texture_type).first() {
                let _ = writeln!(out, "{keyword} {}", slot.path);
            }
        }
        let _ = writeln!(out);
    }
    out
}

impl ObjWriter {
    /// Write a scene as OBJ + MTL.
    ///
    /// The scene is mutated: embedded textures get export filenames and
    /// the material slots that referenced them are repointed. Callers
    /// that need the input untouched pass a copy (as `save_scene` does).
    pub fn write_scene(scene: &mut Scene, path: &Path) -> Result<()> {
        let model_dir = path.parent().unwrap_or(Path::new("."));
        export_embedded_textures(scene, model_dir)?;

        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model");
        let mtl_name = format!("{stem}.mtl");
        let has_materials = !scene.materials.is_empty();

        let mut out = String::new();
        if has_materials {
            let _ = writeln!(out, "mtllib {mtl_name}");
        }

        let (mut v_offset, mut vt_offset, mut vn_offset) = (0usize, 0usize, 0usize);
        for mesh in &scene.meshes {
            let _ = writeln!(out, "o {}", mesh.name);

            for position in &mesh.positions {
                let _ = writeln!(out, "v {} {} {}", position.x, position.y, position.z);
            }
            let uv_channel = mesh.uv_channels.first();
            if let Some(channel) = uv_channel {
                for uv in &channel.coords {
                    if channel.components >= 3 {
                        let _ = writeln!(out, "vt {} {} {}", uv[0], uv[1], uv[2]);
                    } else {
                        let _ = writeln!(out, "vt {} {}", uv[0], uv[1]);
                    }
                }
            }
            if let Some(normals) = &mesh.normals {
                for normal in normals {
                    let _ = writeln!(out, "vn {} {} {}", normal.x, normal.y, normal.z);
                }
            }

            if (mesh.material_index as usize) < scene.materials.len() {
                let _ = writeln!(
                    out,
                    "usemtl {}",
                    scene.materials[mesh.material_index as usize].name
                );
            }

            let corner = |index: u32| -> String {
                let v = v_offset + index as usize + 1;
                match (uv_channel.is_some(), mesh.normals.is_some()) {
                    (true, true) => format!(
                        "{v}/{}/{}",
                        vt_offset + index as usize + 1,
                        vn_offset + index as usize + 1
                    ),
                    (true, false) => format!("{v}/{}", vt_offset + index as usize + 1),
                    (false, true) => format!("{v}//{}", vn_offset + index as usize + 1),
                    (false, false) => format!("{v}"),
                }
            };

            match mesh.primitive_kind {
                PrimitiveKind::Points => {
                    for &index in &mesh.indices {
                        let _ = writeln!(out, "p {}", corner(index));
                    }
                }
                PrimitiveKind::Lines => {
                    for pair in mesh.indices.chunks_exact(2) {
                        let _ = writeln!(out, "l {} {}", corner(pair[0]), corner(pair[1]));
                    }
                }
                _ => {
                    for triangle in mesh.indices.chunks_exact(3) {
                        let _ = writeln!(
                            out,
                            "f {} {} {}",
                            corner(triangle[0]),
                            corner(triangle[1]),
                            corner(triangle[2])
                        );
                    }
                }
            }

            v_offset += mesh.positions.len();
            if uv_channel.is_some() {
                vt_offset += mesh.positions.len();
            }
            if mesh.normals.is_some() {
                vn_offset += mesh.positions.len();
            }
        }

        std::fs::write(path, out)
            .map_err(|e| Error::ExportFailed(format!("Cannot write {}: {e}", path.display())))?;

        if has_materials {
            let mtl_path = model_dir.join(&mtl_name);
            std::fs::write(&mtl_path, write_mtl(scene)).map_err(|e| {
                Error::ExportFailed(format!("Cannot write {}: {e}", mtl_path.display()))
            })?;
        }
        Ok(())
    }
}
