//! Scene I/O for lodkit
//!
//! Loads and saves complete scenes by file extension. Import applies the
//! post-processing the pipeline relies on — polygon triangulation,
//! identical-vertex joining, and by-primitive-type mesh splitting — so a
//! loaded scene is immediately simplifiable. Export always works on a
//! private deep copy and strips materials no mesh references before
//! writing.

pub mod obj;

pub use obj::{ObjReader, ObjWriter};

use lodkit_core::{Error, Result, Scene};
use std::path::Path;

/// Extensions supported for both import and export
pub fn supported_formats() -> Vec<&'static str> {
    vec!["obj"]
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load a scene file, dispatching on the file extension
pub fn load_scene(path: &Path) -> Result<Scene> {
    if !path.exists() {
        return Err(Error::FileNotFound(format!(
            "File not found: {}",
            path.display()
        )));
    }
    match extension_of(path).as_str() {
        "obj" => ObjReader::read_scene(path),
        other => Err(Error::UnsupportedFormat(format!(
            "No importer for extension: {other:?}"
        ))),
    }
}

/// Save a scene to a path, dispatching on the file extension.
///
/// The scene is deep-copied first (exporters may rewrite embedded texture
/// names and slot paths in place) and unreferenced materials are stripped
/// from the copy so the written material table matches what the meshes
/// actually use.
pub fn save_scene(scene: &Scene, path: &Path) -> Result<()> {
    match extension_of(path).as_str() {
        "obj" => {}
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "No exporter for extension: {other:?}"
            )))
        }
    }

    let mut copy = scene.clone();
    strip_unused_materials(&mut copy);
    ObjWriter::write_scene(&mut copy, path)
}

/// Remove materials that no mesh references, compacting the material
/// table and rewriting `mesh.material_index`.
pub fn strip_unused_materials(scene: &mut Scene) {
    if scene.materials.is_empty() {
        return;
    }

    let mut referenced = vec![false; scene.materials.len()];
    for mesh in &scene.meshes {
        if let Some(slot) = referenced.get_mut(mesh.material_index as usize) {
            *slot = true;
        }
    }
    if referenced.iter().all(|&used| used) {
        return;
    }

    let mut remap = vec![u32::MAX; scene.materials.len()];
    let mut kept = Vec::new();
    for (index, material) in scene.materials.drain(..).enumerate() {
        if referenced[index] {
            remap[index] = kept.len() as u32;
            kept.push(material);
        }
    }
    scene.materials = kept;

    for mesh in &mut scene.meshes {
        if let Some(&new_index) = remap.get(mesh.material_index as usize) {
            if new_index != u32::MAX {
                mesh.material_index = new_index;
            }
        }
    }
}
