use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use anyhow::Context;

use crate::data_structures::scene::{Material, Node, Scene, SceneFlags};

/**
 * This module contains all logic for loading meshes, materials and binary resources from
 * external files.
 */
pub mod binary;
pub mod mesh;

pub use binary::{ResourceReader, decode_data_uri, is_data_uri, load_binary, load_buffers, load_string};

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub async fn load_model_obj(path: &Path) -> anyhow::Result<Scene> {
    let reader = ResourceReader::for_file(path);
    let obj_text = load_string(path).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    // Polygons are kept, triangulation is a post-processing step
    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let reader = reader.clone();
            async move {
                match reader.read_string(&p).await {
                    Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                    Err(e) => {
                        log::warn!("{e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await
    .with_context(|| format!("Unable to parse OBJ file {}", path.display()))?;

    let mut materials: Vec<Material> = match obj_materials {
        Ok(materials) => materials
            .into_iter()
            .map(|m| Material {
                diffuse: m.diffuse.map(|[r, g, b]| [r, g, b, m.dissolve.unwrap_or(1.0)]),
                diffuse_texture: m.diffuse_texture,
                name: m.name,
            })
            .collect(),
        Err(e) => {
            log::warn!("Materials of {} could not be loaded: {e}", path.display());
            Vec::new()
        }
    };
    if materials.is_empty() {
        materials.push(Material::default());
    }

    let mut root = Node::new(file_name(path));
    let mut meshes = Vec::with_capacity(models.len());
    for model in models.iter() {
        // tobj reports an unnamed object even for files without geometry
        if model.mesh.positions.is_empty() {
            log::debug!("Skipping object {} of {} without vertices", model.name, path.display());
            continue;
        }
        let mut mesh = mesh::load_obj_mesh(model);
        if mesh.material_index >= materials.len() {
            log::warn!(
                "Mesh {} references unknown material {}, using the first one",
                mesh.name,
                mesh.material_index
            );
            mesh.material_index = 0;
        }
        let mut node = Node::new(model.name.clone());
        node.meshes.push(meshes.len());
        root.children.push(node);
        meshes.push(mesh);
    }

    Ok(Scene {
        root,
        meshes,
        materials,
        flags: SceneFlags::default(),
    })
}

pub async fn load_model_gltf(path: &Path) -> anyhow::Result<Scene> {
    let gltf_bytes = load_binary(path).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes).context("glTF deserialize failed")?;
    let reader = ResourceReader::for_file(path);
    let buffer_data = load_buffers(&gltf, &reader).await?;

    let mut materials: Vec<Material> = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let diffuse_texture = pbr.base_color_texture().map(|info| {
                match info.texture().source().source() {
                    gltf::image::Source::Uri { uri, .. } => uri.to_string(),
                    gltf::image::Source::View { view, .. } => format!("*{}", view.index()),
                }
            });
            Material {
                name: material
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
                diffuse: Some(pbr.base_color_factor()),
                diffuse_texture,
            }
        })
        .collect();
    let mut default_material = None;

    // Every primitive becomes its own mesh; remember which meshes a glTF mesh expanded to
    let mut meshes = Vec::new();
    let mut mesh_map: Vec<Vec<usize>> = Vec::new();
    for gltf_mesh in gltf.meshes() {
        let name = gltf_mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", gltf_mesh.index()));
        let mut expanded = Vec::new();
        for primitive in gltf_mesh.primitives() {
            let mut mesh = mesh::load_gltf_primitive(&name, &primitive, &buffer_data)
                .with_context(|| format!("Unable to read primitive {} of mesh {name}", primitive.index()))?;
            mesh.material_index = match primitive.material().index() {
                Some(idx) => idx,
                None => *default_material.get_or_insert_with(|| {
                    materials.push(Material::default());
                    materials.len() - 1
                }),
            };
            expanded.push(meshes.len());
            meshes.push(mesh);
        }
        mesh_map.push(expanded);
    }

    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    let mut roots: Vec<Node> = match scene {
        Some(scene) => scene.nodes().map(|node| to_node(node, &mesh_map)).collect(),
        None => {
            log::warn!("{} contains no scene", path.display());
            Vec::new()
        }
    };
    let root = if roots.len() == 1 {
        roots.remove(0)
    } else {
        let mut root = Node::new(file_name(path));
        root.children = roots;
        root
    };

    Ok(Scene {
        root,
        meshes,
        materials,
        flags: SceneFlags::default(),
    })
}

fn to_node(node: gltf::Node, mesh_map: &[Vec<usize>]) -> Node {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));
    let mut scene_node = Node::new(name);
    scene_node.transformation = node.transform().matrix().into();
    if let Some(mesh) = node.mesh() {
        scene_node.meshes = mesh_map[mesh.index()].clone();
    }
    for child in node.children() {
        scene_node.children.push(to_node(child, mesh_map));
    }
    scene_node
}
