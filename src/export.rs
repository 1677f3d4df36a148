//! Writes imported scenes to simple text formats.
//!
//! Node transformations are baked into the exported vertices, so the output
//! is a flat list of meshes in world space.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, bail};
use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};

use crate::{
    data_structures::scene::{Mesh, Node, Scene},
    transform::{transform_normals, transform_vertices},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportFormat {
    pub id: &'static str,
    pub description: &'static str,
    pub extension: &'static str,
}

pub const EXPORT_FORMATS: &[ExportFormat] = &[
    ExportFormat {
        id: "obj",
        description: "Wavefront OBJ format",
        extension: "obj",
    },
    ExportFormat {
        id: "objnomtl",
        description: "Wavefront OBJ format without material file",
        extension: "obj",
    },
    ExportFormat {
        id: "stl",
        description: "Stereolithography",
        extension: "stl",
    },
    ExportFormat {
        id: "ply",
        description: "Stanford Polygon Library",
        extension: "ply",
    },
];

pub fn find_format(id: &str) -> Option<&'static ExportFormat> {
    EXPORT_FORMATS.iter().find(|format| format.id == id)
}

#[derive(Debug, Default)]
pub struct Exporter;

impl Exporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, scene: &Scene, format_id: &str, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let Some(format) = find_format(format_id) else {
            bail!("Found no exporter to handle this file format: {format_id}");
        };
        let is_mtl = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("mtl"));
        if format.id == "obj" && is_mtl {
            bail!(
                "Output {} would be overwritten by its material library",
                path.display()
            );
        }
        let meshes = bake_meshes(scene);
        let file = File::create(path).with_context(|| format!("Unable to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        match format.id {
            "obj" => {
                let mtl_path = path.with_extension("mtl");
                let mtl_name = mtl_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                write_obj(&mut out, scene, &meshes, Some(&mtl_name))?;
                let mtl = File::create(&mtl_path)
                    .with_context(|| format!("Unable to create {}", mtl_path.display()))?;
                let mut mtl_out = BufWriter::new(mtl);
                write_mtl(&mut mtl_out, scene)?;
                mtl_out.flush()?;
            }
            "objnomtl" => write_obj(&mut out, scene, &meshes, None)?,
            "stl" => write_stl(&mut out, &scene.root.name, &meshes)?,
            "ply" => write_ply(&mut out, &meshes)?,
            other => bail!("Found no exporter to handle this file format: {other}"),
        }
        out.flush()?;
        log::debug!("Exported {} meshes to {}", meshes.len(), path.display());
        Ok(())
    }
}

/// Copies every mesh instance referenced by the node tree into world space.
pub fn bake_meshes(scene: &Scene) -> Vec<Mesh> {
    fn walk(scene: &Scene, node: &Node, parent: Matrix4<f32>, meshes: &mut Vec<Mesh>) {
        let world = parent * node.transformation;
        for &idx in &node.meshes {
            if let Some(mesh) = scene.meshes.get(idx) {
                let mut mesh = mesh.clone();
                transform_vertices(&mut mesh, &world);
                transform_normals(&mut mesh, &world);
                meshes.push(mesh);
            }
        }
        for child in &node.children {
            walk(scene, child, world, meshes);
        }
    }
    let mut meshes = Vec::new();
    walk(scene, &scene.root, Matrix4::identity(), &mut meshes);
    meshes
}

fn write_obj(
    out: &mut impl Write,
    scene: &Scene,
    meshes: &[Mesh],
    mtllib: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(mtllib) = mtllib {
        writeln!(out, "mtllib {mtllib}")?;
    }
    // OBJ indices are global and 1-based
    let (mut v_base, mut vt_base, mut vn_base) = (1usize, 1usize, 1usize);
    for mesh in meshes {
        writeln!(out, "o {}", mesh.name)?;
        if mtllib.is_some() {
            if let Some(material) = scene.materials.get(mesh.material_index) {
                writeln!(out, "usemtl {}", material.name)?;
            }
        }
        for v in &mesh.vertices {
            writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
        }
        let with_tex_coords = mesh.has_tex_coords() && mesh.tex_coords.len() == mesh.num_vertices();
        let with_normals = mesh.has_normals() && mesh.normals.len() == mesh.num_vertices();
        if with_tex_coords {
            for t in &mesh.tex_coords {
                writeln!(out, "vt {} {}", t.x, t.y)?;
            }
        }
        if with_normals {
            for n in &mesh.normals {
                writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
            }
        }
        for face in &mesh.faces {
            let keyword = match face.num_indices() {
                1 => "p",
                2 => "l",
                _ => "f",
            };
            let refs: Vec<String> = face
                .indices
                .iter()
                .map(|&i| {
                    let i = i as usize;
                    // points and lines only reference positions
                    if keyword != "f" {
                        return (v_base + i).to_string();
                    }
                    match (with_tex_coords, with_normals) {
                        (true, true) => format!("{}/{}/{}", v_base + i, vt_base + i, vn_base + i),
                        (true, false) => format!("{}/{}", v_base + i, vt_base + i),
                        (false, true) => format!("{}//{}", v_base + i, vn_base + i),
                        (false, false) => (v_base + i).to_string(),
                    }
                })
                .collect();
            writeln!(out, "{keyword} {}", refs.join(" "))?;
        }
        v_base += mesh.vertices.len();
        if with_tex_coords {
            vt_base += mesh.tex_coords.len();
        }
        if with_normals {
            vn_base += mesh.normals.len();
        }
    }
    Ok(())
}

fn write_mtl(out: &mut impl Write, scene: &Scene) -> anyhow::Result<()> {
    for material in &scene.materials {
        writeln!(out, "newmtl {}", material.name)?;
        if let Some([r, g, b, a]) = material.diffuse {
            writeln!(out, "Kd {r} {g} {b}")?;
            writeln!(out, "d {a}")?;
        }
        if let Some(texture) = &material.diffuse_texture {
            writeln!(out, "map_Kd {texture}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_stl(out: &mut impl Write, name: &str, meshes: &[Mesh]) -> anyhow::Result<()> {
    writeln!(out, "solid {name}")?;
    for mesh in meshes {
        for face in mesh.faces.iter().filter(|f| f.num_indices() == 3) {
            let (Some(&a), Some(&b), Some(&c)) = (
                mesh.vertices.get(face.indices[0] as usize),
                mesh.vertices.get(face.indices[1] as usize),
                mesh.vertices.get(face.indices[2] as usize),
            ) else {
                log::warn!("Skipping face of mesh {} with a missing vertex", mesh.name);
                continue;
            };
            let normal = (b - a).cross(c - a);
            let normal = if normal.magnitude2() > 0.0 {
                normal.normalize()
            } else {
                Vector3::new(0.0, 0.0, 0.0)
            };
            writeln!(out, " facet normal {} {} {}", normal.x, normal.y, normal.z)?;
            writeln!(out, "  outer loop")?;
            for v in [a, b, c] {
                writeln!(out, "   vertex {} {} {}", v.x, v.y, v.z)?;
            }
            writeln!(out, "  endloop")?;
            writeln!(out, " endfacet")?;
        }
    }
    writeln!(out, "endsolid {name}")?;
    Ok(())
}

fn write_ply(out: &mut impl Write, meshes: &[Mesh]) -> anyhow::Result<()> {
    let num_vertices: usize = meshes.iter().map(Mesh::num_vertices).sum();
    let num_faces: usize = meshes.iter().map(Mesh::num_faces).sum();
    let with_normals = !meshes.is_empty()
        && meshes
            .iter()
            .all(|mesh| mesh.has_normals() && mesh.normals.len() == mesh.num_vertices());

    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {num_vertices}")?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    if with_normals {
        writeln!(out, "property float nx")?;
        writeln!(out, "property float ny")?;
        writeln!(out, "property float nz")?;
    }
    writeln!(out, "element face {num_faces}")?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "end_header")?;

    for mesh in meshes {
        for (i, v) in mesh.vertices.iter().enumerate() {
            match mesh.normals.get(i).filter(|_| with_normals) {
                Some(n) => writeln!(out, "{} {} {} {} {} {}", v.x, v.y, v.z, n.x, n.y, n.z)?,
                None => writeln!(out, "{} {} {}", v.x, v.y, v.z)?,
            }
        }
    }
    let mut base = 0usize;
    for mesh in meshes {
        for face in &mesh.faces {
            let indices: Vec<String> = face
                .indices
                .iter()
                .map(|&i| (base + i as usize).to_string())
                .collect();
            writeln!(out, "{} {}", face.num_indices(), indices.join(" "))?;
        }
        base += mesh.num_vertices();
    }
    Ok(())
}
