use anyhow::bail;
use cgmath::{Vector2, Vector3};
use gltf::mesh::Mode;

use crate::data_structures::scene::{Face, Mesh};

/**
 * Converts the meshes of an OBJ file. The file is loaded with `single_index`, so positions,
 * normals and texture coordinates share one index buffer.
 *
 * Polygons are kept as they are: `face_arities` holds the vertex count of every face and is
 * empty when the file only contains triangles.
 */
pub fn load_obj_mesh(model: &tobj::Model) -> Mesh {
    let m = &model.mesh;
    let num_vertices = m.positions.len() / 3;
    let vertices = m
        .positions
        .chunks_exact(3)
        .map(|p| Vector3::new(p[0], p[1], p[2]))
        .collect();
    let normals = if m.normals.len() == num_vertices * 3 {
        m.normals
            .chunks_exact(3)
            .map(|n| Vector3::new(n[0], n[1], n[2]))
            .collect()
    } else {
        Vec::new()
    };
    let tex_coords = if m.texcoords.len() == num_vertices * 2 {
        m.texcoords
            .chunks_exact(2)
            .map(|t| Vector2::new(t[0], t[1]))
            .collect()
    } else {
        Vec::new()
    };

    let faces = if m.face_arities.is_empty() {
        m.indices
            .chunks(3)
            .map(|c| Face::new(c.to_vec()))
            .collect()
    } else {
        let mut start = 0;
        m.face_arities
            .iter()
            .map(|&arity| {
                let end = start + arity as usize;
                let face = Face::new(m.indices[start..end].to_vec());
                start = end;
                face
            })
            .collect()
    };

    Mesh {
        name: model.name.clone(),
        vertices,
        normals,
        tex_coords,
        faces,
        material_index: m.material_id.unwrap_or(0),
        ..Default::default()
    }
}

/// Converts one glTF primitive into a mesh. Materials are resolved by the caller.
pub fn load_gltf_primitive(
    name: &str,
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
) -> anyhow::Result<Mesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let vertices: Vec<Vector3<f32>> = match reader.read_positions() {
        Some(positions) => positions.map(Vector3::from).collect(),
        None => Vec::new(),
    };
    let num_vertices = vertices.len();
    let normals = per_vertex(
        name,
        "normals",
        num_vertices,
        reader
            .read_normals()
            .map(|normals| normals.map(Vector3::from).collect())
            .unwrap_or_default(),
    );
    let tex_coords = per_vertex(
        name,
        "texture coordinates",
        num_vertices,
        reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().map(Vector2::from).collect())
            .unwrap_or_default(),
    );
    let tangents: Vec<[f32; 4]> = per_vertex(
        name,
        "tangents",
        num_vertices,
        reader
            .read_tangents()
            .map(|tangents| tangents.collect())
            .unwrap_or_default(),
    );
    // glTF stores the bitangent sign in w
    let (tangents, bitangents) = if !tangents.is_empty() && !normals.is_empty() {
        tangents
            .iter()
            .zip(&normals)
            .map(|(&[x, y, z, w], normal)| {
                let tangent = Vector3::new(x, y, z);
                (tangent, normal.cross(tangent) * w)
            })
            .unzip()
    } else {
        (Vec::new(), Vec::new())
    };

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..num_vertices as u32).collect(),
    };

    Ok(Mesh {
        name: name.to_string(),
        vertices,
        normals,
        tex_coords,
        tangents,
        bitangents,
        faces: faces_for_mode(primitive.mode(), &indices)?,
        material_index: 0,
    })
}

/// Keeps a vertex attribute only if it holds exactly one value per vertex.
fn per_vertex<T>(mesh: &str, label: &str, num_vertices: usize, data: Vec<T>) -> Vec<T> {
    if data.is_empty() || data.len() == num_vertices {
        return data;
    }
    log::warn!(
        "Dropping {} {label} of mesh {mesh}, it has {num_vertices} vertices",
        data.len()
    );
    Vec::new()
}

/// Splits a primitive's index list into faces according to its topology.
pub fn faces_for_mode(mode: Mode, indices: &[u32]) -> anyhow::Result<Vec<Face>> {
    let faces = match mode {
        Mode::Points => indices.iter().map(|&i| Face::new(vec![i])).collect(),
        Mode::Lines => indices.chunks_exact(2).map(|c| Face::new(c.to_vec())).collect(),
        Mode::LineStrip => indices
            .windows(2)
            .map(|w| Face::new(w.to_vec()))
            .collect(),
        Mode::LineLoop => {
            let mut faces: Vec<Face> = indices
                .windows(2)
                .map(|w| Face::new(w.to_vec()))
                .collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    faces.push(Face::new(vec![last, first]));
                }
            }
            faces
        }
        Mode::Triangles => {
            if indices.len() % 3 != 0 {
                bail!("Triangle list has {} indices, not a multiple of 3", indices.len());
            }
            indices.chunks_exact(3).map(|c| Face::new(c.to_vec())).collect()
        }
        // Every other triangle of a strip is wound the other way round
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    Face::new(vec![w[0], w[1], w[2]])
                } else {
                    Face::new(vec![w[1], w[0], w[2]])
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&center, rest)) => rest
                .windows(2)
                .map(|w| Face::new(vec![center, w[0], w[1]]))
                .collect(),
            None => Vec::new(),
        },
    };
    Ok(faces)
}
