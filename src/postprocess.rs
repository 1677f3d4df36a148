//! Post-processing steps applied to a freshly imported scene.

use std::collections::HashMap;

use anyhow::bail;
use bitflags::bitflags;
use cgmath::{InnerSpace, Vector3, Zero};

use crate::data_structures::scene::{Face, Mesh, Node, Scene};

bitflags! {
    /// A set of post-processing steps, combined with `|`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PostProcessSteps: u32 {
        /// Splits polygons with more than three vertices into triangles.
        const TRIANGULATE = 1 << 0;
        /// Flips the v texture coordinate (`v = 1 - v`).
        const FLIP_UVS = 1 << 1;
        /// Generates smooth vertex normals for meshes that have none.
        const GEN_NORMALS = 1 << 2;
        /// Checks every index of the scene for consistency.
        const VALIDATE_DATA_STRUCTURE = 1 << 3;
        /// Computes tangents and bitangents from positions and texture coordinates.
        const CALC_TANGENT_SPACE = 1 << 4;
        /// Merges vertices whose attributes are all bitwise equal.
        const JOIN_IDENTICAL_VERTICES = 1 << 5;
    }
}

/// Runs the requested steps in a fixed order: validation first so later
/// steps can rely on valid indices, joining last so it sees every attribute.
pub fn apply(scene: &mut Scene, steps: PostProcessSteps) -> anyhow::Result<()> {
    if steps.contains(PostProcessSteps::VALIDATE_DATA_STRUCTURE) {
        validate(scene)?;
        scene.flags.validated = true;
    }
    for mesh in scene.meshes.iter_mut() {
        if steps.contains(PostProcessSteps::TRIANGULATE) {
            triangulate(mesh);
        }
        if steps.contains(PostProcessSteps::FLIP_UVS) {
            flip_uvs(mesh);
        }
        if steps.contains(PostProcessSteps::GEN_NORMALS) && !mesh.has_normals() {
            gen_normals(mesh);
        }
        if steps.contains(PostProcessSteps::CALC_TANGENT_SPACE) && !mesh.has_tangents_and_bitangents() {
            calc_tangent_space(mesh);
        }
        if steps.contains(PostProcessSteps::JOIN_IDENTICAL_VERTICES) {
            join_identical_vertices(mesh);
        }
    }
    Ok(())
}

/// Fan-triangulates every polygon with more than three indices.
pub fn triangulate(mesh: &mut Mesh) {
    if mesh.faces.iter().all(|f| f.num_indices() <= 3) {
        return;
    }
    let mut faces = Vec::with_capacity(mesh.faces.len());
    for face in mesh.faces.drain(..) {
        if face.num_indices() <= 3 {
            faces.push(face);
            continue;
        }
        let first = face.indices[0];
        for pair in face.indices[1..].windows(2) {
            faces.push(Face::new(vec![first, pair[0], pair[1]]));
        }
    }
    mesh.faces = faces;
}

pub fn flip_uvs(mesh: &mut Mesh) {
    for uv in mesh.tex_coords.iter_mut() {
        uv.y = 1.0 - uv.y;
    }
}

/**
 * Smooth normals: every triangle adds its unnormalised face normal to its three vertices, so
 * larger faces weigh more. Vertices that end up with a zero vector keep it.
 */
pub fn gen_normals(mesh: &mut Mesh) {
    let mut normals = vec![Vector3::zero(); mesh.vertices.len()];
    for face in mesh.faces.iter().filter(|f| f.num_indices() == 3) {
        let [a, b, c] = [face.indices[0], face.indices[1], face.indices[2]].map(|i| i as usize);
        let (Some(&p0), Some(&p1), Some(&p2)) = (
            mesh.vertices.get(a),
            mesh.vertices.get(b),
            mesh.vertices.get(c),
        ) else {
            log::warn!("Face of mesh {} references a missing vertex", mesh.name);
            continue;
        };
        let face_normal = (p1 - p0).cross(p2 - p0);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }
    for n in normals.iter_mut() {
        if n.magnitude2() > 0.0 {
            *n = n.normalize();
        } else {
            *n = Vector3::zero();
        }
    }
    mesh.normals = normals;
}

/**
 * Tangent space per vertex, accumulated over the triangles using it like the normals are.
 *
 * Every triangle contributes the tangent and bitangent solving
 * `delta_pos = delta_uv.x * T + delta_uv.y * B` for its two edges. The sums are made orthogonal
 * to the vertex normal when there is one and normalised. Meshes without texture coordinates
 * are left alone.
 */
pub fn calc_tangent_space(mesh: &mut Mesh) {
    if !mesh.has_tex_coords() {
        log::debug!("Mesh {} has no texture coordinates, no tangents computed", mesh.name);
        return;
    }
    let mut tangents = vec![Vector3::zero(); mesh.vertices.len()];
    let mut bitangents = vec![Vector3::zero(); mesh.vertices.len()];
    for face in mesh.faces.iter().filter(|f| f.num_indices() == 3) {
        let c = [face.indices[0], face.indices[1], face.indices[2]].map(|i| i as usize);
        let (Some(&pos0), Some(&pos1), Some(&pos2), Some(&uv0), Some(&uv1), Some(&uv2)) = (
            mesh.vertices.get(c[0]),
            mesh.vertices.get(c[1]),
            mesh.vertices.get(c[2]),
            mesh.tex_coords.get(c[0]),
            mesh.tex_coords.get(c[1]),
            mesh.tex_coords.get(c[2]),
        ) else {
            log::warn!("Face of mesh {} references a missing vertex", mesh.name);
            continue;
        };
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det == 0.0 {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;
        for i in c {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }
    for (i, (t, b)) in tangents.iter_mut().zip(bitangents.iter_mut()).enumerate() {
        if let Some(&n) = mesh.normals.get(i) {
            *t -= n * n.dot(*t);
            *b -= n * n.dot(*b);
        }
        *t = if t.magnitude2() > 0.0 { t.normalize() } else { Vector3::zero() };
        *b = if b.magnitude2() > 0.0 { b.normalize() } else { Vector3::zero() };
    }
    mesh.tangents = tangents;
    mesh.bitangents = bitangents;
}

/// Merges vertices that share every attribute and remaps the faces onto the survivors.
pub fn join_identical_vertices(mesh: &mut Mesh) {
    let num_vertices = mesh.vertices.len();
    let key = |i: usize| -> Vec<u32> {
        let mut key = Vec::with_capacity(14);
        for attribute in [&mesh.vertices, &mesh.normals, &mesh.tangents, &mesh.bitangents] {
            if let Some(&v) = attribute.get(i) {
                let v: [f32; 3] = v.into();
                key.extend(v.map(f32::to_bits));
            }
        }
        if let Some(&uv) = mesh.tex_coords.get(i) {
            let uv: [f32; 2] = uv.into();
            key.extend(uv.map(f32::to_bits));
        }
        key
    };

    let mut seen: HashMap<Vec<u32>, u32> = HashMap::with_capacity(num_vertices);
    let mut remap = Vec::with_capacity(num_vertices);
    let mut kept = Vec::with_capacity(num_vertices);
    for i in 0..num_vertices {
        let next = kept.len() as u32;
        let target = *seen.entry(key(i)).or_insert(next);
        if target == next {
            kept.push(i);
        }
        remap.push(target);
    }
    if kept.len() == num_vertices {
        return;
    }
    log::debug!("Joined {} of {num_vertices} vertices of mesh {}", num_vertices - kept.len(), mesh.name);

    fn select<T: Copy>(data: &[T], kept: &[usize]) -> Vec<T> {
        if data.is_empty() {
            return Vec::new();
        }
        kept.iter().filter_map(|&i| data.get(i).copied()).collect()
    }
    mesh.vertices = select(&mesh.vertices, &kept);
    mesh.normals = select(&mesh.normals, &kept);
    mesh.tex_coords = select(&mesh.tex_coords, &kept);
    mesh.tangents = select(&mesh.tangents, &kept);
    mesh.bitangents = select(&mesh.bitangents, &kept);
    for face in mesh.faces.iter_mut() {
        for index in face.indices.iter_mut() {
            if let Some(&target) = remap.get(*index as usize) {
                *index = target;
            }
        }
    }
}

pub fn validate(scene: &Scene) -> anyhow::Result<()> {
    for (idx, mesh) in scene.meshes.iter().enumerate() {
        let num_vertices = mesh.num_vertices();
        if let Some(face) = mesh
            .faces
            .iter()
            .find(|f| f.indices.iter().any(|&i| i as usize >= num_vertices))
        {
            bail!(
                "Mesh {idx} ({}) has a face {:?} referencing a vertex out of range ({num_vertices} vertices)",
                mesh.name,
                face.indices
            );
        }
        if mesh.faces.iter().any(|f| f.indices.is_empty()) {
            bail!("Mesh {idx} ({}) has an empty face", mesh.name);
        }
        if mesh.has_normals() && mesh.normals.len() != num_vertices {
            bail!("Mesh {idx} ({}) has {} normals for {num_vertices} vertices", mesh.name, mesh.normals.len());
        }
        if mesh.has_tex_coords() && mesh.tex_coords.len() != num_vertices {
            bail!(
                "Mesh {idx} ({}) has {} texture coordinates for {num_vertices} vertices",
                mesh.name,
                mesh.tex_coords.len()
            );
        }
        for (label, len) in [("tangents", mesh.tangents.len()), ("bitangents", mesh.bitangents.len())] {
            if len != 0 && len != num_vertices {
                bail!("Mesh {idx} ({}) has {len} {label} for {num_vertices} vertices", mesh.name);
            }
        }
        if !scene.materials.is_empty() && mesh.material_index >= scene.materials.len() {
            bail!(
                "Mesh {idx} ({}) references material {} but there are only {}",
                mesh.name,
                mesh.material_index,
                scene.materials.len()
            );
        }
    }
    validate_node(&scene.root, scene.meshes.len())
}

fn validate_node(node: &Node, num_meshes: usize) -> anyhow::Result<()> {
    if let Some(idx) = node.meshes.iter().find(|&&i| i >= num_meshes) {
        bail!(
            "Node {} references mesh {idx} but there are only {num_meshes}",
            node.name
        );
    }
    node.children
        .iter()
        .try_for_each(|child| validate_node(child, num_meshes))
}

#[cfg(test)]
mod tests {
    use cgmath::Vector2;

    use super::*;
    use crate::data_structures::scene::{Material, SceneFlags};

    fn quad() -> Mesh {
        Mesh {
            name: "quad".into(),
            vertices: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            tex_coords: vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(1.0, 0.0),
                Vector2::new(1.0, 1.0),
                Vector2::new(0.0, 0.25),
            ],
            faces: vec![Face::new(vec![0, 1, 2, 3])],
            ..Default::default()
        }
    }

    fn scene_with(mesh: Mesh) -> Scene {
        let mut root = Node::new("root");
        root.meshes.push(0);
        Scene {
            root,
            meshes: vec![mesh],
            materials: vec![Material::default()],
            flags: SceneFlags::default(),
        }
    }

    #[test]
    fn combines_steps() {
        let steps = PostProcessSteps::TRIANGULATE | PostProcessSteps::GEN_NORMALS;
        assert!(steps.contains(PostProcessSteps::TRIANGULATE));
        assert!(!steps.contains(PostProcessSteps::FLIP_UVS));
        assert!(PostProcessSteps::empty().is_empty());

        let mut steps = PostProcessSteps::empty();
        steps |= PostProcessSteps::JOIN_IDENTICAL_VERTICES;
        assert_eq!(steps.bits(), 1 << 5);
    }

    #[test]
    fn fan_triangulates_quads() {
        let mut mesh = quad();
        triangulate(&mut mesh);
        let faces: Vec<_> = mesh.faces.iter().map(|f| f.indices.clone()).collect();
        assert_eq!(faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn flips_v_coordinate() {
        let mut mesh = quad();
        flip_uvs(&mut mesh);
        assert_eq!(mesh.tex_coords[3], Vector2::new(0.0, 0.75));
        assert_eq!(mesh.tex_coords[0], Vector2::new(0.0, 1.0));
    }

    #[test]
    fn generates_normals_facing_the_viewer() {
        let mut mesh = quad();
        triangulate(&mut mesh);
        gen_normals(&mut mesh);
        assert_eq!(mesh.normals.len(), 4);
        for n in &mesh.normals {
            assert!((*n - Vector3::unit_z()).magnitude() < 1e-6);
        }
    }

    #[test]
    fn leaves_unused_vertices_without_normal() {
        let mut mesh = quad();
        mesh.vertices.push(Vector3::new(5.0, 5.0, 5.0));
        triangulate(&mut mesh);
        gen_normals(&mut mesh);
        assert_eq!(mesh.normals[4], Vector3::zero());
    }

    #[test]
    fn generates_normals_for_tiny_triangles() {
        let mut mesh = Mesh {
            name: "tiny".into(),
            vertices: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1e-4, 0.0, 0.0),
                Vector3::new(0.0, 1e-4, 0.0),
            ],
            faces: vec![Face::new(vec![0, 1, 2])],
            ..Default::default()
        };
        gen_normals(&mut mesh);
        for n in &mesh.normals {
            assert!((*n - Vector3::unit_z()).magnitude() < 1e-6, "{n:?}");
        }
    }

    fn uv_triangle() -> Mesh {
        Mesh {
            name: "tri".into(),
            vertices: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vector3::unit_z(); 3],
            tex_coords: vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)],
            faces: vec![Face::new(vec![0, 1, 2])],
            ..Default::default()
        }
    }

    #[test]
    fn tangents_follow_texture_axes() {
        let mut mesh = uv_triangle();
        calc_tangent_space(&mut mesh);
        assert_eq!(mesh.tangents, vec![Vector3::unit_x(); 3]);
        assert_eq!(mesh.bitangents, vec![Vector3::unit_y(); 3]);
        assert!(mesh.has_tangents_and_bitangents());
    }

    #[test]
    fn tangents_need_texture_coordinates() {
        let mut mesh = uv_triangle();
        mesh.tex_coords.clear();
        calc_tangent_space(&mut mesh);
        assert!(!mesh.has_tangents_and_bitangents());
    }

    #[test]
    fn joins_vertices_with_equal_attributes() {
        let mut mesh = uv_triangle();
        mesh.vertices.push(Vector3::new(0.0, 0.0, 0.0));
        mesh.normals.push(Vector3::unit_z());
        mesh.tex_coords.push(Vector2::new(0.0, 0.0));
        mesh.faces.push(Face::new(vec![3, 2, 1]));
        join_identical_vertices(&mut mesh);
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.normals.len(), 3);
        assert_eq!(mesh.tex_coords.len(), 3);
        assert_eq!(mesh.faces[1].indices, vec![0, 2, 1]);
    }

    #[test]
    fn keeps_vertices_that_differ_in_any_attribute() {
        let mut mesh = uv_triangle();
        mesh.vertices.push(Vector3::new(0.0, 0.0, 0.0));
        mesh.normals.push(Vector3::unit_z());
        mesh.tex_coords.push(Vector2::new(0.5, 0.0));
        mesh.faces.push(Face::new(vec![3, 2, 1]));
        join_identical_vertices(&mut mesh);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.faces[1].indices, vec![3, 2, 1]);
    }

    #[test]
    fn apply_runs_tangents_after_generated_normals() {
        let mut mesh = uv_triangle();
        mesh.normals.clear();
        let mut scene = scene_with(mesh);
        apply(
            &mut scene,
            PostProcessSteps::GEN_NORMALS | PostProcessSteps::CALC_TANGENT_SPACE,
        )
        .unwrap();
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.normals.len(), 3);
        assert_eq!(mesh.tangents[0], Vector3::unit_x());
    }

    #[test]
    fn validation_rejects_partial_tangents() {
        let mut mesh = uv_triangle();
        mesh.tangents = vec![Vector3::unit_x()];
        mesh.bitangents = vec![Vector3::unit_y()];
        assert!(validate(&scene_with(mesh)).unwrap_err().to_string().contains("tangents"));
    }

    #[test]
    fn apply_keeps_existing_normals() {
        let mut mesh = quad();
        mesh.normals = vec![Vector3::unit_x(); 4];
        let mut scene = scene_with(mesh);
        apply(&mut scene, PostProcessSteps::GEN_NORMALS).unwrap();
        assert_eq!(scene.meshes[0].normals[0], Vector3::unit_x());
    }

    #[test]
    fn validation_rejects_out_of_range_indices() {
        let mut mesh = quad();
        mesh.faces.push(Face::new(vec![0, 1, 9]));
        let mut scene = scene_with(mesh);
        let err = apply(&mut scene, PostProcessSteps::VALIDATE_DATA_STRUCTURE).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(!scene.flags.validated);
    }

    #[test]
    fn validation_rejects_dangling_node_meshes() {
        let mut scene = scene_with(quad());
        let mut child = Node::new("child");
        child.meshes.push(3);
        scene.root.children.push(child);
        assert!(validate(&scene).is_err());
    }

    #[test]
    fn validation_marks_scene() {
        let mut scene = scene_with(quad());
        apply(&mut scene, PostProcessSteps::VALIDATE_DATA_STRUCTURE).unwrap();
        assert!(scene.flags.validated);
    }
}
