//! Vertex transformations applied in place to imported meshes.

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};

use crate::data_structures::scene::{Mesh, Scene};

/// Matrix that mirrors the Z axis.
pub fn flip_z_axis() -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(1.0, 1.0, -1.0)
}

/// Transforms every vertex as a point (`w = 1`).
pub fn transform_vertices(mesh: &mut Mesh, transform: &Matrix4<f32>) {
    for vertex in mesh.vertices.iter_mut() {
        *vertex = (*transform * vertex.extend(1.0)).truncate();
    }
}

/// Transforms normals with the inverse transpose of the upper 3x3 block and
/// tangents with the block itself, renormalising both. Singular matrices leave
/// them untouched.
pub fn transform_normals(mesh: &mut Mesh, transform: &Matrix4<f32>) {
    let linear = Matrix3::from_cols(
        transform.x.truncate(),
        transform.y.truncate(),
        transform.z.truncate(),
    );
    let Some(normal_matrix) = linear.invert().map(|m| m.transpose()) else {
        log::warn!("Normals of mesh {} kept, transformation is singular", mesh.name);
        return;
    };
    let renormalise = |v: Vector3<f32>, original: &mut Vector3<f32>| {
        if v.magnitude2() > 0.0 {
            *original = v.normalize();
        }
    };
    for normal in mesh.normals.iter_mut() {
        renormalise(normal_matrix * *normal, normal);
    }
    for tangent in mesh.tangents.iter_mut().chain(mesh.bitangents.iter_mut()) {
        renormalise(linear * *tangent, tangent);
    }
}

/**
 * Converts every mesh into the right-handed system where +X points to the right, +Y points up
 * and +Z points out of the screen towards the viewer, by mirroring the Z axis.
 *
 * Normals and tangents are mirrored with the vertices. Mirroring reverses the winding of every
 * face, so the indices of every face are reversed too to keep them front facing; printed faces
 * list their vertices in the reversed order.
 */
pub fn convert_system_axis(scene: &mut Scene) {
    let transform = flip_z_axis();
    for mesh in scene.meshes.iter_mut() {
        transform_vertices(mesh, &transform);
        transform_normals(mesh, &transform);
        for face in mesh.faces.iter_mut() {
            face.indices.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene::{Face, Material, Node, SceneFlags};

    fn triangle() -> Mesh {
        Mesh {
            name: "tri".into(),
            vertices: vec![
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 2.0),
                Vector3::new(0.0, 1.0, 3.0),
            ],
            normals: vec![Vector3::unit_z(); 3],
            tangents: vec![Vector3::unit_x(); 3],
            bitangents: vec![Vector3::unit_z(); 3],
            faces: vec![Face::new(vec![0, 1, 2])],
            ..Default::default()
        }
    }

    #[test]
    fn translates_vertices_as_points() {
        let mut mesh = triangle();
        transform_vertices(&mut mesh, &Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(mesh.vertices[0], Vector3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn flips_z_of_every_mesh() {
        let mut scene = Scene {
            root: Node::new("root"),
            meshes: vec![triangle()],
            materials: vec![Material::default()],
            flags: SceneFlags::default(),
        };
        convert_system_axis(&mut scene);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.vertices[1], Vector3::new(1.0, 0.0, -2.0));
        assert_eq!(mesh.normals[0], Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(mesh.tangents[0], Vector3::unit_x());
        assert_eq!(mesh.bitangents[0], Vector3::new(0.0, 0.0, -1.0));
        // winding is reversed with the mirror
        assert_eq!(mesh.faces[0].indices, vec![2, 1, 0]);
    }

    #[test]
    fn keeps_normals_for_singular_transforms() {
        let mut mesh = triangle();
        transform_normals(&mut mesh, &Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0));
        assert_eq!(mesh.normals[0], Vector3::unit_z());
    }
}
