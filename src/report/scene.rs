//! Plain text dump of an imported scene.

use std::io::{self, Write};

use cgmath::{Matrix, Matrix4, Vector3};

use crate::data_structures::scene::{Mesh, Node, Scene};

/// Prints the number of top level nodes, meshes and materials.
pub fn print_scene(out: &mut impl Write, scene: &Scene) -> io::Result<()> {
    writeln!(out, "numChildren: {}", scene.root.num_children())?;
    writeln!(out, "numMeshes: {}", scene.num_meshes())?;
    writeln!(out, "numMaterials: {}", scene.num_materials())
}

/// Prints `node` and all of its descendants, depth first.
pub fn print_nodes(out: &mut impl Write, scene: &Scene, node: &Node) -> io::Result<()> {
    print_node(out, scene, node)?;
    for child in &node.children {
        print_nodes(out, scene, child)?;
    }
    Ok(())
}

pub fn print_node(out: &mut impl Write, scene: &Scene, node: &Node) -> io::Result<()> {
    writeln!(out, "nodeName: {}", node.name)?;
    writeln!(out, "numChildren: {}", node.num_children())?;
    writeln!(out, "numMeshes: {}", node.num_meshes())?;
    print_matrix4x4(out, &node.transformation)?;
    print_node_meshes(out, scene, node)
}

pub fn print_node_meshes(out: &mut impl Write, scene: &Scene, node: &Node) -> io::Result<()> {
    for &mesh_index in &node.meshes {
        match scene.meshes.get(mesh_index) {
            Some(mesh) => print_node_mesh(out, mesh)?,
            None => log::error!("Node {} references missing mesh {mesh_index}", node.name),
        }
    }
    Ok(())
}

/// Prints the positions of every face's vertices, one vertex per line.
pub fn print_node_mesh(out: &mut impl Write, mesh: &Mesh) -> io::Result<()> {
    writeln!(out, "meshName: {}", mesh.name)?;

    if !mesh.has_positions() {
        log::error!("Mesh {} has no positions", mesh.name);
        return Ok(());
    }

    writeln!(out, "numVertices: {}", mesh.num_vertices())?;
    writeln!(out, "numFaces: {}", mesh.num_faces())?;

    for face in &mesh.faces {
        for &index in &face.indices {
            match mesh.vertices.get(index as usize) {
                Some(vertex) => print_vector3d(out, vertex)?,
                None => log::error!("Face of mesh {} references missing vertex {index}", mesh.name),
            }
        }
    }
    Ok(())
}

/// Prints the matrix row by row, so a translation shows up in the last column.
pub fn print_matrix4x4(out: &mut impl Write, matrix: &Matrix4<f32>) -> io::Result<()> {
    writeln!(out, "Matrix")?;
    for i in 0..4 {
        let row = matrix.row(i);
        writeln!(out, "{}  {}  {}  {}", row.x, row.y, row.z, row.w)?;
    }
    Ok(())
}

pub fn print_vector3d(out: &mut impl Write, vector: &Vector3<f32>) -> io::Result<()> {
    writeln!(out, "{}  {}  {}", vector.x, vector.y, vector.z)
}
