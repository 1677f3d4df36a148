//! Human readable reports written to any `std::io::Write`.
//!
//! - `scene` dumps an imported scene: node tree, matrices and triangles
//! - `document` dumps a glTF document: entity counts and resource sizes

pub mod document;
pub mod scene;

pub use document::{
    print_document_info, print_info, print_mesh_info, print_mesh_positions, print_positions,
    print_resource_info,
};
pub use scene::{
    print_matrix4x4, print_node, print_node_mesh, print_node_meshes, print_nodes, print_scene,
    print_vector3d,
};
