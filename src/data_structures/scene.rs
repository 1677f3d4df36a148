//! Imported scene graph.
//!
//! A `Scene` owns flat lists of meshes and materials. Nodes form the
//! hierarchy and refer to meshes by index, so the same mesh may be
//! instanced by several nodes.

use cgmath::{Matrix4, SquareMatrix, Vector2, Vector3};

/// Name given to the material that is added when a file defines none.
pub const DEFAULT_MATERIAL_NAME: &str = "DefaultMaterial";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneFlags {
    /// Set when the import produced no mesh with vertices.
    pub incomplete: bool,
    /// Set once the validation step has run successfully.
    pub validated: bool,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub root: Node,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub flags: SceneFlags,
}

impl Scene {
    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    /// Visits every node depth first, parents before children.
    pub fn visit_nodes<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        fn walk<'a>(node: &'a Node, visit: &mut dyn FnMut(&'a Node)) {
            visit(node);
            for child in &node.children {
                walk(child, visit);
            }
        }
        walk(&self.root, visit);
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    /// Transformation relative to the parent node.
    pub transformation: Matrix4<f32>,
    /// Indices into `Scene::meshes`.
    pub meshes: Vec<usize>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transformation: Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }
}

/// A face is a polygon given as indices into the vertex arrays of its mesh.
/// One index is a point, two a line, three a triangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl Face {
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vector3<f32>>,
    /// Either empty or exactly one normal per vertex.
    pub normals: Vec<Vector3<f32>>,
    /// Either empty or exactly one coordinate per vertex.
    pub tex_coords: Vec<Vector2<f32>>,
    /// Either empty or exactly one tangent per vertex, as are `bitangents`.
    pub tangents: Vec<Vector3<f32>>,
    pub bitangents: Vec<Vector3<f32>>,
    pub faces: Vec<Face>,
    /// Index into `Scene::materials`.
    pub material_index: usize,
}

impl Mesh {
    pub fn has_positions(&self) -> bool {
        !self.vertices.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_tex_coords(&self) -> bool {
        !self.tex_coords.is_empty()
    }

    pub fn has_tangents_and_bitangents(&self) -> bool {
        !self.tangents.is_empty() && !self.bitangents.is_empty()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Option<[f32; 4]>,
    pub diffuse_texture: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: None,
            diffuse_texture: None,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(DEFAULT_MATERIAL_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_nodes_parents_first() {
        let mut root = Node::new("root");
        let mut a = Node::new("a");
        a.children.push(Node::new("a1"));
        root.children.push(a);
        root.children.push(Node::new("b"));
        let scene = Scene {
            root,
            meshes: Vec::new(),
            materials: Vec::new(),
            flags: SceneFlags::default(),
        };

        let mut names = Vec::new();
        scene.visit_nodes(&mut |node| names.push(node.name.as_str()));
        assert_eq!(names, ["root", "a", "a1", "b"]);
    }
}
