//! Data structures produced by the importers.
//!
//! - `scene` holds the scene graph: nodes, meshes, faces and materials

pub mod scene;
