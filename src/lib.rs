//! model-inspect
//!
//! Diagnostic tooling for 3D model files. Two independent paths exist: a
//! format-independent importer that turns `.obj`, `.gltf` and `.glb` files
//! into one scene graph and dumps it, and a glTF inspector that reports what a
//! glTF document declares together with the size of its binary resources.
//!
//! High-level modules
//! - `data_structures`: the imported scene graph (nodes, meshes, materials)
//! - `resources`: file loading, data URIs and the per-format scene loaders
//! - `importer`: the `Importer` context and `import_scene`
//! - `postprocess`: triangulation, uv flipping, normal generation, validation
//! - `transform`: in-place vertex transforms and the axis conversion
//! - `export`: OBJ, STL and PLY writers
//! - `document`: a parsed glTF document with its buffers resolved
//! - `report`: text reports for scenes and glTF documents
//!

pub mod data_structures;
pub mod document;
pub mod export;
pub mod importer;
pub mod postprocess;
pub mod report;
pub mod resources;
pub mod transform;

// Re-exports commonly used types for convenience in downstream code.
pub use data_structures::scene::{Face, Material, Mesh, Node, Scene};
pub use document::GltfFile;
pub use export::{EXPORT_FORMATS, Exporter};
pub use importer::{Importer, import_scene};
pub use postprocess::PostProcessSteps;
