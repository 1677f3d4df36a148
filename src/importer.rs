//! Format-independent scene import.
//!
//! The `Importer` owns the scene it produced last, like a loader context: the
//! returned reference lives as long as the importer is not reused.

use std::path::Path;

use anyhow::bail;

use crate::{
    data_structures::scene::{Mesh, Scene},
    postprocess::{self, PostProcessSteps},
    resources::{load_model_gltf, load_model_obj},
};

/// Steps used by [`import_scene`].
pub const DEFAULT_STEPS: PostProcessSteps = PostProcessSteps::TRIANGULATE
    .union(PostProcessSteps::FLIP_UVS)
    .union(PostProcessSteps::GEN_NORMALS);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Gltf,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Some(Self::Obj),
            "gltf" | "glb" => Some(Self::Gltf),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Importer {
    scene: Option<Scene>,
    error: String,
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports `path` and applies `steps`. The previous scene is dropped even if
    /// the import fails.
    pub async fn read_file(
        &mut self,
        path: impl AsRef<Path>,
        steps: PostProcessSteps,
    ) -> anyhow::Result<&Scene> {
        let path = path.as_ref();
        self.scene = None;
        self.error.clear();
        match load(path, steps).await {
            Ok(scene) => Ok(&*self.scene.insert(scene)),
            Err(e) => {
                self.error = format!("{e:#}");
                Err(e)
            }
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Takes ownership of the last imported scene.
    pub fn take_scene(&mut self) -> Option<Scene> {
        self.scene.take()
    }

    /// Description of the last failure, empty if the last import succeeded.
    pub fn error_string(&self) -> &str {
        &self.error
    }
}

async fn load(path: &Path, steps: PostProcessSteps) -> anyhow::Result<Scene> {
    log::debug!("Importing {} with steps {:#06b}", path.display(), steps.bits());
    let mut scene = match ModelFormat::from_path(path) {
        Some(ModelFormat::Obj) => load_model_obj(path).await?,
        Some(ModelFormat::Gltf) => load_model_gltf(path).await?,
        None => bail!(
            "No suitable reader found for the file format of file '{}'",
            path.display()
        ),
    };
    scene.flags.incomplete = !scene.meshes.iter().any(Mesh::has_positions);
    postprocess::apply(&mut scene, steps)?;
    log::debug!(
        "Imported {} meshes and {} materials from {}",
        scene.num_meshes(),
        scene.num_materials(),
        path.display()
    );
    Ok(scene)
}

/// Imports `path` with triangulation, flipped UVs and generated normals.
///
/// Failures, including scenes without any mesh, are logged and yield `None`.
pub async fn import_scene<'a>(importer: &'a mut Importer, path: impl AsRef<Path>) -> Option<&'a Scene> {
    let path = path.as_ref();
    if let Err(e) = importer.read_file(path, DEFAULT_STEPS).await {
        log::error!("Error loading model: {e:#}");
        return None;
    }
    let scene = importer.scene()?;
    if scene.flags.incomplete {
        log::error!("Error loading model: {} contains no meshes", path.display());
        return None;
    }
    Some(scene)
}
