//! glTF documents together with their resolved binary resources.
//!
//! Unlike the scene importer this keeps the document as the `gltf` crate
//! parsed it, so the inspector reports what the file actually declares.

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};

use crate::resources::{ResourceReader, decode_data_uri, is_data_uri, load_binary, load_buffers};

pub const GLTF_EXTENSION: &str = "gltf";
pub const GLB_EXTENSION: &str = "glb";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GltfFormat {
    /// JSON manifest with external or embedded buffers.
    Gltf,
    /// Binary container with a JSON chunk and an optional BIN chunk.
    Glb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexAttribute {
    Position,
    Normal,
    Tangent,
}

impl VertexAttribute {
    pub fn label(self) -> &'static str {
        match self {
            VertexAttribute::Position => "position",
            VertexAttribute::Normal => "normal",
            VertexAttribute::Tangent => "tangent",
        }
    }
}

pub struct GltfFile {
    path: PathBuf,
    format: GltfFormat,
    gltf: gltf::Gltf,
    buffers: Vec<Vec<u8>>,
    reader: ResourceReader,
}

impl GltfFile {
    /// Parses the manifest and loads every buffer it declares. External
    /// resources are resolved relative to the directory of `path`.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some(GLTF_EXTENSION) => GltfFormat::Gltf,
            Some(GLB_EXTENSION) => GltfFormat::Glb,
            _ => bail!("Command line argument path filename extension must be .gltf or .glb"),
        };
        let bytes = load_binary(path).await?;
        let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| anyhow!("glTF deserialize failed: {e}"))?;
        let reader = ResourceReader::for_file(path);
        let buffers = load_buffers(&gltf, &reader)
            .await
            .with_context(|| format!("Unable to load buffers of {}", path.display()))?;
        log::debug!("Loaded {} buffers of {}", buffers.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            format,
            gltf,
            buffers,
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> GltfFormat {
        self.format
    }

    pub fn document(&self) -> &gltf::Document {
        &self.gltf.document
    }

    pub fn buffers(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    /// Reads a float attribute of `primitive`, flattened. `None` if the
    /// primitive lacks the attribute or its data can not be read.
    pub fn read_attribute(
        &self,
        primitive: &gltf::Primitive,
        attribute: VertexAttribute,
    ) -> Option<Vec<f32>> {
        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(Vec::as_slice));
        match attribute {
            VertexAttribute::Position => reader
                .read_positions()
                .map(|iter| iter.flatten().collect()),
            VertexAttribute::Normal => reader
                .read_normals()
                .map(|iter| iter.flatten().collect()),
            VertexAttribute::Tangent => reader
                .read_tangents()
                .map(|iter| iter.flatten().collect()),
        }
    }

    /// Raw, still encoded, bytes of an image.
    pub async fn read_image_data(&self, image: &gltf::Image<'_>) -> anyhow::Result<Vec<u8>> {
        match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = self
                    .buffers
                    .get(view.buffer().index())
                    .ok_or_else(|| anyhow!("Image {} refers to a missing buffer", image.index()))?;
                let start = view.offset();
                let end = start + view.length();
                buffer
                    .get(start..end)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| anyhow!("Buffer view {} is out of range", view.index()))
            }
            gltf::image::Source::Uri { uri, .. } => match decode_data_uri(uri) {
                Some(decoded) => decoded,
                None => self.reader.read(uri).await,
            },
        }
    }

    /// Name shown for an image: the uri of the buffer it is stored in (empty
    /// for the GLB binary chunk), `Data URI` for embedded data, else its uri.
    pub fn image_filename(&self, image: &gltf::Image<'_>) -> String {
        match image.source() {
            gltf::image::Source::View { view, .. } => match view.buffer().source() {
                gltf::buffer::Source::Bin => String::new(),
                gltf::buffer::Source::Uri(uri) if is_data_uri(uri) => String::new(),
                gltf::buffer::Source::Uri(uri) => uri.to_string(),
            },
            gltf::image::Source::Uri { uri, .. } if is_data_uri(uri) => "Data URI".to_string(),
            gltf::image::Source::Uri { uri, .. } => uri.to_string(),
        }
    }
}

/// Size in bytes of a float array.
pub fn byte_length(data: &[f32]) -> usize {
    bytemuck::cast_slice::<f32, u8>(data).len()
}
