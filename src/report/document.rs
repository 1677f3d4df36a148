//! Plain text dump of a glTF document and its binary resources.

use std::io::{self, Cursor, Write};

use crate::{
    document::{GltfFile, VertexAttribute, byte_length},
    resources::file_name,
};

/// Prints asset metadata and the number of every top level entity.
pub fn print_document_info(out: &mut impl Write, document: &gltf::Document) -> io::Result<()> {
    let asset = &document.as_json().asset;
    writeln!(out, "Asset Version:    {}", asset.version)?;
    writeln!(out, "Asset MinVersion: {}", asset.min_version.as_deref().unwrap_or_default())?;
    writeln!(out, "Asset Generator:  {}", asset.generator.as_deref().unwrap_or_default())?;
    writeln!(out, "Asset Copyright:  {}\n", asset.copyright.as_deref().unwrap_or_default())?;

    let scene_count = document.scenes().count();
    writeln!(out, "Scene Count: {scene_count}")?;
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => writeln!(out, "Default Scene Index: {}\n", scene.index())?,
        None => writeln!(out)?,
    }

    writeln!(out, "Node Count:     {}", document.nodes().count())?;
    writeln!(out, "Camera Count:   {}", document.cameras().count())?;
    writeln!(out, "Material Count: {}\n", document.materials().count())?;

    writeln!(out, "Mesh Count: {}", document.meshes().count())?;
    writeln!(out, "Skin Count: {}\n", document.skins().count())?;

    writeln!(out, "Image Count:   {}", document.images().count())?;
    writeln!(out, "Texture Count: {}", document.textures().count())?;
    writeln!(out, "Sampler Count: {}\n", document.samplers().count())?;

    writeln!(out, "Buffer Count:     {}", document.buffers().count())?;
    writeln!(out, "BufferView Count: {}", document.views().count())?;
    writeln!(out, "Accessor Count:   {}\n", document.accessors().count())?;

    writeln!(out, "Animation Count: {}\n", document.animations().count())?;

    let mut used = document.extensions_used().peekable();
    let any_used = used.peek().is_some();
    for extension in used {
        writeln!(out, "Extension Used: {extension}")?;
    }
    if any_used {
        writeln!(out)?;
    }

    let mut required = document.extensions_required().peekable();
    let any_required = required.peek().is_some();
    for extension in required {
        writeln!(out, "Extension Required: {extension}")?;
    }
    if any_required {
        writeln!(out)?;
    }
    Ok(())
}

/// Prints the size of the position data of every primitive and of every image.
pub async fn print_resource_info(out: &mut impl Write, file: &GltfFile) -> anyhow::Result<()> {
    print_attribute_sizes(out, file, &[VertexAttribute::Position])?;

    for image in file.document().images() {
        let filename = file.image_filename(&image);
        let data = file.read_image_data(&image).await?;

        writeln!(out, "Image: {}", image.index())?;
        writeln!(out, "Image: {} bytes of image data", data.len())?;
        match image_dimensions(&data) {
            Some((width, height)) => writeln!(out, "Image dimensions: {width}x{height}")?,
            None => log::debug!("Image {} could not be decoded", image.index()),
        }

        if !filename.is_empty() {
            writeln!(out, "Image filename: {filename}\n")?;
        }
    }
    Ok(())
}

/// Prints the size of the position, normal and tangent data of every primitive.
pub fn print_mesh_info(out: &mut impl Write, file: &GltfFile) -> io::Result<()> {
    print_attribute_sizes(
        out,
        file,
        &[VertexAttribute::Position, VertexAttribute::Normal, VertexAttribute::Tangent],
    )
}

fn print_attribute_sizes(
    out: &mut impl Write,
    file: &GltfFile,
    attributes: &[VertexAttribute],
) -> io::Result<()> {
    for mesh in file.document().meshes() {
        writeln!(out, "Mesh: {}", mesh.index())?;

        for primitive in mesh.primitives() {
            for &attribute in attributes {
                if let Some(data) = file.read_attribute(&primitive, attribute) {
                    writeln!(
                        out,
                        "MeshPrimitive: {} bytes of {} data",
                        byte_length(&data),
                        attribute.label()
                    )?;
                }
            }
        }

        writeln!(out)?;
    }
    Ok(())
}

/// Prints a flat position array three components per line. Every line starts
/// with a line break and every value is followed by two spaces.
pub fn print_positions(out: &mut impl Write, positions: &[f32]) -> io::Result<()> {
    for (i, value) in positions.iter().enumerate() {
        if i % 3 == 0 {
            writeln!(out)?;
        }
        write!(out, "{value}  ")?;
    }
    Ok(())
}

/// Prints the vertex positions of every primitive.
pub fn print_mesh_positions(out: &mut impl Write, file: &GltfFile) -> io::Result<()> {
    for mesh in file.document().meshes() {
        writeln!(out, "Mesh: {}", mesh.index())?;
        for primitive in mesh.primitives() {
            let Some(positions) = file.read_attribute(&primitive, VertexAttribute::Position) else {
                continue;
            };
            write!(out, "MeshPrimitive: {} positions", primitive.index())?;
            print_positions(out, &positions)?;
            writeln!(out, "\n")?;
        }
    }
    Ok(())
}

/// Opens `path` and prints its document and resource info.
pub async fn print_info(out: &mut impl Write, path: &std::path::Path) -> anyhow::Result<()> {
    let file = GltfFile::open(path).await?;

    writeln!(out, "### glTF Info - {:?} ###\n", file_name(path))?;

    print_document_info(out, file.document())?;
    print_resource_info(out, &file).await
}

fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
