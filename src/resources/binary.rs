use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use base64::Engine;

pub async fn load_string(path: impl AsRef<Path>) -> anyhow::Result<String> {
    let path = path.as_ref();
    let txt = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))?;
    Ok(txt)
}

pub async fn load_binary(path: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
    let path = path.as_ref();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))?;
    Ok(data)
}

/// Resolves the relative URIs of external resources (buffers, images,
/// material libraries) against the directory of the file that declares them.
#[derive(Clone, Debug)]
pub struct ResourceReader {
    base: PathBuf,
}

impl ResourceReader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Reader rooted at the parent directory of `file`.
    pub fn for_file(file: &Path) -> Self {
        let base = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(base)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn resolve(&self, uri: &str) -> PathBuf {
        self.base.join(uri.replace("%20", " "))
    }

    pub async fn read(&self, uri: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.resolve(uri);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Unable to create a valid input stream for uri: {uri}"))
    }

    pub async fn read_string(&self, uri: &str) -> anyhow::Result<String> {
        let path = self.resolve(uri);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Unable to create a valid input stream for uri: {uri}"))
    }
}

pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decodes a `data:[<mime>][;base64],<payload>` URI.
///
/// Returns `None` if `uri` is not a data URI at all.
pub fn decode_data_uri(uri: &str) -> Option<anyhow::Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let decoded = match rest.split_once(',') {
        Some((header, payload)) if header.ends_with(";base64") => {
            base64::engine::general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| anyhow!("Invalid base64 payload in data URI: {e}"))
        }
        Some(_) => Err(anyhow!("Only base64 encoded data URIs are supported")),
        None => Err(anyhow!("Malformed data URI")),
    };
    Some(decoded)
}

/// Reads the bytes of every buffer of a glTF document, in buffer order.
pub async fn load_buffers(
    gltf: &gltf::Gltf,
    reader: &ResourceReader,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let mut data = match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => blob.to_vec(),
                None => bail!("Buffer {} refers to a missing GLB binary chunk", buffer.index()),
            },
            gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri) {
                Some(decoded) => decoded?,
                None => reader.read(uri).await?,
            },
        };
        if data.len() < buffer.length() {
            bail!(
                "Buffer {} is {} bytes long but declares {} bytes",
                buffer.index(),
                data.len(),
                buffer.length()
            );
        }
        // GLB chunks are padded to four bytes
        data.truncate(buffer.length());
        buffer_data.push(data);
    }
    Ok(buffer_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_data_uri() {
        let bytes = decode_data_uri("data:application/octet-stream;base64,AAECAw==")
            .unwrap()
            .unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn ignores_plain_uris() {
        assert!(decode_data_uri("buffer.bin").is_none());
        assert!(!is_data_uri("buffer.bin"));
    }

    #[test]
    fn rejects_non_base64_data_uri() {
        assert!(decode_data_uri("data:text/plain,hello").unwrap().is_err());
    }

    #[test]
    fn resolves_escaped_spaces() {
        let reader = ResourceReader::new("models");
        assert_eq!(
            reader.resolve("my%20buffer.bin"),
            Path::new("models").join("my buffer.bin")
        );
    }
}
