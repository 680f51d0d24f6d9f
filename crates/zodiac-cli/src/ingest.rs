use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::path::Path;
use zodiac_core::ledger::ImageIngestor;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Inlines the file as a `data:` URL, the same shape a browser upload produces.
#[derive(Debug, Default)]
pub struct DataUrlIngestor;

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

impl ImageIngestor for DataUrlIngestor {
    fn to_data_reference(&self, path: &Path) -> Result<String> {
        let mime = mime_for(path)
            .ok_or_else(|| anyhow!("unsupported image type: {}", path.display()))?;
        let size = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        if size > MAX_IMAGE_BYTES {
            return Err(anyhow!("image larger than {} bytes", MAX_IMAGE_BYTES));
        }
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(format!(
            "data:{mime};base64,{}",
            general_purpose::STANDARD.encode(bytes)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn png_becomes_data_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deed.PNG");
        fs::write(&path, b"hi").unwrap();
        let reference = DataUrlIngestor.to_data_reference(&path).unwrap();
        assert_eq!(reference, "data:image/png;base64,aGk=");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hi").unwrap();
        assert!(DataUrlIngestor.to_data_reference(&path).is_err());
    }
}
