use std::path::{Path, PathBuf};

use image::ImageFormat;
use nanoid::nanoid;

use crate::{error::Error, tools::log::{log_error, LogServiceType}, Result};

/// Formats accepted for upload.
pub const ACCEPTED_FORMATS: [ImageFormat; 4] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp, ImageFormat::Tiff];

/// Sniffs the image format from the content, rejecting anything not in [`ACCEPTED_FORMATS`].
pub fn accepted_format(bytes: &[u8]) -> Result<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED_FORMATS.contains(&format) => Ok(format),
        Ok(format) => Err(Error::UnsupportedImageFormat(format!("{:?}", format).to_lowercase())),
        Err(_) => Err(Error::UnsupportedImageFormat("unknown".to_string())),
    }
}

pub fn extension_for_format(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("bin")
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let format = path.extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension);
    match format {
        Some(format) => format.to_mime_type(),
        None => "application/octet-stream",
    }
}

/// Image written to the cache folder for the duration of one analysis.
///
/// The file is removed when the value is dropped, whatever path the request took.
#[derive(Debug)]
pub struct TempImageFile {
    path: PathBuf,
}

impl TempImageFile {
    pub async fn write(dir: &Path, format: ImageFormat, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.{}", nanoid!(), extension_for_format(format)));
        let file = Self { path };
        tokio::fs::write(&file.path, bytes).await?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImageFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log_error(LogServiceType::Analysis, format!("Unable to remove temporary file {:?}: {}", self.path, err));
            }
        }
    }
}
