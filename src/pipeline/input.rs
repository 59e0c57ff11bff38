//! Image intake: validate an upload and decode it once.
//!
//! Uploads arrive either as bytes (browser form) or as a local path (CLI).
//! Both end in an [`ImageInput`] whose MIME type is sniffed from the magic
//! bytes, not trusted from a filename or client header. Decoding happens
//! before any network call so a corrupt upload fails fast and locally.

use crate::error::AssistantError;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated JPEG or PNG upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Sniff the format and keep the bytes untouched.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, AssistantError> {
        let bytes = bytes.into();
        let mime_type = sniff_mime(&bytes)?;
        debug!("Image upload: {} bytes, {}", bytes.len(), mime_type);
        Ok(Self { mime_type, bytes })
    }

    /// Read a local file, mapping I/O failures to precise errors.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AssistantError> {
        let path = path.as_ref().to_path_buf();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| read_error(path.clone(), e))?;
        Self::from_bytes(bytes)
    }

    /// Decode the pixels on the blocking pool.
    ///
    /// JPEG/PNG decoding is CPU-bound; running it on a Tokio worker would
    /// stall every other interaction served by that thread.
    pub async fn decode(&self) -> Result<DynamicImage, AssistantError> {
        let bytes = self.bytes.clone();
        tokio::task::spawn_blocking(move || decode_blocking(&bytes))
            .await
            .map_err(|e| AssistantError::Internal(format!("Decode task panicked: {e}")))?
    }
}

fn sniff_mime(bytes: &[u8]) -> Result<&'static str, AssistantError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(other) => Err(AssistantError::UnsupportedImage {
            detail: format!("{other:?}"),
        }),
        Err(_) => Err(AssistantError::UnsupportedImage {
            detail: "unrecognised file signature".to_string(),
        }),
    }
}

fn decode_blocking(bytes: &[u8]) -> Result<DynamicImage, AssistantError> {
    let img = image::load_from_memory(bytes).map_err(|e| AssistantError::InvalidImage {
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded image → {}x{} px, {:?}",
        img.width(),
        img.height(),
        img.color()
    );
    Ok(img)
}

fn read_error(path: PathBuf, e: std::io::Error) -> AssistantError {
    match e.kind() {
        std::io::ErrorKind::NotFound => AssistantError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => AssistantError::PermissionDenied { path },
        _ => AssistantError::Internal(format!("Failed to read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([128])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_is_sniffed() {
        let input = ImageInput::from_bytes(png_bytes()).unwrap();
        assert_eq!(input.mime_type, "image/png");
    }

    #[test]
    fn jpeg_is_sniffed() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(ImageInput::from_bytes(buf).unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn text_is_rejected() {
        let err = ImageInput::from_bytes(b"hello world".to_vec()).unwrap_err();
        assert!(matches!(err, AssistantError::UnsupportedImage { .. }));
    }

    #[tokio::test]
    async fn truncated_png_fails_to_decode() {
        let mut bytes = png_bytes();
        bytes.truncate(20);
        let input = ImageInput::from_bytes(bytes).unwrap();
        assert!(matches!(
            input.decode().await,
            Err(AssistantError::InvalidImage { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = ImageInput::from_path("/definitely/not/here.png")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::FileNotFound { .. }));
    }
}
