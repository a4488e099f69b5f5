//! Store photo processing.
//!
//! Uploaded photos are decoded in memory, resized to a fixed display width,
//! re-encoded as JPEG, and written under the uploads directory with a random
//! filename. Only the filename is persisted on the store.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;
use uuid::Uuid;

/// Target width for stored photos, in pixels. Height follows the aspect
/// ratio. Smaller images are kept as-is, never upscaled.
pub const PHOTO_WIDTH: u32 = 800;

const JPEG_QUALITY: u8 = 80;

/// Errors from photo processing.
#[derive(Debug, Error)]
pub enum PhotoError {
    /// The upload's content type is not an image.
    #[error("not an image: {0}")]
    NotAnImage(String),

    /// The bytes did not decode as any supported image format.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Writing the resized file failed.
    #[error("photo write failed: {0}")]
    Io(#[from] std::io::Error),

    /// JPEG re-encoding failed.
    #[error("jpeg encode failed: {0}")]
    Encode(String),
}

/// Validate, resize, and store an uploaded photo.
///
/// `content_type` must start with `image/`. Returns the generated filename
/// (not the full path), which the caller persists on the store.
///
/// # Errors
///
/// Returns [`PhotoError::NotAnImage`] for non-image uploads,
/// [`PhotoError::Decode`] for undecodable bytes, and IO/encode variants for
/// storage failures.
pub async fn process_upload(
    uploads_dir: &Path,
    content_type: &str,
    data: &[u8],
) -> Result<String, PhotoError> {
    if !content_type.starts_with("image/") {
        return Err(PhotoError::NotAnImage(content_type.to_owned()));
    }

    let encoded = resize_to_jpeg(data)?;

    let filename = format!("{}.jpg", Uuid::new_v4());
    let path: PathBuf = uploads_dir.join(&filename);

    tokio::fs::create_dir_all(uploads_dir).await?;
    tokio::fs::write(&path, encoded).await?;

    tracing::debug!(file = %filename, "Stored resized photo");
    Ok(filename)
}

/// Decode, clamp to [`PHOTO_WIDTH`], and encode as JPEG.
fn resize_to_jpeg(data: &[u8]) -> Result<Vec<u8>, PhotoError> {
    let img = image::load_from_memory(data)?;

    let img = if img.width() > PHOTO_WIDTH {
        // Lanczos keeps text and signage legible at directory-card size.
        img.resize(PHOTO_WIDTH, u32::MAX, FilterType::Lanczos3)
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| PhotoError::Encode(e.to_string()))?;

    Ok(out.into_inner())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 40]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_resize_clamps_width_and_keeps_aspect() {
        let encoded = resize_to_jpeg(&png_bytes(1600, 1200)).unwrap();
        let resized = image::load_from_memory(&encoded).unwrap();
        assert_eq!(resized.width(), PHOTO_WIDTH);
        assert_eq!(resized.height(), 600);
    }

    #[test]
    fn test_resize_never_upscales() {
        let encoded = resize_to_jpeg(&png_bytes(400, 300)).unwrap();
        let resized = image::load_from_memory(&encoded).unwrap();
        assert_eq!(resized.width(), 400);
        assert_eq!(resized.height(), 300);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(
            resize_to_jpeg(b"definitely not an image"),
            Err(PhotoError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_non_image_content_type_rejected() {
        let dir = std::env::temp_dir();
        let result = process_upload(&dir, "application/pdf", &[]).await;
        assert!(matches!(result, Err(PhotoError::NotAnImage(_))));
    }

    #[tokio::test]
    async fn test_process_upload_writes_jpeg_with_uuid_name() {
        let dir = std::env::temp_dir().join("savory-photo-test");
        let filename = process_upload(&dir, "image/png", &png_bytes(10, 10))
            .await
            .unwrap();
        assert!(filename.ends_with(".jpg"));

        let written = tokio::fs::read(dir.join(&filename)).await.unwrap();
        assert!(image::load_from_memory(&written).is_ok());

        let _ = tokio::fs::remove_file(dir.join(&filename)).await;
    }
}
