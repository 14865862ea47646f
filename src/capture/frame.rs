use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ExtendedColorType, ImageEncoder};

const JPEG_QUALITY: u8 = 80;

/// A camera feed that can hand out its current frame. `Ok(None)` means the
/// feed is up but has no frame yet.
pub trait FrameSource: Send + Sync {
    fn grab(&self) -> Result<Option<DynamicImage>>;
}

/// Reads the frame from an image file on every grab, e.g. the file a webcam
/// daemon keeps overwriting with its latest picture.
#[derive(Debug, Clone)]
pub struct StillFrameSource {
    path: PathBuf,
}

impl StillFrameSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FrameSource for StillFrameSource {
    fn grab(&self) -> Result<Option<DynamicImage>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let frame = image::open(&self.path)
            .with_context(|| format!("failed to decode frame {}", self.path.display()))?;
        Ok(Some(frame))
    }
}

pub fn encode_jpeg(frame: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = frame.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .context("failed to encode snapshot as JPEG")?;
    Ok(bytes)
}
