//! Raster images the renderer may place on a page, keyed by resource id.

use crate::error::{FolioError, FolioResult};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat, RgbImage};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub resource_id: String,
    /// Baseline RGB JPEG, written to the PDF with `/DCTDecode`.
    pub jpeg: Arc<Vec<u8>>,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageAsset {
    pub fn bytes_len(&self) -> usize {
        self.jpeg.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    images: BTreeMap<String, ImageAsset>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an image file and registers it. Registering the same bytes twice
    /// returns the existing entry.
    pub fn register_file(&mut self, path: &Path) -> FolioResult<ImageAsset> {
        let data = std::fs::read(path).map_err(|err| FolioError::asset(path, err.to_string()))?;
        self.register_bytes(&data)
            .map_err(|message| FolioError::asset(path, message))
    }

    pub fn register_bytes(&mut self, data: &[u8]) -> Result<ImageAsset, String> {
        let resource_id = resource_id_for(data);
        if let Some(existing) = self.images.get(&resource_id) {
            return Ok(existing.clone());
        }
        let (jpeg, width_px, height_px) = to_rgb_jpeg(data)?;
        let asset = ImageAsset {
            resource_id: resource_id.clone(),
            jpeg: Arc::new(jpeg),
            width_px,
            height_px,
        };
        self.images.insert(resource_id, asset.clone());
        Ok(asset)
    }

    pub fn get(&self, resource_id: &str) -> Option<&ImageAsset> {
        self.images.get(resource_id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn resource_id_for(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut id = String::from("img-");
    for byte in &digest[..8] {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

fn to_rgb_jpeg(data: &[u8]) -> Result<(Vec<u8>, u32, u32), String> {
    let format = image::guess_format(data).map_err(|err| err.to_string())?;
    let decoded = image::load_from_memory(data).map_err(|err| err.to_string())?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err("image has no pixels".to_string());
    }
    // Already a plain RGB JPEG: embed as-is.
    if format == ImageFormat::Jpeg && decoded.color() == ColorType::Rgb8 {
        return Ok((data.to_vec(), width, height));
    }
    let rgb = flatten_on_white(&decoded);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 92)
        .encode_image(&rgb)
        .map_err(|err| err.to_string())?;
    Ok((out, width, height))
}

/// Composites any alpha channel onto a white background.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as u32;
        for channel in 0..3 {
            let value = src[channel] as u32 * alpha + 255 * (255 - alpha);
            dst[channel] = ((value + 127) / 255) as u8;
        }
    }
    out
}
