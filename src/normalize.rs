//! Brand image normalization: fit into a pixel box, flatten, and re-encode as
//! JPEG under a byte ceiling.

use crate::assets::flatten_on_white;
use crate::config::{ImageBudget, LogoConfig};
use crate::error::{FolioError, FolioResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

pub const QUALITY_START: u8 = 90;
pub const QUALITY_STEP: u8 = 10;
pub const QUALITY_FLOOR: u8 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
    pub byte_len: usize,
    pub quality: u8,
}

impl NormalizedImage {
    pub fn within(&self, budget: &ImageBudget) -> bool {
        self.byte_len as u64 <= budget.max_bytes
    }
}

/// Normalizes `source` into `output`. The source file is never touched. When
/// even the quality floor stays above `budget.max_bytes` the floor result is
/// still written and returned; callers check [`NormalizedImage::within`].
pub fn normalize_image(
    source: &Path,
    budget: &ImageBudget,
    output: &Path,
) -> FolioResult<NormalizedImage> {
    let data = std::fs::read(source).map_err(|err| FolioError::asset(source, err.to_string()))?;
    let decoded =
        image::load_from_memory(&data).map_err(|err| FolioError::asset(source, err.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(FolioError::asset(source, "image has no pixels"));
    }

    let fitted = if decoded.width() > budget.max_width_px || decoded.height() > budget.max_height_px
    {
        decoded.resize(budget.max_width_px, budget.max_height_px, FilterType::Lanczos3)
    } else {
        decoded
    };
    let rgb = flatten_on_white(&fitted);

    let mut quality = QUALITY_START;
    let encoded = loop {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality)
            .encode_image(&rgb)
            .map_err(|err| FolioError::asset(source, format!("jpeg encode: {err}")))?;
        if buf.len() as u64 <= budget.max_bytes || quality <= QUALITY_FLOOR {
            break buf;
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &encoded)?;
    tracing::debug!(
        source = %source.display(),
        width = rgb.width(),
        height = rgb.height(),
        bytes = encoded.len(),
        quality,
        "normalized image"
    );

    Ok(NormalizedImage {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width_px: rgb.width(),
        height_px: rgb.height(),
        byte_len: encoded.len(),
        quality,
    })
}

#[derive(Debug, Default)]
pub struct NormalizedLogos {
    pub title: Option<FolioResult<NormalizedImage>>,
    pub header: Option<FolioResult<NormalizedImage>>,
}

/// Normalizes the title and header logo variants in parallel. A variant with
/// no configured path yields `None`.
pub fn normalize_logos(logos: &LogoConfig, out_dir: &Path) -> NormalizedLogos {
    let run = |source: &Option<PathBuf>, budget: &ImageBudget, name: &str| {
        source
            .as_deref()
            .map(|path| normalize_image(path, budget, &out_dir.join(name)))
    };
    let (title, header) = rayon::join(
        || run(&logos.title_logo, &logos.title_budget, "logo-title.jpg"),
        || run(&logos.header_logo, &logos.header_budget, "logo-header.jpg"),
    );
    NormalizedLogos { title, header }
}
