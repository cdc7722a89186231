//! Resolved generation configuration.
//!
//! Discovery and defaulting of configuration files happens upstream; this
//! module only describes the resolved object the pipeline consumes and the
//! checks it performs before a run starts.

use crate::error::{FolioError, FolioResult};
use crate::types::{Color, Margins, Pt, Rect, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Markup source the content tree was produced from. Recorded in the
    /// report and the document info dictionary only.
    pub source_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub branding: BrandingConfig,
    pub logos: LogoConfig,
    pub layout: LayoutConfig,
    pub toc: TocConfig,
    pub validation: ValidationConfig,
    pub timeout_secs: Option<u64>,
    pub perf_log: Option<PathBuf>,
    pub debug_log: Option<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            output_path: PathBuf::from("output.pdf"),
            branding: BrandingConfig::default(),
            logos: LogoConfig::default(),
            layout: LayoutConfig::default(),
            toc: TocConfig::default(),
            validation: ValidationConfig::default(),
            timeout_secs: None,
            perf_log: None,
            debug_log: None,
        }
    }
}

impl GenerationConfig {
    pub fn from_json_str(raw: &str) -> FolioResult<Self> {
        let config: GenerationConfig = serde_json::from_str(raw)
            .map_err(|err| FolioError::invalid(format!("config json: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: &Path) -> FolioResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> FolioResult<()> {
        if self.output_path.as_os_str().is_empty() {
            return Err(FolioError::invalid("output_path cannot be empty"));
        }
        if self.validation.max_attempts == 0 {
            return Err(FolioError::invalid("validation.max_attempts must be >= 1"));
        }
        if self.validation.dpi < 36 || self.validation.dpi > 600 {
            return Err(FolioError::invalid(format!(
                "validation.dpi must be within 36..=600, got {}",
                self.validation.dpi
            )));
        }
        if !(1..=6).contains(&self.toc.max_level) {
            return Err(FolioError::invalid(format!(
                "toc.max_level must be within 1..=6, got {}",
                self.toc.max_level
            )));
        }
        if Color::from_hex(&self.branding.accent_color).is_none() {
            return Err(FolioError::invalid(format!(
                "branding.accent_color is not #rrggbb: {}",
                self.branding.accent_color
            )));
        }
        if self.branding.require_logos
            && (self.logos.title_logo.is_none() || self.logos.header_logo.is_none())
        {
            return Err(FolioError::invalid(
                "branding.require_logos is set but a logo path is missing",
            ));
        }
        for budget in [&self.logos.title_budget, &self.logos.header_budget] {
            if budget.max_width_px == 0 || budget.max_height_px == 0 || budget.max_bytes == 0 {
                return Err(FolioError::invalid("image budgets must be positive"));
            }
        }
        self.layout.resolve().map(|_| ())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrandingConfig {
    pub client_name: String,
    pub company_name: String,
    pub company_info: Vec<String>,
    pub document_title: String,
    pub subtitle: Option<String>,
    pub prepared_date: Option<String>,
    /// Header text on every non-title page; falls back to `document_title`.
    pub running_title: Option<String>,
    pub accent_color: String,
    pub require_logos: bool,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            company_name: String::new(),
            company_info: Vec::new(),
            document_title: "Untitled Document".to_string(),
            subtitle: None,
            prepared_date: None,
            running_title: None,
            accent_color: "#1f3a5f".to_string(),
            require_logos: false,
        }
    }
}

impl BrandingConfig {
    pub fn running_title(&self) -> &str {
        self.running_title
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.document_title)
    }

    pub fn accent(&self) -> Color {
        Color::from_hex(&self.accent_color).unwrap_or(Color::BLACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageBudget {
    pub max_width_px: u32,
    pub max_height_px: u32,
    pub max_bytes: u64,
}

impl ImageBudget {
    pub fn title_logo() -> Self {
        Self {
            max_width_px: 600,
            max_height_px: 300,
            max_bytes: 150_000,
        }
    }

    pub fn header_logo() -> Self {
        Self {
            max_width_px: 300,
            max_height_px: 80,
            max_bytes: 40_000,
        }
    }
}

impl Default for ImageBudget {
    fn default() -> Self {
        Self::title_logo()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogoConfig {
    pub title_logo: Option<PathBuf>,
    pub header_logo: Option<PathBuf>,
    pub title_budget: ImageBudget,
    pub header_budget: ImageBudget,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            title_logo: None,
            header_logo: None,
            title_budget: ImageBudget::title_logo(),
            header_budget: ImageBudget::header_logo(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageSizeConfig {
    Named(String),
    Points { width: f32, height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarginConfig {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            top: 72.0,
            right: 54.0,
            bottom: 64.0,
            left: 54.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub page_size: PageSizeConfig,
    pub margins: MarginConfig,
    /// Distance from the top edge to the header band.
    pub header_offset: f32,
    pub header_height: f32,
    /// Distance from the bottom edge to the footer band.
    pub footer_offset: f32,
    pub footer_height: f32,
    /// Footer page label; `{page}` and `{pages}` are substituted per page.
    pub footer_text: String,
    pub base_font_size: f32,
    pub h1_page_break: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: PageSizeConfig::Named("letter".to_string()),
            margins: MarginConfig::default(),
            header_offset: 24.0,
            header_height: 36.0,
            footer_offset: 24.0,
            footer_height: 20.0,
            footer_text: "Page {page} of {pages}".to_string(),
            base_font_size: 10.5,
            h1_page_break: false,
        }
    }
}

impl LayoutConfig {
    pub fn resolve(&self) -> FolioResult<LayoutParams> {
        let page_size = match &self.page_size {
            PageSizeConfig::Named(name) => Size::from_name(name)
                .ok_or_else(|| FolioError::invalid(format!("unknown page size: {name}")))?,
            PageSizeConfig::Points { width, height } => {
                if !(*width > 0.0 && *height > 0.0) {
                    return Err(FolioError::invalid("page size must be positive"));
                }
                Size::from_points(*width, *height)
            }
        };
        let m = self.margins;
        for (name, value) in [
            ("top", m.top),
            ("right", m.right),
            ("bottom", m.bottom),
            ("left", m.left),
            ("header_offset", self.header_offset),
            ("header_height", self.header_height),
            ("footer_offset", self.footer_offset),
            ("footer_height", self.footer_height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FolioError::invalid(format!(
                    "layout.{name} must be a non-negative number"
                )));
            }
        }
        if !(self.base_font_size >= 4.0 && self.base_font_size <= 72.0) {
            return Err(FolioError::invalid("layout.base_font_size must be within 4..=72"));
        }
        let params = LayoutParams {
            page_size,
            margins: Margins::new(m.top, m.right, m.bottom, m.left),
            header_offset: Pt::from_f32(self.header_offset),
            header_height: Pt::from_f32(self.header_height),
            footer_offset: Pt::from_f32(self.footer_offset),
            footer_height: Pt::from_f32(self.footer_height),
            footer_text: self.footer_text.clone(),
            base_font_size: Pt::from_f32(self.base_font_size),
            h1_page_break: self.h1_page_break,
        };
        params.check()?;
        Ok(params)
    }
}

/// Layout geometry for one generation attempt. The retry policy derives a
/// new value from the previous one; it is never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParams {
    pub page_size: Size,
    pub margins: Margins,
    pub header_offset: Pt,
    pub header_height: Pt,
    pub footer_offset: Pt,
    pub footer_height: Pt,
    pub footer_text: String,
    pub base_font_size: Pt,
    pub h1_page_break: bool,
}

impl LayoutParams {
    pub fn check(&self) -> FolioResult<()> {
        let frame = self.content_frame();
        // Need room for at least a few lines of body text.
        let min_height = self.base_font_size * 4;
        if frame.width <= Pt::from_i32(72) || frame.height <= min_height {
            return Err(FolioError::invalid(format!(
                "margins leave no usable content frame ({}x{}pt)",
                frame.width.to_f32(),
                frame.height.to_f32()
            )));
        }
        Ok(())
    }

    pub fn content_frame(&self) -> Rect {
        self.margins.frame_for(self.page_size)
    }

    pub fn header_band(&self) -> Rect {
        Rect::new(
            self.margins.left,
            self.header_offset,
            (self.page_size.width - self.margins.left - self.margins.right).max(Pt::ZERO),
            self.header_height,
        )
    }

    pub fn footer_band(&self) -> Rect {
        let y = self.page_size.height - self.footer_offset - self.footer_height;
        Rect::new(
            self.margins.left,
            y.max(Pt::ZERO),
            (self.page_size.width - self.margins.left - self.margins.right).max(Pt::ZERO),
            self.footer_height,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TocConfig {
    pub title: String,
    pub max_level: u8,
    pub indent_per_level: f32,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            title: "Table of Contents".to_string(),
            max_level: 3,
            indent_per_level: 14.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub max_attempts: usize,
    /// Explicit 1-based pages to inspect. When absent the first
    /// `sample_count` pages are used.
    pub sample_pages: Option<Vec<usize>>,
    pub sample_count: usize,
    pub dpi: u32,
    /// Margin growth applied per retry by the default adjustment policy.
    pub margin_step: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            sample_pages: None,
            sample_count: 3,
            dpi: 144,
            margin_step: 18.0,
        }
    }
}
