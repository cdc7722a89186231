//! The rendering engine: one per run, shared by every section and attempt.

use crate::assets::{AssetBundle, ImageAsset};
use crate::canvas::Document;
use crate::debug::DebugLogger;
use crate::error::{FolioError, FolioResult};
use crate::pdf::{PdfOptions, document_to_pdf};
use crate::perf::PerfLogger;
use crate::sections::SectionKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, SystemTime};
use tempfile::TempDir;

/// A rendered section on disk. Lives inside the engine's work directory and
/// disappears with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderArtifact {
    pub section: SectionKind,
    pub path: PathBuf,
    pub page_count: usize,
    pub byte_len: usize,
    pub generated_at: SystemTime,
}

pub struct RenderEngine {
    workdir: TempDir,
    assets: AssetBundle,
    sequence: AtomicUsize,
    perf: Option<PerfLogger>,
    debug: Option<DebugLogger>,
}

impl RenderEngine {
    pub fn new() -> FolioResult<Self> {
        let workdir = tempfile::Builder::new().prefix("brandfolio-").tempdir()?;
        tracing::debug!(workdir = %workdir.path().display(), "render engine ready");
        Ok(Self {
            workdir,
            assets: AssetBundle::new(),
            sequence: AtomicUsize::new(0),
            perf: None,
            debug: None,
        })
    }

    pub fn with_loggers(mut self, perf: Option<PerfLogger>, debug: Option<DebugLogger>) -> Self {
        self.perf = perf;
        self.debug = debug;
        self
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn perf(&self) -> Option<&PerfLogger> {
        self.perf.as_ref()
    }

    pub fn debug(&self) -> Option<&DebugLogger> {
        self.debug.as_ref()
    }

    pub fn assets(&self) -> &AssetBundle {
        &self.assets
    }

    pub fn register_image(&mut self, path: &Path) -> FolioResult<ImageAsset> {
        self.assets.register_file(path)
    }

    /// Serializes `document` into a new artifact file. Every call gets its
    /// own file name, so artifacts from earlier attempts stay readable.
    pub fn render(
        &self,
        section: SectionKind,
        document: &Document,
        options: &PdfOptions,
    ) -> FolioResult<RenderArtifact> {
        if document.pages.is_empty() {
            return Err(FolioError::render(section.as_str(), "document has no pages"));
        }
        let start = Instant::now();
        let bytes = document_to_pdf(document, &self.assets, options).map_err(|err| match err {
            FolioError::Render { message, .. } => FolioError::render(section.as_str(), message),
            other => other,
        })?;
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self
            .workdir
            .path()
            .join(format!("{}-{seq:03}.pdf", section.as_str()));
        std::fs::write(&path, &bytes).map_err(|err| {
            FolioError::render(section.as_str(), format!("write {}: {err}", path.display()))
        })?;

        let ms = start.elapsed().as_secs_f64() * 1000.0;
        if let Some(perf) = &self.perf {
            perf.log_span_ms(&format!("render.{}", section.as_str()), None, ms);
        }
        tracing::debug!(
            section = section.as_str(),
            pages = document.page_count(),
            bytes = bytes.len(),
            "rendered section"
        );
        Ok(RenderArtifact {
            section,
            path,
            page_count: document.page_count(),
            byte_len: bytes.len(),
            generated_at: SystemTime::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::types::{Pt, Size};

    fn two_pages() -> Document {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_string(Pt::from_f32(50.0), Pt::from_f32(50.0), "one");
        canvas.show_page();
        canvas.draw_string(Pt::from_f32(50.0), Pt::from_f32(50.0), "two");
        canvas.finish()
    }

    #[test]
    fn artifacts_are_written_into_the_private_workdir() {
        let engine = RenderEngine::new().expect("engine");
        let first = engine
            .render(SectionKind::Content, &two_pages(), &PdfOptions::default())
            .expect("render");
        let second = engine
            .render(SectionKind::Content, &two_pages(), &PdfOptions::default())
            .expect("render");
        assert_eq!(first.page_count, 2);
        assert!(first.path.starts_with(engine.workdir()));
        assert_ne!(first.path, second.path);
        assert_eq!(
            std::fs::metadata(&first.path).expect("meta").len() as usize,
            first.byte_len
        );
        let name = engine
            .workdir()
            .file_name()
            .and_then(|n| n.to_str())
            .expect("name");
        assert!(name.starts_with("brandfolio-"));
    }

    #[test]
    fn workdir_is_removed_on_drop() {
        let engine = RenderEngine::new().expect("engine");
        let dir = engine.workdir().to_path_buf();
        engine
            .render(SectionKind::Title, &two_pages(), &PdfOptions::default())
            .expect("render");
        drop(engine);
        assert!(!dir.exists());
    }

    #[test]
    fn missing_image_is_attributed_to_the_section() {
        let engine = RenderEngine::new().expect("engine");
        let mut canvas = Canvas::new(Size::letter());
        canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(5.0), Pt::from_f32(5.0), "img-x");
        let err = engine
            .render(SectionKind::Toc, &canvas.finish(), &PdfOptions::default())
            .expect_err("missing image");
        assert_eq!(err.stage(), "toc");
    }
}
