//! Branded PDF generation with a table of contents whose page numbers are
//! resolved from the rendered content, merged into one document and checked
//! by a bounded visual validation loop.

mod assemble;
mod assets;
mod canvas;
mod config;
mod content;
mod debug;
mod doc_context;
mod doc_template;
mod engine;
mod error;
mod flowable;
mod font;
mod frame;
mod metrics;
mod normalize;
mod offsets;
mod page_template;
mod pdf;
mod pdfinspect;
mod perf;
mod pipeline;
mod raster;
mod report;
mod resolver;
mod scan;
mod sections;
mod types;
mod validate;

/// Meta key under which every placed flowable records its frame rectangle.
pub const META_BBOX_KEY: &str = "brandfolio.bbox";
/// Meta key under which TOC entries record `id|x|y|w|h` in millipoints.
pub const META_LINK_KEY: &str = "brandfolio.toc_link";

pub use assemble::{AssembledDocument, AssemblyInput, DocumentInfo, TocLink, assemble};
pub use assets::{AssetBundle, ImageAsset};
pub use canvas::{Canvas, Command, Document, Page};
pub use config::{
    BrandingConfig, GenerationConfig, ImageBudget, LayoutConfig, LayoutParams, LogoConfig,
    MarginConfig, PageSizeConfig, TocConfig, ValidationConfig,
};
pub use content::{ContentInput, ContentNode, ContentTree, Heading, validate_headings};
pub use debug::DebugLogger;
pub use doc_context::DocContext;
pub use doc_template::DocTemplate;
pub use engine::{RenderArtifact, RenderEngine};
pub use error::{FolioError, FolioResult};
pub use flowable::{
    BreakAfter, BreakBefore, BreakInside, Flowable, ImageFlowable, ListItemFlowable, Pagination,
    Paragraph, RuleFlowable, Spacer, TextAlign, TextStyle, TocEntryFlowable,
};
pub use font::BaseFont;
pub use metrics::{DocumentMetrics, PageMetrics};
pub use normalize::{NormalizedImage, NormalizedLogos, normalize_image, normalize_logos};
pub use offsets::PageOffsets;
pub use page_template::PageTemplate;
pub use pdf::{PdfOptions, document_to_pdf};
pub use pdfinspect::{MergeBlocker, PdfReport, inspect_pdf_bytes, inspect_pdf_path};
pub use perf::PerfLogger;
pub use pipeline::{generate, generate_with_policy};
pub use raster::{RasterPage, rasterize_page};
pub use report::{GenerationReport, HeadingSummary, SectionSummary, ValidationOutcome};
pub use resolver::{Resolution, resolve_artifact, resolve_headings};
pub use scan::{Layer, ScannedPage, TextRun, scan_document, scan_pdf_bytes};
pub use sections::{Chrome, SectionBuilder, SectionKind};
pub use types::{Color, Margins, Pt, Rect, Size};
pub use validate::{
    ExtractedPage, LayoutAdjustmentPolicy, LoopPhase, MarginStepPolicy, Severity,
    ValidationIssue, ValidationLoopState, ValidationType, extract_pages, inspect_page,
    sample_pages,
};
