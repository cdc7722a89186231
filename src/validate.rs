//! Visual layout validation of the assembled document and the bounded retry
//! loop around it.
//!
//! Sample pages are scanned, rasterized per layer and written as
//! `page-{n}-actual.png`. Inspection compares where body ink sits relative
//! to the running header and footer ink. The loop itself is an explicit
//! state machine; issues are only ever appended.

use crate::config::{LayoutParams, ValidationConfig};
use crate::error::{FolioError, FolioResult};
use crate::raster::{RasterPage, rasterize_page};
use crate::scan::{Layer, ScannedPage, scan_document};
use crate::types::Pt;
use lopdf::Document as LoDocument;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    HeaderOverlap,
    FooterOverlap,
    MissingPageNumber,
    BlankPage,
    HeadingUnresolved,
    ImageOverBudget,
    LogoUnavailable,
    ImageUnreadable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub page: Option<usize>,
    pub validation_type: ValidationType,
    pub message: String,
    pub suggestion: Option<String>,
    /// What the issue is about when it is not a page: a heading id, an
    /// image path or a logo variant.
    pub subject: Option<String>,
    pub attempt: usize,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        validation_type: ValidationType,
        message: impl Into<String>,
        attempt: usize,
    ) -> Self {
        Self {
            severity,
            page: None,
            validation_type,
            message: message.into(),
            suggestion: None,
            subject: None,
            attempt,
        }
    }

    pub fn warning(validation_type: ValidationType, message: impl Into<String>, attempt: usize) -> Self {
        Self::new(Severity::Warning, validation_type, message, attempt)
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Same finding regardless of the attempt that raised it.
    pub fn same_finding(&self, other: &ValidationIssue) -> bool {
        self.validation_type == other.validation_type
            && self.page == other.page
            && match (&self.subject, &other.subject) {
                (Some(a), Some(b)) => a == b,
                (None, None) => self.message == other.message,
                _ => false,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Idle,
    Extracting,
    Inspecting,
    Passed,
    Retrying,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationLoopState {
    pub attempt: usize,
    pub max_attempts: usize,
    pub all_issues: Vec<ValidationIssue>,
    pub should_continue: bool,
    pub current_pages: Vec<usize>,
    pub phase: LoopPhase,
}

impl ValidationLoopState {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            attempt: 1,
            max_attempts: max_attempts.max(1),
            all_issues: Vec::new(),
            should_continue: true,
            current_pages: Vec::new(),
            phase: LoopPhase::Idle,
        }
    }

    fn transition(&mut self, allowed: &[LoopPhase], next: LoopPhase) -> FolioResult<()> {
        if !allowed.contains(&self.phase) {
            return Err(FolioError::render(
                "validate",
                format!("invalid loop transition {:?} -> {:?}", self.phase, next),
            ));
        }
        self.phase = next;
        Ok(())
    }

    pub fn start_extracting(&mut self, pages: Vec<usize>) -> FolioResult<()> {
        self.transition(&[LoopPhase::Idle, LoopPhase::Retrying], LoopPhase::Extracting)?;
        self.current_pages = pages;
        Ok(())
    }

    pub fn start_inspecting(&mut self) -> FolioResult<()> {
        self.transition(&[LoopPhase::Extracting], LoopPhase::Inspecting)
    }

    /// Appends issues raised outside inspection (resolver, assets).
    pub fn log_issues(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.all_issues.extend(issues);
    }

    /// Like [`log_issues`](Self::log_issues), but drops findings an earlier
    /// attempt already reported. Layout and resolver warnings recur on every
    /// attempt and are kept with the attempt that first raised them.
    pub fn log_new_issues(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) -> usize {
        let mut added = 0;
        for issue in issues {
            if !self.all_issues.iter().any(|seen| seen.same_finding(&issue)) {
                self.all_issues.push(issue);
                added += 1;
            }
        }
        added
    }

    /// Closes the current attempt with its inspection results and decides the
    /// next phase.
    pub fn finish_inspection(&mut self, issues: Vec<ValidationIssue>) -> FolioResult<LoopPhase> {
        if self.phase != LoopPhase::Inspecting {
            return Err(FolioError::render(
                "validate",
                format!("cannot finish inspection while {:?}", self.phase),
            ));
        }
        self.all_issues.extend(issues);
        let errors = self.errors_in(self.attempt);
        self.phase = if errors == 0 {
            self.should_continue = false;
            LoopPhase::Passed
        } else if self.attempt < self.max_attempts {
            self.attempt += 1;
            LoopPhase::Retrying
        } else {
            self.should_continue = false;
            LoopPhase::Failed
        };
        Ok(self.phase)
    }

    /// Ends a retry the adjustment policy had nothing to offer for.
    pub fn give_up(&mut self) -> FolioResult<()> {
        self.transition(&[LoopPhase::Retrying], LoopPhase::Failed)?;
        self.attempt -= 1;
        self.should_continue = false;
        Ok(())
    }

    pub fn errors_in(&self, attempt: usize) -> usize {
        self.all_issues
            .iter()
            .filter(|issue| issue.attempt == attempt && issue.is_error())
            .count()
    }
}

/// Derives the layout for the next attempt from the issues of the last one.
pub trait LayoutAdjustmentPolicy: Send + Sync {
    fn adjust(&self, params: &LayoutParams, issues: &[ValidationIssue]) -> Option<LayoutParams>;

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Grows the top margin on header overlap and the bottom margin on footer
/// overlap.
#[derive(Debug, Clone, Copy)]
pub struct MarginStepPolicy {
    pub step: Pt,
}

impl MarginStepPolicy {
    pub fn new(step: f32) -> Self {
        Self {
            step: Pt::from_f32(step),
        }
    }
}

impl LayoutAdjustmentPolicy for MarginStepPolicy {
    fn adjust(&self, params: &LayoutParams, issues: &[ValidationIssue]) -> Option<LayoutParams> {
        let has = |kind: ValidationType| issues.iter().any(|i| i.validation_type == kind);
        let mut next = params.clone();
        if has(ValidationType::HeaderOverlap) {
            next.margins.top += self.step;
        }
        if has(ValidationType::FooterOverlap) {
            next.margins.bottom += self.step;
        }
        if next == *params || next.check().is_err() {
            return None;
        }
        Some(next)
    }

    fn name(&self) -> &'static str {
        "margin_step"
    }
}

/// 1-based pages to inspect: the configured list when present, otherwise
/// the first `sample_count` pages.
pub fn sample_pages(config: &ValidationConfig, page_count: usize) -> Vec<usize> {
    let mut pages: Vec<usize> = match &config.sample_pages {
        Some(list) => list
            .iter()
            .copied()
            .filter(|page| (1..=page_count).contains(page))
            .collect(),
        None => (1..=config.sample_count.min(page_count)).collect(),
    };
    pages.sort_unstable();
    pages.dedup();
    pages
}

pub struct ExtractedPage {
    pub scanned: ScannedPage,
    pub raster: RasterPage,
    pub png_path: PathBuf,
}

impl ExtractedPage {
    pub fn number(&self) -> usize {
        self.scanned.number
    }
}

/// Scans and rasterizes `pages` of the PDF at `pdf_path`, writing one PNG
/// per page into `out_dir`. Pages are rasterized in parallel.
pub fn extract_pages(
    pdf_path: &Path,
    pages: &[usize],
    dpi: u32,
    out_dir: &Path,
) -> FolioResult<Vec<ExtractedPage>> {
    let doc = LoDocument::load(pdf_path)
        .map_err(|err| FolioError::render("validate", format!("load for extraction: {err}")))?;
    let scanned = scan_document(&doc, Some(pages))
        .map_err(|err| FolioError::render("validate", format!("scan: {err}")))?;
    scanned
        .into_par_iter()
        .map(|page| -> FolioResult<ExtractedPage> {
            let raster = rasterize_page(&page, dpi)?;
            let png_path = out_dir.join(format!("page-{}-actual.png", page.number));
            raster.save_png(&png_path)?;
            Ok(ExtractedPage {
                scanned: page,
                raster,
                png_path,
            })
        })
        .collect()
}

/// Per-page rules. Pages up to `title_pages` carry no chrome and are not
/// inspected.
pub fn inspect_page(page: &ExtractedPage, title_pages: usize, attempt: usize) -> Vec<ValidationIssue> {
    let number = page.number();
    if number <= title_pages {
        return Vec::new();
    }
    let mut issues = Vec::new();
    let raster = &page.raster;
    let body = raster.ink_span_pt(Layer::Body);

    if let (Some((body_top, _)), Some((_, header_bottom))) =
        (body, raster.ink_span_pt(Layer::Header))
    {
        if body_top <= header_bottom {
            issues.push(
                ValidationIssue::new(
                    Severity::Error,
                    ValidationType::HeaderOverlap,
                    format!(
                        "body ink starts at {body_top:.1}pt, running header ends at {header_bottom:.1}pt"
                    ),
                    attempt,
                )
                .on_page(number)
                .with_suggestion("increase the top margin"),
            );
        }
    }
    if let (Some((_, body_bottom)), Some((footer_top, _))) =
        (body, raster.ink_span_pt(Layer::Footer))
    {
        if body_bottom >= footer_top {
            issues.push(
                ValidationIssue::new(
                    Severity::Error,
                    ValidationType::FooterOverlap,
                    format!(
                        "body ink ends at {body_bottom:.1}pt, footer starts at {footer_top:.1}pt"
                    ),
                    attempt,
                )
                .on_page(number)
                .with_suggestion("increase the bottom margin"),
            );
        }
    }

    let footer = page.scanned.layer_text(Layer::Footer);
    let wanted = number.to_string();
    let has_number = footer
        .split(|c: char| !c.is_ascii_digit())
        .any(|token| token == wanted);
    if !has_number {
        issues.push(
            ValidationIssue::new(
                Severity::Error,
                ValidationType::MissingPageNumber,
                format!("footer text {footer:?} does not show page {number}"),
                attempt,
            )
            .on_page(number)
            .with_suggestion("include {page} in layout.footer_text"),
        );
    }

    if body.is_none() {
        issues.push(
            ValidationIssue::warning(ValidationType::BlankPage, "page has no body content", attempt)
                .on_page(number),
        );
    }
    issues
}
