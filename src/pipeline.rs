//! Generation pipeline: content layout, heading resolution, title and TOC
//! sections, chrome, merge, then the validation loop around all of it.

use crate::assemble::{AssemblyInput, DocumentInfo, assemble};
use crate::assets::ImageAsset;
use crate::config::{GenerationConfig, ImageBudget, LayoutParams};
use crate::content::{ContentTree, Heading, validate_headings};
use crate::debug::DebugLogger;
use crate::engine::{RenderArtifact, RenderEngine};
use crate::error::{FolioError, FolioResult};
use crate::normalize::{NormalizedImage, normalize_logos};
use crate::pdf::PdfOptions;
use crate::perf::PerfLogger;
use crate::report::{
    GenerationReport, HeadingSummary, SectionSummary, ValidationOutcome, sha256_hex,
};
use crate::resolver::resolve_artifact;
use crate::sections::{Chrome, SectionBuilder, SectionKind};
use crate::validate::{
    LayoutAdjustmentPolicy, LoopPhase, MarginStepPolicy, ValidationIssue, ValidationLoopState,
    ValidationType, extract_pages, inspect_page, sample_pages,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Caller-level time limit, checked between stages.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            at: limit.map(|limit| Instant::now() + limit),
        }
    }

    fn check(&self, stage: &'static str) -> FolioResult<()> {
        match self.at {
            Some(at) if Instant::now() >= at => Err(FolioError::Timeout { stage }),
            _ => Ok(()),
        }
    }
}

/// Output of one full generation attempt.
struct AttemptOutput {
    attempt: usize,
    path: PathBuf,
    page_count: usize,
    sections: Vec<SectionSummary>,
    headings: Vec<Heading>,
}

/// Generates with the default [`MarginStepPolicy`] built from
/// `validation.margin_step`.
pub fn generate(
    config: &GenerationConfig,
    tree: &ContentTree,
    headings: &[Heading],
) -> FolioResult<GenerationReport> {
    let policy = MarginStepPolicy::new(config.validation.margin_step);
    generate_with_policy(config, tree, headings, &policy)
}

pub fn generate_with_policy(
    config: &GenerationConfig,
    tree: &ContentTree,
    headings: &[Heading],
    policy: &dyn LayoutAdjustmentPolicy,
) -> FolioResult<GenerationReport> {
    config.validate()?;
    validate_headings(headings)?;
    let deadline = Deadline::new(config.timeout());
    let started = Instant::now();

    let perf = config.perf_log.as_deref().map(PerfLogger::new).transpose()?;
    let debug = config.debug_log.as_deref().map(DebugLogger::new).transpose()?;
    let mut engine = RenderEngine::new()?.with_loggers(perf.clone(), debug.clone());

    let mut preflight = Vec::new();
    let logos = prepare_logos(config, &mut engine, &mut preflight)?;
    deadline.check("normalize")?;

    let mut run = Run {
        config,
        tree,
        headings,
        engine,
        logos,
        deadline,
    };
    let mut state = ValidationLoopState::new(if config.validation.enabled {
        config.validation.max_attempts
    } else {
        1
    });
    state.log_issues(preflight);

    let mut layout = config.layout.resolve()?;
    let mut best: Option<(usize, AttemptOutput)> = None;
    let outcome = loop {
        let attempt = state.attempt;
        let span = tracing::info_span!("attempt", attempt);
        let _guard = span.enter();
        let attempt_start = Instant::now();

        let (output, issues) = run.attempt(&layout, attempt)?;
        let added = state.log_new_issues(issues);
        tracing::debug!(added, "layout and resolver issues");

        if !config.validation.enabled {
            best = Some((0, output));
            break ValidationOutcome::Skipped;
        }

        run.deadline.check("validate")?;
        let pages = sample_pages(&config.validation, output.page_count);
        state.start_extracting(pages.clone())?;
        let raster_dir = run.engine.workdir().join(format!("attempt-{attempt}"));
        std::fs::create_dir_all(&raster_dir)?;
        let extracted = extract_pages(&output.path, &pages, config.validation.dpi, &raster_dir)?;
        state.start_inspecting()?;
        let title_pages = output
            .sections
            .first()
            .map(|section| section.page_count)
            .unwrap_or(0);
        let found: Vec<ValidationIssue> = extracted
            .iter()
            .flat_map(|page| inspect_page(page, title_pages, attempt))
            .collect();
        let phase = state.finish_inspection(found)?;
        let errors = state.errors_in(attempt);
        if let Some(perf) = run.engine.perf() {
            perf.log_span_ms(
                "attempt",
                Some(attempt),
                attempt_start.elapsed().as_secs_f64() * 1000.0,
            );
            perf.log_counts(
                "validate",
                Some(attempt),
                &[("pages", pages.len() as u64), ("errors", errors as u64)],
            );
        }
        tracing::info!(phase = ?phase, errors, pages = pages.len(), "validation finished");

        // Ties go to the later attempt.
        if best.as_ref().is_none_or(|(fewest, _)| errors <= *fewest) {
            best = Some((errors, output));
        }

        match phase {
            LoopPhase::Passed => break ValidationOutcome::Passed,
            LoopPhase::Failed => break ValidationOutcome::Failed,
            LoopPhase::Retrying => {
                let last: Vec<ValidationIssue> = state
                    .all_issues
                    .iter()
                    .filter(|issue| issue.attempt == attempt)
                    .cloned()
                    .collect();
                match policy.adjust(&layout, &last) {
                    Some(next) => {
                        tracing::info!(
                            policy = policy.name(),
                            top = next.margins.top.to_f32(),
                            bottom = next.margins.bottom.to_f32(),
                            "retrying with adjusted layout"
                        );
                        layout = next;
                    }
                    None => {
                        tracing::warn!(policy = policy.name(), "no layout adjustment available");
                        state.give_up()?;
                        break ValidationOutcome::Failed;
                    }
                }
            }
            other => {
                return Err(FolioError::render(
                    "validate",
                    format!("loop stopped in unexpected phase {other:?}"),
                ));
            }
        }
    };

    let Some((_, chosen)) = best else {
        return Err(FolioError::render("validate", "no attempt produced a document"));
    };
    let bytes = std::fs::read(&chosen.path)?;
    if let Some(parent) = config
        .output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config.output_path, &bytes)?;

    let report = GenerationReport {
        output_path: config.output_path.clone(),
        source_path: config.source_path.clone(),
        page_count: chosen.page_count,
        file_size_bytes: bytes.len() as u64,
        sha256: sha256_hex(&bytes),
        outcome,
        selected_attempt: chosen.attempt,
        attempts: state.attempt,
        sections: chosen.sections,
        headings: chosen.headings.iter().map(HeadingSummary::from).collect(),
        issues: state.all_issues,
    };

    if let Some(perf) = run.engine.perf() {
        perf.log_span_ms("generate", None, started.elapsed().as_secs_f64() * 1000.0);
    }
    if let Some(debug) = run.engine.debug() {
        debug.log_event(
            "generate.finished",
            json!({
                "outcome": outcome.as_str(),
                "attempts": report.attempts,
                "pages": report.page_count,
                "errors": report.error_count(),
            }),
        );
        debug.emit_summary("generate");
    }
    tracing::info!(
        outcome = outcome.as_str(),
        attempts = report.attempts,
        pages = report.page_count,
        output = %report.output_path.display(),
        "document generated"
    );
    Ok(report)
}

#[derive(Default)]
struct Logos {
    title: Option<ImageAsset>,
    header: Option<ImageAsset>,
}

/// Normalizes and registers both logo variants. Failures are warnings unless
/// `branding.require_logos` is set.
fn prepare_logos(
    config: &GenerationConfig,
    engine: &mut RenderEngine,
    issues: &mut Vec<ValidationIssue>,
) -> FolioResult<Logos> {
    let normalized = normalize_logos(&config.logos, engine.workdir());
    let required = config.branding.require_logos;
    let mut register = |variant: &str,
                        result: Option<FolioResult<NormalizedImage>>,
                        budget: &ImageBudget|
     -> FolioResult<Option<ImageAsset>> {
        let Some(result) = result else {
            return Ok(None);
        };
        let registered = result.and_then(|image| {
            if !image.within(budget) {
                issues.push(
                    ValidationIssue::warning(
                        ValidationType::ImageOverBudget,
                        format!(
                            "{variant} logo is {} bytes at the quality floor, over the {} byte budget",
                            image.byte_len, budget.max_bytes
                        ),
                        1,
                    )
                    .with_subject(variant)
                    .with_suggestion("supply a smaller or simpler logo"),
                );
            }
            engine.register_image(&image.output)
        });
        match registered {
            Ok(asset) => Ok(Some(asset)),
            Err(err) if required => Err(err),
            Err(err) => {
                tracing::warn!(variant, error = %err, "logo skipped");
                issues.push(
                    ValidationIssue::warning(
                        ValidationType::LogoUnavailable,
                        format!("{variant} logo unavailable: {err}"),
                        1,
                    )
                    .with_subject(variant),
                );
                Ok(None)
            }
        }
    };
    let title = register("title", normalized.title, &config.logos.title_budget)?;
    let header = register("header", normalized.header, &config.logos.header_budget)?;
    Ok(Logos { title, header })
}

struct Run<'a> {
    config: &'a GenerationConfig,
    tree: &'a ContentTree,
    headings: &'a [Heading],
    engine: RenderEngine,
    logos: Logos,
    deadline: Deadline,
}

impl Run<'_> {
    fn base_dir(&self) -> Option<PathBuf> {
        self.config
            .source_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
    }

    fn timed<T>(&self, name: &str, attempt: usize, f: impl FnOnce() -> T) -> T {
        match self.engine.perf() {
            Some(perf) => perf.time(name, Some(attempt), f),
            None => f(),
        }
    }

    /// One full pass: layout, resolve, title, TOC, chrome, render, merge.
    fn attempt(
        &mut self,
        layout: &LayoutParams,
        attempt: usize,
    ) -> FolioResult<(AttemptOutput, Vec<ValidationIssue>)> {
        let config = self.config;
        let builder = SectionBuilder {
            branding: &config.branding,
            toc: &config.toc,
            layout,
            base_dir: self.base_dir(),
            debug: self.engine.debug().cloned(),
        };
        let options = PdfOptions {
            title: Some(config.branding.document_title.clone()),
        };

        self.deadline.check("content")?;
        let mut content = builder.layout_content(self.tree, &mut self.engine, attempt)?;
        let mut issues = std::mem::take(&mut content.issues);

        // Chrome does not move body text, so the bare content render gives
        // the same pagination as the final one.
        let bare = self.engine.render(SectionKind::Content, &content.document, &options)?;
        self.deadline.check("resolve")?;
        let resolution = self.timed("resolve", attempt, || {
            resolve_artifact(&bare.path, self.headings, attempt)
        })?;
        tracing::info!(
            resolved = resolution.resolved_count(),
            headings = self.headings.len(),
            content_pages = bare.page_count,
            "headings resolved"
        );
        issues.extend(resolution.issues);

        self.deadline.check("title")?;
        let title_doc = builder.build_title(self.logos.title.as_ref())?;
        let title_pages = title_doc.page_count();

        self.deadline.check("toc")?;
        let toc = builder.build_toc(self.headings, &resolution.local_pages, title_pages)?;
        let offsets = toc.offsets;
        let total = offsets.front_matter() + content.document.page_count();
        tracing::debug!(
            title_pages = offsets.title_pages,
            toc_pages = offsets.toc_pages,
            total,
            "page offsets"
        );

        let chrome = Chrome::new(&config.branding, layout, self.logos.header.clone());
        let mut toc_doc = toc.layout.document;
        chrome.apply(&mut toc_doc, layout, title_pages + 1, total);
        chrome.apply(
            &mut content.document,
            layout,
            offsets.front_matter() + 1,
            total,
        );

        self.deadline.check("render")?;
        let title = self.engine.render(SectionKind::Title, &title_doc, &options)?;
        let toc_artifact = self.engine.render(SectionKind::Toc, &toc_doc, &options)?;
        let content_artifact =
            self.engine
                .render(SectionKind::Content, &content.document, &options)?;

        self.deadline.check("assemble")?;
        let out_path = self.engine.workdir().join(format!("attempt-{attempt}.pdf"));
        let input = AssemblyInput {
            title: &title,
            toc: &toc_artifact,
            content: &content_artifact,
            headings: &toc.headings,
            toc_links: &toc.layout.links,
            info: DocumentInfo {
                title: config.branding.document_title.clone(),
                author: config.branding.company_name.clone(),
                subject: config.branding.subtitle.clone(),
            },
        };
        let assembled = self.timed("assemble", attempt, || assemble(&input, &out_path))?;

        let sections = summarize(&[&title, &toc_artifact, &content_artifact]);
        Ok((
            AttemptOutput {
                attempt,
                path: assembled.path,
                page_count: assembled.page_count,
                sections,
                headings: toc.headings,
            },
            issues,
        ))
    }
}

fn summarize(artifacts: &[&RenderArtifact]) -> Vec<SectionSummary> {
    let mut first_page = 1;
    artifacts
        .iter()
        .map(|artifact| {
            let summary = SectionSummary {
                section: artifact.section,
                page_count: artifact.page_count,
                first_page,
                byte_len: artifact.byte_len,
            };
            first_page += artifact.page_count;
            summary
        })
        .collect()
}
