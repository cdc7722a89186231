//! Title, TOC and content section builders plus the running chrome.
//!
//! Sections are laid out without chrome. Header and footer are prepended to
//! each page afterwards, once the final page numbers are known, so applying
//! chrome never changes pagination.

use crate::assemble::TocLink;
use crate::assets::ImageAsset;
use crate::canvas::{Canvas, Command, Document};
use crate::config::{BrandingConfig, LayoutParams, TocConfig};
use crate::content::{ContentNode, ContentTree, Heading};
use crate::debug::DebugLogger;
use crate::doc_template::DocTemplate;
use crate::engine::RenderEngine;
use crate::error::{FolioError, FolioResult};
use crate::flowable::{
    BreakAfter, BreakInside, Flowable, ImageFlowable, ListItemFlowable, Pagination, Paragraph, RuleFlowable,
    Spacer, TextAlign, TextStyle, TocEntryFlowable,
};
use crate::font::BaseFont;
use crate::offsets::PageOffsets;
use crate::page_template::PageTemplate;
use crate::types::{Color, Pt, Rect, Size};
use crate::validate::{ValidationIssue, ValidationType};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Title,
    Toc,
    Content,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Title => "title",
            SectionKind::Toc => "toc",
            SectionKind::Content => "content",
        }
    }
}

const CHROME_FONT_SIZE: f32 = 9.0;
const HEADER_LOGO_MAX_WIDTH: f32 = 140.0;
const MUTED: Color = Color {
    r: 0.35,
    g: 0.35,
    b: 0.35,
};

/// Running header and footer for every non-title page.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub running_title: String,
    pub client_name: String,
    pub footer_text: String,
    pub accent: Color,
    pub header_logo: Option<ImageAsset>,
}

impl Chrome {
    pub fn new(branding: &BrandingConfig, layout: &LayoutParams, header_logo: Option<ImageAsset>) -> Self {
        Self {
            running_title: branding.running_title().to_string(),
            client_name: branding.client_name.clone(),
            footer_text: layout.footer_text.clone(),
            accent: branding.accent(),
            header_logo,
        }
    }

    pub fn footer_label(&self, page: usize, total: usize) -> String {
        self.footer_text
            .replace("{page}", &page.to_string())
            .replace("{pages}", &total.to_string())
    }

    fn commands(&self, layout: &LayoutParams, page: usize, total: usize) -> Vec<Command> {
        let style = TextStyle::new(BaseFont::Helvetica, CHROME_FONT_SIZE).with_color(MUTED);
        let mut canvas = Canvas::new(layout.page_size);
        canvas.save_state();

        let band = layout.header_band();
        let text_y = band.y + (band.height - style.font_size).max(Pt::ZERO).mul_ratio(1, 2);
        canvas.begin_artifact("Header");
        canvas.set_font(style.font);
        canvas.set_font_size(style.font_size);
        canvas.set_fill_color(style.color);
        match &self.header_logo {
            Some(logo) if logo.height_px > 0 && band.height > Pt::ZERO => {
                let ratio = logo.width_px as f32 / logo.height_px as f32;
                let mut height = band.height.to_f32();
                let mut width = height * ratio;
                if width > HEADER_LOGO_MAX_WIDTH {
                    width = HEADER_LOGO_MAX_WIDTH;
                    height = width / ratio;
                }
                canvas.draw_image(
                    band.x,
                    band.y,
                    Pt::from_f32(width),
                    Pt::from_f32(height),
                    logo.resource_id.clone(),
                );
            }
            _ if !self.client_name.trim().is_empty() => {
                canvas.draw_string(band.x, text_y, self.client_name.clone());
            }
            _ => {}
        }
        if !self.running_title.is_empty() {
            let width = style.measure(&self.running_title);
            canvas.draw_string(band.right() - width, text_y, self.running_title.clone());
        }
        canvas.set_stroke_color(self.accent);
        canvas.set_line_width(Pt::from_f32(0.75));
        canvas.stroke_line(band.x, band.bottom(), band.right(), band.bottom());
        canvas.end_marked_content();

        let band = layout.footer_band();
        let label = self.footer_label(page, total);
        if !label.is_empty() {
            canvas.begin_artifact("Footer");
            let width = style.measure(&label);
            let x = band.x + (band.width - width).max(Pt::ZERO).mul_ratio(1, 2);
            let y = band.y + (band.height - style.font_size).max(Pt::ZERO).mul_ratio(1, 2);
            canvas.draw_string(x, y, label);
            canvas.end_marked_content();
        }

        canvas.restore_state();
        canvas
            .finish()
            .pages
            .into_iter()
            .next()
            .map(|page| page.commands)
            .unwrap_or_default()
    }

    /// Prepends chrome to every page. Page `i` (0-based) is numbered
    /// `first_page + i` out of `total`.
    pub fn apply(&self, document: &mut Document, layout: &LayoutParams, first_page: usize, total: usize) {
        for (index, page) in document.pages.iter_mut().enumerate() {
            let chrome = self.commands(layout, first_page + index, total);
            page.commands.splice(0..0, chrome);
        }
    }
}

pub struct TocLayout {
    pub document: Document,
    pub links: Vec<TocLink>,
}

pub struct TocBuild {
    pub layout: TocLayout,
    pub offsets: PageOffsets,
    /// Headings with final page numbers.
    pub headings: Vec<Heading>,
}

pub struct ContentLayout {
    pub document: Document,
    pub issues: Vec<ValidationIssue>,
}

/// Shared inputs of the three section builders for one attempt.
pub struct SectionBuilder<'a> {
    pub branding: &'a BrandingConfig,
    pub toc: &'a TocConfig,
    pub layout: &'a LayoutParams,
    /// Directory relative image paths are resolved against.
    pub base_dir: Option<PathBuf>,
    pub debug: Option<DebugLogger>,
}

impl SectionBuilder<'_> {
    fn body_template(&self, name: &str) -> PageTemplate {
        PageTemplate::new(name, self.layout.page_size).with_frame(self.layout.content_frame())
    }

    fn frame_size(&self) -> Size {
        let frame = self.layout.content_frame();
        Size {
            width: frame.width,
            height: frame.height,
        }
    }

    fn base_size(&self) -> f32 {
        self.layout.base_font_size.to_f32()
    }

    pub fn build_title(&self, logo: Option<&ImageAsset>) -> FolioResult<Document> {
        let accent = self.branding.accent();
        let page_width = self.layout.page_size.width;
        let template = self
            .body_template("title")
            .set_on_page(move |canvas, ctx| {
                // Accent band on the cover only; overflow pages stay plain.
                if ctx.is_first_page() {
                    canvas.set_fill_color(accent);
                    canvas.fill_rect(Pt::ZERO, Pt::ZERO, page_width, Pt::from_f32(10.0));
                }
            });
        let mut doc = DocTemplate::new(SectionKind::Title.as_str(), vec![template])
            .with_debug(self.debug.clone());
        let base = self.base_size();
        let center = |text: &str, style: TextStyle| -> Box<dyn Flowable> {
            Box::new(
                Paragraph::new(text)
                    .with_style(style)
                    .with_align(TextAlign::Center),
            )
        };

        doc.add_flowable(Box::new(Spacer::new(48.0)));
        if let Some(logo) = logo {
            // Title logos are normalized at 2x.
            let image = ImageFlowable::new_pt(
                Pt::from_f32(logo.width_px as f32 / 2.0),
                Pt::from_f32(logo.height_px as f32 / 2.0),
                logo.resource_id.clone(),
            )
            .with_align(TextAlign::Center)
            .fit_within(Size {
                width: self.frame_size().width,
                height: Pt::from_f32(160.0),
            });
            doc.add_flowable(Box::new(image));
            doc.add_flowable(Box::new(Spacer::new(36.0)));
        }
        doc.add_flowable(center(
            &self.branding.document_title,
            TextStyle::new(BaseFont::HelveticaBold, base * 2.4).with_color(accent),
        ));
        if let Some(subtitle) = self.branding.subtitle.as_deref().filter(|s| !s.is_empty()) {
            doc.add_flowable(Box::new(Spacer::new(8.0)));
            doc.add_flowable(center(subtitle, TextStyle::new(BaseFont::Helvetica, base * 1.4)));
        }
        doc.add_flowable(Box::new(Spacer::new(24.0)));
        doc.add_flowable(Box::new(RuleFlowable::new(1.5, accent)));
        doc.add_flowable(Box::new(Spacer::new(24.0)));
        if !self.branding.client_name.is_empty() {
            doc.add_flowable(center(
                "Prepared for",
                TextStyle::new(BaseFont::Helvetica, base).with_color(MUTED),
            ));
            doc.add_flowable(center(
                &self.branding.client_name,
                TextStyle::new(BaseFont::HelveticaBold, base * 1.3),
            ));
        }
        if let Some(date) = self.branding.prepared_date.as_deref().filter(|s| !s.is_empty()) {
            doc.add_flowable(Box::new(Spacer::new(6.0)));
            doc.add_flowable(center(date, TextStyle::new(BaseFont::Helvetica, base)));
        }
        if !self.branding.company_name.is_empty() || !self.branding.company_info.is_empty() {
            doc.add_flowable(Box::new(Spacer::new(48.0)));
            if !self.branding.company_name.is_empty() {
                doc.add_flowable(center(
                    &self.branding.company_name,
                    TextStyle::new(BaseFont::HelveticaBold, base * 1.1),
                ));
            }
            for line in &self.branding.company_info {
                doc.add_flowable(center(
                    line,
                    TextStyle::new(BaseFont::Helvetica, base * 0.9).with_color(MUTED),
                ));
            }
        }
        doc.build()
    }

    /// One TOC layout. Page labels come from `heading.page_number`; headings
    /// without one show an en dash and get no link.
    pub fn toc_pass(&self, headings: &[Heading]) -> FolioResult<TocLayout> {
        let mut doc = DocTemplate::new(SectionKind::Toc.as_str(), vec![self.body_template("toc")])
            .with_debug(self.debug.clone());
        let base = self.base_size();
        doc.add_flowable(Box::new(
            Paragraph::new(self.toc.title.clone())
                .with_style(
                    TextStyle::new(BaseFont::HelveticaBold, base * 1.7)
                        .with_color(self.branding.accent()),
                )
                .with_keep_space(Pt::from_f32(base * 3.0)),
        ));
        doc.add_flowable(Box::new(Spacer::new(base * 1.2)));
        for heading in headings.iter().filter(|h| h.level <= self.toc.max_level) {
            let font = if heading.level == 1 {
                BaseFont::HelveticaBold
            } else {
                BaseFont::Helvetica
            };
            let indent = Pt::from_f32(self.toc.indent_per_level * f32::from(heading.level.saturating_sub(1)));
            let style = TextStyle::new(font, base);
            let entry = match heading.page_number {
                Some(page) => TocEntryFlowable::new(
                    heading.id.clone(),
                    heading.text.clone(),
                    page.to_string(),
                    indent,
                    style,
                ),
                None => TocEntryFlowable::new(
                    heading.id.clone(),
                    heading.text.clone(),
                    "\u{2013}",
                    indent,
                    style,
                )
                .without_link(),
            };
            doc.add_flowable(Box::new(entry));
            doc.add_flowable(Box::new(Spacer::new(base * 0.35)));
        }
        let document = doc.build()?;
        let links = collect_links(&document);
        Ok(TocLayout { document, links })
    }

    /// Lays the TOC out once to learn its page count, computes offsets, then
    /// renders it again with final numbers. The second pass must keep the
    /// page count of the first.
    pub fn build_toc(
        &self,
        headings: &[Heading],
        local_pages: &[Option<usize>],
        title_pages: usize,
    ) -> FolioResult<TocBuild> {
        let mut draft: Vec<Heading> = headings.to_vec();
        for (heading, local) in draft.iter_mut().zip(local_pages) {
            heading.page_number = *local;
        }
        let first = self.toc_pass(&draft)?;
        let offsets = PageOffsets::new(title_pages, first.document.page_count());

        let mut final_headings = headings.to_vec();
        offsets.apply(&mut final_headings, local_pages);
        let layout = self.toc_pass(&final_headings)?;
        if layout.document.page_count() != offsets.toc_pages {
            return Err(FolioError::render(
                SectionKind::Toc.as_str(),
                format!(
                    "page count changed from {} to {} once final numbers were applied",
                    offsets.toc_pages,
                    layout.document.page_count()
                ),
            ));
        }
        Ok(TocBuild {
            layout,
            offsets,
            headings: final_headings,
        })
    }

    fn resolve_image_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn layout_content(
        &self,
        tree: &ContentTree,
        engine: &mut RenderEngine,
        attempt: usize,
    ) -> FolioResult<ContentLayout> {
        let mut doc =
            DocTemplate::new(SectionKind::Content.as_str(), vec![self.body_template("content")])
                .with_debug(self.debug.clone());
        let base = self.base_size();
        let body = TextStyle::new(BaseFont::Helvetica, base);
        let gap = base * 0.6;
        let accent = self.branding.accent();
        let mut issues = Vec::new();

        for node in &tree.nodes {
            match node {
                ContentNode::Heading { level, text, .. } => {
                    let factor = match level {
                        1 => 1.9,
                        2 => 1.5,
                        3 => 1.25,
                        4 => 1.1,
                        _ => 1.0,
                    };
                    let mut style = TextStyle::new(BaseFont::HelveticaBold, base * factor);
                    if *level <= 2 {
                        style = style.with_color(accent);
                    }
                    let breaks_page = *level == 1 && self.layout.h1_page_break;
                    let pagination = if breaks_page {
                        Pagination {
                            break_inside: BreakInside::Avoid,
                            ..Pagination::page_before()
                        }
                    } else {
                        Pagination::avoid_break_inside()
                    };
                    let keep = body.line_height * 3;
                    // A spacer ahead of a page break would leave a blank page.
                    if !breaks_page {
                        doc.add_flowable(Box::new(Spacer::new(base * 0.8)));
                    }
                    doc.add_flowable(Box::new(
                        Paragraph::new(text.clone())
                            .with_style(style)
                            .with_pagination(pagination)
                            .with_keep_space(keep),
                    ));
                    doc.add_flowable(Box::new(Spacer::new(base * 0.4)));
                }
                ContentNode::Paragraph { text, bold } => {
                    let font = if *bold {
                        BaseFont::HelveticaBold
                    } else {
                        BaseFont::Helvetica
                    };
                    doc.add_flowable(Box::new(
                        Paragraph::new(text.clone()).with_style(TextStyle::new(font, base)),
                    ));
                    doc.add_flowable(Box::new(Spacer::new(gap)));
                }
                ContentNode::List { ordered, items } => {
                    for (index, item) in items.iter().enumerate() {
                        let label = if *ordered {
                            format!("{}.", index + 1)
                        } else {
                            "\u{2022}".to_string()
                        };
                        doc.add_flowable(Box::new(ListItemFlowable::new(
                            Paragraph::new(label).with_style(body.clone()),
                            Paragraph::new(item.clone()).with_style(body.clone()),
                            Pt::from_f32(base * 1.8),
                        )));
                    }
                    doc.add_flowable(Box::new(Spacer::new(gap)));
                }
                ContentNode::Code { text } => {
                    doc.add_flowable(Box::new(
                        Paragraph::new(text.clone())
                            .with_style(TextStyle::new(BaseFont::Courier, base * 0.9))
                            .with_preserved_whitespace()
                            .with_indent(Pt::from_f32(10.0))
                            .with_left_bar(Color::rgb(0.8, 0.8, 0.8)),
                    ));
                    doc.add_flowable(Box::new(Spacer::new(gap)));
                }
                ContentNode::Quote { text } => {
                    doc.add_flowable(Box::new(
                        Paragraph::new(text.clone())
                            .with_style(body.clone().with_color(MUTED))
                            .with_indent(Pt::from_f32(14.0))
                            .with_left_bar(accent),
                    ));
                    doc.add_flowable(Box::new(Spacer::new(gap)));
                }
                ContentNode::Image { path, alt, width } => {
                    let resolved = self.resolve_image_path(path);
                    match engine.register_image(&resolved) {
                        Ok(asset) => {
                            // Content images are taken at 96 dpi.
                            let natural_w = asset.width_px as f32 * 0.75;
                            let natural_h = asset.height_px as f32 * 0.75;
                            let (w, h) = match width {
                                Some(w) if *w > 0.0 && natural_w > 0.0 => {
                                    (*w, natural_h * (*w / natural_w))
                                }
                                _ => (natural_w, natural_h),
                            };
                            doc.add_flowable(Box::new(
                                ImageFlowable::new_pt(
                                    Pt::from_f32(w),
                                    Pt::from_f32(h),
                                    asset.resource_id,
                                )
                                .with_align(TextAlign::Center)
                                .fit_within(self.frame_size()),
                            ));
                        }
                        Err(err) => {
                            tracing::warn!(path = %resolved.display(), error = %err, "content image skipped");
                            issues.push(
                                ValidationIssue::warning(
                                    ValidationType::ImageUnreadable,
                                    err.to_string(),
                                    attempt,
                                )
                                .with_subject(resolved.display().to_string()),
                            );
                            let label = if alt.trim().is_empty() {
                                path.display().to_string()
                            } else {
                                alt.clone()
                            };
                            doc.add_flowable(Box::new(
                                Paragraph::new(format!("[Image unavailable: {label}]"))
                                    .with_style(body.clone().with_color(MUTED))
                                    .with_indent(Pt::from_f32(10.0))
                                    .with_left_bar(MUTED),
                            ));
                        }
                    }
                    doc.add_flowable(Box::new(Spacer::new(gap)));
                }
                ContentNode::Rule => {
                    doc.add_flowable(Box::new(RuleFlowable::new(0.75, Color::rgb(0.7, 0.7, 0.7))));
                }
                ContentNode::PageBreak => {
                    doc.add_flowable(Box::new(Spacer::new(0.0).with_pagination(Pagination {
                        break_after: BreakAfter::Page,
                        ..Pagination::default()
                    })));
                }
            }
        }

        let (document, metrics) = doc.build_with_metrics()?;
        tracing::debug!(
            pages = document.page_count(),
            breaks = metrics.page_breaks(),
            splits = metrics.breaks_for("flowable_split"),
            ms = metrics.total_render_ms,
            "content laid out"
        );
        Ok(ContentLayout { document, issues })
    }
}

/// Link rectangles recorded by TOC entries, with 1-based local pages.
pub fn collect_links(document: &Document) -> Vec<TocLink> {
    let mut links = Vec::new();
    for (index, page) in document.pages.iter().enumerate() {
        for value in page.meta_values(crate::META_LINK_KEY) {
            let mut parts = value.rsplitn(5, '|');
            let (Some(h), Some(w), Some(y), Some(x), Some(id)) =
                (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            let parse = |raw: &str| raw.parse::<i64>().ok().map(Pt::from_milli_i64);
            let (Some(x), Some(y), Some(w), Some(h)) = (parse(x), parse(y), parse(w), parse(h))
            else {
                continue;
            };
            links.push(TocLink {
                toc_page: index + 1,
                heading_id: id.to_string(),
                rect: Rect::new(x, y, w, h),
            });
        }
    }
    links
}
