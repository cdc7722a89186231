use crate::canvas::{Canvas, Document};
use crate::debug::DebugLogger;
use crate::doc_context::DocContext;
use crate::error::{FolioError, FolioResult};
use crate::flowable::{BreakAfter, BreakBefore, Flowable};
use crate::frame::{AddResult, Frame};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::page_template::PageTemplate;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Instant;

/// Flows a story of flowables through page templates into a [`Document`].
pub struct DocTemplate {
    section: &'static str,
    page_templates: Vec<PageTemplate>,
    story: Vec<Box<dyn Flowable>>,
    debug: Option<DebugLogger>,
}

impl DocTemplate {
    pub fn new(section: &'static str, page_templates: Vec<PageTemplate>) -> Self {
        Self {
            section,
            page_templates,
            story: Vec::new(),
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: Option<DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    pub fn add_flowable(&mut self, flowable: Box<dyn Flowable>) {
        self.story.push(flowable);
    }

    pub fn extend<I>(&mut self, flowables: I)
    where
        I: IntoIterator<Item = Box<dyn Flowable>>,
    {
        self.story.extend(flowables);
    }

    pub fn build(self) -> FolioResult<Document> {
        Ok(self.build_with_metrics()?.0)
    }

    pub fn build_with_metrics(self) -> FolioResult<(Document, DocumentMetrics)> {
        if self.page_templates.is_empty() {
            return Err(FolioError::render(self.section, "no page template"));
        }
        if self.page_templates.iter().any(|t| t.frame_count() == 0) {
            return Err(FolioError::render(self.section, "page template has no frames"));
        }

        let mut layout = Layout::start(self.section, &self.page_templates, self.debug.as_ref());
        let mut story: VecDeque<Box<dyn Flowable>> = self.story.into();

        while let Some(flowable) = story.pop_front() {
            let mut current = flowable;
            let mut continuation = false;
            loop {
                let name = current.debug_name();
                let pagination = current.pagination();
                if !continuation
                    && pagination.break_before == BreakBefore::Page
                    && (layout.placed_on_page || layout.frame_index > 0)
                {
                    layout.next_page("break_before_page", name);
                }
                if layout.frame_index >= layout.frames.len() {
                    layout.next_page("frame_exhausted", name);
                }

                let is_last_frame = layout.frame_index + 1 >= layout.frames.len();
                let fresh_page = !layout.placed_on_page && is_last_frame;
                let frame = &mut layout.frames[layout.frame_index];
                let frame_rect = frame.rect();
                match frame.add(current, &mut layout.canvas) {
                    AddResult::Placed => {
                        layout.placed_on_page = true;
                        layout.page_flowables += 1;
                        if pagination.break_after == BreakAfter::Page && !story.is_empty() {
                            layout.next_page("break_after_page", name);
                        }
                        break;
                    }
                    AddResult::Split(rest) => {
                        layout.placed_on_page = true;
                        layout.page_flowables += 1;
                        layout.log_break("flowable_split", name);
                        continuation = true;
                        current = rest;
                        layout.frame_index += 1;
                    }
                    AddResult::Overflow(rest) => {
                        if fresh_page {
                            return Err(FolioError::render(
                                self.section,
                                format!(
                                    "{} does not fit a {:.1}x{:.1}pt frame",
                                    name,
                                    frame_rect.width.to_f32(),
                                    frame_rect.height.to_f32()
                                ),
                            ));
                        }
                        layout.log_break("frame_overflow", name);
                        current = rest;
                        layout.frame_index += 1;
                    }
                }
            }
        }

        Ok(layout.finish())
    }
}

struct Layout<'a> {
    section: &'static str,
    templates: &'a [PageTemplate],
    debug: Option<&'a DebugLogger>,
    canvas: Canvas,
    frames: Vec<Frame>,
    frame_index: usize,
    page_number: usize,
    placed_on_page: bool,
    page_flowables: usize,
    page_start: Instant,
    metrics: DocumentMetrics,
}

impl<'a> Layout<'a> {
    fn start(
        section: &'static str,
        templates: &'a [PageTemplate],
        debug: Option<&'a DebugLogger>,
    ) -> Self {
        let first = select_template(templates, 1);
        let mut layout = Self {
            section,
            templates,
            debug,
            canvas: Canvas::new(first.page_size),
            frames: Vec::new(),
            frame_index: 0,
            page_number: 1,
            placed_on_page: false,
            page_flowables: 0,
            page_start: Instant::now(),
            metrics: DocumentMetrics::default(),
        };
        layout.begin_page();
        layout
    }

    fn begin_page(&mut self) {
        let template = select_template(self.templates, self.page_number);
        self.frames = template.instantiate_frames();
        self.frame_index = 0;
        self.placed_on_page = false;
        if let Some(callback) = template.on_page() {
            callback(
                &mut self.canvas,
                &DocContext::new(self.section, self.page_number, &template.name),
            );
        }
    }

    fn finish_page(&mut self) {
        let elapsed = self.page_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.total_render_ms += elapsed;
        self.metrics.pages.push(PageMetrics {
            page_number: self.page_number,
            render_ms: elapsed,
            command_count: self.canvas.current_command_count(),
            flowable_count: self.page_flowables,
        });
        self.canvas.show_page();
        self.page_flowables = 0;
        self.page_start = Instant::now();
    }

    fn log_break(&mut self, reason: &str, flowable: &str) {
        self.metrics.record_break(reason);
        let Some(logger) = self.debug else {
            return;
        };
        logger.log_event(
            "layout.page_break",
            json!({
                "section": self.section,
                "reason": reason,
                "from_page": self.page_number,
                "frame_index": self.frame_index,
                "flowable": flowable,
            }),
        );
        logger.increment("layout.page_break", 1);
    }

    fn next_page(&mut self, reason: &str, flowable: &str) {
        self.log_break(reason, flowable);
        self.finish_page();
        self.page_number += 1;
        self.begin_page();
    }

    fn finish(mut self) -> (Document, DocumentMetrics) {
        if !self.canvas.is_current_empty() || self.metrics.pages.is_empty() {
            self.finish_page();
        }
        (self.canvas.finish(), self.metrics)
    }
}

// Page n uses templates[n-1]; the last template repeats.
fn select_template(templates: &[PageTemplate], page_number: usize) -> &PageTemplate {
    let idx = page_number
        .saturating_sub(1)
        .min(templates.len().saturating_sub(1));
    &templates[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::flowable::{Pagination, Paragraph, Spacer, TextStyle};
    use crate::font::BaseFont;
    use crate::types::{Pt, Rect, Size};

    fn template(name: &str, frame_height: f32) -> PageTemplate {
        PageTemplate::new(name, Size::letter()).with_frame(Rect::new(
            Pt::from_f32(72.0),
            Pt::from_f32(72.0),
            Pt::from_f32(400.0),
            Pt::from_f32(frame_height),
        ))
    }

    fn text_count(doc: &Document, page: usize) -> usize {
        doc.pages[page]
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::DrawString { .. }))
            .count()
    }

    #[test]
    fn empty_story_yields_one_page() {
        let doc = DocTemplate::new("content", vec![template("body", 500.0)])
            .build()
            .expect("build");
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn overflowing_spacers_paginate() {
        let mut doc = DocTemplate::new("content", vec![template("body", 100.0)]);
        for _ in 0..5 {
            doc.add_flowable(Box::new(Spacer::new(40.0)));
            doc.add_flowable(Box::new(Paragraph::new("x")));
        }
        let (doc, metrics) = doc.build_with_metrics().expect("build");
        assert!(doc.page_count() >= 2);
        assert_eq!(metrics.pages.len(), doc.page_count());
        assert!(metrics.page_breaks() >= doc.page_count() - 1);
        assert!(metrics.breaks_for("break_before_page") == 0);
    }

    #[test]
    fn break_before_starts_a_new_page_only_after_content() {
        let mut doc = DocTemplate::new("content", vec![template("body", 500.0)]);
        doc.add_flowable(Box::new(
            Paragraph::new("first").with_pagination(Pagination::page_before()),
        ));
        doc.add_flowable(Box::new(
            Paragraph::new("second").with_pagination(Pagination::page_before()),
        ));
        let doc = doc.build().expect("build");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(text_count(&doc, 0), 1);
        assert_eq!(text_count(&doc, 1), 1);
    }

    #[test]
    fn on_page_runs_for_every_page_with_its_number() {
        let tpl = template("body", 30.0).set_on_page(|canvas, ctx| {
            canvas.meta("page", format!("{}:{}", ctx.section, ctx.page_number));
        });
        let mut doc = DocTemplate::new("content", vec![tpl]);
        for i in 0..3 {
            doc.add_flowable(Box::new(
                Paragraph::new(format!("p{i}"))
                    .with_style(TextStyle::new(BaseFont::Helvetica, 20.0)),
            ));
        }
        let doc = doc.build().expect("build");
        assert_eq!(doc.page_count(), 3);
        let numbers: Vec<String> = doc
            .pages
            .iter()
            .flat_map(|page| page.meta_values("page").map(str::to_string))
            .collect();
        assert_eq!(numbers, vec!["content:1", "content:2", "content:3"]);
    }

    #[test]
    fn later_templates_apply_from_their_page_on() {
        let first = template("cover", 20.0).set_on_page(|canvas, ctx| {
            canvas.meta("tpl", ctx.template_name.clone());
        });
        let rest = template("body", 20.0).set_on_page(|canvas, ctx| {
            canvas.meta("tpl", ctx.template_name.clone());
        });
        let mut doc = DocTemplate::new("content", vec![first, rest]);
        for i in 0..3 {
            doc.add_flowable(Box::new(Paragraph::new(format!("p{i}"))));
        }
        let doc = doc.build().expect("build");
        let names: Vec<&str> = doc.pages.iter().flat_map(|p| p.meta_values("tpl")).collect();
        assert_eq!(names, vec!["cover", "body", "body"]);
    }
}
