use crate::canvas::Canvas;
use crate::font::{self, BaseFont};
use crate::types::{Color, Pt, Rect, Size};

fn huge_pt() -> Pt {
    Pt::from_i32(1_000_000)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakBefore {
    Auto,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakAfter {
    Auto,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakInside {
    Auto,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub break_before: BreakBefore,
    pub break_after: BreakAfter,
    pub break_inside: BreakInside,
    pub orphans: usize,
    pub widows: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            break_before: BreakBefore::Auto,
            break_after: BreakAfter::Auto,
            break_inside: BreakInside::Auto,
            orphans: 2,
            widows: 2,
        }
    }
}

impl Pagination {
    pub fn avoid_break_inside() -> Self {
        Self {
            break_inside: BreakInside::Avoid,
            ..Self::default()
        }
    }

    pub fn page_before() -> Self {
        Self {
            break_before: BreakBefore::Page,
            ..Self::default()
        }
    }
}

pub trait Flowable: FlowableClone + Send + Sync {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)>;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);

    fn pagination(&self) -> Pagination {
        Pagination::default()
    }

    /// Extra room that must remain below this flowable on the same page, so
    /// headings are not stranded at the bottom of a frame.
    fn keep_space(&self) -> Pt {
        Pt::ZERO
    }

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait FlowableClone {
    fn clone_box(&self) -> Box<dyn Flowable>;
}

impl<T> FlowableClone for T
where
    T: 'static + Flowable + Clone,
{
    fn clone_box(&self) -> Box<dyn Flowable> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Flowable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: BaseFont,
    pub font_size: Pt,
    pub line_height: Pt,
    pub color: Color,
}

impl TextStyle {
    pub fn new(font: BaseFont, size: f32) -> Self {
        let font_size = Pt::from_f32(size);
        Self {
            font,
            font_size,
            line_height: font::line_height(font_size),
            color: Color::BLACK,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn measure(&self, text: &str) -> Pt {
        self.font.measure(self.font_size, text)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(BaseFont::Helvetica, 12.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub text: String,
    pub width: Pt,
}

/// Greedy line breaking. Words wider than the line are broken by character;
/// with `preserve_whitespace` every source line is kept and only hard-wrapped.
pub fn wrap_text(
    style: &TextStyle,
    text: &str,
    max_width: Pt,
    preserve_whitespace: bool,
) -> Vec<LineLayout> {
    let max_width = max_width.max(Pt::from_f32(1.0));
    let mut lines: Vec<String> = Vec::new();
    if preserve_whitespace {
        for segment in text.split('\n') {
            lines.extend(break_by_char(style, segment, max_width));
        }
    } else {
        let space_width = style.measure(" ");
        for segment in text.split('\n') {
            let mut current = String::new();
            let mut current_width = Pt::ZERO;
            for word in segment.split_whitespace() {
                let word_width = style.measure(word);
                if !current.is_empty() && current_width + space_width + word_width <= max_width {
                    current.push(' ');
                    current.push_str(word);
                    current_width = current_width + space_width + word_width;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if word_width > max_width {
                    let mut pieces = break_by_char(style, word, max_width);
                    let last = pieces.pop().unwrap_or_default();
                    lines.extend(pieces);
                    current_width = style.measure(&last);
                    current = last;
                } else {
                    current.push_str(word);
                    current_width = word_width;
                }
            }
            if !current.is_empty() || lines.is_empty() {
                lines.push(current);
            }
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
        .into_iter()
        .map(|text| {
            let width = style.measure(&text);
            LineLayout { text, width }
        })
        .collect()
}

fn break_by_char(style: &TextStyle, segment: &str, max_width: Pt) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_width = Pt::ZERO;
    for ch in segment.chars() {
        let w = Pt::from_f32(style.font_size.to_f32() * style.font.advance(ch) as f32 / 1000.0);
        if !current.is_empty() && current_width + w > max_width {
            out.push(std::mem::take(&mut current));
            current_width = Pt::ZERO;
        }
        current.push(ch);
        current_width += w;
    }
    out.push(current);
    out
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    text: String,
    style: TextStyle,
    align: TextAlign,
    pagination: Pagination,
    preserve_whitespace: bool,
    indent: Pt,
    left_bar: Option<Color>,
    keep_space: Pt,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
            align: TextAlign::Left,
            pagination: Pagination::default(),
            preserve_whitespace: false,
            indent: Pt::ZERO,
            left_bar: None,
            keep_space: Pt::ZERO,
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_preserved_whitespace(mut self) -> Self {
        self.preserve_whitespace = true;
        self
    }

    pub fn with_indent(mut self, indent: Pt) -> Self {
        self.indent = indent.max(Pt::ZERO);
        self
    }

    /// Draws a vertical bar in the indent gutter, used for block quotes.
    pub fn with_left_bar(mut self, color: Color) -> Self {
        self.left_bar = Some(color);
        self
    }

    pub fn with_keep_space(mut self, space: Pt) -> Self {
        self.keep_space = space;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    fn text_width(&self, avail_width: Pt) -> Pt {
        (avail_width - self.indent).max(Pt::from_f32(1.0))
    }

    fn layout_lines(&self, avail_width: Pt) -> Vec<LineLayout> {
        wrap_text(
            &self.style,
            &self.text,
            self.text_width(avail_width),
            self.preserve_whitespace,
        )
    }

    /// Splits between lines, honoring orphans and widows.
    pub fn split_lines(&self, avail_width: Pt, avail_height: Pt) -> Option<(Paragraph, Paragraph)> {
        if self.pagination.break_inside == BreakInside::Avoid {
            return None;
        }
        let lines = self.layout_lines(avail_width);
        let lh = self.style.line_height.to_milli_i64();
        let ah = avail_height.to_milli_i64();
        if lh <= 0 || ah <= 0 {
            return None;
        }
        let total_lines = lines.len();
        let max_lines = (ah / lh) as usize;
        if max_lines == 0 || max_lines >= total_lines {
            return None;
        }

        let orphans = self.pagination.orphans.max(1);
        let widows = self.pagination.widows.max(1);
        let mut split_at = max_lines;
        if total_lines - split_at < widows {
            split_at = total_lines.saturating_sub(widows);
        }
        if split_at < orphans {
            return None;
        }

        let join = |slice: &[LineLayout]| {
            slice
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };
        // Both halves keep their computed line breaks.
        let first = self
            .with_text(
                join(&lines[..split_at]),
                Pagination {
                    break_after: BreakAfter::Auto,
                    ..self.pagination
                },
            )
            .with_preserved_whitespace();
        let second = self
            .with_text(
                join(&lines[split_at..]),
                Pagination {
                    break_before: BreakBefore::Auto,
                    ..self.pagination
                },
            )
            .with_preserved_whitespace();
        Some((first, second))
    }

    fn with_text(&self, text: String, pagination: Pagination) -> Paragraph {
        Paragraph {
            text,
            pagination,
            ..self.clone()
        }
    }
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = self.layout_lines(avail_width);
        let width = lines
            .iter()
            .fold(Pt::ZERO, |acc, line| acc.max(line.width))
            .min(avail_width);
        Size {
            width: width + self.indent,
            height: self.style.line_height * (lines.len() as i32),
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let (first, second) = self.split_lines(avail_width, avail_height)?;
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = self.layout_lines(avail_width);
        let text_width = self.text_width(avail_width);
        let text_x = x + self.indent;
        if let Some(bar) = self.left_bar {
            let height = self.style.line_height * (lines.len() as i32);
            let bar_width = Pt::from_f32(2.5);
            canvas.set_fill_color(bar);
            canvas.fill_rect(x + self.indent.mul_ratio(1, 3), y, bar_width, height);
        }
        canvas.set_fill_color(self.style.color);
        canvas.set_font(self.style.font);
        canvas.set_font_size(self.style.font_size);
        let mut cursor_y = y;
        for line in &lines {
            let offset = match self.align {
                TextAlign::Left => Pt::ZERO,
                TextAlign::Center => (text_width - line.width).max(Pt::ZERO).mul_ratio(1, 2),
                TextAlign::Right => (text_width - line.width).max(Pt::ZERO),
            };
            if !line.text.trim().is_empty() {
                canvas.draw_string(text_x + offset, cursor_y, line.text.clone());
            }
            cursor_y += self.style.line_height;
        }
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }

    fn keep_space(&self) -> Pt {
        self.keep_space
    }
}

/// A list item with a hanging label. Continuation pieces after a split keep
/// the indent but drop the label.
#[derive(Debug, Clone)]
pub struct ListItemFlowable {
    label: Option<Paragraph>,
    body: Paragraph,
    label_width: Pt,
}

impl ListItemFlowable {
    pub fn new(label: Paragraph, body: Paragraph, label_width: Pt) -> Self {
        Self {
            label: Some(label),
            body,
            label_width,
        }
    }

    fn body_width(&self, avail_width: Pt) -> Pt {
        (avail_width - self.label_width).max(Pt::from_f32(1.0))
    }
}

impl Flowable for ListItemFlowable {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        let label_height = self
            .label
            .as_ref()
            .map(|label| label.wrap(self.label_width, huge_pt()).height)
            .unwrap_or(Pt::ZERO);
        let body_size = self.body.wrap(self.body_width(avail_width), avail_height);
        Size {
            width: avail_width,
            height: label_height.max(body_size.height),
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let (first, rest) = self
            .body
            .split_lines(self.body_width(avail_width), avail_height)?;
        let first = ListItemFlowable {
            label: self.label.clone(),
            body: first,
            label_width: self.label_width,
        };
        let rest = ListItemFlowable {
            label: None,
            body: rest,
            label_width: self.label_width,
        };
        Some((Box::new(first), Box::new(rest)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt) {
        if let Some(label) = &self.label {
            label.draw(canvas, x, y, self.label_width, avail_height);
        }
        self.body.draw(
            canvas,
            x + self.label_width,
            y,
            self.body_width(avail_width),
            avail_height,
        );
    }
}

#[derive(Debug, Clone)]
pub struct Spacer {
    height: Pt,
    pagination: Pagination,
}

impl Spacer {
    pub fn new(height: f32) -> Self {
        Self::new_pt(Pt::from_f32(height))
    }

    pub fn new_pt(height: Pt) -> Self {
        Self {
            height,
            pagination: Pagination::default(),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

impl Flowable for Spacer {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        // Trailing space at the bottom of a frame collapses instead of
        // pushing the next flowable onto a fresh page.
        Size {
            width: avail_width,
            height: self.height.max(Pt::ZERO).min(avail_height.max(Pt::ZERO)),
        }
    }

    fn split(&self, _: Pt, _: Pt) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, _canvas: &mut Canvas, _x: Pt, _y: Pt, _avail_width: Pt, _avail_height: Pt) {}

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

#[derive(Debug, Clone)]
pub struct ImageFlowable {
    pub width: Pt,
    pub height: Pt,
    pub resource_id: String,
    align: TextAlign,
    pagination: Pagination,
}

impl ImageFlowable {
    pub fn new_pt(width: Pt, height: Pt, resource_id: impl Into<String>) -> Self {
        Self {
            width,
            height,
            resource_id: resource_id.into(),
            align: TextAlign::Left,
            pagination: Pagination::avoid_break_inside(),
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    /// Scales to fit inside `max`, keeping the aspect ratio. Never upscales.
    pub fn fit_within(mut self, max: Size) -> Self {
        let w = self.width.to_f32();
        let h = self.height.to_f32();
        if w <= 0.0 || h <= 0.0 {
            return self;
        }
        let scale = (max.width.to_f32() / w).min(max.height.to_f32() / h).min(1.0);
        self.width = Pt::from_f32(w * scale);
        self.height = Pt::from_f32(h * scale);
        self
    }
}

impl Flowable for ImageFlowable {
    fn wrap(&self, _avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    fn split(&self, _: Pt, _: Pt) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let offset = match self.align {
            TextAlign::Left => Pt::ZERO,
            TextAlign::Center => (avail_width - self.width).max(Pt::ZERO).mul_ratio(1, 2),
            TextAlign::Right => (avail_width - self.width).max(Pt::ZERO),
        };
        canvas.draw_image(
            x + offset,
            y,
            self.width,
            self.height,
            self.resource_id.clone(),
        );
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

#[derive(Debug, Clone)]
pub struct RuleFlowable {
    thickness: Pt,
    color: Color,
    space: Pt,
}

impl RuleFlowable {
    pub fn new(thickness: f32, color: Color) -> Self {
        Self {
            thickness: Pt::from_f32(thickness),
            color,
            space: Pt::from_f32(6.0),
        }
    }
}

impl Flowable for RuleFlowable {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.space * 2 + self.thickness,
        }
    }

    fn split(&self, _: Pt, _: Pt) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        canvas.set_fill_color(self.color);
        canvas.fill_rect(x, y + self.space, avail_width, self.thickness);
    }
}

/// One table-of-contents line: indented title, dot leader, right-aligned
/// page label, and a recorded link rectangle for the assembler.
#[derive(Debug, Clone)]
pub struct TocEntryFlowable {
    heading_id: String,
    title: String,
    page_label: String,
    indent: Pt,
    style: TextStyle,
    number_column: Pt,
    linked: bool,
}

impl TocEntryFlowable {
    pub fn new(
        heading_id: impl Into<String>,
        title: impl Into<String>,
        page_label: impl Into<String>,
        indent: Pt,
        style: TextStyle,
    ) -> Self {
        // Wide enough for four digits, so the displayed number never changes
        // how the title wraps.
        let number_column = style.measure("0000") + style.font_size;
        Self {
            heading_id: heading_id.into(),
            title: title.into(),
            page_label: page_label.into(),
            indent,
            style,
            number_column,
            linked: true,
        }
    }

    pub fn without_link(mut self) -> Self {
        self.linked = false;
        self
    }

    fn title_width(&self, avail_width: Pt) -> Pt {
        (avail_width - self.indent - self.number_column).max(Pt::from_f32(1.0))
    }

    fn lines(&self, avail_width: Pt) -> Vec<LineLayout> {
        wrap_text(&self.style, &self.title, self.title_width(avail_width), false)
    }
}

impl Flowable for TocEntryFlowable {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = self.lines(avail_width);
        Size {
            width: avail_width,
            height: self.style.line_height * (lines.len() as i32),
        }
    }

    fn split(&self, _: Pt, _: Pt) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = self.lines(avail_width);
        canvas.set_fill_color(self.style.color);
        canvas.set_font(self.style.font);
        canvas.set_font_size(self.style.font_size);

        let title_x = x + self.indent;
        let mut cursor_y = y;
        for line in &lines {
            canvas.draw_string(title_x, cursor_y, line.text.clone());
            cursor_y += self.style.line_height;
        }
        let last_y = cursor_y - self.style.line_height;
        let last_width = lines.last().map(|l| l.width).unwrap_or(Pt::ZERO);

        let number_width = self.style.measure(&self.page_label);
        let number_x = x + avail_width - number_width;
        let dot_width = self.style.measure(".");
        let leader_start = title_x + last_width + dot_width;
        let leader_end = number_x - dot_width;
        if dot_width > Pt::ZERO && leader_end > leader_start {
            let span = (leader_end - leader_start).to_milli_i64();
            let count = (span / dot_width.to_milli_i64()).max(0) as usize;
            if count > 0 {
                canvas.draw_string(leader_start, last_y, ".".repeat(count));
            }
        }
        canvas.draw_string(number_x, last_y, self.page_label.clone());

        if self.linked {
            let height = self.style.line_height * (lines.len() as i32);
            let rect = Rect::new(x, y, avail_width, height);
            canvas.meta(
                crate::META_LINK_KEY,
                format!(
                    "{}|{}|{}|{}|{}",
                    self.heading_id,
                    rect.x.to_milli_i64(),
                    rect.y.to_milli_i64(),
                    rect.width.to_milli_i64(),
                    rect.height.to_milli_i64()
                ),
            );
        }
    }

    fn pagination(&self) -> Pagination {
        Pagination::avoid_break_inside()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::types::Size;

    fn style() -> TextStyle {
        TextStyle::new(BaseFont::Courier, 10.0)
    }

    #[test]
    fn wrap_text_breaks_on_words() {
        // Courier 10pt: 6pt per char, 60pt fits 10 chars.
        let lines = wrap_text(&style(), "alpha beta gamma delta", Pt::from_f32(60.0), false);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma", "delta"]);
    }

    #[test]
    fn wrap_text_breaks_long_words_by_char() {
        let lines = wrap_text(&style(), "abcdefghijklmnop", Pt::from_f32(30.0), false);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn preserved_whitespace_keeps_indentation() {
        let lines = wrap_text(&style(), "fn main() {\n    x\n}", Pt::from_f32(500.0), true);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "    x");
    }

    #[test]
    fn paragraph_split_respects_widows_and_orphans() {
        let text = (0..6).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let para = Paragraph::new(text)
            .with_style(style())
            .with_preserved_whitespace();
        let lh = style().line_height;
        // Room for 5 of 6 lines: widows=2 forces a 4/2 split.
        let (first, second) = para
            .split(Pt::from_f32(300.0), lh * 5)
            .expect("splittable");
        assert_eq!(first.wrap(Pt::from_f32(300.0), lh * 10).height, lh * 4);
        assert_eq!(second.wrap(Pt::from_f32(300.0), lh * 10).height, lh * 2);
        // Room for a single line: orphans=2 refuses to split.
        assert!(para.split(Pt::from_f32(300.0), lh).is_none());
    }

    #[test]
    fn image_fit_keeps_aspect_ratio() {
        let img = ImageFlowable::new_pt(Pt::from_f32(800.0), Pt::from_f32(400.0), "img")
            .fit_within(Size::from_points(400.0, 1000.0));
        assert_eq!(img.width.to_milli_i64(), 400_000);
        assert_eq!(img.height.to_milli_i64(), 200_000);
        let small = ImageFlowable::new_pt(Pt::from_f32(50.0), Pt::from_f32(20.0), "img")
            .fit_within(Size::from_points(400.0, 1000.0));
        assert_eq!(small.width.to_milli_i64(), 50_000);
    }

    #[test]
    fn toc_entry_height_ignores_page_label() {
        let a = TocEntryFlowable::new("a", "Results", "3", Pt::ZERO, style());
        let b = TocEntryFlowable::new("a", "Results", "1234", Pt::ZERO, style());
        let w = Pt::from_f32(200.0);
        assert_eq!(a.wrap(w, w).height, b.wrap(w, w).height);
    }

    #[test]
    fn toc_entry_records_link_and_right_aligns_number() {
        let entry = TocEntryFlowable::new("sec-1", "Results", "12", Pt::ZERO, style());
        let mut canvas = Canvas::new(Size::letter());
        entry.draw(&mut canvas, Pt::from_f32(50.0), Pt::from_f32(100.0), Pt::from_f32(300.0), Pt::from_f32(500.0));
        let doc = canvas.finish();
        let link: Vec<&str> = doc.pages[0].meta_values(crate::META_LINK_KEY).collect();
        assert_eq!(link, vec!["sec-1|50000|100000|300000|12000"]);
        let number_x = doc.pages[0].commands.iter().find_map(|cmd| match cmd {
            Command::DrawString { x, text, .. } if text == "12" => Some(*x),
            _ => None,
        });
        // 350 - 2 chars * 6pt
        assert_eq!(number_x.map(|x| x.to_milli_i64()), Some(338_000));
    }
}
