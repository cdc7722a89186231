//! Reads pages of a PDF back into positioned text runs and filled marks.
//!
//! Only what the engine itself writes is interpreted faithfully: standard
//! fonts, `Td`/`Tm` positioning, rectangles, strokes and image XObjects.
//! Marked content tagged `/Artifact` with a `/Header` or `/Footer` subtype is
//! attributed to that layer; everything else is body.

use crate::font::BaseFont;
use crate::pdf::winansi_char;
use crate::types::{Color, Pt, Size};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary as LoDictionary, Document as LoDocument, Object as LoObject, ObjectId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Body,
    Header,
    Footer,
}

impl Layer {
    fn from_artifact_subtype(name: &[u8]) -> Option<Layer> {
        match name {
            b"Header" => Some(Layer::Header),
            b"Footer" => Some(Layer::Footer),
            _ => None,
        }
    }
}

/// Axis-aligned box in top-left page coordinates, points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxF {
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxF {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: BaseFont,
    pub font_size: f32,
    /// Left edge and top of the em box; the baseline sits `font_size` below.
    pub bounds: BoxF,
    pub color: Color,
    pub layer: Layer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkKind {
    Fill,
    Stroke,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub kind: MarkKind,
    pub bounds: BoxF,
    pub color: Color,
    pub layer: Layer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannedPage {
    /// 1-based position in the scanned document.
    pub number: usize,
    pub size: Size,
    pub runs: Vec<TextRun>,
    pub marks: Vec<Mark>,
}

impl ScannedPage {
    pub fn runs_in(&self, layer: Layer) -> impl Iterator<Item = &TextRun> {
        self.runs.iter().filter(move |run| run.layer == layer)
    }

    /// Body text grouped into visual lines, top to bottom.
    pub fn body_lines(&self) -> Vec<String> {
        self.lines_in(Layer::Body)
    }

    pub fn lines_in(&self, layer: Layer) -> Vec<String> {
        self.lines_matching(layer, |_| true)
    }

    /// Lines built only from the runs `keep` accepts, grouped as in
    /// [`ScannedPage::lines_in`].
    pub fn lines_matching(&self, layer: Layer, keep: impl Fn(&TextRun) -> bool) -> Vec<String> {
        let mut runs: Vec<&TextRun> = self.runs_in(layer).filter(|run| keep(run)).collect();
        runs.sort_by(|a, b| {
            a.bounds
                .top
                .total_cmp(&b.bounds.top)
                .then(a.bounds.x.total_cmp(&b.bounds.x))
        });
        let mut lines: Vec<(f32, Vec<&TextRun>)> = Vec::new();
        for run in runs {
            let tolerance = run.font_size * 0.5;
            match lines.last_mut() {
                Some((top, members)) if (run.bounds.top - *top).abs() <= tolerance => {
                    members.push(run)
                }
                _ => lines.push((run.bounds.top, vec![run])),
            }
        }
        lines
            .into_iter()
            .map(|(_, mut members)| {
                members.sort_by(|a, b| a.bounds.x.total_cmp(&b.bounds.x));
                members
                    .iter()
                    .map(|run| run.text.trim())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn layer_text(&self, layer: Layer) -> String {
        self.lines_in(layer).join("\n")
    }
}

pub fn scan_pdf_bytes(bytes: &[u8]) -> Result<Vec<ScannedPage>, lopdf::Error> {
    let doc = LoDocument::load_mem(bytes)?;
    scan_document(&doc, None)
}

/// Scans the given 1-based pages, or every page when `pages` is `None`.
/// Page numbers past the end are skipped.
pub fn scan_document(
    doc: &LoDocument,
    pages: Option<&[usize]>,
) -> Result<Vec<ScannedPage>, lopdf::Error> {
    let page_map = doc.get_pages();
    let wanted: Vec<(u32, ObjectId)> = match pages {
        None => page_map.into_iter().collect(),
        Some(list) => list
            .iter()
            .filter_map(|n| {
                let key = u32::try_from(*n).ok()?;
                page_map.get(&key).map(|id| (key, *id))
            })
            .collect(),
    };
    wanted
        .into_iter()
        .map(|(number, id)| scan_page(doc, number as usize, id))
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    fn identity() -> Self {
        Self::from_operands(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    fn from_operands(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::from_operands(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn concat(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
            e: self.e * rhs.a + self.f * rhs.c + rhs.e,
            f: self.e * rhs.b + self.f * rhs.d + rhs.f,
        }
    }

    fn transform_point(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn scale_y(self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[derive(Clone)]
struct ScanState {
    ctm: Matrix,
    font: BaseFont,
    font_size: f32,
    fill: Color,
    stroke: Color,
    line_width: f32,
    text_matrix: Matrix,
    text_line_matrix: Matrix,
    leading: f32,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            ctm: Matrix::identity(),
            font: BaseFont::Helvetica,
            font_size: 12.0,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            text_matrix: Matrix::identity(),
            text_line_matrix: Matrix::identity(),
            leading: 0.0,
        }
    }
}

struct PageResources {
    fonts: HashMap<Vec<u8>, BaseFont>,
    images: HashMap<Vec<u8>, ObjectId>,
}

struct PageScanner<'a> {
    page_height: f32,
    resources: &'a PageResources,
    state: ScanState,
    stack: Vec<ScanState>,
    layers: Vec<Option<Layer>>,
    path: Vec<BoxF>,
    runs: Vec<TextRun>,
    marks: Vec<Mark>,
}

fn scan_page(doc: &LoDocument, number: usize, page_id: ObjectId) -> Result<ScannedPage, lopdf::Error> {
    let size = page_size_for_id(doc, page_id)?;
    let page_dict = doc.get_object(page_id)?.as_dict()?;
    let resources = page_resources(doc, page_dict)?;
    let content_bytes = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_bytes)?;

    let mut scanner = PageScanner {
        page_height: size.height.to_f32(),
        resources: &resources,
        state: ScanState::default(),
        stack: Vec::new(),
        layers: Vec::new(),
        path: Vec::new(),
        runs: Vec::new(),
        marks: Vec::new(),
    };
    for op in &content.operations {
        scanner.apply(doc, op);
    }

    Ok(ScannedPage {
        number,
        size,
        runs: scanner.runs,
        marks: scanner.marks,
    })
}

impl PageScanner<'_> {
    fn layer(&self) -> Layer {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| *layer)
            .unwrap_or(Layer::Body)
    }

    fn apply(&mut self, doc: &LoDocument, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(prev) = self.stack.pop() {
                    self.state = prev;
                }
            }
            "cm" => {
                if let Some([a, b, c, d, e, f]) = op_f32_6(op) {
                    self.state.ctm = Matrix::from_operands(a, b, c, d, e, f).concat(self.state.ctm);
                }
            }
            "w" => {
                if let Some(width) = op_f32(op, 0) {
                    self.state.line_width = width.max(0.0);
                }
            }
            "rg" => {
                if let Some([r, g, b]) = op_f32_3(op) {
                    self.state.fill = Color::rgb(r, g, b);
                }
            }
            "RG" => {
                if let Some([r, g, b]) = op_f32_3(op) {
                    self.state.stroke = Color::rgb(r, g, b);
                }
            }
            "g" => {
                if let Some(gray) = op_f32(op, 0) {
                    self.state.fill = Color::rgb(gray, gray, gray);
                }
            }
            "G" => {
                if let Some(gray) = op_f32(op, 0) {
                    self.state.stroke = Color::rgb(gray, gray, gray);
                }
            }
            "BDC" => {
                let layer = artifact_layer(doc, op);
                self.layers.push(layer);
            }
            "BMC" => self.layers.push(None),
            "EMC" => {
                self.layers.pop();
            }
            "re" => {
                if let Some([x, y, w, h]) = op_f32_4(op) {
                    let bounds = self.user_box(x, y, x + w, y + h);
                    self.path.push(bounds);
                }
            }
            "m" | "l" => {
                if let Some([x, y]) = op_f32_2(op) {
                    let (px, py) = self.state.ctm.transform_point(x, y);
                    self.path.push(BoxF {
                        x: px,
                        top: self.page_height - py,
                        width: 0.0,
                        height: 0.0,
                    });
                }
            }
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                let layer = self.layer();
                let color = self.state.fill;
                for bounds in self.path.drain(..) {
                    self.marks.push(Mark {
                        kind: MarkKind::Fill,
                        bounds,
                        color,
                        layer,
                    });
                }
            }
            "S" | "s" => {
                if let Some(bounds) = union(&self.path) {
                    let half = self.state.line_width / 2.0;
                    self.marks.push(Mark {
                        kind: MarkKind::Stroke,
                        bounds: BoxF {
                            x: bounds.x - half,
                            top: bounds.top - half,
                            width: bounds.width + self.state.line_width,
                            height: bounds.height + self.state.line_width,
                        },
                        color: self.state.stroke,
                        layer: self.layer(),
                    });
                }
                self.path.clear();
            }
            "n" => self.path.clear(),
            "BT" => {
                self.state.text_matrix = Matrix::identity();
                self.state.text_line_matrix = Matrix::identity();
            }
            "Tf" => {
                if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                    self.state.font = self
                        .resources
                        .fonts
                        .get(name)
                        .copied()
                        .unwrap_or(BaseFont::Helvetica);
                }
                if let Some(size) = op_f32(op, 1) {
                    self.state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = op_f32(op, 0) {
                    self.state.leading = leading;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = op_f32_2(op) {
                    self.next_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = op_f32_2(op) {
                    self.state.leading = -ty;
                    self.next_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some([a, b, c, d, e, f]) = op_f32_6(op) {
                    let m = Matrix::from_operands(a, b, c, d, e, f);
                    self.state.text_matrix = m;
                    self.state.text_line_matrix = m;
                }
            }
            "T*" => self.next_line(0.0, -self.state.leading),
            "Tj" => {
                if let Some(bytes) = op.operands.first().and_then(|o| o.as_str().ok()) {
                    self.show(bytes);
                }
            }
            "'" | "\"" => {
                self.next_line(0.0, -self.state.leading);
                if let Some(bytes) = op.operands.last().and_then(|o| o.as_str().ok()) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                let Some(items) = op.operands.first().and_then(|o| o.as_array().ok()) else {
                    return;
                };
                for item in items {
                    if let Ok(bytes) = item.as_str() {
                        self.show(bytes);
                    } else if let Some(adj) = obj_to_f32(item) {
                        self.advance(-adj / 1000.0 * self.state.font_size);
                    }
                }
            }
            "Do" => {
                let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                    return;
                };
                if self.resources.images.contains_key(name) {
                    let bounds = self.user_box(0.0, 0.0, 1.0, 1.0);
                    self.marks.push(Mark {
                        kind: MarkKind::Image,
                        bounds,
                        color: Color::rgb(0.5, 0.5, 0.5),
                        layer: self.layer(),
                    });
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        let m = Matrix::translation(tx, ty).concat(self.state.text_line_matrix);
        self.state.text_line_matrix = m;
        self.state.text_matrix = m;
    }

    fn advance(&mut self, tx: f32) {
        self.state.text_matrix = Matrix::translation(tx, 0.0).concat(self.state.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        let text: String = bytes.iter().map(|b| winansi_char(*b)).collect();
        let width = self
            .state
            .font
            .measure(Pt::from_f32(self.state.font_size), &text)
            .to_f32();
        let render = self.state.text_matrix.concat(self.state.ctm);
        let size = self.state.font_size * render.scale_y().max(0.0001);
        let (x, baseline) = render.transform_point(0.0, 0.0);
        let (x_end, _) = render.transform_point(width, 0.0);
        if !text.trim().is_empty() {
            self.runs.push(TextRun {
                text,
                font: self.state.font,
                font_size: size,
                bounds: BoxF {
                    x: x.min(x_end),
                    top: self.page_height - baseline - size,
                    width: (x_end - x).abs(),
                    height: size,
                },
                color: self.state.fill,
                layer: self.layer(),
            });
        }
        self.advance(width);
    }

    /// Maps the rectangle `(x0, y0)-(x1, y1)` through the CTM and returns its
    /// bounding box.
    fn user_box(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> BoxF {
        let corners = [
            self.state.ctm.transform_point(x0, y0),
            self.state.ctm.transform_point(x1, y0),
            self.state.ctm.transform_point(x0, y1),
            self.state.ctm.transform_point(x1, y1),
        ];
        let left = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let right = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let low = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let high = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        BoxF {
            x: left,
            top: self.page_height - high,
            width: right - left,
            height: high - low,
        }
    }
}

fn union(boxes: &[BoxF]) -> Option<BoxF> {
    let first = boxes.first()?;
    let mut left = first.x;
    let mut top = first.top;
    let mut right = first.x + first.width;
    let mut bottom = first.bottom();
    for b in &boxes[1..] {
        left = left.min(b.x);
        top = top.min(b.top);
        right = right.max(b.x + b.width);
        bottom = bottom.max(b.bottom());
    }
    Some(BoxF {
        x: left,
        top,
        width: right - left,
        height: bottom - top,
    })
}

fn artifact_layer(doc: &LoDocument, op: &Operation) -> Option<Layer> {
    let tag = op.operands.first()?.as_name().ok()?;
    if tag != b"Artifact" {
        return None;
    }
    let props = match op.operands.get(1)? {
        LoObject::Dictionary(dict) => dict,
        LoObject::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
        _ => return None,
    };
    let subtype = props.get(b"Subtype").ok()?.as_name().ok()?;
    Layer::from_artifact_subtype(subtype)
}

fn page_resources(doc: &LoDocument, page_dict: &LoDictionary) -> Result<PageResources, lopdf::Error> {
    let mut out = PageResources {
        fonts: HashMap::new(),
        images: HashMap::new(),
    };
    let Ok(obj) = page_dict.get(b"Resources") else {
        return Ok(out);
    };
    let resources = resolve_dict(doc, obj)?;

    if let Ok(font_obj) = resources.get(b"Font") {
        for (name, font_ref) in resolve_dict(doc, font_obj)?.iter() {
            let font_dict = resolve_dict(doc, font_ref)?;
            let font = font_dict
                .get(b"BaseFont")
                .and_then(LoObject::as_name)
                .ok()
                .and_then(|raw| BaseFont::from_pdf_name(&String::from_utf8_lossy(raw)))
                .unwrap_or(BaseFont::Helvetica);
            out.fonts.insert(name.clone(), font);
        }
    }

    if let Ok(xobj) = resources.get(b"XObject") {
        for (name, ref_obj) in resolve_dict(doc, xobj)?.iter() {
            let Ok(id) = ref_obj.as_reference() else {
                continue;
            };
            let is_image = doc
                .get_object(id)
                .and_then(LoObject::as_stream)
                .ok()
                .and_then(|stream| stream.dict.get(b"Subtype").ok())
                .and_then(|subtype| subtype.as_name().ok())
                .is_some_and(|subtype| subtype == b"Image");
            if is_image {
                out.images.insert(name.clone(), id);
            }
        }
    }
    Ok(out)
}

pub(crate) fn page_size_for_id(doc: &LoDocument, mut id: ObjectId) -> Result<Size, lopdf::Error> {
    loop {
        let dict = doc.get_object(id)?.as_dict()?;
        if let Ok(arr) = dict.get(b"MediaBox").and_then(LoObject::as_array) {
            if let Some(size) = parse_media_box_array(arr) {
                return Ok(size);
            }
        }
        id = match dict.get(b"Parent").and_then(LoObject::as_reference) {
            Ok(parent_id) => parent_id,
            Err(_) => break,
        };
    }
    Ok(Size::letter())
}

fn parse_media_box_array(arr: &[LoObject]) -> Option<Size> {
    if arr.len() < 4 {
        return None;
    }
    let x0 = obj_to_f32(&arr[0])?;
    let y0 = obj_to_f32(&arr[1])?;
    let x1 = obj_to_f32(&arr[2])?;
    let y1 = obj_to_f32(&arr[3])?;
    Some(Size::from_points(
        (x1 - x0).abs().max(1.0),
        (y1 - y0).abs().max(1.0),
    ))
}

fn resolve_dict(doc: &LoDocument, obj: &LoObject) -> Result<LoDictionary, lopdf::Error> {
    let mut obj = obj;
    while let LoObject::Reference(id) = obj {
        obj = doc.get_object(*id)?;
    }
    match obj {
        LoObject::Dictionary(d) => Ok(d.clone()),
        _ => Ok(LoDictionary::new()),
    }
}

fn op_f32(op: &Operation, idx: usize) -> Option<f32> {
    obj_to_f32(op.operands.get(idx)?)
}

fn op_f32_2(op: &Operation) -> Option<[f32; 2]> {
    Some([op_f32(op, 0)?, op_f32(op, 1)?])
}

fn op_f32_3(op: &Operation) -> Option<[f32; 3]> {
    Some([op_f32(op, 0)?, op_f32(op, 1)?, op_f32(op, 2)?])
}

fn op_f32_4(op: &Operation) -> Option<[f32; 4]> {
    Some([
        op_f32(op, 0)?,
        op_f32(op, 1)?,
        op_f32(op, 2)?,
        op_f32(op, 3)?,
    ])
}

fn op_f32_6(op: &Operation) -> Option<[f32; 6]> {
    Some([
        op_f32(op, 0)?,
        op_f32(op, 1)?,
        op_f32(op, 2)?,
        op_f32(op, 3)?,
        op_f32(op, 4)?,
        op_f32(op, 5)?,
    ])
}

fn obj_to_f32(obj: &LoObject) -> Option<f32> {
    if let Ok(v) = obj.as_float() {
        return Some(v);
    }
    obj.as_i64().ok().map(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetBundle;
    use crate::canvas::Canvas;
    use crate::pdf::{PdfOptions, document_to_pdf};

    fn rendered(build: impl FnOnce(&mut Canvas)) -> Vec<ScannedPage> {
        let mut canvas = Canvas::new(Size::letter());
        build(&mut canvas);
        let bytes = document_to_pdf(&canvas.finish(), &AssetBundle::new(), &PdfOptions::default())
            .expect("pdf");
        scan_pdf_bytes(&bytes).expect("scan")
    }

    #[test]
    fn text_positions_round_trip_through_the_writer() {
        let pages = rendered(|canvas| {
            canvas.set_font(BaseFont::Courier);
            canvas.set_font_size(Pt::from_f32(10.0));
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(100.0), "hello");
        });
        let run = &pages[0].runs[0];
        assert_eq!(run.text, "hello");
        assert_eq!(run.font, BaseFont::Courier);
        assert!((run.bounds.x - 72.0).abs() < 0.01);
        assert!((run.bounds.top - 100.0).abs() < 0.01);
        assert!((run.bounds.width - 30.0).abs() < 0.01);
        assert_eq!(run.layer, Layer::Body);
    }

    #[test]
    fn artifacts_are_assigned_to_chrome_layers() {
        let pages = rendered(|canvas| {
            canvas.begin_artifact("Header");
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(30.0), "Running title");
            canvas.fill_rect(
                Pt::from_f32(72.0),
                Pt::from_f32(55.0),
                Pt::from_f32(400.0),
                Pt::from_f32(1.0),
            );
            canvas.end_marked_content();
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(100.0), "Body line");
            canvas.begin_artifact("Footer");
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(750.0), "Page 3 of 9");
            canvas.end_marked_content();
        });
        let page = &pages[0];
        assert_eq!(page.layer_text(Layer::Header), "Running title");
        assert_eq!(page.layer_text(Layer::Footer), "Page 3 of 9");
        assert_eq!(page.body_lines(), vec!["Body line".to_string()]);
        let rule = page.marks.iter().find(|m| m.kind == MarkKind::Fill).expect("rule");
        assert_eq!(rule.layer, Layer::Header);
        assert!((rule.bounds.top - 55.0).abs() < 0.01);
    }

    #[test]
    fn runs_on_one_baseline_join_into_a_line() {
        let pages = rendered(|canvas| {
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(100.0), "Results");
            canvas.draw_string(Pt::from_f32(300.0), Pt::from_f32(100.0), "12");
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(140.0), "Next");
        });
        assert_eq!(pages[0].body_lines(), vec!["Results 12", "Next"]);
    }

    #[test]
    fn selected_pages_only() {
        let mut canvas = Canvas::new(Size::letter());
        for label in ["one", "two", "three"] {
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(72.0), label);
            canvas.show_page();
        }
        let bytes = document_to_pdf(&canvas.finish(), &AssetBundle::new(), &PdfOptions::default())
            .expect("pdf");
        let doc = LoDocument::load_mem(&bytes).expect("load");
        let pages = scan_document(&doc, Some(&[2, 9][..])).expect("scan");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 2);
        assert_eq!(pages[0].body_lines(), vec!["two"]);
    }
}
