//! Rasterizes scanned pages with tiny-skia.
//!
//! Glyphs are drawn as ink boxes sized from the standard font metrics, which
//! is all the layout inspection needs. Each layer is painted into its own
//! pixmap so ink can be attributed to body, header or footer afterwards.

use crate::error::{FolioError, FolioResult};
use crate::scan::{BoxF, Layer, MarkKind, ScannedPage, TextRun};
use crate::types::Color;
use std::path::Path;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};

const LAYERS: [Layer; 3] = [Layer::Body, Layer::Header, Layer::Footer];

// Cap height and descender depth as a fraction of the font size.
const CAP_HEIGHT: f32 = 0.72;
const DESCENDER: f32 = 0.21;

pub struct RasterPage {
    pub number: usize,
    /// Pixels per point.
    pub scale: f32,
    layers: Vec<(Layer, Pixmap)>,
}

impl RasterPage {
    pub fn width_px(&self) -> u32 {
        self.layers.first().map(|(_, p)| p.width()).unwrap_or(0)
    }

    pub fn height_px(&self) -> u32 {
        self.layers.first().map(|(_, p)| p.height()).unwrap_or(0)
    }

    fn layer(&self, layer: Layer) -> Option<&Pixmap> {
        self.layers
            .iter()
            .find(|(l, _)| *l == layer)
            .map(|(_, pixmap)| pixmap)
    }

    /// First and last pixel rows carrying ink in `layer`, or `None` when the
    /// layer is empty.
    pub fn ink_rows(&self, layer: Layer) -> Option<(u32, u32)> {
        let pixmap = self.layer(layer)?;
        let width = pixmap.width() as usize;
        let data = pixmap.data();
        let row_has_ink = |row: usize| {
            data[row * width * 4..(row + 1) * width * 4]
                .chunks_exact(4)
                .any(|px| px[3] > 0)
        };
        let height = pixmap.height() as usize;
        let first = (0..height).find(|row| row_has_ink(*row))?;
        let last = (0..height).rev().find(|row| row_has_ink(*row))?;
        Some((first as u32, last as u32))
    }

    /// Ink extent of `layer` in points from the top edge: `(top, bottom)`.
    pub fn ink_span_pt(&self, layer: Layer) -> Option<(f32, f32)> {
        let (first, last) = self.ink_rows(layer)?;
        Some((first as f32 / self.scale, (last + 1) as f32 / self.scale))
    }

    pub fn has_ink(&self, layer: Layer) -> bool {
        self.ink_rows(layer).is_some()
    }

    /// All layers flattened onto white.
    pub fn composite(&self) -> FolioResult<Pixmap> {
        let mut out = Pixmap::new(self.width_px(), self.height_px())
            .ok_or_else(|| FolioError::invalid("raster page has no pixels"))?;
        out.fill(tiny_skia::Color::WHITE);
        for (_, pixmap) in &self.layers {
            out.draw_pixmap(
                0,
                0,
                pixmap.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        Ok(out)
    }

    pub fn save_png(&self, path: &Path) -> FolioResult<()> {
        let png = self
            .composite()?
            .encode_png()
            .map_err(|err| FolioError::invalid(format!("png encode failed: {err}")))?;
        std::fs::write(path, png)?;
        Ok(())
    }
}

pub fn rasterize_page(page: &ScannedPage, dpi: u32) -> FolioResult<RasterPage> {
    let dpi = if dpi == 0 { 144 } else { dpi };
    let scale = dpi as f32 / 72.0;
    let width_px = (page.size.width.to_f32() * scale).ceil().max(1.0) as u32;
    let height_px = (page.size.height.to_f32() * scale).ceil().max(1.0) as u32;
    let transform = Transform::from_scale(scale, scale);

    let mut layers = Vec::with_capacity(LAYERS.len());
    for layer in LAYERS {
        let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
            FolioError::invalid(format!(
                "invalid raster size {width_px}x{height_px} at {dpi} DPI"
            ))
        })?;
        for mark in page.marks.iter().filter(|m| m.layer == layer) {
            let color = match mark.kind {
                MarkKind::Image => Color::rgb(0.55, 0.55, 0.55),
                MarkKind::Fill | MarkKind::Stroke => mark.color,
            };
            // Stroked hairlines still need at least one device pixel.
            let min = 1.0 / scale;
            let bounds = BoxF {
                width: mark.bounds.width.max(min),
                height: mark.bounds.height.max(min),
                ..mark.bounds
            };
            fill_box(&mut pixmap, bounds, color, transform);
        }
        for run in page.runs.iter().filter(|r| r.layer == layer) {
            draw_run(&mut pixmap, run, transform);
        }
        layers.push((layer, pixmap));
    }

    Ok(RasterPage {
        number: page.number,
        scale,
        layers,
    })
}

fn draw_run(pixmap: &mut Pixmap, run: &TextRun, transform: Transform) {
    let size = run.font_size;
    let baseline = run.bounds.top + size;
    let total_units: f32 = run.text.chars().map(|ch| run.font.advance(ch) as f32).sum();
    if total_units <= 0.0 {
        return;
    }
    // Horizontal scale from font units to the run's measured width.
    let per_unit = run.bounds.width / total_units;
    let mut pen = run.bounds.x;
    for ch in run.text.chars() {
        let advance = run.font.advance(ch) as f32 * per_unit;
        if !ch.is_whitespace() {
            let descends = matches!(ch, 'g' | 'j' | 'p' | 'q' | 'y' | ',' | ';');
            let top = baseline - size * CAP_HEIGHT;
            let bottom = if descends {
                baseline + size * DESCENDER
            } else {
                baseline
            };
            fill_box(
                pixmap,
                BoxF {
                    x: pen + advance * 0.1,
                    top,
                    width: advance * 0.8,
                    height: bottom - top,
                },
                run.color,
                transform,
            );
        }
        pen += advance;
    }
}

fn fill_box(pixmap: &mut Pixmap, bounds: BoxF, color: Color, transform: Transform) {
    let Some(rect) = Rect::from_xywh(bounds.x, bounds.top, bounds.width, bounds.height) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(tiny_skia::Color::from_rgba(
        color.r.clamp(0.0, 1.0),
        color.g.clamp(0.0, 1.0),
        color.b.clamp(0.0, 1.0),
        1.0,
    )
    .unwrap_or(tiny_skia::Color::BLACK));
    paint.anti_alias = false;
    let path = PathBuilder::from_rect(rect);
    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::BaseFont;
    use crate::scan::{Mark, TextRun};
    use crate::types::Size;

    fn page_with(runs: Vec<TextRun>, marks: Vec<Mark>) -> ScannedPage {
        ScannedPage {
            number: 1,
            size: Size::letter(),
            runs,
            marks,
        }
    }

    fn run(text: &str, top: f32, layer: Layer) -> TextRun {
        TextRun {
            text: text.to_string(),
            font: BaseFont::Helvetica,
            font_size: 10.0,
            bounds: BoxF {
                x: 72.0,
                top,
                width: BaseFont::Helvetica
                    .measure(crate::types::Pt::from_f32(10.0), text)
                    .to_f32(),
                height: 10.0,
            },
            color: Color::BLACK,
            layer,
        }
    }

    #[test]
    fn page_dimensions_follow_dpi() {
        let raster = rasterize_page(&page_with(vec![], vec![]), 144).expect("raster");
        assert_eq!((raster.width_px(), raster.height_px()), (1224, 1584));
        assert!(!raster.has_ink(Layer::Body));
    }

    #[test]
    fn ink_is_attributed_per_layer() {
        let raster = rasterize_page(
            &page_with(
                vec![
                    run("Header", 30.0, Layer::Header),
                    run("Main text", 100.0, Layer::Body),
                    run("Page 2", 750.0, Layer::Footer),
                ],
                vec![],
            ),
            72,
        )
        .expect("raster");
        let (body_top, body_bottom) = raster.ink_span_pt(Layer::Body).expect("body ink");
        // Cap height starts ~2.8pt below the em box top, baseline at 110.
        assert!(body_top > 100.0 && body_top < 105.0, "{body_top}");
        assert!(body_bottom <= 111.0, "{body_bottom}");
        let (_, header_bottom) = raster.ink_span_pt(Layer::Header).expect("header ink");
        assert!(header_bottom < body_top);
        let (footer_top, _) = raster.ink_span_pt(Layer::Footer).expect("footer ink");
        assert!(footer_top > body_bottom);
    }

    #[test]
    fn composite_png_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page-1-actual.png");
        let raster = rasterize_page(
            &page_with(
                vec![run("Hello", 100.0, Layer::Body)],
                vec![Mark {
                    kind: MarkKind::Image,
                    bounds: BoxF {
                        x: 72.0,
                        top: 200.0,
                        width: 100.0,
                        height: 50.0,
                    },
                    color: Color::BLACK,
                    layer: Layer::Body,
                }],
            ),
            72,
        )
        .expect("raster");
        raster.save_png(&path).expect("save");
        let decoded = image::open(&path).expect("open").to_rgb8();
        assert_eq!(decoded.dimensions(), (612, 792));
        assert_eq!(decoded.get_pixel(100, 220).0, [140, 140, 140]);
        assert_eq!(decoded.get_pixel(500, 500).0, [255, 255, 255]);
    }
}
