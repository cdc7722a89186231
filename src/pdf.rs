//! Serializes a laid-out [`Document`] into a standalone PDF.
//!
//! Text uses the standard Type1 fonts with WinAnsi encoding, images are
//! embedded as DCT streams, and running chrome is wrapped in `/Artifact`
//! marked content so later stages can tell it apart from body text.

use crate::assets::AssetBundle;
use crate::canvas::{Command, Document, Page};
use crate::error::{FolioError, FolioResult};
use crate::font::BaseFont;
use crate::types::{Color, Pt};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    pub title: Option<String>,
}

pub fn document_to_pdf(
    document: &Document,
    assets: &AssetBundle,
    options: &PdfOptions,
) -> FolioResult<Vec<u8>> {
    let mut objects: Vec<Vec<u8>> = Vec::new();
    let alloc = |objects: &mut Vec<Vec<u8>>| {
        objects.push(Vec::new());
        objects.len()
    };

    let catalog_id = alloc(&mut objects);
    let pages_id = alloc(&mut objects);

    let mut font_ids: Vec<(BaseFont, usize)> = Vec::new();
    for font in BaseFont::ALL {
        let id = alloc(&mut objects);
        objects[id - 1] = font_object(font).into_bytes();
        font_ids.push((font, id));
    }
    let font_resources = font_ids
        .iter()
        .map(|(font, id)| format!("/{} {} 0 R", font.resource_name(), id))
        .collect::<Vec<_>>()
        .join(" ");

    // Image XObjects in first-use order so object numbering is stable.
    let mut image_names: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for page in &document.pages {
        for cmd in &page.commands {
            let Command::DrawImage { resource_id, .. } = cmd else {
                continue;
            };
            if image_names.contains_key(resource_id) {
                continue;
            }
            let asset = assets.get(resource_id).ok_or_else(|| {
                FolioError::render("pdf", format!("unknown image resource {resource_id}"))
            })?;
            let id = alloc(&mut objects);
            objects[id - 1] = image_object(asset.width_px, asset.height_px, &asset.jpeg);
            let name = format!("Im{}", image_names.len() + 1);
            image_names.insert(resource_id.clone(), (name, id));
        }
    }

    let page_height = document.page_size.height;
    let mut kids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = render_page(page, page_height, &image_names);
        let content_id = alloc(&mut objects);
        objects[content_id - 1] = stream_object(content.as_bytes());

        let used_images: Vec<&(String, usize)> = image_names
            .iter()
            .filter(|(rid, _)| {
                page.commands.iter().any(|cmd| {
                    matches!(cmd, Command::DrawImage { resource_id, .. } if resource_id == *rid)
                })
            })
            .map(|(_, entry)| entry)
            .collect();
        let xobjects = if used_images.is_empty() {
            String::new()
        } else {
            let entries = used_images
                .iter()
                .map(|(name, id)| format!("/{name} {id} 0 R"))
                .collect::<Vec<_>>()
                .join(" ");
            format!(" /XObject << {entries} >>")
        };

        let page_id = alloc(&mut objects);
        objects[page_id - 1] = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << {} >>{} >> /Contents {} 0 R >>",
            pages_id,
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height),
            font_resources,
            xobjects,
            content_id
        )
        .into_bytes();
        kids.push(page_id);
    }

    let kids_refs = kids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    objects[pages_id - 1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids_refs,
        kids.len()
    )
    .into_bytes();
    objects[catalog_id - 1] = format!("<< /Type /Catalog /Pages {pages_id} 0 R >>").into_bytes();

    let info_id = alloc(&mut objects);
    objects[info_id - 1] = info_object(options.title.as_deref()).into_bytes();

    Ok(build_pdf(&objects, catalog_id, info_id))
}

fn render_page(
    page: &Page,
    page_height: Pt,
    image_names: &BTreeMap<String, (String, usize)>,
) -> String {
    let mut out = String::new();
    let mut font = BaseFont::Helvetica;
    let mut font_size = Pt::from_f32(12.0);
    let mut saved: Vec<(BaseFont, Pt)> = Vec::new();

    for cmd in &page.commands {
        match cmd {
            Command::SaveState => {
                saved.push((font, font_size));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((prev_font, prev_size)) = saved.pop() {
                    font = prev_font;
                    font_size = prev_size;
                }
                out.push_str("Q\n");
            }
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => {
                out.push_str(&format!("{} rg\n", color_components(*color)));
            }
            Command::SetStrokeColor(color) => {
                out.push_str(&format!("{} RG\n", color_components(*color)));
            }
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetFont(next) => font = *next,
            Command::SetFontSize(size) => font_size = *size,
            Command::DrawString { x, y, text } => {
                out.push_str("BT\n");
                out.push_str(&format!(
                    "/{} {} Tf\n",
                    font.resource_name(),
                    fmt_pt(font_size)
                ));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encode_winansi_pdf_string(text)));
                out.push_str("ET\n");
            }
            Command::FillRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::StrokeLine { x1, y1, x2, y2 } => {
                out.push_str(&format!(
                    "{} {} m\n{} {} l\nS\n",
                    fmt_pt(*x1),
                    fmt_pt(page_height - *y1),
                    fmt_pt(*x2),
                    fmt_pt(page_height - *y2)
                ));
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                if let Some((name, _)) = image_names.get(resource_id) {
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - *height)
                    ));
                    out.push_str(&format!("/{name} Do\n"));
                    out.push_str("Q\n");
                }
            }
            Command::BeginArtifact { subtype } => {
                out.push_str(&format!(
                    "/Artifact <</Type /Pagination /Subtype /{}>> BDC\n",
                    escape_pdf_name(subtype)
                ));
            }
            Command::EndMarkedContent => out.push_str("EMC\n"),
        }
    }

    out
}

fn font_object(font: BaseFont) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.pdf_name()
    )
}

fn image_object(width: u32, height: u32, jpeg: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
        width,
        height,
        jpeg.len()
    )
    .into_bytes();
    out.extend_from_slice(jpeg);
    out.extend_from_slice(b"\nendstream");
    out
}

fn stream_object(content: &[u8]) -> Vec<u8> {
    let mut out = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    out.extend_from_slice(content);
    out.extend_from_slice(b"\nendstream");
    out
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec!["/Producer (brandfolio)".to_string()];
    if let Some(title) = title {
        entries.push(format!("/Title ({})", encode_winansi_pdf_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn build_pdf(objects: &[Vec<u8>], catalog_id: usize, info_id: usize) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            catalog_id,
            info_id,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// Maps text to WinAnsi bytes and escapes it for a literal string. Characters
/// outside the code page become `?`.
pub fn encode_winansi_pdf_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.chars().map(winansi_byte) {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{b:03o}")),
            b => out.push(b as char),
        }
    }
    out
}

pub fn winansi_byte(ch: char) -> u8 {
    match ch {
        '\u{0000}'..='\u{007F}' => ch as u8,
        '\u{00A0}'..='\u{00FF}' => ch as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => b'?',
    }
}

/// Inverse of [`winansi_byte`], used when reading text back out of a page.
pub fn winansi_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        b => b as char,
    }
}

fn escape_pdf_name(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("#{byte:02X}"));
            }
        }
    }
    out
}

fn color_components(color: Color) -> String {
    format!(
        "{} {} {}",
        fmt(color.r.clamp(0.0, 1.0)),
        fmt(color.g.clamp(0.0, 1.0)),
        fmt(color.b.clamp(0.0, 1.0))
    )
}

fn fmt(value: f32) -> String {
    fmt_pt(Pt::from_f32(value))
}

/// Shortest decimal rendering of a point value at millipoint precision.
pub fn fmt_pt(value: Pt) -> String {
    let milli = value.to_milli_i64();
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let (int_part, frac_part) = (abs / 1000, abs % 1000);
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let frac = format!("{frac_part:03}");
    format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::types::Size;

    fn sample_document() -> Document {
        let mut canvas = Canvas::new(Size::letter());
        canvas.begin_artifact("Header");
        canvas.set_font(BaseFont::HelveticaBold);
        canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(24.0), "Header (draft)");
        canvas.end_marked_content();
        canvas.set_font_size(Pt::from_f32(10.0));
        canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(100.0), "Café");
        canvas.fill_rect(
            Pt::from_f32(72.0),
            Pt::from_f32(200.0),
            Pt::from_f32(100.0),
            Pt::from_f32(2.0),
        );
        canvas.show_page();
        canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(100.0), "second");
        canvas.finish()
    }

    #[test]
    fn fmt_pt_trims_trailing_zeros() {
        assert_eq!(fmt_pt(Pt::from_f32(12.0)), "12");
        assert_eq!(fmt_pt(Pt::from_f32(10.5)), "10.5");
        assert_eq!(fmt_pt(Pt::from_f32(-0.125)), "-0.125");
        assert_eq!(fmt_pt(Pt::ZERO), "0");
    }

    #[test]
    fn winansi_escapes_delimiters_and_high_bytes() {
        assert_eq!(encode_winansi_pdf_string("a(b)\\"), "a\\(b\\)\\\\");
        assert_eq!(encode_winansi_pdf_string("é"), "\\351");
        assert_eq!(encode_winansi_pdf_string("\u{2013}"), "\\226");
        assert_eq!(encode_winansi_pdf_string("\u{4e2d}"), "?");
        for byte in [0x41u8, 0x96, 0xE9] {
            assert_eq!(winansi_byte(winansi_char(byte)), byte);
        }
    }

    #[test]
    fn output_loads_with_lopdf() {
        let bytes = document_to_pdf(
            &sample_document(),
            &AssetBundle::new(),
            &PdfOptions {
                title: Some("Report".into()),
            },
        )
        .expect("pdf");
        let doc = lopdf::Document::load_mem(&bytes).expect("load");
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn text_baseline_and_artifacts_are_written() {
        let doc = sample_document();
        let content = render_page(&doc.pages[0], doc.page_size.height, &BTreeMap::new());
        assert!(content.contains("/Artifact <</Type /Pagination /Subtype /Header>> BDC"));
        // 792 - 24 - 12
        assert!(content.contains("72 756 Td"));
        assert!(content.contains("(Header \\(draft\\)) Tj"));
        assert!(content.contains("/F2 10 Tf"));
    }

    #[test]
    fn missing_image_resource_is_a_render_error() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(10.0), Pt::from_f32(10.0), "nope");
        let err = document_to_pdf(&canvas.finish(), &AssetBundle::new(), &PdfOptions::default())
            .expect_err("missing");
        assert!(matches!(err, FolioError::Render { .. }));
    }
}
