//! Finds the content-local page each heading begins on by reading back the
//! body text of the content-only render.

use crate::content::Heading;
use crate::error::{FolioError, FolioResult};
use crate::font::BaseFont;
use crate::pdf::{winansi_byte, winansi_char};
use crate::scan::{Layer, ScannedPage, TextRun, scan_document};
use crate::validate::{ValidationIssue, ValidationType};
use lopdf::Document as LoDocument;
use std::path::Path;

/// Shortest line accepted as the first part of a wrapped heading.
const MIN_PREFIX_CHARS: usize = 4;

/// Headings are set in the bold face; body text starting with the same
/// words is not a heading.
fn is_heading_run(run: &TextRun) -> bool {
    run.font == BaseFont::HelveticaBold
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Local page per heading, index for index with the input.
    pub local_pages: Vec<Option<usize>>,
    pub issues: Vec<ValidationIssue>,
}

impl Resolution {
    pub fn resolved_count(&self) -> usize {
        self.local_pages.iter().filter(|p| p.is_some()).count()
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What the heading reads like after a round trip through the PDF's
/// single-byte text encoding.
fn as_rendered(text: &str) -> String {
    normalize(
        &text
            .chars()
            .map(|ch| winansi_char(winansi_byte(ch)))
            .collect::<String>(),
    )
}

fn line_matches(line: &str, heading: &str) -> bool {
    if heading.is_empty() || line.is_empty() {
        return false;
    }
    line == heading
        || line.starts_with(heading)
        || (line.chars().count() >= MIN_PREFIX_CHARS && heading.starts_with(line))
}

/// Resolves headings in document order. Each search resumes on the line
/// after the previous match, so repeated heading text maps to successive
/// occurrences. A heading that is not found leaves the cursor where it was.
pub fn resolve_headings(pages: &[ScannedPage], headings: &[Heading], attempt: usize) -> Resolution {
    let lines: Vec<(usize, String)> = pages
        .iter()
        .flat_map(|page| {
            page.lines_matching(Layer::Body, is_heading_run)
                .into_iter()
                .map(move |line| (page.number, normalize(&line)))
        })
        .collect();

    let mut cursor = 0;
    let mut local_pages = Vec::with_capacity(headings.len());
    let mut issues = Vec::new();
    for heading in headings {
        let wanted = as_rendered(&heading.text);
        let found = lines[cursor..]
            .iter()
            .position(|(_, line)| line_matches(line, &wanted))
            .map(|offset| cursor + offset);
        match found {
            Some(index) => {
                cursor = index + 1;
                local_pages.push(Some(lines[index].0));
            }
            None => {
                tracing::warn!(heading = %heading.id, "heading not found in rendered content");
                issues.push(
                    ValidationIssue::warning(
                        ValidationType::HeadingUnresolved,
                        format!("heading {} (\"{}\") was not found", heading.id, heading.text),
                        attempt,
                    )
                    .with_subject(heading.id.clone()),
                );
                local_pages.push(None);
            }
        }
    }

    Resolution {
        local_pages,
        issues,
    }
}

pub fn resolve_artifact(path: &Path, headings: &[Heading], attempt: usize) -> FolioResult<Resolution> {
    let doc = LoDocument::load(path)
        .map_err(|err| FolioError::render("content", format!("read back for resolving: {err}")))?;
    let pages = scan_document(&doc, None)
        .map_err(|err| FolioError::render("content", format!("text extraction: {err}")))?;
    Ok(resolve_headings(&pages, headings, attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::BoxF;
    use crate::types::{Color, Size};

    fn page(number: usize, lines: &[(&str, Layer)]) -> ScannedPage {
        let lines: Vec<(&str, Layer, BaseFont)> = lines
            .iter()
            .map(|(text, layer)| (*text, *layer, BaseFont::HelveticaBold))
            .collect();
        page_in_fonts(number, &lines)
    }

    fn page_in_fonts(number: usize, lines: &[(&str, Layer, BaseFont)]) -> ScannedPage {
        let runs = lines
            .iter()
            .enumerate()
            .map(|(index, (text, layer, font))| TextRun {
                text: text.to_string(),
                font: *font,
                font_size: 10.0,
                bounds: BoxF {
                    x: 72.0,
                    top: 80.0 + 14.0 * index as f32,
                    width: 100.0,
                    height: 10.0,
                },
                color: Color::BLACK,
                layer: *layer,
            })
            .collect();
        ScannedPage {
            number,
            size: Size::letter(),
            runs,
            marks: Vec::new(),
        }
    }

    #[test]
    fn headings_resolve_to_their_pages() {
        let pages = vec![
            page(1, &[("Introduction", Layer::Body), ("Some text", Layer::Body)]),
            page(2, &[("Methods", Layer::Body)]),
        ];
        let headings = vec![
            Heading::new(1, "Introduction", "intro"),
            Heading::new(1, "Methods", "methods"),
        ];
        let res = resolve_headings(&pages, &headings, 1);
        assert_eq!(res.local_pages, vec![Some(1), Some(2)]);
        assert!(res.issues.is_empty());
    }

    #[test]
    fn running_chrome_is_ignored() {
        let pages = vec![
            page(1, &[("Methods", Layer::Header), ("Intro", Layer::Body)]),
            page(2, &[("Methods", Layer::Body)]),
        ];
        let res = resolve_headings(&pages, &[Heading::new(1, "Methods", "m")], 1);
        assert_eq!(res.local_pages, vec![Some(2)]);
    }

    #[test]
    fn wrapped_heading_matches_on_its_first_line() {
        let pages = vec![page(
            3,
            &[
                ("A rather long heading that", Layer::Body),
                ("wraps onto two lines", Layer::Body),
            ],
        )];
        let headings = vec![Heading::new(
            2,
            "A rather long  heading that wraps onto two lines",
            "long",
        )];
        assert_eq!(resolve_headings(&pages, &headings, 1).local_pages, vec![Some(3)]);
    }

    #[test]
    fn short_lines_are_not_taken_as_prefixes() {
        let pages = vec![
            page(1, &[("Re", Layer::Body)]),
            page(2, &[("Results", Layer::Body)]),
        ];
        let res = resolve_headings(&pages, &[Heading::new(1, "Results", "r")], 1);
        assert_eq!(res.local_pages, vec![Some(2)]);
    }

    #[test]
    fn duplicate_heading_text_maps_to_successive_occurrences() {
        let pages = vec![
            page(1, &[("Summary", Layer::Body)]),
            page(2, &[("Body", Layer::Body)]),
            page(3, &[("Summary", Layer::Body)]),
        ];
        let headings = vec![
            Heading::new(2, "Summary", "s1"),
            Heading::new(2, "Summary", "s2"),
        ];
        assert_eq!(
            resolve_headings(&pages, &headings, 1).local_pages,
            vec![Some(1), Some(3)]
        );
    }

    #[test]
    fn missing_heading_warns_once_and_keeps_the_cursor() {
        let pages = vec![
            page(1, &[("Alpha", Layer::Body)]),
            page(2, &[("Gamma", Layer::Body)]),
        ];
        let headings = vec![
            Heading::new(1, "Alpha", "a"),
            Heading::new(1, "Beta", "b"),
            Heading::new(1, "Gamma", "g"),
        ];
        let res = resolve_headings(&pages, &headings, 2);
        assert_eq!(res.local_pages, vec![Some(1), None, Some(2)]);
        assert_eq!(res.issues.len(), 1);
        assert_eq!(res.issues[0].validation_type, ValidationType::HeadingUnresolved);
        assert!(res.issues[0].message.contains("heading b"));
        assert_eq!(res.issues[0].subject.as_deref(), Some("b"));
        assert_eq!(res.issues[0].attempt, 2);
        assert_eq!(res.resolved_count(), 2);
    }

    #[test]
    fn unencodable_characters_match_their_rendered_form() {
        let pages = vec![page(1, &[("Caf\u{e9} ? notes", Layer::Body)])];
        let res = resolve_headings(&pages, &[Heading::new(1, "Caf\u{e9} \u{4e2d} notes", "c")], 1);
        assert_eq!(res.local_pages, vec![Some(1)]);
    }

    #[test]
    fn body_text_starting_with_heading_words_is_skipped() {
        let pages = vec![
            page_in_fonts(
                1,
                &[
                    ("Introduction", Layer::Body, BaseFont::HelveticaBold),
                    ("Results were mixed across regions.", Layer::Body, BaseFont::Helvetica),
                ],
            ),
            page_in_fonts(
                2,
                &[
                    ("Results", Layer::Body, BaseFont::HelveticaBold),
                    ("Results follow below.", Layer::Body, BaseFont::Helvetica),
                ],
            ),
        ];
        let headings = vec![
            Heading::new(1, "Introduction", "intro"),
            Heading::new(1, "Results", "results"),
        ];
        let res = resolve_headings(&pages, &headings, 1);
        assert_eq!(res.local_pages, vec![Some(1), Some(2)]);
        assert!(res.issues.is_empty());
    }

    #[test]
    fn heading_set_only_in_body_type_is_unresolved() {
        let pages = vec![page_in_fonts(
            1,
            &[("Methods", Layer::Body, BaseFont::Helvetica)],
        )];
        let res = resolve_headings(&pages, &[Heading::new(1, "Methods", "m")], 1);
        assert_eq!(res.local_pages, vec![None]);
        assert_eq!(res.issues.len(), 1);
    }
}
