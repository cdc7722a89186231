//! Structural checks on section artifacts and the assembled document.

use crate::error::{FolioError, FolioResult};
use lopdf::Document as LoDocument;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeBlocker {
    Encrypted,
    NoPages,
}

impl MergeBlocker {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeBlocker::Encrypted => "PDF_ENCRYPTED_UNSUPPORTED",
            MergeBlocker::NoPages => "PDF_EMPTY_OR_NO_PAGES",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

impl PdfReport {
    fn of(doc: &LoDocument, file_size_bytes: usize) -> Self {
        Self {
            pdf_version: doc.version.clone(),
            page_count: doc.get_pages().len(),
            encrypted: doc.is_encrypted(),
            file_size_bytes,
        }
    }

    pub fn merge_blockers(&self) -> Vec<MergeBlocker> {
        let mut blockers = Vec::new();
        if self.encrypted {
            blockers.push(MergeBlocker::Encrypted);
        }
        if self.page_count == 0 {
            blockers.push(MergeBlocker::NoPages);
        }
        blockers
    }
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> FolioResult<PdfReport> {
    Ok(load_mergeable_unchecked(bytes)?.1)
}

pub fn inspect_pdf_path(path: &Path) -> FolioResult<PdfReport> {
    let data = std::fs::read(path)
        .map_err(|err| FolioError::merge(format!("{}: {err}", path.display())))?;
    inspect_pdf_bytes(&data)
}

/// Loads `path` and rejects it when it cannot take part in a merge. `label`
/// names the source in error messages.
pub fn load_mergeable(label: &str, path: &Path) -> FolioResult<(LoDocument, PdfReport)> {
    let data = std::fs::read(path)
        .map_err(|err| FolioError::merge(format!("{label} source unreadable: {err}")))?;
    let (doc, report) = load_mergeable_unchecked(&data)
        .map_err(|err| FolioError::merge(format!("{label} source: {err}")))?;
    require_mergeable(label, &report)?;
    Ok((doc, report))
}

pub fn require_mergeable(label: &str, report: &PdfReport) -> FolioResult<()> {
    match report.merge_blockers().first() {
        Some(MergeBlocker::Encrypted) => Err(FolioError::merge(format!(
            "{label} source is encrypted ({})",
            MergeBlocker::Encrypted.as_str()
        ))),
        Some(MergeBlocker::NoPages) => Err(FolioError::merge(format!(
            "{label} source has no pages ({})",
            MergeBlocker::NoPages.as_str()
        ))),
        None => Ok(()),
    }
}

fn load_mergeable_unchecked(bytes: &[u8]) -> FolioResult<(LoDocument, PdfReport)> {
    let doc = LoDocument::load_mem(bytes)
        .map_err(|err| FolioError::merge(format!("PDF_PARSE_FAILED: {err}")))?;
    let report = PdfReport::of(&doc, bytes.len());
    Ok((doc, report))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Object as LoObject, Stream as LoStream, dictionary};

    pub(crate) fn make_single_page_pdf_bytes(text: &str) -> Vec<u8> {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT /F1 18 Tf 72 720 Td ({text}) Tj ET").into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, LoObject::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save");
        out
    }

    #[test]
    fn inspect_reads_version_and_page_count() {
        let bytes = make_single_page_pdf_bytes("HELLO");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 1);
        assert!(!report.encrypted);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert_eq!(report.pdf_version, "1.5");
        assert!(report.merge_blockers().is_empty());
    }

    #[test]
    fn malformed_data_is_a_merge_error() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert!(matches!(err, FolioError::Merge(ref m) if m.contains("PDF_PARSE_FAILED")));
    }

    #[test]
    fn missing_source_names_the_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_mergeable("toc", &dir.path().join("toc.pdf")).expect_err("missing");
        assert!(err.to_string().contains("toc source unreadable"));
    }

    #[test]
    fn encrypted_and_empty_sources_are_blocked() {
        let encrypted = PdfReport {
            pdf_version: "1.7".to_string(),
            page_count: 1,
            encrypted: true,
            file_size_bytes: 0,
        };
        assert_eq!(encrypted.merge_blockers(), vec![MergeBlocker::Encrypted]);
        let err = require_mergeable("title", &encrypted).expect_err("encrypted");
        assert!(err.to_string().contains("title source is encrypted"));

        let empty = PdfReport {
            page_count: 0,
            encrypted: false,
            ..encrypted
        };
        assert_eq!(empty.merge_blockers(), vec![MergeBlocker::NoPages]);
        let err = require_mergeable("content", &empty).expect_err("empty");
        assert!(err.to_string().contains("PDF_EMPTY_OR_NO_PAGES"));
    }

    #[test]
    fn path_and_bytes_agree() {
        let bytes = make_single_page_pdf_bytes("PATH");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("one.pdf");
        std::fs::write(&path, &bytes).expect("write");

        let from_path = inspect_pdf_path(&path).expect("inspect path");
        let (_, loaded) = load_mergeable("title", &path).expect("load");
        assert_eq!(from_path, inspect_pdf_bytes(&bytes).expect("inspect bytes"));
        assert_eq!(loaded.page_count, 1);
    }
}
