//! The run summary handed back to callers and printed by the CLI.

use crate::content::Heading;
use crate::error::FolioResult;
use crate::sections::SectionKind;
use crate::validate::ValidationIssue;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Passed,
    /// The attempt budget ran out. The best attempt was still written.
    Failed,
    Skipped,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Passed => "passed",
            ValidationOutcome::Failed => "failed",
            ValidationOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub section: SectionKind,
    pub page_count: usize,
    /// 1-based page of the section's first page in the final document.
    pub first_page: usize,
    pub byte_len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadingSummary {
    pub id: String,
    pub level: u8,
    pub text: String,
    pub page_number: Option<usize>,
}

impl From<&Heading> for HeadingSummary {
    fn from(heading: &Heading) -> Self {
        Self {
            id: heading.id.clone(),
            level: heading.level,
            text: heading.text.clone(),
            page_number: heading.page_number,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub output_path: PathBuf,
    pub source_path: Option<PathBuf>,
    pub page_count: usize,
    pub file_size_bytes: u64,
    pub sha256: String,
    pub outcome: ValidationOutcome,
    /// Attempt the output came from.
    pub selected_attempt: usize,
    pub attempts: usize,
    pub sections: Vec<SectionSummary>,
    pub headings: Vec<HeadingSummary>,
    pub issues: Vec<ValidationIssue>,
}

impl GenerationReport {
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    /// Heading id to final page, in document order.
    pub fn heading_pages(&self) -> Vec<(&str, Option<usize>)> {
        self.headings
            .iter()
            .map(|h| (h.id.as_str(), h.page_number))
            .collect()
    }

    pub fn to_json(&self) -> FolioResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| std::io::Error::other(err).into())
    }

    pub fn write_json(&self, path: &Path) -> FolioResult<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationType;

    fn report() -> GenerationReport {
        GenerationReport {
            output_path: PathBuf::from("out/report.pdf"),
            source_path: None,
            page_count: 4,
            file_size_bytes: 1024,
            sha256: sha256_hex(b"pdf"),
            outcome: ValidationOutcome::Passed,
            selected_attempt: 2,
            attempts: 2,
            sections: vec![SectionSummary {
                section: SectionKind::Toc,
                page_count: 1,
                first_page: 2,
                byte_len: 900,
            }],
            headings: vec![HeadingSummary::from(&Heading {
                page_number: Some(3),
                ..Heading::new(1, "Intro", "intro")
            })],
            issues: vec![
                ValidationIssue::warning(ValidationType::HeadingUnresolved, "missing", 1),
                ValidationIssue::new(
                    crate::validate::Severity::Error,
                    ValidationType::HeaderOverlap,
                    "overlap",
                    1,
                )
                .on_page(2),
            ],
        }
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let digest = sha256_hex(b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn json_uses_snake_case_tags() {
        let json = report().to_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["outcome"], "passed");
        assert_eq!(value["sections"][0]["section"], "toc");
        assert_eq!(value["issues"][1]["validation_type"], "header_overlap");
        assert_eq!(value["issues"][1]["page"], 2);
        assert_eq!(value["headings"][0]["page_number"], 3);
    }

    #[test]
    fn counts_split_errors_and_warnings() {
        let report = report();
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.heading_pages(), vec![("intro", Some(3))]);
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/report.json");
        report().write_json(&path).expect("write");
        assert!(std::fs::read_to_string(&path).expect("read").contains("\"sha256\""));
    }
}
