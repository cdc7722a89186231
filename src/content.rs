//! Styled content tree and heading records handed to the pipeline by the
//! upstream markup transform.

use crate::error::{FolioError, FolioResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    Heading {
        level: u8,
        id: String,
        text: String,
    },
    Paragraph {
        text: String,
        #[serde(default)]
        bold: bool,
    },
    List {
        #[serde(default)]
        ordered: bool,
        items: Vec<String>,
    },
    Code {
        text: String,
    },
    Quote {
        text: String,
    },
    Image {
        path: PathBuf,
        #[serde(default)]
        alt: String,
        /// Display width in points; defaults to the natural size capped at
        /// the frame width.
        #[serde(default)]
        width: Option<f32>,
    },
    Rule,
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentTree {
    pub nodes: Vec<ContentNode>,
}

impl ContentTree {
    pub fn new(nodes: Vec<ContentNode>) -> Self {
        Self { nodes }
    }

    /// Heading records in document order, as the upstream transform would
    /// extract them.
    pub fn headings(&self) -> Vec<Heading> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                ContentNode::Heading { level, id, text } => {
                    Some(Heading::new(*level, text.clone(), id.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
    #[serde(default)]
    pub page_number: Option<usize>,
}

impl Heading {
    pub fn new(level: u8, text: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            id: id.into(),
            page_number: None,
        }
    }
}

pub fn validate_headings(headings: &[Heading]) -> FolioResult<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(headings.len());
    for heading in headings {
        if heading.id.trim().is_empty() {
            return Err(FolioError::invalid(format!(
                "heading \"{}\" has an empty id",
                heading.text
            )));
        }
        if !(1..=6).contains(&heading.level) {
            return Err(FolioError::invalid(format!(
                "heading {} has level {} outside 1..=6",
                heading.id, heading.level
            )));
        }
        if !seen.insert(heading.id.as_str()) {
            return Err(FolioError::invalid(format!(
                "duplicate heading id: {}",
                heading.id
            )));
        }
    }
    Ok(())
}

/// On-disk input for the CLI: the content tree plus, optionally, the heading
/// list. Missing headings are derived from the tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentInput {
    pub nodes: Vec<ContentNode>,
    #[serde(default)]
    pub headings: Option<Vec<Heading>>,
}

impl ContentInput {
    pub fn from_json_path(path: &Path) -> FolioResult<(ContentTree, Vec<Heading>)> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> FolioResult<(ContentTree, Vec<Heading>)> {
        let input: ContentInput = serde_json::from_str(raw)
            .map_err(|err| FolioError::invalid(format!("content json: {err}")))?;
        let tree = ContentTree::new(input.nodes);
        let headings = input.headings.unwrap_or_else(|| tree.headings());
        validate_headings(&headings)?;
        Ok((tree, headings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_are_extracted_in_document_order() {
        let tree = ContentTree::new(vec![
            ContentNode::Heading {
                level: 1,
                id: "intro".into(),
                text: "Introduction".into(),
            },
            ContentNode::Paragraph {
                text: "Body".into(),
                bold: false,
            },
            ContentNode::Heading {
                level: 2,
                id: "scope".into(),
                text: "Scope".into(),
            },
        ]);
        let headings = tree.headings();
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].id, "intro");
        assert_eq!(headings[1].level, 2);
        assert!(headings.iter().all(|h| h.page_number.is_none()));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let headings = vec![Heading::new(1, "A", "same"), Heading::new(2, "B", "same")];
        let err = validate_headings(&headings).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate heading id"));
    }

    #[test]
    fn out_of_range_levels_are_rejected() {
        assert!(validate_headings(&[Heading::new(0, "A", "a")]).is_err());
        assert!(validate_headings(&[Heading::new(7, "A", "a")]).is_err());
        assert!(validate_headings(&[Heading::new(6, "A", "a")]).is_ok());
    }

    #[test]
    fn content_json_derives_headings_when_absent() {
        let (tree, headings) = ContentInput::from_json_str(
            r#"{"nodes":[
                {"type":"heading","level":1,"id":"h1","text":"Overview"},
                {"type":"paragraph","text":"Hello"},
                {"type":"list","ordered":true,"items":["a","b"]},
                {"type":"page_break"}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(headings, vec![Heading::new(1, "Overview", "h1")]);
    }
}
