use brandfolio::{
    ContentInput, ContentNode, ContentTree, GenerationConfig, GenerationReport, Heading, Layer,
    LayoutAdjustmentPolicy, LayoutParams, Pt, SectionKind, Severity, ValidationIssue,
    ValidationOutcome, ValidationType, generate, generate_with_policy, scan_pdf_bytes,
};
use std::path::Path;

fn heading(level: u8, id: &str, text: &str) -> ContentNode {
    ContentNode::Heading {
        level,
        id: id.to_string(),
        text: text.to_string(),
    }
}

fn para(text: &str) -> ContentNode {
    ContentNode::Paragraph {
        text: text.to_string(),
        bold: false,
    }
}

/// Introduction and Scope on content page 1, Findings on content page 2.
fn sample_tree() -> ContentTree {
    ContentTree::new(vec![
        heading(1, "intro", "Introduction"),
        para("This assessment covers the external perimeter and two internal services."),
        heading(2, "scope", "Scope"),
        para("Hosts in the 10.0.0.0/16 range were in scope."),
        ContentNode::PageBreak,
        heading(1, "findings", "Findings"),
        ContentNode::List {
            ordered: false,
            items: vec!["Outdated TLS configuration".into(), "Verbose errors".into()],
        },
    ])
}

fn config_in(dir: &Path, name: &str) -> GenerationConfig {
    let mut config = GenerationConfig {
        output_path: dir.join(name),
        ..GenerationConfig::default()
    };
    config.branding.client_name = "Acme Corp".into();
    config.branding.company_name = "Northwind Advisory".into();
    config.branding.document_title = "Perimeter Review".into();
    config
}

fn pages(report: &GenerationReport) -> Vec<Option<usize>> {
    report.headings.iter().map(|h| h.page_number).collect()
}

fn count(report: &GenerationReport, kind: ValidationType) -> usize {
    report
        .issues
        .iter()
        .filter(|issue| issue.validation_type == kind)
        .count()
}

#[test]
fn headings_land_after_title_and_toc() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.validation.enabled = false;
    let tree = sample_tree();

    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    assert_eq!(report.outcome, ValidationOutcome::Skipped);
    assert_eq!(report.attempts, 1);
    assert_eq!(pages(&report), vec![Some(3), Some(3), Some(4)]);
    assert_eq!(report.page_count, 4);

    let kinds: Vec<SectionKind> = report.sections.iter().map(|s| s.section).collect();
    assert_eq!(kinds, vec![SectionKind::Title, SectionKind::Toc, SectionKind::Content]);
    let sum: usize = report.sections.iter().map(|s| s.page_count).sum();
    assert_eq!(sum, report.page_count);
    let front = report.sections[0].page_count + report.sections[1].page_count;
    for heading in &report.headings {
        assert!(heading.page_number.expect("resolved") > front);
    }

    let bytes = std::fs::read(&config.output_path).expect("output");
    assert_eq!(bytes.len() as u64, report.file_size_bytes);
    assert_eq!(report.sha256.len(), 64);
}

#[test]
fn chrome_is_absent_on_the_title_and_numbered_elsewhere() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.validation.enabled = false;
    let tree = sample_tree();
    let report = generate(&config, &tree, &tree.headings()).expect("generate");

    let bytes = std::fs::read(&config.output_path).expect("output");
    let scanned = scan_pdf_bytes(&bytes).expect("scan");
    assert_eq!(scanned.len(), report.page_count);
    assert!(scanned[0].layer_text(Layer::Header).is_empty());
    assert!(scanned[0].layer_text(Layer::Footer).is_empty());
    assert!(scanned[0].body_lines().contains(&"Perimeter Review".to_string()));
    for page in &scanned[1..] {
        assert_eq!(
            page.layer_text(Layer::Footer),
            format!("Page {} of {}", page.number, report.page_count)
        );
        assert!(page.layer_text(Layer::Header).contains("Perimeter Review"));
    }
    // TOC page lists the final numbers.
    let toc = scanned[1].body_lines().join("\n");
    assert!(toc.contains("Introduction"));
    assert!(toc.contains("Findings"));
    // Content starts where the report says it does.
    assert!(scanned[2].body_lines().contains(&"Introduction".to_string()));
    assert!(scanned[3].body_lines().contains(&"Findings".to_string()));
}

#[test]
fn missing_heading_is_one_warning_and_stays_unresolved() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.validation.enabled = false;
    let tree = sample_tree();
    let mut headings = tree.headings();
    headings.push(Heading::new(2, "Appendix Z", "ghost"));

    let report = generate(&config, &tree, &headings).expect("generate");
    assert_eq!(pages(&report), vec![Some(3), Some(3), Some(4), None]);
    let unresolved: Vec<&ValidationIssue> = report
        .issues
        .iter()
        .filter(|issue| issue.validation_type == ValidationType::HeadingUnresolved)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].severity, Severity::Warning);
    assert!(unresolved[0].message.contains("ghost"));
    assert_eq!(report.error_count(), 0);
}

#[test]
fn default_layout_passes_validation_first_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), "out.pdf");
    let tree = sample_tree();
    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    assert_eq!(report.outcome, ValidationOutcome::Passed);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.error_count(), 0);
}

#[test]
fn header_overlap_is_fixed_by_a_retry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.layout.margins.top = 40.0;
    config.validation.margin_step = 40.0;
    let tree = sample_tree();

    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    assert_eq!(report.outcome, ValidationOutcome::Passed);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.selected_attempt, 2);
    assert!(report.issues.iter().any(|issue| {
        issue.validation_type == ValidationType::HeaderOverlap
            && issue.page == Some(2)
            && issue.attempt == 1
            && issue.is_error()
    }));
    assert!(
        report
            .issues
            .iter()
            .filter(|issue| issue.attempt == 2)
            .all(|issue| !issue.is_error())
    );
    assert!(config.output_path.exists());
}

#[test]
fn unresolved_heading_is_reported_once_across_retries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.layout.margins.top = 40.0;
    config.validation.margin_step = 40.0;
    let tree = sample_tree();
    let mut headings = tree.headings();
    headings.push(Heading::new(2, "Appendix Z", "ghost"));

    let report = generate(&config, &tree, &headings).expect("generate");
    assert_eq!(report.outcome, ValidationOutcome::Passed);
    assert_eq!(report.attempts, 2);
    let unresolved: Vec<&ValidationIssue> = report
        .issues
        .iter()
        .filter(|issue| issue.validation_type == ValidationType::HeadingUnresolved)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].subject.as_deref(), Some("ghost"));
    assert_eq!(unresolved[0].page, None);
    assert_eq!(unresolved[0].attempt, 1);
    assert_eq!(pages(&report).last(), Some(&None));
}

/// Nudges the top margin by one point each time, never enough to clear the
/// header.
struct CreepingPolicy;

impl LayoutAdjustmentPolicy for CreepingPolicy {
    fn adjust(&self, params: &LayoutParams, _issues: &[ValidationIssue]) -> Option<LayoutParams> {
        let mut next = params.clone();
        next.margins.top += Pt::from_f32(1.0);
        Some(next)
    }
}

#[test]
fn attempts_never_exceed_the_budget() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "nested/dir/out.pdf");
    config.layout.margins.top = 30.0;
    config.validation.max_attempts = 3;
    let tree = sample_tree();

    let report =
        generate_with_policy(&config, &tree, &tree.headings(), &CreepingPolicy).expect("generate");
    assert_eq!(report.outcome, ValidationOutcome::Failed);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.selected_attempt, 3);
    assert!(count(&report, ValidationType::HeaderOverlap) >= 3);
    let max_attempt = report.issues.iter().map(|i| i.attempt).max().unwrap_or(0);
    assert!(max_attempt <= 3);
    assert!(config.output_path.exists());
}

#[test]
fn policy_without_an_answer_stops_early() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.layout.margins.top = 40.0;
    config.validation.margin_step = 0.0;
    let tree = sample_tree();

    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    assert_eq!(report.outcome, ValidationOutcome::Failed);
    assert_eq!(report.attempts, 1);
    assert!(count(&report, ValidationType::HeaderOverlap) >= 1);
}

#[test]
fn identical_inputs_give_identical_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tree = sample_tree();
    let first = generate(&config_in(dir.path(), "a.pdf"), &tree, &tree.headings()).expect("a");
    let second = generate(&config_in(dir.path(), "b.pdf"), &tree, &tree.headings()).expect("b");
    assert_eq!(first.page_count, second.page_count);
    assert_eq!(first.heading_pages(), second.heading_pages());
    assert_eq!(first.sha256, second.sha256);
}

#[test]
fn long_documents_grow_the_toc_and_shift_every_heading() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "long.pdf");
    config.validation.enabled = false;
    let mut nodes = Vec::new();
    for i in 0..70 {
        nodes.push(heading(1, &format!("s{i}"), &format!("Section {i}")));
        nodes.push(para("Short body."));
        nodes.push(ContentNode::PageBreak);
    }
    nodes.pop();
    let tree = ContentTree::new(nodes);

    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    let toc_pages = report.sections[1].page_count;
    assert!(toc_pages >= 2);
    for (index, page) in pages(&report).into_iter().enumerate() {
        assert_eq!(page, Some(1 + toc_pages + index + 1));
    }
    assert_eq!(report.page_count, 1 + toc_pages + 70);
}

#[test]
fn cli_content_json_round_trips_through_the_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = r#"{
        "nodes": [
            {"type": "heading", "level": 1, "id": "a", "text": "Alpha"},
            {"type": "paragraph", "text": "Body."},
            {"type": "rule"},
            {"type": "quote", "text": "Quoted."},
            {"type": "code", "text": "fn main() {}"}
        ]
    }"#;
    let (tree, headings) = ContentInput::from_json_str(raw).expect("content");
    let mut config = config_in(dir.path(), "out.pdf");
    config.validation.enabled = false;
    let report = generate(&config, &tree, &headings).expect("generate");
    assert_eq!(report.heading_pages(), vec![("a", Some(3))]);
    let json = report.to_json().expect("json");
    assert!(json.contains("\"outcome\": \"skipped\""));
}

#[test]
fn logos_are_embedded_when_present() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logo = dir.path().join("logo.png");
    image::RgbImage::from_pixel(400, 120, image::Rgb([20, 60, 160]))
        .save(&logo)
        .expect("save logo");
    let mut config = config_in(dir.path(), "out.pdf");
    config.branding.require_logos = true;
    config.logos.title_logo = Some(logo.clone());
    config.logos.header_logo = Some(logo);
    let tree = sample_tree();

    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    assert_eq!(count(&report, ValidationType::LogoUnavailable), 0);
    let doc = lopdf::Document::load(&config.output_path).expect("load");
    let images = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .is_ok_and(|name| name == b"Image")
        })
        .count();
    assert!(images >= 1);
}

#[test]
fn unreadable_optional_logo_is_a_warning() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path(), "out.pdf");
    config.validation.enabled = false;
    config.logos.header_logo = Some(dir.path().join("missing.png"));
    let tree = sample_tree();

    let report = generate(&config, &tree, &tree.headings()).expect("generate");
    assert_eq!(count(&report, ValidationType::LogoUnavailable), 1);
    let logo = report
        .issues
        .iter()
        .find(|issue| issue.validation_type == ValidationType::LogoUnavailable)
        .expect("logo warning");
    assert_eq!(logo.subject.as_deref(), Some("header"));
    assert_eq!(report.error_count(), 0);
}
