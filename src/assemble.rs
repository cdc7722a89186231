//! Structural concatenation of the title, TOC and content artifacts.
//!
//! Page objects and their content streams are imported as-is; nothing is
//! re-rendered. After the page tree is rebuilt the assembler adds TOC link
//! annotations, an outline nested by heading level and document info.

use crate::content::Heading;
use crate::engine::RenderArtifact;
use crate::error::{FolioError, FolioResult};
use crate::pdfinspect::load_mergeable;
use crate::scan::page_size_for_id;
use crate::types::Rect;
use lopdf::{
    Dictionary as LoDictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId,
    StringFormat, dictionary,
};
use std::path::{Path, PathBuf};

/// A clickable TOC line: its rectangle (top-left coordinates) on a page
/// local to the TOC section, and the heading it jumps to.
#[derive(Debug, Clone, PartialEq)]
pub struct TocLink {
    pub toc_page: usize,
    pub heading_id: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: Option<String>,
}

pub struct AssemblyInput<'a> {
    pub title: &'a RenderArtifact,
    pub toc: &'a RenderArtifact,
    pub content: &'a RenderArtifact,
    /// Headings with final page numbers already applied.
    pub headings: &'a [Heading],
    pub toc_links: &'a [TocLink],
    pub info: DocumentInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub path: PathBuf,
    pub page_count: usize,
    pub byte_len: usize,
    pub link_count: usize,
    pub outline_count: usize,
}

fn lopdf_err(err: lopdf::Error) -> FolioError {
    FolioError::merge(format!("pdf compose error: {err}"))
}

fn import_document_objects(dst: &mut LoDocument, mut src: LoDocument) -> Vec<LoObjectId> {
    let start_id = dst.max_id + 1;
    src.renumber_objects_with(start_id);
    let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    page_ids
}

fn page_box(doc: &LoDocument, page_id: LoObjectId) -> Vec<LoObject> {
    let size = page_size_for_id(doc, page_id).unwrap_or_else(|_| crate::types::Size::letter());
    vec![
        0.into(),
        0.into(),
        size.width.to_f32().into(),
        size.height.to_f32().into(),
    ]
}

/// Literal for ASCII text, UTF-16BE with a byte order mark otherwise.
fn text_string(text: &str) -> LoObject {
    if text.is_ascii() {
        return LoObject::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    LoObject::String(bytes, StringFormat::Hexadecimal)
}

fn destination(page_id: LoObjectId) -> LoObject {
    LoObject::Array(vec![
        page_id.into(),
        LoObject::Name(b"XYZ".to_vec()),
        LoObject::Null,
        LoObject::Null,
        LoObject::Null,
    ])
}

pub fn assemble(input: &AssemblyInput<'_>, out_path: &Path) -> FolioResult<AssembledDocument> {
    let mut composed = LoDocument::with_version("1.7");
    let mut ranges: Vec<Vec<LoObjectId>> = Vec::with_capacity(3);
    for artifact in [input.title, input.toc, input.content] {
        let label = artifact.section.as_str();
        let (src, report) = load_mergeable(label, &artifact.path)?;
        if report.page_count != artifact.page_count {
            return Err(FolioError::merge(format!(
                "{label} source has {} pages, expected {}",
                report.page_count, artifact.page_count
            )));
        }
        ranges.push(import_document_objects(&mut composed, src));
    }
    let all_pages: Vec<LoObjectId> = ranges.iter().flatten().copied().collect();
    let expected = input.title.page_count + input.toc.page_count + input.content.page_count;
    if all_pages.len() != expected {
        return Err(FolioError::merge(format!(
            "merged page count {} does not match section total {expected}",
            all_pages.len()
        )));
    }

    let pages_id = composed.new_object_id();
    for page_id in &all_pages {
        let media_box = page_box(&composed, *page_id);
        let page = composed
            .get_object_mut(*page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        if !page.has(b"MediaBox") {
            page.set("MediaBox", LoObject::Array(media_box));
        }
        page.set("Parent", pages_id);
    }

    let toc_offset = input.title.page_count;
    let link_count = add_toc_links(&mut composed, input, &ranges[1], &all_pages, toc_offset)?;

    let kids: Vec<LoObject> = all_pages.iter().map(|id| LoObject::Reference(*id)).collect();
    composed.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => all_pages.len() as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    let outline_count = match build_outline(&mut composed, input.headings, &all_pages) {
        Some((outlines_id, count)) => {
            catalog.set("Outlines", outlines_id);
            catalog.set("PageMode", "UseOutlines");
            count
        }
        None => 0,
    };
    let catalog_id = composed.add_object(catalog);
    composed.trailer.set("Root", catalog_id);

    let mut info = dictionary! {
        "Title" => text_string(&input.info.title),
        "Creator" => LoObject::string_literal("brandfolio"),
        "Producer" => LoObject::string_literal("brandfolio"),
    };
    if !input.info.author.is_empty() {
        info.set("Author", text_string(&input.info.author));
    }
    if let Some(subject) = input.info.subject.as_deref() {
        info.set("Subject", text_string(subject));
    }
    let info_id = composed.add_object(info);
    composed.trailer.set("Info", info_id);

    composed.prune_objects();
    composed.renumber_objects();
    composed.compress();
    let mut bytes = Vec::new();
    composed.save_to(&mut bytes)?;
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, &bytes)?;

    tracing::debug!(
        pages = all_pages.len(),
        links = link_count,
        outline = outline_count,
        bytes = bytes.len(),
        "assembled document"
    );

    Ok(AssembledDocument {
        path: out_path.to_path_buf(),
        page_count: all_pages.len(),
        byte_len: bytes.len(),
        link_count,
        outline_count,
    })
}

fn add_toc_links(
    composed: &mut LoDocument,
    input: &AssemblyInput<'_>,
    toc_pages: &[LoObjectId],
    all_pages: &[LoObjectId],
    toc_offset: usize,
) -> FolioResult<usize> {
    let mut added = 0;
    for (index, toc_page_id) in toc_pages.iter().enumerate() {
        let local = index + 1;
        let page_height = page_size_for_id(composed, *toc_page_id)
            .map_err(lopdf_err)?
            .height
            .to_f32();
        let mut annots: Vec<LoObject> = Vec::new();
        for link in input.toc_links.iter().filter(|l| l.toc_page == local) {
            let Some(target) = input
                .headings
                .iter()
                .find(|h| h.id == link.heading_id)
                .and_then(|h| h.page_number)
                .and_then(|page| all_pages.get(page.wrapping_sub(1)))
            else {
                continue;
            };
            let x0 = link.rect.x.to_f32();
            let x1 = link.rect.right().to_f32();
            let y1 = page_height - link.rect.y.to_f32();
            let y0 = page_height - link.rect.bottom().to_f32();
            let annot_id = composed.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![x0.into(), y0.into(), x1.into(), y1.into()],
                "Border" => vec![0.into(), 0.into(), 0.into()],
                "Dest" => destination(*target),
            });
            annots.push(LoObject::Reference(annot_id));
        }
        if annots.is_empty() {
            continue;
        }
        added += annots.len();
        tracing::trace!(page = toc_offset + local, links = annots.len(), "toc links");
        let page = composed
            .get_object_mut(*toc_page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page.set("Annots", annots);
    }
    Ok(added)
}

struct OutlineNode {
    title: String,
    page_id: LoObjectId,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Builds the outline tree from resolved headings. Returns the outline root
/// and the number of items, or `None` when no heading has a page.
fn build_outline(
    composed: &mut LoDocument,
    headings: &[Heading],
    all_pages: &[LoObjectId],
) -> Option<(LoObjectId, usize)> {
    let mut nodes: Vec<OutlineNode> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    // (level, node index) of the open ancestors.
    let mut stack: Vec<(u8, usize)> = Vec::new();
    for heading in headings {
        let Some(page_id) = heading
            .page_number
            .and_then(|page| all_pages.get(page.wrapping_sub(1)))
        else {
            continue;
        };
        while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
            stack.pop();
        }
        let parent = stack.last().map(|(_, index)| *index);
        let index = nodes.len();
        nodes.push(OutlineNode {
            title: heading.text.clone(),
            page_id: *page_id,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => nodes[p].children.push(index),
            None => roots.push(index),
        }
        stack.push((heading.level, index));
    }
    if nodes.is_empty() {
        return None;
    }

    let root_id = composed.new_object_id();
    let ids: Vec<LoObjectId> = nodes.iter().map(|_| composed.new_object_id()).collect();

    fn descendants(nodes: &[OutlineNode], index: usize) -> i64 {
        nodes[index]
            .children
            .iter()
            .map(|child| 1 + descendants(nodes, *child))
            .sum()
    }

    let mut items: Vec<(LoObjectId, LoDictionary)> = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => text_string(&node.title),
            "Parent" => node.parent.map(|p| ids[p]).unwrap_or(root_id),
            "Dest" => destination(node.page_id),
        };
        let siblings: &[usize] = match node.parent {
            Some(p) => &nodes[p].children,
            None => &roots,
        };
        if let Some(pos) = siblings.iter().position(|s| *s == index) {
            if pos > 0 {
                item.set("Prev", ids[siblings[pos - 1]]);
            }
            if let Some(next) = siblings.get(pos + 1) {
                item.set("Next", ids[*next]);
            }
        }
        if let (Some(first), Some(last)) = (node.children.first(), node.children.last()) {
            item.set("First", ids[*first]);
            item.set("Last", ids[*last]);
            item.set("Count", descendants(&nodes, index));
        }
        items.push((ids[index], item));
    }
    for (id, item) in items {
        composed.objects.insert(id, LoObject::Dictionary(item));
    }

    let (first, last) = (roots.first()?, roots.last()?);
    composed.objects.insert(
        root_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => ids[*first],
            "Last" => ids[*last],
            "Count" => nodes.len() as i64,
        }),
    );
    Some((root_id, nodes.len()))
}
