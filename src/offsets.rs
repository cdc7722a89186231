use crate::content::Heading;
use serde::Serialize;

/// Pages that precede the content section in the final document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageOffsets {
    pub title_pages: usize,
    pub toc_pages: usize,
}

impl PageOffsets {
    pub fn new(title_pages: usize, toc_pages: usize) -> Self {
        Self {
            title_pages,
            toc_pages,
        }
    }

    pub fn front_matter(&self) -> usize {
        self.title_pages + self.toc_pages
    }

    pub fn final_page(&self, local: usize) -> usize {
        self.front_matter() + local
    }

    /// Writes final page numbers into `headings` from their content-local
    /// pages, index for index. Unresolved headings stay `None`.
    pub fn apply(&self, headings: &mut [Heading], local_pages: &[Option<usize>]) {
        for (heading, local) in headings.iter_mut().zip(local_pages) {
            heading.page_number = local.map(|page| self.final_page(page));
        }
    }
}
