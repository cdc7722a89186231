/// What a page callback knows about the page being started.
#[derive(Debug, Clone)]
pub struct DocContext {
    pub section: &'static str,
    /// 1-based, local to the section.
    pub page_number: usize,
    pub template_name: String,
}

impl DocContext {
    pub fn new(section: &'static str, page_number: usize, template_name: impl Into<String>) -> Self {
        Self {
            section,
            page_number,
            template_name: template_name.into(),
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.page_number == 1
    }
}
