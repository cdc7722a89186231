use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub render_ms: f64,
    pub command_count: usize,
    pub flowable_count: usize,
}

/// Layout statistics for one section build.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_render_ms: f64,
    /// Page or frame breaks keyed by reason (`flowable_split`,
    /// `frame_overflow`, `break_before_page`, ...).
    pub breaks: BTreeMap<String, usize>,
}

impl DocumentMetrics {
    pub fn record_break(&mut self, reason: &str) {
        *self.breaks.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn page_breaks(&self) -> usize {
        self.breaks.values().sum()
    }

    pub fn breaks_for(&self, reason: &str) -> usize {
        self.breaks.get(reason).copied().unwrap_or(0)
    }

    pub fn busiest_page(&self) -> Option<&PageMetrics> {
        self.pages.iter().max_by_key(|page| page.command_count)
    }
}
