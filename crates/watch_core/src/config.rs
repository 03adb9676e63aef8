use crate::{FilterPipeline, RunMode, ScoreFilter, TagFilter, DEFAULT_DELIVERED_CAPACITY};

/// Per-watch settings, built once at process start.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// Name of the watched configuration; used in logs and digest labels.
    pub label: String,
    pub tags: Vec<String>,
    /// Zero disables the score filter.
    pub min_score: f64,
    pub seed_max_pages: u32,
    pub delta_max_pages: u32,
    /// Page budget of the unfiltered last-resort preview pull.
    pub fallback_max_pages: u32,
    pub preview_count: usize,
    pub delivered_capacity: usize,
    /// Everything runs except dispatch.
    pub dry_run: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            label: "watch".to_string(),
            tags: Vec::new(),
            min_score: 0.0,
            seed_max_pages: 50,
            delta_max_pages: 50,
            fallback_max_pages: 1,
            preview_count: 5,
            delivered_capacity: DEFAULT_DELIVERED_CAPACITY,
            dry_run: false,
        }
    }
}

impl WatchConfig {
    pub fn filters(&self) -> FilterPipeline {
        FilterPipeline::new(TagFilter::new(&self.tags), ScoreFilter::new(self.min_score))
    }

    pub fn max_pages(&self, mode: &RunMode) -> u32 {
        match mode {
            RunMode::Seed => self.seed_max_pages,
            RunMode::Delta { .. } => self.delta_max_pages,
        }
    }
}
