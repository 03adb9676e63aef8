use std::collections::BTreeSet;

use crate::RemoteItem;

/// Trim and lowercase a tag; empty tags are dropped.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Keeps items sharing at least one tag with the configured set.
/// An empty set keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeSet<String>,
}

impl TagFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .filter_map(|t| normalize_tag(t.as_ref()))
                .collect(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn passes(&self, item: &RemoteItem) -> bool {
        self.is_disabled() || !self.tags.is_disjoint(&item.tags)
    }
}

/// Keeps items whose score is present and at least `min`.
/// A minimum of zero or less disables the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreFilter {
    min: f64,
}

impl ScoreFilter {
    pub fn new(min: f64) -> Self {
        Self { min }
    }

    pub fn is_disabled(&self) -> bool {
        self.min <= 0.0
    }

    pub fn passes(&self, item: &RemoteItem) -> bool {
        self.is_disabled() || item.score.is_some_and(|score| score >= self.min)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPipeline {
    pub tag: TagFilter,
    pub score: ScoreFilter,
}

impl FilterPipeline {
    pub fn new(tag: TagFilter, score: ScoreFilter) -> Self {
        Self { tag, score }
    }

    pub fn passes(&self, item: &RemoteItem) -> bool {
        self.tag.passes(item) && self.score.passes(item)
    }

    /// Keep-set of both predicates, order preserved.
    pub fn apply<'a, I>(&self, items: I) -> Vec<RemoteItem>
    where
        I: IntoIterator<Item = &'a RemoteItem>,
    {
        items
            .into_iter()
            .filter(|item| self.passes(item))
            .cloned()
            .collect()
    }
}
