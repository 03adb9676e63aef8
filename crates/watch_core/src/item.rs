use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// A listing record after normalization.
///
/// `identity` is never empty; see [`crate::normalize`] for how it is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteItem {
    pub identity: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub tags: BTreeSet<String>,
    pub score: Option<f64>,
    pub link: Option<String>,
}

impl RemoteItem {
    /// Minimal item with only an identity; handy for building fixtures.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: String::new(),
            created_at: None,
            tags: BTreeSet::new(),
            score: None,
            link: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .filter_map(|t| crate::normalize_tag(t.as_ref()))
            .collect();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
