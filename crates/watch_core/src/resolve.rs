use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{DeliveredIds, RemoteItem, SyncState};

/// Run mode, fixed at run start by whether a watermark exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Seed,
    Delta { watermark: DateTime<Utc> },
}

impl RunMode {
    pub fn from_state(state: &SyncState) -> Self {
        match state.watermark {
            Some(watermark) => RunMode::Delta { watermark },
            None => RunMode::Seed,
        }
    }

    /// Pagination cutoff for this mode.
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        match self {
            RunMode::Seed => None,
            RunMode::Delta { watermark } => Some(*watermark),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    New,
    Preview,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub mode: RunMode,
    pub kind: BatchKind,
    /// Empty only when the filtered pool was empty; the caller then pulls an
    /// unfiltered preview.
    pub batch: Vec<RemoteItem>,
    pub next_state: SyncState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaResolver {
    preview_count: usize,
}

impl DeltaResolver {
    pub fn new(preview_count: usize) -> Self {
        Self { preview_count }
    }

    /// Resolve one run.
    ///
    /// `pool` is everything fetched this run (drives the watermark), `filtered`
    /// is the subset that passed the filter pipeline (drives the batch). Both
    /// are newest-first.
    pub fn resolve(
        &self,
        state: &SyncState,
        pool: &[RemoteItem],
        filtered: &[RemoteItem],
        now: DateTime<Utc>,
    ) -> Resolution {
        let mode = RunMode::from_state(state);
        let mut next_state = state.clone();
        next_state.watermark = advance_watermark(state.watermark, pool, now);

        let (kind, batch) = match mode {
            RunMode::Seed => {
                let preview = select_preview(filtered, self.preview_count);
                record_all(&mut next_state.delivered_ids, &preview);
                (BatchKind::Preview, preview)
            }
            RunMode::Delta { watermark } => {
                let fresh = new_items(filtered, watermark, &state.delivered_ids);
                if fresh.is_empty() {
                    (
                        BatchKind::Preview,
                        select_preview(filtered, self.preview_count),
                    )
                } else {
                    record_all(&mut next_state.delivered_ids, &fresh);
                    (BatchKind::New, fresh)
                }
            }
        };

        Resolution {
            mode,
            kind,
            batch,
            next_state,
        }
    }
}

/// Delta membership test, before in-run deduplication.
pub fn is_new(item: &RemoteItem, watermark: DateTime<Utc>, delivered: &DeliveredIds) -> bool {
    if delivered.contains(&item.identity) {
        return false;
    }
    match item.created_at {
        Some(created_at) => created_at > watermark,
        None => true,
    }
}

/// Up to `count` most recent items, one per identity. Items without a
/// timestamp sort after timestamped ones; ties keep pool order.
pub fn select_preview(items: &[RemoteItem], count: usize) -> Vec<RemoteItem> {
    let mut ordered: Vec<&RemoteItem> = items.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|item| seen.insert(item.identity.as_str()))
        .take(count)
        .cloned()
        .collect()
}

/// `max(previous, min(newest observed, now))`. Unchanged when the pool has
/// no timestamps.
pub fn advance_watermark(
    previous: Option<DateTime<Utc>>,
    pool: &[RemoteItem],
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let observed = pool
        .iter()
        .filter_map(|item| item.created_at)
        .max()
        .map(|newest| newest.min(now));
    match (previous, observed) {
        (Some(previous), Some(observed)) => Some(previous.max(observed)),
        (previous, observed) => previous.or(observed),
    }
}

fn new_items(
    filtered: &[RemoteItem],
    watermark: DateTime<Utc>,
    delivered: &DeliveredIds,
) -> Vec<RemoteItem> {
    let mut seen = HashSet::new();
    filtered
        .iter()
        .filter(|item| is_new(item, watermark, delivered))
        .filter(|item| seen.insert(item.identity.as_str()))
        .cloned()
        .collect()
}

fn record_all(delivered: &mut DeliveredIds, items: &[RemoteItem]) {
    for item in items {
        delivered.record(&item.identity);
    }
}
