use chrono::{DateTime, Utc};

use crate::RemoteItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned an empty page.
    Exhausted,
    /// The oldest timestamped item on the last page predates the cutoff.
    CutoffReached,
    /// The page budget for this call was used up.
    PageCap,
    /// A page request failed; the pool holds what came before it.
    PageFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVerdict {
    Continue,
    Stop(StopReason),
}

/// Stopping conditions of a newest-first page walk.
///
/// Pages are requested in increasing index order starting at 0. The caller
/// asks [`Paginator::next_page`] for an index, fetches it, then reports the
/// normalized page with [`Paginator::record_page`] (items of that page are
/// always kept) or a failure with [`Paginator::record_failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    next_index: u32,
    pages_remaining: u32,
    cutoff: Option<DateTime<Utc>>,
    stopped: Option<StopReason>,
}

impl Paginator {
    pub fn new(max_pages: u32, cutoff: Option<DateTime<Utc>>) -> Self {
        Self {
            next_index: 0,
            pages_remaining: max_pages,
            cutoff,
            stopped: None,
        }
    }

    /// Index of the next page to request, or `None` once stopped.
    pub fn next_page(&mut self) -> Option<u32> {
        if self.stopped.is_some() {
            return None;
        }
        if self.pages_remaining == 0 {
            self.stopped = Some(StopReason::PageCap);
            return None;
        }
        Some(self.next_index)
    }

    pub fn record_page(&mut self, items: &[RemoteItem]) -> PageVerdict {
        if items.is_empty() {
            return self.stop(StopReason::Exhausted);
        }
        self.next_index += 1;
        self.pages_remaining = self.pages_remaining.saturating_sub(1);

        if let Some(cutoff) = self.cutoff {
            let oldest = items.iter().rev().find_map(|item| item.created_at);
            if oldest.is_some_and(|oldest| oldest < cutoff) {
                return self.stop(StopReason::CutoffReached);
            }
        }
        if self.pages_remaining == 0 {
            return self.stop(StopReason::PageCap);
        }
        PageVerdict::Continue
    }

    pub fn record_failure(&mut self) -> StopReason {
        self.stopped = Some(StopReason::PageFailed);
        StopReason::PageFailed
    }

    pub fn pages_fetched(&self) -> u32 {
        self.next_index
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    fn stop(&mut self, reason: StopReason) -> PageVerdict {
        self.stopped = Some(reason);
        PageVerdict::Stop(reason)
    }
}
