use chrono::{DateTime, Utc};
use watch_core::{normalize, FieldMap, PageVerdict, Paginator, RemoteItem, StopReason};
use watch_logging::{run_label, set_run_label, watch_debug, watch_warn};

use crate::PageSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub max_pages: u32,
    pub cutoff: Option<DateTime<Utc>>,
}

/// Normalized items of one run, newest to oldest.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPool {
    pub items: Vec<RemoteItem>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}

/// Walk the listing page by page until the paginator stops.
///
/// A failed page truncates the pool instead of failing the run. The caller's
/// run label is restored after every page, since the task may resume on
/// another worker thread.
pub async fn collect_pool(source: &dyn PageSource, fields: &FieldMap, plan: FetchPlan) -> FetchPool {
    let label = run_label();
    let mut paginator = Paginator::new(plan.max_pages, plan.cutoff);
    let mut items = Vec::new();

    while let Some(index) = paginator.next_page() {
        let fetched = source.fetch_page(index).await;
        set_run_label(label.clone());
        let records = match fetched {
            Ok(records) => records,
            Err(err) => {
                watch_warn!("Stopping pagination, keeping {} items: {}", items.len(), err);
                paginator.record_failure();
                break;
            }
        };
        let page: Vec<RemoteItem> = records
            .iter()
            .map(|record| normalize(record, fields))
            .collect();
        let verdict = paginator.record_page(&page);
        watch_debug!("page={} records={} verdict={:?}", index, page.len(), verdict);
        items.extend(page);
        if let PageVerdict::Stop(_) = verdict {
            break;
        }
    }

    FetchPool {
        items,
        pages_fetched: paginator.pages_fetched(),
        stop_reason: paginator.stop_reason().unwrap_or(StopReason::PageCap),
    }
}
