use std::sync::Arc;

use chrono::{DateTime, Utc};
use watch_core::{
    select_preview, BatchKind, DeltaResolver, FieldMap, RemoteItem, RunMode, StateStore,
    StopReason, WatchConfig,
};
use watch_logging::{set_run_label, watch_error, watch_info, watch_warn};

use crate::digest::render_digest;
use crate::pool::{collect_pool, FetchPlan};
use crate::{DigestDispatcher, PageSource};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    SkippedDryRun,
    Failed(String),
}

/// What one run observed and did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub mode: RunMode,
    pub kind: BatchKind,
    pub batch: Vec<RemoteItem>,
    pub used_fallback: bool,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
    pub watermark_before: Option<DateTime<Utc>>,
    pub watermark_after: Option<DateTime<Utc>>,
    pub state_saved: bool,
    pub dispatch: DispatchOutcome,
}

impl RunReport {
    pub fn batch_ids(&self) -> Vec<&str> {
        self.batch.iter().map(|item| item.identity.as_str()).collect()
    }
}

/// One sequential pass: fetch, normalize, filter, resolve, persist, dispatch.
///
/// Nothing in a run is fatal. Page failures truncate the pool, a failed save
/// is logged, and dispatch failures are reported without touching state.
pub struct WatchRunner<S: StateStore> {
    config: WatchConfig,
    fields: FieldMap,
    source: Arc<dyn PageSource>,
    store: S,
    dispatcher: Box<dyn DigestDispatcher>,
    clock: Clock,
}

impl<S: StateStore> WatchRunner<S> {
    pub fn new(
        config: WatchConfig,
        fields: FieldMap,
        source: Arc<dyn PageSource>,
        store: S,
        dispatcher: Box<dyn DigestDispatcher>,
    ) -> Self {
        Self {
            config,
            fields,
            source,
            store,
            dispatcher,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run once. The run label is set on whichever thread resumes the task
    /// after each fetch, so any tokio runtime flavor may drive this.
    pub async fn run(&self) -> RunReport {
        set_run_label(self.config.label.clone());

        let mut state = self.store.load();
        state
            .delivered_ids
            .set_capacity(self.config.delivered_capacity);
        let mode = RunMode::from_state(&state);
        watch_info!(
            "Run start mode={:?} delivered={}",
            mode,
            state.delivered_ids.len()
        );

        let pool = collect_pool(
            self.source.as_ref(),
            &self.fields,
            FetchPlan {
                max_pages: self.config.max_pages(&mode),
                cutoff: mode.cutoff(),
            },
        )
        .await;
        set_run_label(self.config.label.clone());

        let filtered = self.config.filters().apply(&pool.items);
        watch_info!(
            "Fetched {} items over {} pages ({:?}); {} pass filters",
            pool.items.len(),
            pool.pages_fetched,
            pool.stop_reason,
            filtered.len()
        );

        let now = (self.clock)();
        let resolution = DeltaResolver::new(self.config.preview_count).resolve(
            &state,
            &pool.items,
            &filtered,
            now,
        );

        let mut batch = resolution.batch;
        let mut used_fallback = false;
        if filtered.is_empty() && self.config.preview_count > 0 {
            watch_info!("Filtered pool empty; pulling an unfiltered preview");
            let fallback = collect_pool(
                self.source.as_ref(),
                &self.fields,
                FetchPlan {
                    max_pages: self.config.fallback_max_pages,
                    cutoff: None,
                },
            )
            .await;
            set_run_label(self.config.label.clone());
            batch = select_preview(&fallback.items, self.config.preview_count);
            used_fallback = true;
        }

        let state_saved = match self.store.save(&resolution.next_state) {
            Ok(()) => true,
            Err(err) => {
                watch_error!("Failed to save state: {}", err);
                false
            }
        };
        watch_info!(
            "Resolved {:?} batch of {}; watermark {:?} -> {:?}",
            resolution.kind,
            batch.len(),
            state.watermark,
            resolution.next_state.watermark
        );

        let is_preview = resolution.kind == BatchKind::Preview;
        let dispatch = if self.config.dry_run {
            let digest = render_digest(&self.config.label, &batch, is_preview);
            watch_info!("Dry run, not dispatching: {}", digest.subject);
            DispatchOutcome::SkippedDryRun
        } else {
            match self
                .dispatcher
                .dispatch(&batch, &self.config.label, is_preview)
            {
                Ok(()) => DispatchOutcome::Sent,
                Err(err) => {
                    watch_warn!("Dispatch failed; state already saved: {}", err);
                    DispatchOutcome::Failed(err.to_string())
                }
            }
        };

        RunReport {
            mode,
            kind: resolution.kind,
            batch,
            used_fallback,
            pages_fetched: pool.pages_fetched,
            stop_reason: pool.stop_reason,
            watermark_before: state.watermark,
            watermark_after: resolution.next_state.watermark,
            state_saved,
            dispatch,
        }
    }

    /// Drive [`WatchRunner::run`] on a private single-threaded runtime.
    pub fn run_blocking(&self) -> std::io::Result<RunReport> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run()))
    }
}
