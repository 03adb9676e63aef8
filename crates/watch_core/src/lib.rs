//! Watch core: pure normalization, filtering, pagination and delta logic.
mod config;
mod filter;
mod item;
mod normalize;
mod paginate;
mod record;
mod resolve;
mod state;

pub use config::WatchConfig;
pub use filter::{normalize_tag, FilterPipeline, ScoreFilter, TagFilter};
pub use item::RemoteItem;
pub use normalize::{normalize, parse_timestamp, FieldMap};
pub use paginate::{PageVerdict, Paginator, StopReason};
pub use record::RawRecord;
pub use resolve::{
    advance_watermark, is_new, select_preview, BatchKind, DeltaResolver, Resolution, RunMode,
};
pub use state::{DeliveredIds, StateStore, SyncState, DEFAULT_DELIVERED_CAPACITY};
