//! Watch engine: listing IO, state persistence, digest delivery and the run loop.
mod digest;
mod dispatch;
mod fetch;
mod persist;
mod pool;
mod runner;
mod types;

pub use digest::{render_digest, Digest};
pub use dispatch::{DigestDispatcher, DispatchError, FileDispatcher, LogDispatcher};
pub use fetch::{ListingSettings, PageSource, ReqwestPageSource};
pub use persist::{ensure_output_dir, AtomicFileWriter, FileStateStore, PersistError};
pub use pool::{collect_pool, FetchPlan, FetchPool};
pub use runner::{Clock, DispatchOutcome, RunReport, WatchRunner};
pub use types::{PageError, PageFailureKind};
