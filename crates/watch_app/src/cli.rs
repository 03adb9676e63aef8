use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Parser, Debug)]
#[command(
    name = "listing-watch",
    about = "Report new items on a paginated, newest-first listing since the last run"
)]
pub struct Cli {
    /// Name of this watch; used in logs and digest subjects
    #[arg(long, env = "WATCH_LABEL", default_value = "watch")]
    pub label: String,

    /// Comma-separated tags; an item must carry at least one. Empty keeps all
    #[arg(long, env = "WATCH_TAGS", default_value = "")]
    pub tags: String,

    /// Minimum item score; 0 disables the score filter
    #[arg(long, env = "WATCH_MIN_SCORE", default_value_t = 0.0)]
    pub min_score: f64,

    /// Page cap for the first (seed) run
    #[arg(long, env = "WATCH_MAX_PAGES", default_value_t = 50)]
    pub max_pages: u32,

    /// Page cap for later (delta) runs
    #[arg(long, env = "WATCH_DELTA_PAGES", default_value_t = 50)]
    pub delta_pages: u32,

    /// Page cap for the unfiltered preview pulled when nothing passes the filters
    #[arg(long, env = "WATCH_FALLBACK_PAGES", default_value_t = 1)]
    pub fallback_pages: u32,

    /// Items shown when there is nothing new
    #[arg(long, env = "WATCH_PREVIEW_COUNT", default_value_t = 5)]
    pub preview_count: usize,

    /// Delivered identities remembered across runs
    #[arg(long, env = "WATCH_DELIVERED_CAPACITY", default_value_t = watch_core::DEFAULT_DELIVERED_CAPACITY)]
    pub delivered_capacity: usize,

    /// Compute and save state, but do not dispatch the digest.
    /// `DRY_RUN=1` enables it; `0`, `false`, `no` and `off` do not
    #[arg(long, env = "DRY_RUN", value_parser = FalseyValueParser::new())]
    pub dry_run: bool,

    /// State file for this watch
    #[arg(long, env = "WATCH_STATE_FILE", default_value = "watch_state.json")]
    pub state_file: String,

    /// Listing endpoint
    #[arg(long, env = "WATCH_ENDPOINT", default_value = "https://api.beatsaver.com/maps/latest")]
    pub endpoint: String,

    /// Query parameter carrying the page index
    #[arg(long, default_value = "page")]
    pub page_param: String,

    /// Response field holding the record array
    #[arg(long, default_value = "docs")]
    pub records_field: String,

    /// Extra query parameter as key=value (repeatable)
    #[arg(long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    #[arg(long, env = "WATCH_USER_AGENT", default_value = "listing-watch")]
    pub user_agent: String,

    /// Per-page request timeout in seconds
    #[arg(long, default_value_t = 20)]
    pub timeout_secs: u64,

    /// Item link; `{id}` is replaced with the item id
    #[arg(long, env = "WATCH_LINK_TEMPLATE", default_value = "https://beatsaver.com/maps/{id}")]
    pub link_template: String,

    /// Write digest.html and digest.json here instead of logging the digest
    #[arg(long, env = "WATCH_DIGEST_DIR")]
    pub digest_dir: Option<String>,

    #[arg(long, value_enum, default_value = "terminal")]
    pub log: LogTarget,

    /// Log per-page detail
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}
