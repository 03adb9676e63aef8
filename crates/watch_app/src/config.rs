use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use watch_core::{normalize_tag, FieldMap, WatchConfig};
use watch_engine::ListingSettings;

use crate::cli::Cli;

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub watch: WatchConfig,
    pub listing: ListingSettings,
    pub fields: FieldMap,
    pub state_file: PathBuf,
    pub digest_dir: Option<PathBuf>,
}

impl AppSettings {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        if !cli.min_score.is_finite() || cli.min_score < 0.0 {
            bail!("--min-score must be a number >= 0, got {}", cli.min_score);
        }
        if cli.timeout_secs == 0 {
            bail!("--timeout-secs must be positive");
        }
        if cli.state_file.trim().is_empty() {
            bail!("--state-file must not be empty");
        }

        let watch = WatchConfig {
            label: cli.label,
            tags: parse_tags(&cli.tags),
            min_score: cli.min_score,
            seed_max_pages: cli.max_pages,
            delta_max_pages: cli.delta_pages,
            fallback_max_pages: cli.fallback_pages,
            preview_count: cli.preview_count,
            delivered_capacity: cli.delivered_capacity,
            dry_run: cli.dry_run,
        };

        let listing = ListingSettings {
            endpoint: cli.endpoint,
            page_param: cli.page_param,
            records_field: cli.records_field,
            extra_query: cli.query,
            user_agent: cli.user_agent,
            request_timeout: Duration::from_secs(cli.timeout_secs),
            ..ListingSettings::default()
        };

        let link_template = Some(cli.link_template).filter(|t| !t.trim().is_empty());
        let fields = FieldMap {
            link_template,
            ..FieldMap::default()
        };

        Ok(Self {
            watch,
            listing,
            fields,
            state_file: PathBuf::from(cli.state_file),
            digest_dir: cli.digest_dir.map(PathBuf::from),
        })
    }
}

fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').filter_map(normalize_tag) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
