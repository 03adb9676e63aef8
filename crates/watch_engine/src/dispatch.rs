use std::path::PathBuf;

use serde_json::json;
use watch_core::RemoteItem;
use watch_logging::watch_info;

use crate::digest::render_digest;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Renders and delivers a resolved batch.
pub trait DigestDispatcher: Send + Sync {
    fn dispatch(&self, items: &[RemoteItem], label: &str, is_preview: bool)
        -> Result<(), DispatchError>;
}

/// Writes the digest to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl DigestDispatcher for LogDispatcher {
    fn dispatch(
        &self,
        items: &[RemoteItem],
        label: &str,
        is_preview: bool,
    ) -> Result<(), DispatchError> {
        let digest = render_digest(label, items, is_preview);
        for line in digest.plain.lines().filter(|line| !line.is_empty()) {
            watch_info!("{}", line);
        }
        Ok(())
    }
}

/// Writes `digest.html` plus a `digest.json` manifest into a directory.
pub struct FileDispatcher {
    dir: PathBuf,
    html_filename: String,
    manifest_filename: String,
}

impl FileDispatcher {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            html_filename: "digest.html".to_string(),
            manifest_filename: "digest.json".to_string(),
        }
    }
}

impl DigestDispatcher for FileDispatcher {
    fn dispatch(
        &self,
        items: &[RemoteItem],
        label: &str,
        is_preview: bool,
    ) -> Result<(), DispatchError> {
        let digest = render_digest(label, items, is_preview);
        let writer = AtomicFileWriter::new(self.dir.clone());

        let html_path = writer.write(&self.html_filename, &digest.html)?;

        let manifest = json!({
            "label": label,
            "subject": digest.subject,
            "is_preview": is_preview,
            "count": items.len(),
            "items": items.iter().map(|item| {
                json!({
                    "identity": item.identity,
                    "name": item.name,
                    "created_at": item.created_at.map(|t| t.to_rfc3339()),
                    "tags": item.tags,
                    "score": item.score,
                    "link": item.link,
                })
            }).collect::<Vec<_>>()
        });
        let manifest_path = writer.write(&self.manifest_filename, &manifest.to_string())?;

        watch_info!(
            "Digest written to {:?} and {:?}",
            html_path,
            manifest_path
        );
        Ok(())
    }
}
