use chrono::{DateTime, NaiveDateTime, Utc};

use crate::filter::normalize_tag;
use crate::{RawRecord, RemoteItem};

/// Which raw fields feed each part of a [`RemoteItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub id: String,
    pub secondary_key: String,
    pub name: String,
    /// Tried in order; the first parseable value wins.
    pub timestamps: Vec<String>,
    pub tags: String,
    pub score: String,
    /// `{id}` is replaced with the primary id.
    pub link_template: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            secondary_key: "versions.0.hash".to_string(),
            name: "name".to_string(),
            timestamps: vec![
                "createdAt".to_string(),
                "uploaded".to_string(),
                "lastPublishedAt".to_string(),
            ],
            tags: "tags".to_string(),
            score: "stats.score".to_string(),
            link_template: None,
        }
    }
}

/// Map a raw record to a [`RemoteItem`]. Never fails: malformed fields
/// normalize to "absent" and the record is kept.
///
/// Identity: primary id, else `v:{secondary}`, else `n:{name}@{raw created}`.
pub fn normalize(record: &dyn RawRecord, fields: &FieldMap) -> RemoteItem {
    let name = record
        .text(&fields.name)
        .map(|n| n.trim().to_string())
        .unwrap_or_default();

    let raw_created: Vec<String> = fields
        .timestamps
        .iter()
        .filter_map(|path| record.text(path))
        .collect();
    let created_at = raw_created.iter().find_map(|raw| parse_timestamp(raw));

    let primary_id = non_empty(record.text(&fields.id));
    let identity = match (&primary_id, non_empty(record.text(&fields.secondary_key))) {
        (Some(id), _) => id.clone(),
        (None, Some(key)) => format!("v:{key}"),
        (None, None) => {
            let raw = raw_created
                .iter()
                .map(|r| r.trim())
                .find(|r| !r.is_empty())
                .unwrap_or("");
            format!("n:{name}@{raw}")
        }
    };

    let tags = record
        .text_list(&fields.tags)
        .iter()
        .filter_map(|t| normalize_tag(t))
        .collect();

    let link = match (&fields.link_template, &primary_id) {
        (Some(template), Some(id)) => Some(template.replace("{id}", id)),
        _ => None,
    };

    RemoteItem {
        identity,
        name,
        created_at,
        tags,
        score: record.number(&fields.score),
        link,
    }
}

/// Parse an ISO-8601 timestamp into UTC. Offsetless values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
