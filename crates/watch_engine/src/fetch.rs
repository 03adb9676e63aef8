use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use url::Url;

use crate::{PageError, PageFailureKind};

#[derive(Debug, Clone)]
pub struct ListingSettings {
    /// Listing endpoint, e.g. `https://api.beatsaver.com/maps/latest`.
    pub endpoint: String,
    /// Query parameter carrying the zero-based page index.
    pub page_param: String,
    /// Field holding the record array when the body is an object.
    pub records_field: String,
    pub extra_query: Vec<(String, String)>,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.beatsaver.com/maps/latest".to_string(),
            page_param: "page".to_string(),
            records_field: "docs".to_string(),
            extra_query: Vec::new(),
            user_agent: "listing-watch".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            max_bytes: 8 * 1024 * 1024,
        }
    }
}

/// One page of a newest-first listing. An empty page means "no more pages".
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, index: u32) -> Result<Vec<Value>, PageError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestPageSource {
    settings: ListingSettings,
    client: reqwest::Client,
}

impl ReqwestPageSource {
    pub fn new(settings: ListingSettings) -> Result<Self, PageError> {
        Url::parse(&settings.endpoint)
            .map_err(|err| PageError::new(0, PageFailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| PageError::new(0, PageFailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn page_url(&self, index: u32) -> Result<Url, PageError> {
        let page = index.to_string();
        let params = self
            .settings
            .extra_query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once((self.settings.page_param.as_str(), page.as_str())));
        Url::parse_with_params(&self.settings.endpoint, params)
            .map_err(|err| PageError::new(index, PageFailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl PageSource for ReqwestPageSource {
    async fn fetch_page(&self, index: u32) -> Result<Vec<Value>, PageError> {
        let url = self.page_url(index)?;
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.settings.user_agent)
            .send()
            .await
            .map_err(|err| map_reqwest_error(index, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::new(
                index,
                PageFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(index, max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(index, err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(index, max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|err| PageError::new(index, PageFailureKind::Decode, err.to_string()))?;
        extract_records(index, body, &self.settings.records_field)
    }
}

/// Accept a bare array, or an object holding the array under `field`.
/// A missing or null field reads as an empty page.
fn extract_records(index: u32, body: Value, field: &str) -> Result<Vec<Value>, PageError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Array(records)) => Ok(records),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => Err(PageError::new(
                index,
                PageFailureKind::Decode,
                format!("field `{field}` is not an array"),
            )),
        },
        _ => Err(PageError::new(
            index,
            PageFailureKind::Decode,
            "body is neither an array nor an object",
        )),
    }
}

fn too_large(index: u32, max_bytes: u64, actual: u64) -> PageError {
    PageError::new(
        index,
        PageFailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(index: u32, err: reqwest::Error) -> PageError {
    if err.is_timeout() {
        return PageError::new(index, PageFailureKind::Timeout, err.to_string());
    }
    PageError::new(index, PageFailureKind::Network, err.to_string())
}
