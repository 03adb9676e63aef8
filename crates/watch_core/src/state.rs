use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DELIVERED_CAPACITY: usize = 5_000;

/// Cross-run memory of one watched configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default)]
    pub watermark: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_ids: DeliveredIds,
}

impl SyncState {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            watermark: None,
            delivered_ids: DeliveredIds::new(capacity),
        }
    }
}

/// Insertion-ordered identity set holding at most `capacity` entries.
/// The oldest entry is evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DeliveredIds {
    order: VecDeque<String>,
    index: HashSet<String>,
    capacity: usize,
}

impl DeliveredIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            index: HashSet::new(),
            capacity,
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains(identity)
    }

    /// Record an identity as most recent. Re-recording refreshes its position.
    pub fn record(&mut self, identity: &str) {
        if self.index.contains(identity) {
            self.order.retain(|existing| existing != identity);
        } else {
            self.index.insert(identity.to_string());
        }
        self.order.push_back(identity.to_string());
        self.evict_overflow();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict_overflow();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn evict_overflow(&mut self) {
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
    }
}

impl Default for DeliveredIds {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERED_CAPACITY)
    }
}

impl PartialEq for DeliveredIds {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.capacity == other.capacity
    }
}

impl Eq for DeliveredIds {}

impl From<Vec<String>> for DeliveredIds {
    fn from(ids: Vec<String>) -> Self {
        // Keep everything on disk; the store applies its own bound after load.
        let mut set = Self::new(ids.len().max(DEFAULT_DELIVERED_CAPACITY));
        for id in ids.iter().filter(|id| !id.is_empty()) {
            set.record(id);
        }
        set
    }
}

impl From<DeliveredIds> for Vec<String> {
    fn from(ids: DeliveredIds) -> Self {
        ids.order.into_iter().collect()
    }
}

/// Load/save capability for [`SyncState`].
///
/// `load` never fails: a missing or unreadable record yields the seed state.
/// `save` must replace the whole record atomically.
pub trait StateStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> SyncState;
    fn save(&self, state: &SyncState) -> Result<(), Self::Error>;
}
