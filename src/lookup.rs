//! In-memory bidirectional Monarch ↔ OMIM lookup over persisted mapping tables.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::MappingError;
use crate::mapping::normalize::{normalize_external_id, normalize_knowledge_base_id};
use crate::mapping::{ForwardEntry, ForwardTable, MappingTable, ReverseEntry, ReverseTable};

const TABLE_API: &str = "mapping-table";

/// Where a persisted table is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLocation {
    Path(PathBuf),
    Url(String),
}

impl TableLocation {
    /// `http://` and `https://` values are URLs; anything else is a filesystem path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    async fn fetch<V: DeserializeOwned>(&self) -> Result<MappingTable<V>, MappingError> {
        match self {
            Self::Path(path) => crate::mapping::store::read_table(path).await,
            Self::Url(url) => {
                let client = crate::sources::shared_client()?;
                let resp = client.get(url).send().await?;
                let status = resp.status();
                let bytes = crate::sources::read_limited_body(resp, TABLE_API).await?;
                if !status.is_success() {
                    return Err(MappingError::Api {
                        api: TABLE_API.to_string(),
                        message: format!(
                            "HTTP {status}: {}",
                            crate::sources::body_excerpt(&bytes)
                        ),
                    });
                }
                serde_json::from_slice(&bytes).map_err(|source| MappingError::ApiJson {
                    api: TABLE_API.to_string(),
                    source,
                })
            }
        }
    }
}

impl fmt::Display for TableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded { entries: usize },
    Failed { reason: String },
    TimedOut,
}

impl LoadStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadReport {
    pub forward: LoadStatus,
    pub reverse: LoadStatus,
}

impl LoadReport {
    pub fn is_ready(&self) -> bool {
        self.forward.is_loaded() && self.reverse.is_loaded()
    }
}

/// Read-only bidirectional identifier lookup.
///
/// Both tables are fully loaded before a service value exists, and are never
/// mutated afterwards, so a shared `&LookupService` (or `Arc`) is safe to use
/// from any number of tasks. Misses are `None`, never errors.
#[derive(Debug, Clone, Default)]
pub struct LookupService {
    forward: ForwardTable,
    reverse: ReverseTable,
}

impl LookupService {
    pub fn from_tables(forward: ForwardTable, reverse: ReverseTable) -> Self {
        Self { forward, reverse }
    }

    /// Loads both tables concurrently.
    ///
    /// Each direction is bounded by `timeout` when given. A direction that
    /// fails to load or parse, or times out, is logged and served as an empty
    /// table; the other direction is kept.
    pub async fn load(
        forward: &TableLocation,
        reverse: &TableLocation,
        timeout: Option<Duration>,
    ) -> (Self, LoadReport) {
        let (forward_result, reverse_result) = tokio::join!(
            load_direction::<ForwardEntry>(forward, timeout),
            load_direction::<ReverseEntry>(reverse, timeout),
        );
        let (forward_table, forward_status) = forward_result;
        let (reverse_table, reverse_status) = reverse_result;

        let report = LoadReport {
            forward: forward_status,
            reverse: reverse_status,
        };
        (Self::from_tables(forward_table, reverse_table), report)
    }

    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }

    pub fn reverse_len(&self) -> usize {
        self.reverse.len()
    }

    /// `MONDO:0007947` (any case, surrounding whitespace ignored) → OMIM record.
    pub fn knowledge_base_to_external<'a>(
        &self,
        id: impl Into<Option<&'a str>>,
    ) -> Option<&ForwardEntry> {
        let key = normalize_knowledge_base_id(id.into()?)?;
        self.forward.get(&key)
    }

    /// `OMIM:154700` or `154700` → knowledge-base record.
    pub fn external_to_knowledge_base<'a>(
        &self,
        id: impl Into<Option<&'a str>>,
    ) -> Option<&ReverseEntry> {
        let key = normalize_external_id(id.into()?)?;
        self.reverse.get(&key)
    }

    pub fn name_from_knowledge_base_id<'a>(
        &self,
        id: impl Into<Option<&'a str>>,
    ) -> Option<&str> {
        self.knowledge_base_to_external(id)
            .map(|entry| entry.name.as_str())
    }

    pub fn name_from_external_id<'a>(&self, id: impl Into<Option<&'a str>>) -> Option<&str> {
        self.external_to_knowledge_base(id)
            .map(|entry| entry.name.as_str())
    }
}

async fn load_direction<V: DeserializeOwned>(
    location: &TableLocation,
    timeout: Option<Duration>,
) -> (MappingTable<V>, LoadStatus) {
    let fetch = location.fetch::<V>();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fetch).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    location = %location,
                    timeout_ms = limit.as_millis() as u64,
                    "Mapping table load timed out; serving empty table"
                );
                return (MappingTable::new(), LoadStatus::TimedOut);
            }
        },
        None => fetch.await,
    };

    match result {
        Ok(table) => {
            info!(location = %location, entries = table.len(), "Loaded mapping table");
            let entries = table.len();
            (table, LoadStatus::Loaded { entries })
        }
        Err(err) => {
            let err = MappingError::TableLoad {
                location: location.to_string(),
                reason: err.to_string(),
            };
            warn!("{err}; serving empty table");
            (
                MappingTable::new(),
                LoadStatus::Failed {
                    reason: err.to_string(),
                },
            )
        }
    }
}
