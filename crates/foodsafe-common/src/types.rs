use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of temperature reading.
///
/// `Fridge` and `Freezer` readings are taken against a specific asset,
/// `Food` against a specific food item, `Delivery` against the incoming
/// goods check as a whole (no specific target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadingKind {
    Fridge,
    Freezer,
    Food,
    Delivery,
}

impl std::fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingKind::Fridge => write!(f, "fridge"),
            ReadingKind::Freezer => write!(f, "freezer"),
            ReadingKind::Food => write!(f, "food"),
            ReadingKind::Delivery => write!(f, "delivery"),
        }
    }
}

impl std::str::FromStr for ReadingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fridge" => Ok(ReadingKind::Fridge),
            "freezer" => Ok(ReadingKind::Freezer),
            "food" => Ok(ReadingKind::Food),
            "delivery" => Ok(ReadingKind::Delivery),
            _ => Err(format!("unknown reading kind: {s}")),
        }
    }
}

/// Compliance verdict status, ordered from best to worst.
///
/// # Examples
///
/// ```
/// use foodsafe_common::types::CheckStatus;
///
/// let status: CheckStatus = "warn".parse().unwrap();
/// assert_eq!(status, CheckStatus::Warn);
/// assert_eq!(status.to_string(), "warn");
/// assert!(CheckStatus::Fail > CheckStatus::Ok);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "ok"),
            CheckStatus::Warn => write!(f, "warn"),
            CheckStatus::Fail => write!(f, "fail"),
        }
    }
}

impl std::str::FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(CheckStatus::Ok),
            "warn" => Ok(CheckStatus::Warn),
            "fail" => Ok(CheckStatus::Fail),
            _ => Err(format!("unknown check status: {s}")),
        }
    }
}

/// The verdict produced for a single reading. Computed fresh on each call,
/// never stored as authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ComplianceVerdict {
    pub status: CheckStatus,
    pub requires_action: bool,
    pub message: String,
}

/// Lifecycle status of a materialized occurrence. Transitions are owned by
/// the run-execution workflow, not by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceStatus {
    Open,
    Completed,
}

impl std::fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccurrenceStatus::Open => write!(f, "open"),
            OccurrenceStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for OccurrenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(OccurrenceStatus::Open),
            "completed" => Ok(OccurrenceStatus::Completed),
            _ => Err(format!("unknown occurrence status: {s}")),
        }
    }
}

/// A single recorded temperature observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub kind: ReadingKind,
    pub target_ref: Option<String>,
    pub value_celsius: f64,
    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    /// Correlation key used to match this reading against monitoring
    /// expectations. Fridge and freezer readings correlate to their asset,
    /// food readings to their food item, delivery readings share a single key.
    ///
    /// Returns `None` when a targeted kind is missing its target reference —
    /// such a reading cannot satisfy any expectation.
    pub fn correlation_key(&self) -> Option<String> {
        match self.kind {
            ReadingKind::Fridge | ReadingKind::Freezer => {
                self.target_ref.as_ref().map(|id| format!("asset:{id}"))
            }
            ReadingKind::Food => self.target_ref.as_ref().map(|id| format!("food:{id}")),
            ReadingKind::Delivery => Some("delivery".to_string()),
        }
    }
}

/// What a monitoring expectation points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectationTarget {
    /// A fridge or freezer asset.
    Asset(String),
    /// A monitored food item.
    FoodItem(String),
    /// The incoming-goods check; has no specific target.
    Delivery,
}

impl ExpectationTarget {
    /// Stable key correlating this target with readings:
    /// `asset:<id>`, `food:<id>` or `delivery`.
    pub fn correlation_key(&self) -> String {
        match self {
            ExpectationTarget::Asset(id) => format!("asset:{id}"),
            ExpectationTarget::FoodItem(id) => format!("food:{id}"),
            ExpectationTarget::Delivery => "delivery".to_string(),
        }
    }
}

/// A recurring monitoring obligation ("check this fridge every 4 hours"),
/// distinct from an occurrence: expectations drive the due-window
/// aggregator, occurrences drive checklist-run creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringExpectation {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub target: ExpectationTarget,
    /// Display label for the target; the aggregator falls back to the
    /// correlation key when the target has no label (e.g. it was deleted).
    pub label: Option<String>,
    pub interval_minutes: i64,
    pub active: bool,
}

/// An occurrence draft emitted by the materializer, not yet persisted.
///
/// Deduplication is not the draft's concern: the storage layer enforces
/// uniqueness on (`rule_id`, `due_at`) and silently ignores conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceDraft {
    pub rule_id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub template_id: String,
    pub due_at: DateTime<Utc>,
    pub status: OccurrenceStatus,
}
