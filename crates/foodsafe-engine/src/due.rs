//! Due-window aggregation: overdue / due-soon classification of monitoring
//! expectations against the day's readings.

use chrono::{DateTime, Duration, Utc};
use foodsafe_common::types::{MonitoringExpectation, Reading};
use std::collections::HashMap;

/// Cap on the due-soon list. A UI-bandwidth limit, not a correctness
/// constraint — the overdue list is never capped.
pub const DUE_SOON_LIMIT: usize = 20;

/// One expectation's computed due window.
#[derive(Debug, Clone, PartialEq)]
pub struct DueRow {
    pub expectation_id: String,
    /// Target label, falling back to the correlation key when the target
    /// carries no label (e.g. it has since been deleted).
    pub label: String,
    pub correlation_key: String,
    pub interval_minutes: i64,
    /// `None` when nothing was recorded in the supplied snapshot.
    pub last_recorded_at: Option<DateTime<Utc>>,
    /// `None` when never recorded; otherwise last reading + interval.
    pub due_at: Option<DateTime<Utc>>,
    /// Whole minutes past due, clamped to ≥ 0. Only set for overdue rows
    /// that have a computed due time.
    pub minutes_overdue: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DueWindows {
    pub overdue: Vec<DueRow>,
    pub due_soon: Vec<DueRow>,
}

/// Classifies every active expectation as overdue or due-soon.
///
/// `todays_readings` is expected sorted newest-first; the first reading seen
/// per correlation key wins and no sorting happens here. An expectation with
/// no matching reading in the snapshot is unconditionally overdue —
/// never-recorded is treated conservatively, not as "due soon".
///
/// The due-soon list is sorted ascending by due time and capped at
/// [`DUE_SOON_LIMIT`]; the overdue list is returned unordered.
pub fn compute_due_windows(
    expectations: &[MonitoringExpectation],
    todays_readings: &[Reading],
    now: DateTime<Utc>,
) -> DueWindows {
    let mut latest: HashMap<String, &Reading> = HashMap::new();
    for reading in todays_readings {
        if let Some(key) = reading.correlation_key() {
            latest.entry(key).or_insert(reading);
        }
    }

    let mut windows = DueWindows::default();
    for expectation in expectations.iter().filter(|e| e.active) {
        let key = expectation.target.correlation_key();
        let label = expectation.label.clone().unwrap_or_else(|| key.clone());

        match latest.get(&key) {
            None => windows.overdue.push(DueRow {
                expectation_id: expectation.id.clone(),
                label,
                correlation_key: key,
                interval_minutes: expectation.interval_minutes,
                last_recorded_at: None,
                due_at: None,
                minutes_overdue: None,
            }),
            Some(reading) => {
                let due_at = reading.recorded_at + Duration::minutes(expectation.interval_minutes);
                let row = DueRow {
                    expectation_id: expectation.id.clone(),
                    label,
                    correlation_key: key,
                    interval_minutes: expectation.interval_minutes,
                    last_recorded_at: Some(reading.recorded_at),
                    due_at: Some(due_at),
                    minutes_overdue: None,
                };
                if due_at < now {
                    let minutes = ((now - due_at).num_seconds() / 60).max(0);
                    windows.overdue.push(DueRow {
                        minutes_overdue: Some(minutes),
                        ..row
                    });
                } else {
                    windows.due_soon.push(row);
                }
            }
        }
    }

    windows.due_soon.sort_by_key(|row| row.due_at);
    windows.due_soon.truncate(DUE_SOON_LIMIT);
    windows
}
