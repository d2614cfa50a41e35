//! Declarative recurrence rules and their calendar evaluation.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

/// When a schedule rule fires within the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrencePattern {
    /// Every day.
    Daily,
    /// Specific ISO weekdays, Monday = 1 .. Sunday = 7.
    Weekly(Vec<u8>),
    /// Day of month 1..=31. Months without that day never fire — no
    /// clamping, no rollover to the last valid day.
    Monthly(u8),
}

/// A validated recurrence rule, ready for evaluation.
///
/// Produced from stored rule rows by the boundary layer; rows that cannot
/// be converted are skipped there, so evaluation itself never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRule {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub template_id: String,
    pub pattern: RecurrencePattern,
    /// Local time of day the occurrence is due, hour:minute.
    pub due_time: NaiveTime,
    /// Informational only — due instants are computed in UTC regardless.
    pub timezone_label: String,
    /// Inclusive lower bound of the validity window.
    pub valid_from: NaiveDate,
    /// Inclusive upper bound; `None` means open-ended.
    pub valid_until: Option<NaiveDate>,
    pub active: bool,
}

/// Whether `rule` fires on `today` (a UTC calendar date).
///
/// Malformed patterns (empty weekday set, weekday outside 1..=7, month day
/// outside 1..=31) never apply rather than erroring, so one bad rule cannot
/// abort a materialization batch.
pub fn applies(rule: &ScheduleRule, today: NaiveDate) -> bool {
    if today < rule.valid_from {
        return false;
    }
    if let Some(until) = rule.valid_until {
        if today > until {
            return false;
        }
    }
    match &rule.pattern {
        RecurrencePattern::Daily => true,
        RecurrencePattern::Weekly(weekdays) => {
            let today_dow = iso_weekday(today);
            weekdays.contains(&today_dow)
        }
        RecurrencePattern::Monthly(day) => {
            (1..=31).contains(day) && today.day() == u32::from(*day)
        }
    }
}

/// The instant an occurrence fired on `today` is due: `today` at the rule's
/// due time, interpreted in UTC. `timezone_label` is not consulted.
pub fn due_instant(rule: &ScheduleRule, today: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&today.and_time(rule.due_time))
}

/// ISO weekday number of a date, Monday = 1 .. Sunday = 7.
fn iso_weekday(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}
