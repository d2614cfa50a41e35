//! Turning recurrence rules into concrete occurrence drafts for one day.

use chrono::NaiveDate;
use foodsafe_common::types::{OccurrenceDraft, OccurrenceStatus};

use crate::recurrence::{self, ScheduleRule};

/// Evaluates every active rule against `today` and emits a draft for each
/// rule that fires.
///
/// The batch is not deduplicated here: persistence enforces uniqueness on
/// (`rule_id`, `due_at`) with a conflict-ignoring insert, so running this
/// any number of times for the same day adds no extra occurrences.
pub fn materialize_today(rules: &[ScheduleRule], today: NaiveDate) -> Vec<OccurrenceDraft> {
    rules
        .iter()
        .filter(|rule| rule.active)
        .filter(|rule| recurrence::applies(rule, today))
        .map(|rule| OccurrenceDraft {
            rule_id: rule.id.clone(),
            tenant_id: rule.tenant_id.clone(),
            location_id: rule.location_id.clone(),
            template_id: rule.template_id.clone(),
            due_at: recurrence::due_instant(rule, today),
            status: OccurrenceStatus::Open,
        })
        .collect()
}
