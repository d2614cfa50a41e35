use anyhow::Result;
use chrono::NaiveTime;
use foodsafe_engine::recurrence::{RecurrencePattern, ScheduleRule};
use foodsafe_storage::RecurrenceRuleRow;

// ---- DB row -> engine schedule rule ----

/// Convert a single `RecurrenceRuleRow` into an engine [`ScheduleRule`].
pub fn build_schedule_from_row(row: &RecurrenceRuleRow) -> Result<ScheduleRule> {
    let due_time = NaiveTime::parse_from_str(&row.due_time, "%H:%M")
        .map_err(|e| anyhow::anyhow!("invalid due_time '{}': {e}", row.due_time))?;

    let pattern = match row.recurrence_kind.as_str() {
        "daily" => RecurrencePattern::Daily,
        "weekly" => {
            let weekdays = parse_weekdays(row.weekdays.as_deref().unwrap_or(""))?;
            RecurrencePattern::Weekly(weekdays)
        }
        "monthly" => {
            let day = row
                .month_day
                .ok_or_else(|| anyhow::anyhow!("monthly rule without month_day"))?;
            if !(1..=31).contains(&day) {
                anyhow::bail!("month_day out of range: {day}");
            }
            RecurrencePattern::Monthly(day as u8)
        }
        other => anyhow::bail!("unknown recurrence kind: {other}"),
    };

    Ok(ScheduleRule {
        id: row.id.clone(),
        tenant_id: row.tenant_id.clone(),
        location_id: row.location_id.clone(),
        template_id: row.template_id.clone(),
        pattern,
        due_time,
        timezone_label: row.timezone_label.clone(),
        valid_from: row.valid_from,
        valid_until: row.valid_until,
        active: row.active,
    })
}

/// Convert multiple rows, skipping invalid ones with warnings. A malformed
/// rule never aborts the batch.
pub fn build_schedules_from_rows(rows: &[RecurrenceRuleRow]) -> Vec<ScheduleRule> {
    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        match build_schedule_from_row(row) {
            Ok(rule) => rules.push(rule),
            Err(e) => {
                tracing::warn!(
                    rule_id = %row.id,
                    tenant_id = %row.tenant_id,
                    recurrence_kind = %row.recurrence_kind,
                    error = %e,
                    "Skipping invalid recurrence rule"
                );
            }
        }
    }
    rules
}

/// Parse a CSV of ISO weekday numbers ("1,3,5", Monday = 1). Rejects empty
/// sets and out-of-range entries.
pub fn parse_weekdays(csv: &str) -> Result<Vec<u8>> {
    let mut days = Vec::new();
    for part in csv.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day: u8 = part
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid weekday entry: {part}"))?;
        if !(1..=7).contains(&day) {
            anyhow::bail!("weekday out of range: {day}");
        }
        days.push(day);
    }
    if days.is_empty() {
        anyhow::bail!("weekly rule with empty weekday set");
    }
    Ok(days)
}

/// Join ISO weekday numbers into the stored CSV form.
pub fn format_weekdays(days: &[u8]) -> String {
    days.iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
