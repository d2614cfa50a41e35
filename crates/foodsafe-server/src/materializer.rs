use anyhow::Result;
use chrono::{NaiveDate, Utc};
use foodsafe_storage::ComplianceStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::rule_builder;

/// Summary of one materialization run, returned for observability. The
/// inserted count can be lower than the emitted count: re-runs for the same
/// day are absorbed by the storage-level conflict policy.
#[derive(Debug, Clone)]
pub struct MaterializeOutcome {
    pub rules_considered: usize,
    pub skipped: usize,
    pub emitted: usize,
    pub inserted: u64,
}

/// Materializes occurrences for every enabled rule on `today`.
///
/// Safe under at-least-once invocation: the occurrence insert ignores
/// conflicts on (`rule_id`, `due_at`), so concurrent or repeated runs for the
/// same day add nothing. Rules whose checklist template has been deleted, or
/// whose shape cannot be parsed, are skipped with a warning and never abort
/// the rest of the batch.
pub async fn materialize_for_date(
    store: &ComplianceStore,
    today: NaiveDate,
) -> Result<MaterializeOutcome> {
    let rows = store.list_enabled_recurrence_rules().await?;
    let rules_considered = rows.len();

    let known_templates: HashSet<String> = store
        .list_checklist_template_ids()
        .await?
        .into_iter()
        .collect();

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if known_templates.contains(&row.template_id) {
            kept.push(row);
        } else {
            tracing::warn!(
                rule_id = %row.id,
                template_id = %row.template_id,
                "Skipping rule whose checklist template no longer exists"
            );
        }
    }

    let schedules = rule_builder::build_schedules_from_rows(&kept);
    let skipped = rules_considered - schedules.len();

    let drafts = foodsafe_engine::materialize::materialize_today(&schedules, today);
    let emitted = drafts.len();
    let inserted = store.insert_occurrences_ignoring_conflicts(&drafts).await?;

    tracing::info!(
        date = %today,
        rules = rules_considered,
        skipped,
        emitted,
        inserted,
        "Occurrence materialization finished"
    );

    Ok(MaterializeOutcome {
        rules_considered,
        skipped,
        emitted,
        inserted,
    })
}

pub struct OccurrenceScheduler {
    store: Arc<ComplianceStore>,
    tick_secs: u64,
}

impl OccurrenceScheduler {
    pub fn new(store: Arc<ComplianceStore>, tick_secs: u64) -> Self {
        Self { store, tick_secs }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Occurrence scheduler started");

        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            let today = Utc::now().date_naive();
            if let Err(e) = materialize_for_date(&self.store, today).await {
                tracing::error!(error = %e, "Occurrence materialization cycle failed");
            }
        }
    }
}
