use anyhow::Result;
use chrono::Utc;
use foodsafe_storage::{
    ChecklistTemplateRow, ComplianceStore, ExpectationRow, RecurrenceRuleRow,
};
use std::collections::HashMap;

use crate::config::SeedFile;
use crate::rule_builder;

/// Import templates, recurrence rules and monitoring expectations from a
/// JSON seed file. Templates are deduplicated by (tenant, location, name);
/// rules reference templates by name within the same scope.
pub async fn init_from_seed_file(store: &ComplianceStore, seed_path: &str) -> Result<()> {
    let seed_content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: SeedFile = serde_json::from_str(&seed_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;

    // (tenant, location, name) -> template id, covering both pre-existing
    // and freshly created templates.
    let mut template_ids: HashMap<(String, String, String), String> = HashMap::new();

    let mut templates_created = 0u32;
    let mut templates_skipped = 0u32;

    for tmpl in &seed.templates {
        let existing = store
            .list_checklist_templates(&tmpl.tenant_id, &tmpl.location_id, None, 10000, 0)
            .await?;
        for row in &existing {
            template_ids.insert(
                (row.tenant_id.clone(), row.location_id.clone(), row.name.clone()),
                row.id.clone(),
            );
        }

        let key = (
            tmpl.tenant_id.clone(),
            tmpl.location_id.clone(),
            tmpl.name.clone(),
        );
        if template_ids.contains_key(&key) {
            tracing::warn!(name = %tmpl.name, "Template already exists, skipping");
            templates_skipped += 1;
            continue;
        }

        let now = Utc::now();
        let row = ChecklistTemplateRow {
            id: foodsafe_common::id::next_id(),
            tenant_id: tmpl.tenant_id.clone(),
            location_id: tmpl.location_id.clone(),
            name: tmpl.name.clone(),
            description: tmpl.description.clone(),
            active: tmpl.active,
            created_at: now,
            updated_at: now,
        };
        match store.insert_checklist_template(&row).await {
            Ok(inserted) => {
                tracing::info!(name = %tmpl.name, id = %inserted.id, "Template created");
                template_ids.insert(key, inserted.id);
                templates_created += 1;
            }
            Err(e) => {
                tracing::error!(name = %tmpl.name, error = %e, "Failed to create template");
            }
        }
    }

    let mut rules_created = 0u32;
    let mut rules_skipped = 0u32;

    for rule in &seed.rules {
        let key = (
            rule.tenant_id.clone(),
            rule.location_id.clone(),
            rule.template.clone(),
        );
        let Some(template_id) = template_ids.get(&key) else {
            tracing::error!(
                template = %rule.template,
                tenant_id = %rule.tenant_id,
                "Seed rule references unknown template, skipping"
            );
            rules_skipped += 1;
            continue;
        };

        let now = Utc::now();
        let weekdays = if rule.weekdays.is_empty() {
            None
        } else {
            Some(rule_builder::format_weekdays(&rule.weekdays))
        };
        let row = RecurrenceRuleRow {
            id: foodsafe_common::id::next_id(),
            tenant_id: rule.tenant_id.clone(),
            location_id: rule.location_id.clone(),
            template_id: template_id.clone(),
            recurrence_kind: rule.recurrence_kind.clone(),
            due_time: rule.due_time.clone(),
            timezone_label: rule.timezone_label.clone(),
            weekdays,
            month_day: rule.month_day,
            valid_from: rule.valid_from,
            valid_until: rule.valid_until,
            active: rule.active,
            created_at: now,
            updated_at: now,
        };

        // Reject rules the materializer would only skip later.
        if let Err(e) = rule_builder::build_schedule_from_row(&row) {
            tracing::error!(
                template = %rule.template,
                error = %e,
                "Seed rule has invalid shape, skipping"
            );
            rules_skipped += 1;
            continue;
        }

        match store.insert_recurrence_rule(&row).await {
            Ok(inserted) => {
                tracing::info!(
                    id = %inserted.id,
                    template = %rule.template,
                    kind = %rule.recurrence_kind,
                    "Recurrence rule created"
                );
                rules_created += 1;
            }
            Err(e) => {
                tracing::error!(template = %rule.template, error = %e, "Failed to create rule");
            }
        }
    }

    let mut expectations_created = 0u32;

    for exp in &seed.expectations {
        let now = Utc::now();
        let row = ExpectationRow {
            id: foodsafe_common::id::next_id(),
            tenant_id: exp.tenant_id.clone(),
            location_id: exp.location_id.clone(),
            target_kind: exp.target_kind.clone(),
            target_ref: exp.target_ref.clone(),
            target_label: exp.target_label.clone(),
            interval_minutes: exp.interval_minutes,
            active: exp.active,
            created_at: now,
            updated_at: now,
        };
        match store.insert_expectation(&row).await {
            Ok(inserted) => {
                tracing::info!(
                    id = %inserted.id,
                    target_kind = %exp.target_kind,
                    "Monitoring expectation created"
                );
                expectations_created += 1;
            }
            Err(e) => {
                tracing::error!(target_kind = %exp.target_kind, error = %e, "Failed to create expectation");
            }
        }
    }

    tracing::info!(
        templates_created,
        templates_skipped,
        rules_created,
        rules_skipped,
        expectations_created,
        "init-seed completed"
    );
    Ok(())
}
