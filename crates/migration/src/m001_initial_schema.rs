use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按依赖顺序建表
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS checklist_templates (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    location_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_templates_scope ON checklist_templates(tenant_id, location_id);
CREATE INDEX IF NOT EXISTS idx_templates_active ON checklist_templates(active);

CREATE TABLE IF NOT EXISTS recurrence_rules (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    location_id TEXT NOT NULL,
    template_id TEXT NOT NULL,
    recurrence_kind TEXT NOT NULL,
    due_time TEXT NOT NULL,
    timezone_label TEXT NOT NULL DEFAULT 'UTC',
    weekdays TEXT,
    month_day INTEGER,
    valid_from TEXT NOT NULL,
    valid_until TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rules_scope ON recurrence_rules(tenant_id, location_id);
CREATE INDEX IF NOT EXISTS idx_rules_active ON recurrence_rules(active);
CREATE INDEX IF NOT EXISTS idx_rules_template ON recurrence_rules(template_id);

CREATE TABLE IF NOT EXISTS occurrences (
    id TEXT PRIMARY KEY NOT NULL,
    rule_id TEXT,
    tenant_id TEXT NOT NULL,
    location_id TEXT NOT NULL,
    template_id TEXT NOT NULL,
    due_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_occurrences_rule_due ON occurrences(rule_id, due_at);
CREATE INDEX IF NOT EXISTS idx_occurrences_scope ON occurrences(tenant_id, location_id);
CREATE INDEX IF NOT EXISTS idx_occurrences_due_at ON occurrences(due_at);
CREATE INDEX IF NOT EXISTS idx_occurrences_status ON occurrences(status);

CREATE TABLE IF NOT EXISTS monitoring_expectations (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    location_id TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    target_ref TEXT,
    target_label TEXT,
    interval_minutes INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_expectations_scope ON monitoring_expectations(tenant_id, location_id);
CREATE INDEX IF NOT EXISTS idx_expectations_active ON monitoring_expectations(active);

CREATE TABLE IF NOT EXISTS readings (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    location_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    target_ref TEXT,
    value_celsius REAL NOT NULL,
    recorded_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_readings_scope_recorded ON readings(tenant_id, location_id, recorded_at DESC);
CREATE INDEX IF NOT EXISTS idx_readings_kind ON readings(kind);

CREATE TABLE IF NOT EXISTS corrective_actions (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    location_id TEXT NOT NULL,
    reading_id TEXT,
    status TEXT NOT NULL DEFAULT 'open',
    severity TEXT NOT NULL DEFAULT 'fail',
    description TEXT NOT NULL,
    resolved_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_actions_scope ON corrective_actions(tenant_id, location_id);
CREATE INDEX IF NOT EXISTS idx_actions_status ON corrective_actions(status);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS corrective_actions;
DROP TABLE IF EXISTS readings;
DROP TABLE IF EXISTS monitoring_expectations;
DROP TABLE IF EXISTS occurrences;
DROP TABLE IF EXISTS recurrence_rules;
DROP TABLE IF EXISTS checklist_templates;
";
