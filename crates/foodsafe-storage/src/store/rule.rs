use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::recurrence_rule::{self, Column, Entity};
use crate::store::ComplianceStore;

/// 周期规则数据行（来自 recurrence_rules 表）
///
/// `recurrence_kind` 取值：daily / weekly / monthly。
/// `weekdays` 为 ISO 周几编号的 CSV（如 "1,3,5"，周一 = 1），仅 weekly 使用；
/// `month_day` 仅 monthly 使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRuleRow {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub template_id: String,
    pub recurrence_kind: String,
    /// 到期时间，"HH:MM"
    pub due_time: String,
    /// 仅作展示；到期时间按 UTC 计算
    pub timezone_label: String,
    pub weekdays: Option<String>,
    pub month_day: Option<i32>,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: recurrence_rule::Model) -> RecurrenceRuleRow {
    RecurrenceRuleRow {
        id: m.id,
        tenant_id: m.tenant_id,
        location_id: m.location_id,
        template_id: m.template_id,
        recurrence_kind: m.recurrence_kind,
        due_time: m.due_time,
        timezone_label: m.timezone_label,
        weekdays: m.weekdays,
        month_day: m.month_day,
        valid_from: m.valid_from,
        valid_until: m.valid_until,
        active: m.active,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ComplianceStore {
    pub async fn insert_recurrence_rule(
        &self,
        row: &RecurrenceRuleRow,
    ) -> Result<RecurrenceRuleRow> {
        let now = Utc::now().fixed_offset();
        let am = recurrence_rule::ActiveModel {
            id: Set(row.id.clone()),
            tenant_id: Set(row.tenant_id.clone()),
            location_id: Set(row.location_id.clone()),
            template_id: Set(row.template_id.clone()),
            recurrence_kind: Set(row.recurrence_kind.clone()),
            due_time: Set(row.due_time.clone()),
            timezone_label: Set(row.timezone_label.clone()),
            weekdays: Set(row.weekdays.clone()),
            month_day: Set(row.month_day),
            valid_from: Set(row.valid_from),
            valid_until: Set(row.valid_until),
            active: Set(row.active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_recurrence_rule_by_id(&self, id: &str) -> Result<Option<RecurrenceRuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_recurrence_rules(
        &self,
        tenant_id: &str,
        location_id: &str,
        active: Option<bool>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RecurrenceRuleRow>> {
        let mut q = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id));
        if let Some(a) = active {
            q = q.filter(Column::Active.eq(a));
        }
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_recurrence_rules(
        &self,
        tenant_id: &str,
        location_id: &str,
        active: Option<bool>,
    ) -> Result<u64> {
        let mut q = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id));
        if let Some(a) = active {
            q = q.filter(Column::Active.eq(a));
        }
        Ok(q.count(self.db()).await?)
    }

    pub async fn update_recurrence_rule(
        &self,
        id: &str,
        row: &RecurrenceRuleRow,
    ) -> Result<Option<RecurrenceRuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: recurrence_rule::ActiveModel = m.into();
            am.template_id = Set(row.template_id.clone());
            am.recurrence_kind = Set(row.recurrence_kind.clone());
            am.due_time = Set(row.due_time.clone());
            am.timezone_label = Set(row.timezone_label.clone());
            am.weekdays = Set(row.weekdays.clone());
            am.month_day = Set(row.month_day);
            am.valid_from = Set(row.valid_from);
            am.valid_until = Set(row.valid_until);
            am.active = Set(row.active);
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn set_recurrence_rule_enabled(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<RecurrenceRuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: recurrence_rule::ActiveModel = m.into();
            am.active = Set(active);
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    /// 删除规则。已物化的 occurrence 不受影响（仅移除未来来源）。
    pub async fn delete_recurrence_rule(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    /// 全部启用中的规则（跨租户，供物化任务一次评估）。
    pub async fn list_enabled_recurrence_rules(&self) -> Result<Vec<RecurrenceRuleRow>> {
        let rows = Entity::find()
            .filter(Column::Active.eq(true))
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }
}
