use anyhow::Result;
use chrono::{DateTime, Utc};
use foodsafe_common::types::{OccurrenceDraft, OccurrenceStatus};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::occurrence::{self, Column, Entity};
use crate::store::ComplianceStore;

/// 检查表执行实例数据行（来自 occurrences 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceRow {
    pub id: String,
    /// 产生该实例的规则；手工创建时为空
    pub rule_id: Option<String>,
    pub tenant_id: String,
    pub location_id: String,
    pub template_id: String,
    pub due_at: DateTime<Utc>,
    /// open / completed
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 执行实例列表过滤器
#[derive(Debug, Clone, Default)]
pub struct OccurrenceFilter {
    pub status_eq: Option<String>,
    pub due_gte: Option<DateTime<Utc>>,
    pub due_lte: Option<DateTime<Utc>>,
}

fn to_row(m: occurrence::Model) -> OccurrenceRow {
    OccurrenceRow {
        id: m.id,
        rule_id: m.rule_id,
        tenant_id: m.tenant_id,
        location_id: m.location_id,
        template_id: m.template_id,
        due_at: m.due_at.with_timezone(&Utc),
        status: m.status,
        completed_at: m.completed_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ComplianceStore {
    /// 批量写入物化草稿，冲突行静默忽略。
    ///
    /// 幂等性的唯一保证：`UNIQUE(rule_id, due_at)` 索引 + `ON CONFLICT DO
    /// NOTHING`。同一天重复执行物化任务只会新增 0 行。返回实际插入行数
    /// （可能小于草稿数）。
    pub async fn insert_occurrences_ignoring_conflicts(
        &self,
        drafts: &[OccurrenceDraft],
    ) -> Result<u64> {
        if drafts.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().fixed_offset();
        let models: Vec<occurrence::ActiveModel> = drafts
            .iter()
            .map(|draft| occurrence::ActiveModel {
                id: Set(foodsafe_common::id::next_id()),
                rule_id: Set(Some(draft.rule_id.clone())),
                tenant_id: Set(draft.tenant_id.clone()),
                location_id: Set(draft.location_id.clone()),
                template_id: Set(draft.template_id.clone()),
                due_at: Set(draft.due_at.fixed_offset()),
                status: Set(draft.status.to_string()),
                completed_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .collect();

        let inserted = Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([Column::RuleId, Column::DueAt])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db())
            .await?;
        Ok(inserted)
    }

    pub async fn get_occurrence_by_id(&self, id: &str) -> Result<Option<OccurrenceRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_occurrences(
        &self,
        tenant_id: &str,
        location_id: &str,
        filter: &OccurrenceFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OccurrenceRow>> {
        let rows = occurrence_query(tenant_id, location_id, filter)
            .order_by(Column::DueAt, Order::Asc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_occurrences(
        &self,
        tenant_id: &str,
        location_id: &str,
        filter: &OccurrenceFilter,
    ) -> Result<u64> {
        Ok(occurrence_query(tenant_id, location_id, filter)
            .count(self.db())
            .await?)
    }

    /// 更新执行实例状态；completed 时写入完成时间。
    pub async fn set_occurrence_status(
        &self,
        id: &str,
        status: OccurrenceStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<OccurrenceRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: occurrence::ActiveModel = m.into();
            am.status = Set(status.to_string());
            am.completed_at = Set(completed_at.map(|t| t.fixed_offset()));
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }
}

fn occurrence_query(
    tenant_id: &str,
    location_id: &str,
    filter: &OccurrenceFilter,
) -> sea_orm::Select<Entity> {
    let mut q = Entity::find()
        .filter(Column::TenantId.eq(tenant_id))
        .filter(Column::LocationId.eq(location_id));
    if let Some(status) = &filter.status_eq {
        q = q.filter(Column::Status.eq(status));
    }
    if let Some(from) = filter.due_gte {
        q = q.filter(Column::DueAt.gte(from.fixed_offset()));
    }
    if let Some(to) = filter.due_lte {
        q = q.filter(Column::DueAt.lte(to.fixed_offset()));
    }
    q
}
