use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::corrective_action::{self, Column, Entity};
use crate::store::ComplianceStore;

/// 纠正措施数据行（来自 corrective_actions 表）
///
/// 当记录的温度判定为需要处理时自动创建，由操作员处理后关闭。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectiveActionRow {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    /// 触发该措施的温度记录
    pub reading_id: Option<String>,
    /// open / resolved
    pub status: String,
    /// 触发时的判定等级（warn / fail）
    pub severity: String,
    pub description: String,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: corrective_action::Model) -> CorrectiveActionRow {
    CorrectiveActionRow {
        id: m.id,
        tenant_id: m.tenant_id,
        location_id: m.location_id,
        reading_id: m.reading_id,
        status: m.status,
        severity: m.severity,
        description: m.description,
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ComplianceStore {
    pub async fn insert_corrective_action(
        &self,
        row: &CorrectiveActionRow,
    ) -> Result<CorrectiveActionRow> {
        let now = Utc::now().fixed_offset();
        let am = corrective_action::ActiveModel {
            id: Set(row.id.clone()),
            tenant_id: Set(row.tenant_id.clone()),
            location_id: Set(row.location_id.clone()),
            reading_id: Set(row.reading_id.clone()),
            status: Set(row.status.clone()),
            severity: Set(row.severity.clone()),
            description: Set(row.description.clone()),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn list_corrective_actions(
        &self,
        tenant_id: &str,
        location_id: &str,
        status: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CorrectiveActionRow>> {
        let mut q = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id));
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s));
        }
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_corrective_actions(
        &self,
        tenant_id: &str,
        location_id: &str,
        status: Option<&str>,
    ) -> Result<u64> {
        let mut q = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id));
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s));
        }
        Ok(q.count(self.db()).await?)
    }

    pub async fn resolve_corrective_action(
        &self,
        id: &str,
    ) -> Result<Option<CorrectiveActionRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: corrective_action::ActiveModel = m.into();
            am.status = Set("resolved".to_string());
            am.resolved_at = Set(Some(now));
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }
}
