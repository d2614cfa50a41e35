use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::monitoring_expectation::{self, Column, Entity};
use crate::store::ComplianceStore;

/// 监测预期数据行（来自 monitoring_expectations 表）
///
/// `target_kind` 取值：asset / food / delivery。delivery 无具体目标，
/// `target_ref` 为空。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationRow {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub target_kind: String,
    pub target_ref: Option<String>,
    pub target_label: Option<String>,
    pub interval_minutes: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: monitoring_expectation::Model) -> ExpectationRow {
    ExpectationRow {
        id: m.id,
        tenant_id: m.tenant_id,
        location_id: m.location_id,
        target_kind: m.target_kind,
        target_ref: m.target_ref,
        target_label: m.target_label,
        interval_minutes: m.interval_minutes,
        active: m.active,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ComplianceStore {
    pub async fn insert_expectation(&self, row: &ExpectationRow) -> Result<ExpectationRow> {
        let now = Utc::now().fixed_offset();
        let am = monitoring_expectation::ActiveModel {
            id: Set(row.id.clone()),
            tenant_id: Set(row.tenant_id.clone()),
            location_id: Set(row.location_id.clone()),
            target_kind: Set(row.target_kind.clone()),
            target_ref: Set(row.target_ref.clone()),
            target_label: Set(row.target_label.clone()),
            interval_minutes: Set(row.interval_minutes),
            active: Set(row.active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_expectation_by_id(&self, id: &str) -> Result<Option<ExpectationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_expectations(
        &self,
        tenant_id: &str,
        location_id: &str,
        active: Option<bool>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExpectationRow>> {
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

    pub async fn count_expectations(
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

    /// 仪表盘用：当前启用的全部预期（不分页）。
    pub async fn list_active_expectations(
        &self,
        tenant_id: &str,
        location_id: &str,
    ) -> Result<Vec<ExpectationRow>> {
        let rows = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id))
            .filter(Column::Active.eq(true))
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn update_expectation(
        &self,
        id: &str,
        row: &ExpectationRow,
    ) -> Result<Option<ExpectationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: monitoring_expectation::ActiveModel = m.into();
            am.target_kind = Set(row.target_kind.clone());
            am.target_ref = Set(row.target_ref.clone());
            am.target_label = Set(row.target_label.clone());
            am.interval_minutes = Set(row.interval_minutes);
            am.active = Set(row.active);
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn set_expectation_enabled(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<ExpectationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: monitoring_expectation::ActiveModel = m.into();
            am.active = Set(active);
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_expectation(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}
