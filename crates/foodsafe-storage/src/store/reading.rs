use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::reading::{self, Column, Entity};
use crate::store::ComplianceStore;

/// 温度记录数据行（来自 readings 表）。记录一经写入不可修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRow {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    /// fridge / freezer / food / delivery
    pub kind: String,
    pub target_ref: Option<String>,
    pub value_celsius: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

fn to_row(m: reading::Model) -> ReadingRow {
    ReadingRow {
        id: m.id,
        tenant_id: m.tenant_id,
        location_id: m.location_id,
        kind: m.kind,
        target_ref: m.target_ref,
        value_celsius: m.value_celsius,
        recorded_at: m.recorded_at.with_timezone(&Utc),
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl ComplianceStore {
    pub async fn insert_reading(&self, row: &ReadingRow) -> Result<ReadingRow> {
        let now = Utc::now().fixed_offset();
        let am = reading::ActiveModel {
            id: Set(row.id.clone()),
            tenant_id: Set(row.tenant_id.clone()),
            location_id: Set(row.location_id.clone()),
            kind: Set(row.kind.clone()),
            target_ref: Set(row.target_ref.clone()),
            value_celsius: Set(row.value_celsius),
            recorded_at: Set(row.recorded_at.fixed_offset()),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    /// 时间区间内的记录，按 `recorded_at` 倒序（最新在前，不分页）。
    /// 仪表盘聚合依赖这一排序：同一关联键只取首条。
    pub async fn list_readings_in_range(
        &self,
        tenant_id: &str,
        location_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReadingRow>> {
        let rows = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id))
            .filter(Column::RecordedAt.gte(from.fixed_offset()))
            .filter(Column::RecordedAt.lte(to.fixed_offset()))
            .order_by(Column::RecordedAt, Order::Desc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn list_readings(
        &self,
        tenant_id: &str,
        location_id: &str,
        kind: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReadingRow>> {
        let mut q = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id))
            .filter(Column::RecordedAt.gte(from.fixed_offset()))
            .filter(Column::RecordedAt.lte(to.fixed_offset()));
        if let Some(k) = kind {
            q = q.filter(Column::Kind.eq(k));
        }
        let rows = q
            .order_by(Column::RecordedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_readings(
        &self,
        tenant_id: &str,
        location_id: &str,
        kind: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let mut q = Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::LocationId.eq(location_id))
            .filter(Column::RecordedAt.gte(from.fixed_offset()))
            .filter(Column::RecordedAt.lte(to.fixed_offset()));
        if let Some(k) = kind {
            q = q.filter(Column::Kind.eq(k));
        }
        Ok(q.count(self.db()).await?)
    }
}
