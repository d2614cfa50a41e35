use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::checklist_template::{self, Column, Entity};
use crate::store::ComplianceStore;

/// 检查表模板数据行（来自 checklist_templates 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistTemplateRow {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: checklist_template::Model) -> ChecklistTemplateRow {
    ChecklistTemplateRow {
        id: m.id,
        tenant_id: m.tenant_id,
        location_id: m.location_id,
        name: m.name,
        description: m.description,
        active: m.active,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ComplianceStore {
    pub async fn insert_checklist_template(
        &self,
        row: &ChecklistTemplateRow,
    ) -> Result<ChecklistTemplateRow> {
        let now = Utc::now().fixed_offset();
        let am = checklist_template::ActiveModel {
            id: Set(row.id.clone()),
            tenant_id: Set(row.tenant_id.clone()),
            location_id: Set(row.location_id.clone()),
            name: Set(row.name.clone()),
            description: Set(row.description.clone()),
            active: Set(row.active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_checklist_template_by_id(
        &self,
        id: &str,
    ) -> Result<Option<ChecklistTemplateRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_checklist_templates(
        &self,
        tenant_id: &str,
        location_id: &str,
        active: Option<bool>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChecklistTemplateRow>> {
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

    pub async fn count_checklist_templates(
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

    pub async fn set_checklist_template_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<ChecklistTemplateRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: checklist_template::ActiveModel = m.into();
            am.active = Set(active);
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_checklist_template(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    /// 所有模板 ID（供物化任务校验规则指向的模板是否仍然存在）。
    pub async fn list_checklist_template_ids(&self) -> Result<Vec<String>> {
        let rows = Entity::find().all(self.db()).await?;
        Ok(rows.into_iter().map(|m| m.id).collect())
    }
}
