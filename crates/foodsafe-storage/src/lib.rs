//! Persistence layer for the foodsafe service.
//!
//! A single SeaORM-managed database (SQLite by default, WAL mode) holds
//! checklist templates, recurrence rules, materialized occurrences,
//! monitoring expectations, temperature readings and corrective actions.
//! All access goes through [`store::ComplianceStore`].

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::{
    ChecklistTemplateRow, ComplianceStore, CorrectiveActionRow, ExpectationRow, OccurrenceFilter,
    OccurrenceRow, ReadingRow, RecurrenceRuleRow,
};
