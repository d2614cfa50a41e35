pub mod checklist_template;
pub mod corrective_action;
pub mod monitoring_expectation;
pub mod occurrence;
pub mod reading;
pub mod recurrence_rule;
