use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use foodsafe_storage::ComplianceStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ComplianceStore>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
