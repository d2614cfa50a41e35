use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// 食品探针判定标准（°C）。单次提交可覆盖此值。
    #[serde(default = "default_food_standard_celsius")]
    pub food_standard_celsius: f64,

    #[serde(default)]
    pub materializer: MaterializerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 完整数据库连接 URL；缺省时使用 `data_dir` 下的 SQLite 文件
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}/foodsafe.db?mode=rwc", self.data_dir),
        }
    }

    /// 打印用连接串，隐藏 URL 中的凭据。
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        match (url.find("://"), url.find('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
            }
            _ => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializerConfig {
    #[serde(default = "default_materializer_enabled")]
    pub enabled: bool,
    /// 物化任务扫描间隔（秒）。重复执行是安全的（冲突行被忽略），
    /// 因此间隔可以远小于一天。
    #[serde(default = "default_materializer_tick_secs")]
    pub tick_secs: u64,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            enabled: default_materializer_enabled(),
            tick_secs: default_materializer_tick_secs(),
        }
    }
}

// ---- Seed file types (used by `init-seed` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub templates: Vec<SeedTemplate>,
    #[serde(default)]
    pub rules: Vec<SeedRule>,
    #[serde(default)]
    pub expectations: Vec<SeedExpectation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTemplate {
    pub tenant_id: String,
    pub location_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRule {
    pub tenant_id: String,
    pub location_id: String,
    /// 同一 seed 文件中模板的 name（按租户 + 门店解析为模板 ID）
    pub template: String,
    pub recurrence_kind: String,
    #[serde(default = "default_seed_due_time")]
    pub due_time: String,
    #[serde(default = "default_seed_timezone")]
    pub timezone_label: String,
    #[serde(default)]
    pub weekdays: Vec<u8>,
    #[serde(default)]
    pub month_day: Option<i32>,
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default = "default_seed_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedExpectation {
    pub tenant_id: String,
    pub location_id: String,
    /// asset / food / delivery
    pub target_kind: String,
    #[serde(default)]
    pub target_ref: Option<String>,
    #[serde(default)]
    pub target_label: Option<String>,
    pub interval_minutes: i64,
    #[serde(default = "default_seed_active")]
    pub active: bool,
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_food_standard_celsius() -> f64 {
    75.0
}

fn default_materializer_enabled() -> bool {
    true
}

fn default_materializer_tick_secs() -> u64 {
    3600
}

fn default_seed_active() -> bool {
    true
}

fn default_seed_due_time() -> String {
    "09:00".to_string()
}

fn default_seed_timezone() -> String {
    "UTC".to_string()
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            database: DatabaseConfig::default(),
            food_standard_celsius: default_food_standard_celsius(),
            materializer: MaterializerConfig::default(),
        }
    }
}
