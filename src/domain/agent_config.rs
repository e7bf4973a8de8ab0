//! Agent run configuration.

use std::path::PathBuf;

pub const DEFAULT_GOAL: &str = "Fetch TSLA, calculate SMA, then backtest SMA strategy";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHART_DIR: &str = "charts";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProvider {
    OpenAi,
    Script,
}

impl OracleProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Some(OracleProvider::OpenAi),
            "script" => Some(OracleProvider::Script),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProvider {
    Yahoo,
    Csv,
}

impl DataProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "yahoo" => Some(DataProvider::Yahoo),
            "csv" => Some(DataProvider::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub script_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub provider: DataProvider,
    pub csv_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub goal: String,
    /// `None` runs until the oracle finishes or a backtest completes.
    pub max_steps: Option<usize>,
    pub chart_dir: PathBuf,
    pub oracle: OracleConfig,
    pub data: DataConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            goal: DEFAULT_GOAL.to_string(),
            max_steps: None,
            chart_dir: PathBuf::from(DEFAULT_CHART_DIR),
            oracle: OracleConfig {
                provider: OracleProvider::OpenAi,
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                temperature: 0.0,
                timeout_secs: 60,
                script_path: None,
            },
            data: DataConfig {
                provider: DataProvider::Yahoo,
                csv_dir: None,
                timeout_secs: 30,
            },
        }
    }
}
