use crate::core::service::ServiceSettings;
use crate::utils::error::{Result, ShopError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SEARCH_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub service: Option<ServiceConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub endpoint: String,
    pub index: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub max_hits: Option<usize>,
    pub max_facets: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub request_timeout_seconds: Option<u64>,
    pub recommend_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_SEARCH_TIMEOUT_SECONDS))
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(0)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(200))
    }

    pub fn max_hits(&self) -> usize {
        self.max_hits.unwrap_or(100)
    }

    pub fn max_facets(&self) -> usize {
        self.max_facets.unwrap_or(20)
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShopError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SEARCH_ENDPOINT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShopError::Config {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn max_connections(&self) -> u32 {
        self.database.max_connections.unwrap_or(5)
    }

    /// Budget applied to each request when the caller does not bring a deadline.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.service
            .as_ref()
            .and_then(|s| s.request_timeout_seconds)
            .map(Duration::from_secs)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            search_timeout: self.search.timeout(),
            recommend_limit: self.service.as_ref().and_then(|s| s.recommend_limit),
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("database.url", &self.database.url)?;
        if !self.database.url.starts_with("sqlite:") {
            return Err(ShopError::invalid_argument(
                "database.url",
                "Only sqlite: URLs are supported",
            ));
        }
        validate_positive_number("database.max_connections", self.max_connections() as usize, 1)?;

        validate_url("search.endpoint", &self.search.endpoint)?;
        validate_non_empty_string("search.index", &self.search.index)?;
        if let Some(seconds) = self.search.timeout_seconds {
            validate_positive_number("search.timeout_seconds", seconds as usize, 1)?;
        }
        validate_positive_number("search.max_hits", self.search.max_hits(), 1)?;

        if let Some(limit) = self.service.as_ref().and_then(|s| s.recommend_limit) {
            validate_positive_number("service.recommend_limit", limit, 1)?;
        }
        Ok(())
    }
}
