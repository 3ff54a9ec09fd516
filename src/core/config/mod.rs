use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_VAR: &str = "GROWTHDESK_CONFIG";
pub const ENV_PREFIX: &str = "GROWTHDESK_";
const DEFAULT_CONFIG_FILE: &str = "growthdesk.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Invalid(e.to_string())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub seo: SeoConfig,
    pub tickets: TicketsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// The AI-backed stages only run with a usable key.
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoConfig {
    pub mock_latency_ms: u64,
    pub stage_timeout_secs: u64,
    pub keyword_count: usize,
    pub title_count: usize,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            mock_latency_ms: 800,
            stage_timeout_secs: 90,
            keyword_count: 10,
            title_count: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketsConfig {
    pub seed_demo_data: bool,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
        }
    }
}

impl AppConfig {
    /// Defaults, then `growthdesk.toml` (or `$GROWTHDESK_CONFIG`), then
    /// `GROWTHDESK_*` environment variables with `__` between sections.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_figment(Self::figment(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(path)),
        )
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract()?;
        config.normalize();
        debug!(
            "Config loaded: server={}:{}, llm_enabled={}, model={}",
            config.server.host, config.server.port, config.llm.enabled, config.llm.model
        );
        Ok(config)
    }

    fn normalize(&mut self) {
        if self.seo.keyword_count == 0 {
            warn!("seo.keyword_count must be at least 1, setting to default 10");
            self.seo.keyword_count = 10;
        }

        if self.seo.title_count == 0 {
            warn!("seo.title_count must be at least 1, setting to default 5");
            self.seo.title_count = 5;
        }

        if self.seo.stage_timeout_secs < 5 {
            warn!(
                "seo.stage_timeout_secs {} is too low, setting to minimum of 5 seconds",
                self.seo.stage_timeout_secs
            );
            self.seo.stage_timeout_secs = 5;
        }

        while self.llm.base_url.ends_with('/') {
            self.llm.base_url.pop();
        }

        if self.llm.enabled && !self.llm.is_usable() {
            warn!("llm.enabled is set but no api_key is configured, AI stages fall back to templates");
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn stage_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.seo.stage_timeout_secs)
    }

    pub fn mock_latency(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.seo.mock_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::from_file(Path::new("/nonexistent/growthdesk.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.seo.keyword_count, 10);
        assert!(!config.llm.is_usable());
        assert!(config.tickets.seed_demo_data);
    }

    #[test]
    fn test_file_overrides_and_clamping() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[llm]
enabled = true
api_key = "sk-test"
base_url = "http://localhost:1234/v1/"

[seo]
keyword_count = 0
stage_timeout_secs = 1
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.bind_address(), "127.0.0.1:9090");
        assert!(config.llm.is_usable());
        assert_eq!(config.llm.base_url, "http://localhost:1234/v1");
        assert_eq!(config.seo.keyword_count, 10);
        assert_eq!(config.seo.stage_timeout_secs, 5);
    }

    #[test]
    fn test_blank_key_is_not_usable() {
        let llm = LlmConfig {
            enabled: true,
            api_key: Some("  ".to_string()),
            ..LlmConfig::default()
        };
        assert!(!llm.is_usable());
    }
}
