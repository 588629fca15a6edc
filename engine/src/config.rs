//! Configuration: `~/.spectre/config.toml` plus `SPECTRE_*` env overrides.

use std::path::PathBuf;
use std::{env, fs};

use serde::Deserialize;

use spectre_providers::ApiConfig;
use spectre_tools::backup::BackupStore;

const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_INPUT_TOKENS: u32 = 16_000;
const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 8;

/// Raw on-disk configuration. Every field is optional; [`Settings`] applies
/// defaults and environment overrides.
#[derive(Debug, Default, Deserialize)]
pub struct SpectreConfig {
    pub api: Option<ApiSection>,
    pub context: Option<ContextSection>,
    pub tools: Option<ToolsSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextSection {
    pub max_input_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolsSection {
    pub backup_dir: Option<PathBuf>,
    pub max_tool_iterations: Option<u32>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl SpectreConfig {
    /// Location of the config file: `~/.spectre/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".spectre").join("config.toml"))
    }

    /// Load the config file if it exists. A missing file is `Ok(None)`;
    /// an unreadable or malformed file is an error worth surfacing.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Merge file values with defaults and `SPECTRE_*` environment
    /// overrides (env wins).
    #[must_use]
    pub fn into_settings(self) -> Settings {
        let api = self.api.unwrap_or_default();
        let context = self.context.unwrap_or_default();
        let tools = self.tools.unwrap_or_default();

        let base_url = env::var("SPECTRE_API_BASE_URL")
            .ok()
            .or(api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = env::var("SPECTRE_API_KEY").ok().or(api.key);
        let model = env::var("SPECTRE_MODEL")
            .ok()
            .or(api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Settings {
            api: ApiConfig {
                base_url,
                api_key,
                model,
                max_tokens: api.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                temperature: api.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            },
            max_input_tokens: context.max_input_tokens.unwrap_or(DEFAULT_MAX_INPUT_TOKENS),
            backup_dir: tools.backup_dir.unwrap_or_else(BackupStore::default_dir),
            max_tool_iterations: tools
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS)
                .max(1),
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiConfig,
    pub max_input_tokens: u32,
    pub backup_dir: PathBuf,
    pub max_tool_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        SpectreConfig::default().into_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::SpectreConfig;
    use std::path::PathBuf;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let settings = SpectreConfig::parse("").unwrap().into_settings();
        assert_eq!(settings.api.model, "gpt-3.5-turbo");
        assert_eq!(settings.api.max_tokens, 2048);
        assert_eq!(settings.max_tool_iterations, 8);
        assert!(settings.backup_dir.ends_with(".spectre/backups"));
    }

    #[test]
    fn file_values_override_defaults() {
        let text = r#"
            [api]
            base_url = "http://10.0.0.5:8080/v1"
            model = "qwen2.5-coder"
            temperature = 0.2

            [tools]
            backup_dir = "/tmp/spectre-test-backups"
            max_tool_iterations = 3
        "#;
        let settings = SpectreConfig::parse(text).unwrap().into_settings();
        assert_eq!(settings.api.base_url, "http://10.0.0.5:8080/v1");
        assert_eq!(settings.api.model, "qwen2.5-coder");
        assert!((settings.api.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.backup_dir, PathBuf::from("/tmp/spectre-test-backups"));
        assert_eq!(settings.max_tool_iterations, 3);
    }

    #[test]
    fn unknown_sections_are_tolerated() {
        let text = "[future]\nflag = true\n";
        assert!(SpectreConfig::parse(text).is_ok());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(SpectreConfig::parse("[api\nbroken").is_err());
    }

    #[test]
    fn iteration_floor_is_one() {
        let text = "[tools]\nmax_tool_iterations = 0\n";
        let settings = SpectreConfig::parse(text).unwrap().into_settings();
        assert_eq!(settings.max_tool_iterations, 1);
    }
}
