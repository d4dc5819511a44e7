//! Configuration for the CLI
//!
//! Sources, later wins: built-in defaults, a TOML file, environment
//! variables (after `.env` is loaded), then command-line flags.

use anyhow::Context;
use serde::Deserialize;
use signmate_client::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use signmate_client::ClientConfig;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "signmate.toml";

pub const ENV_API_URL: &str = "SIGNMATE_API_URL";
pub const ENV_TOKEN: &str = "SIGNMATE_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "SIGNMATE_TIMEOUT_SECS";

/// Shape of `signmate.toml`
///
/// ```toml
/// [api]
/// base_url = "http://localhost:5000/api"
/// token = "..."
/// timeout_secs = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api: ApiSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FromStr for FileConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse config TOML")
    }
}

impl FileConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        content.parse()
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl AppConfig {
    /// Load from an explicit file (must exist) or `signmate.toml` in the
    /// working directory (optional), then the process environment.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => Some(FileConfig::from_file(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Some(FileConfig::from_file(default)?)
                } else {
                    None
                }
            }
        };
        Self::resolve(file.unwrap_or_default(), |k| std::env::var(k).ok(), overrides)
    }

    /// Merge the sources. `env` is injected so tests don't touch the process.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> anyhow::Result<Self> {
        let mut config = AppConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        };

        if let Some(url) = file.api.base_url {
            config.base_url = url;
        }
        if let Some(token) = file.api.token {
            config.token = Some(token);
        }
        if let Some(secs) = file.api.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(url) = env(ENV_API_URL) {
            config.base_url = url;
        }
        if let Some(token) = env(ENV_TOKEN) {
            config.token = Some(token);
        }
        if let Some(secs) = env(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(url) = &overrides.base_url {
            config.base_url = url.clone();
        }
        if let Some(token) = &overrides.token {
            config.token = Some(token.clone());
        }

        // An empty token (e.g. `SIGNMATE_TOKEN=`) means "not logged in"
        config.token = config.token.filter(|t| !t.trim().is_empty());

        Ok(config)
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.base_url.clone()).with_timeout(self.timeout);
        match &self.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::resolve(FileConfig::default(), env(&[]), &Overrides::default()).unwrap();
        assert_eq!(
            config,
            AppConfig {
                base_url: "http://localhost:5000/api".into(),
                token: None,
                timeout: Duration::from_secs(30),
            }
        );
    }

    #[test]
    fn test_precedence() {
        let file = FileConfig::from_str(
            r#"
            [api]
            base_url = "http://file/api"
            token = "file-token"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        let env = env(&[(ENV_TOKEN, "env-token"), (ENV_TIMEOUT_SECS, "7")]);
        let overrides = Overrides {
            base_url: Some("http://flag/api".into()),
            token: None,
        };

        let config = AppConfig::resolve(file, env, &overrides).unwrap();
        assert_eq!(config.base_url, "http://flag/api");
        assert_eq!(config.token.as_deref(), Some("env-token"));
        assert_eq!(config.timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_blank_token_means_none() {
        let config = AppConfig::resolve(
            FileConfig::default(),
            env(&[(ENV_TOKEN, "")]),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(config.token, None);
        assert_eq!(config.client_config().token, None);
    }

    #[test]
    fn test_bad_timeout_env() {
        let err = AppConfig::resolve(
            FileConfig::default(),
            env(&[(ENV_TIMEOUT_SECS, "soon")]),
            &Overrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!("[api]\nbase_ulr = \"typo\"".parse::<FileConfig>().is_err());
    }

    #[test]
    fn test_parse_via_from_str() {
        let file: FileConfig = "[api]\ntimeout_secs = 3\n".parse().unwrap();
        assert_eq!(file.api.timeout_secs, Some(3));
        assert_eq!(file.api.base_url, None);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signmate.toml");
        fs::write(&path, "[api]\ntoken = \"abc\"\n").unwrap();
        let file = FileConfig::from_file(&path).unwrap();
        assert_eq!(file.api.token.as_deref(), Some("abc"));

        assert!(FileConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
