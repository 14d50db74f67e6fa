//! Runtime settings: environments, role credentials and worker pool size

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SCENARIO_";

/// Scenario tester settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Batches at least this large run on a pool of this many workers
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// SQLite result store path
    #[serde(default = "crate::default_db_path")]
    pub database_path: PathBuf,

    /// Web API listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Named deployment targets, keyed by label (e.g. "Development")
    #[serde(default = "default_environments")]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

/// One named deployment target
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentConfig {
    /// Base URL of the application under test
    #[serde(default)]
    pub base_url: String,

    /// Credentials keyed by role (e.g. "backoffice", "partner1")
    #[serde(default)]
    pub credentials: BTreeMap<String, Credentials>,
}

/// Username/password pair for one role
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_environments() -> BTreeMap<String, EnvironmentConfig> {
    let mut environments = BTreeMap::new();
    environments.insert("Development".to_string(), EnvironmentConfig::default());
    environments.insert("Staging".to_string(), EnvironmentConfig::default());
    environments.insert(
        "Local".to_string(),
        EnvironmentConfig {
            base_url: "http://127.0.0.1:8000".to_string(),
            credentials: BTreeMap::new(),
        },
    );
    environments
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            database_path: crate::default_db_path(),
            listen_addr: default_listen_addr(),
            environments: default_environments(),
        }
    }
}

impl Settings {
    /// Load settings from file (defaults when missing), then apply
    /// `SCENARIO_*` overrides from the process environment
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        settings.apply_overrides(std::env::vars());
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides of the form:
    ///
    /// - `SCENARIO_WORKERS=8`
    /// - `SCENARIO_<ENV>_URL=https://...`
    /// - `SCENARIO_<ENV>_<ROLE>_USERNAME=...` / `SCENARIO_<ENV>_<ROLE>_PASSWORD=...`
    ///
    /// `<ENV>` matches a configured environment key case-insensitively; the
    /// role is stored lowercased.
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            if rest == "WORKERS" {
                if let Ok(n) = value.trim().parse() {
                    self.worker_pool_size = n;
                }
                continue;
            }

            for (key, env) in self.environments.iter_mut() {
                let upper = key.to_uppercase();
                let Some(tail) = rest
                    .strip_prefix(upper.as_str())
                    .and_then(|t| t.strip_prefix('_'))
                else {
                    continue;
                };

                if tail == "URL" {
                    env.base_url = value.clone();
                } else if let Some(role) = tail.strip_suffix("_USERNAME") {
                    env.credentials.entry(role.to_lowercase()).or_default().username = value.clone();
                } else if let Some(role) = tail.strip_suffix("_PASSWORD") {
                    env.credentials.entry(role.to_lowercase()).or_default().password = value.clone();
                }
            }
        }
    }

    /// Check invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Environment labels in stable order
    pub fn environment_keys(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    /// Configured base URL for an environment, if non-empty
    pub fn base_url(&self, environment: &str) -> Option<&str> {
        self.environments
            .get(environment)
            .map(|env| env.base_url.as_str())
            .filter(|url| !url.is_empty())
    }

    /// Reverse lookup: which environment a base URL belongs to
    pub fn environment_for_url(&self, base_url: &str) -> Option<&str> {
        let wanted = base_url.trim_end_matches('/');
        self.environments
            .iter()
            .find(|(_, env)| !env.base_url.is_empty() && env.base_url.trim_end_matches('/') == wanted)
            .map(|(key, _)| key.as_str())
    }

    /// Credentials for (environment, role), if both fields are set
    pub fn credentials(&self, environment: &str, role: &str) -> Option<&Credentials> {
        self.environments
            .get(environment)
            .and_then(|env| env.credentials.get(role))
            .filter(|c| c.is_configured())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.worker_pool_size, 4);
        assert_eq!(
            settings.environment_keys(),
            vec!["Development", "Local", "Staging"]
        );
        assert_eq!(settings.base_url("Local"), Some("http://127.0.0.1:8000"));
        assert_eq!(settings.base_url("Staging"), None);
        assert_eq!(settings.base_url("Nowhere"), None);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(vars(&[
            ("SCENARIO_WORKERS", "8"),
            ("SCENARIO_STAGING_URL", "https://staging.example.com"),
            ("SCENARIO_STAGING_PARTNER1_USERNAME", "partner@example.com"),
            ("SCENARIO_STAGING_PARTNER1_PASSWORD", "secret"),
            ("SCENARIO_STAGING_BACKOFFICE_USERNAME", "admin"),
            ("UNRELATED", "ignored"),
        ]));

        assert_eq!(settings.worker_pool_size, 8);
        assert_eq!(settings.base_url("Staging"), Some("https://staging.example.com"));
        let creds = settings.credentials("Staging", "partner1").unwrap();
        assert_eq!(creds.username, "partner@example.com");
        // Password missing, so not usable
        assert!(settings.credentials("Staging", "backoffice").is_none());
        assert!(settings.credentials("Local", "partner1").is_none());
    }

    #[test]
    fn test_environment_for_url_ignores_trailing_slash() {
        let settings = Settings::default();
        assert_eq!(settings.environment_for_url("http://127.0.0.1:8000/"), Some("Local"));
        assert_eq!(settings.environment_for_url("http://other"), None);
        assert_eq!(settings.environment_for_url(""), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("scenario-tester.toml");

        let mut settings = Settings::default();
        settings.worker_pool_size = 2;
        settings
            .environments
            .get_mut("Local")
            .unwrap()
            .credentials
            .insert(
                "backoffice".to_string(),
                Credentials {
                    username: "bo".to_string(),
                    password: "pw".to_string(),
                },
            );
        settings.save(&path).unwrap();

        let loaded: Settings = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            worker_pool_size = 3

            [environments.Local]
            base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.worker_pool_size, 3);
        assert_eq!(parsed.listen_addr, "127.0.0.1:8080");
        assert_eq!(parsed.environment_keys(), vec!["Local"]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let settings = Settings {
            worker_pool_size: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }
}
