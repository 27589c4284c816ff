use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use recon_core::ProjectKey;

use crate::binding::Binding;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub binding: BindingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindingConfig {
    /// Absent means standalone: nothing is correlated with the server.
    #[serde(default)]
    pub project_key: Option<String>,
}

impl Config {
    pub fn default_for_repo(project_key: Option<&str>) -> Self {
        Self {
            server: ServerConfig {
                url: "http://localhost:9000".to_string(),
                token: None,
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            },
            binding: BindingConfig {
                project_key: project_key.map(str::to_string),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse recon.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn binding(&self) -> Binding {
        match self.binding.project_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                Binding::Connected { project_key: ProjectKey::from_str(key) }
            }
            _ => Binding::Standalone,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Server token, with `$VAR` / `~` expanded so secrets can stay in the environment.
    pub fn token(&self) -> Result<Option<String>> {
        self.server
            .token
            .as_deref()
            .map(|t| {
                shellexpand::full(t)
                    .map(|s| s.into_owned())
                    .with_context(|| "expand server token")
            })
            .transpose()
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(".recon").join("recon.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = Config::config_path(dir.path());
        let cfg = Config::default_for_repo(Some("my-project"));
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn missing_project_key_is_standalone() {
        let cfg: Config = toml::from_str("[server]\nurl = \"http://x\"\n").unwrap();
        assert_eq!(cfg.binding(), Binding::Standalone);
        assert_eq!(cfg.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let cfg = Config::default_for_repo(Some("  "));
        assert_eq!(cfg.binding(), Binding::Standalone);
    }

    #[test]
    fn project_key_binds() {
        let cfg = Config::default_for_repo(Some("proj"));
        assert_eq!(cfg.binding(), Binding::Connected { project_key: ProjectKey::from_str("proj") });
    }

    #[test]
    fn token_expands_environment() {
        std::env::set_var("RECON_TEST_TOKEN", "secret");
        let mut cfg = Config::default_for_repo(None);
        cfg.server.token = Some("$RECON_TEST_TOKEN".into());
        assert_eq!(cfg.token().unwrap().as_deref(), Some("secret"));
    }
}
