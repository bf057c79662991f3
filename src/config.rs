use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::transport::TransportConfig;
use crate::utils::version::NodeVersion;

const CONFIG_FILE: &str = "config.json";

/// Persisted defaults, overridden by environment and flags.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_dir: Option<PathBuf>,
    pub proxy: Option<String>,
    pub insecure: bool,
}

/// Values supplied on the command line (`NVM_DIR` arrives through `base_dir`).
#[derive(Debug, Default, Clone)]
pub struct Flags {
    pub base_dir: Option<PathBuf>,
    pub proxy: Option<String>,
    pub insecure: bool,
}

/// Directory layout: `<versions_dir>/v<version>/` per install, with scratch
/// files and locks under `<versions_dir>/.staging/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFetcherDirs {
    pub versions_dir: PathBuf,
}

impl NodeFetcherDirs {
    pub fn new(versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
        }
    }

    pub fn version_dir(&self, version: &NodeVersion) -> PathBuf {
        self.versions_dir.join(version.tag())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.versions_dir.join(".staging")
    }

    pub fn lock_path(&self, version: &NodeVersion) -> PathBuf {
        self.staging_dir().join(format!("{}.lock", version.tag()))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub dirs: NodeFetcherDirs,
    pub transport: TransportConfig,
}

impl Settings {
    /// Reads the config file and process environment once, at startup.
    pub fn load(flags: &Flags) -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "node-fetcher", "node-fetcher")
            .context("Failed to determine project directories")?;
        let config = load_config(project_dirs.config_dir())?;
        let default_dir = project_dirs.data_dir().join("versions");

        Self::resolve(flags, |key| std::env::var(key).ok(), config, default_dir)
    }

    /// Flags win over environment, environment over the config file.
    pub fn resolve(
        flags: &Flags,
        env: impl Fn(&str) -> Option<String>,
        config: Config,
        default_dir: PathBuf,
    ) -> Result<Self> {
        let versions_dir = flags
            .base_dir
            .clone()
            .or(config.base_dir)
            .unwrap_or(default_dir);

        let proxy = flags
            .proxy
            .clone()
            .or_else(|| {
                proxy_from_parts(
                    env("PROXY_HOST").as_deref(),
                    env("PROXY_PORT").as_deref(),
                    env("PROXY_USER").as_deref(),
                    env("PROXY_PASS").as_deref(),
                )
            })
            .or(config.proxy)
            .filter(|p| !p.trim().is_empty())
            .map(|p| parse_proxy(&p))
            .transpose()?;

        let insecure = flags.insecure
            || env("IGNORE_SSL").is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
            || config.insecure;

        Ok(Self {
            dirs: NodeFetcherDirs::new(versions_dir),
            transport: TransportConfig {
                proxy,
                accept_invalid_certs: insecure,
            },
        })
    }
}

/// `http://[user:pass@]host:port`, or nothing unless both host and port are set.
pub fn proxy_from_parts(
    host: Option<&str>,
    port: Option<&str>,
    user: Option<&str>,
    pass: Option<&str>,
) -> Option<String> {
    let host = host.map(str::trim).filter(|h| !h.is_empty())?;
    let port = port.map(str::trim).filter(|p| !p.is_empty())?;

    match (user, pass) {
        (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
            Some(format!("http://{user}:{pass}@{host}:{port}"))
        }
        _ => Some(format!("http://{host}:{port}")),
    }
}

fn parse_proxy(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    Url::parse(&candidate).with_context(|| format!("Invalid proxy URL '{raw}'"))
}

pub fn load_config(config_dir: &Path) -> Result<Config> {
    let config_path = config_dir.join(CONFIG_FILE);

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(config)
    } else {
        let config = Config::default();
        save_config(config_dir, &config)?;
        Ok(config)
    }
}

pub fn save_config(config_dir: &Path, config: &Config) -> Result<()> {
    fs::create_dir_all(config_dir)?;
    let config_path = config_dir.join(CONFIG_FILE);

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)?;

    Ok(())
}
