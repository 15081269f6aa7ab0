//! Server configuration: the allow-listed directory roots.
//!
//! Loaded once at startup from a JSON document and validated eagerly; an
//! invalid config is fatal. A running server can swap in a freshly loaded
//! config (SIGHUP) without touching the session store.

use crate::guard::PathGuard;
use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Root that is always allow-listed, config or not.
const TMP_ROOT: &str = "/tmp";

/// On-disk schema. Unknown fields are ignored so the schema stays additive.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    allowed_paths: Vec<String>,
    /// Legacy field from the HTTP-transport era. Parsed, unused at runtime.
    allowed_origins: Vec<String>,
    /// Legacy field from the HTTP-transport era. Parsed, unused at runtime.
    port: Option<u16>,
}

/// Validated, immutable view of the configuration.
#[derive(Debug, Clone)]
pub struct Config {
    allowed_paths: BTreeSet<PathBuf>,
    allowed_origins: Vec<String>,
    port: Option<u16>,
}

impl Config {
    /// Default config file location: `$HOME/.config/scout/scout.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::SERVER_NAME)
            .join(format!("{}.json", crate::SERVER_NAME))
    }

    /// Load and validate a config file.
    ///
    /// A missing file at the default location yields the built-in default
    /// (only `/tmp` allow-listed); a missing file at an explicit `--config`
    /// path is an error.
    pub fn load(path: &Path, explicit: bool) -> anyhow::Result<Self> {
        let raw = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str::<RawConfig>(&content)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else if explicit {
            bail!("config file not found: {}", path.display());
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            RawConfig::default()
        };

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> anyhow::Result<Self> {
        let mut allowed_paths = BTreeSet::new();
        for entry in &raw.allowed_paths {
            let path = Path::new(entry);
            if !path.is_absolute() {
                bail!("allowed path must be absolute: {entry}");
            }
            let canonical = path
                .canonicalize()
                .with_context(|| format!("resolving allowed path {entry}"))?;
            if !canonical.is_dir() {
                bail!("allowed path is not a directory: {entry}");
            }
            allowed_paths.insert(canonical);
        }

        // /tmp is always present so a fresh install has somewhere to work.
        if let Ok(tmp) = Path::new(TMP_ROOT).canonicalize()
            && tmp.is_dir()
        {
            allowed_paths.insert(tmp);
        }

        if allowed_paths.is_empty() {
            bail!("no usable allowed paths");
        }

        Ok(Self {
            allowed_paths,
            allowed_origins: raw.allowed_origins,
            port: raw.port,
        })
    }

    #[must_use]
    pub fn allowed_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.allowed_paths.iter()
    }

    #[must_use]
    pub fn is_allowed_path(&self, path: &Path) -> bool {
        self.guard().allowed(path)
    }

    /// A guard over the current root set.
    #[must_use]
    pub fn guard(&self) -> PathGuard {
        PathGuard::new(self.allowed_paths.iter().cloned().collect())
    }

    #[must_use]
    pub fn server_name(&self) -> &'static str {
        crate::SERVER_NAME
    }

    /// JSON view served by the `get_config` tool.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Value {
        json!({
            "server_name": self.server_name(),
            "version": env!("CARGO_PKG_VERSION"),
            "allowed_paths": self
                .allowed_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
            "allowed_origins": self.allowed_origins,
            "port": self.port,
        })
    }
}
