use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, TimeZone};
use recon_diff::DiffConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "xmlrecon.toml";

/// Contents of `xmlrecon.toml`. Every table and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub diff: DiffConfig,
}

/// Where the workflows read and write by default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub set_a: PathBuf,
    pub set_b: PathBuf,
    pub output_dir: PathBuf,
    /// Reviewed change file read by `apply`.
    pub input_csv: PathBuf,
    /// Documents `apply` patches; `set_a` when unset.
    pub source_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            set_a: PathBuf::from("data/set_a"),
            set_b: PathBuf::from("data/set_b"),
            output_dir: PathBuf::from("output"),
            input_csv: PathBuf::from("input/xml_changes.csv"),
            source_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn source(&self) -> &Path {
        self.source_dir.as_deref().unwrap_or(&self.set_a)
    }

    pub fn changes_csv(&self, stamp: &str) -> PathBuf {
        self.output_dir.join(format!("xml_changes_{stamp}.csv"))
    }

    pub fn updated_dir(&self, stamp: &str) -> PathBuf {
        self.output_dir.join(format!("updated_xmls_{stamp}"))
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.diff.validate()?;
        Ok(config)
    }

    /// Load `path`, or `xmlrecon.toml` in the working directory when no
    /// path is given. A missing file yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Timestamp used in output names, e.g. `20240131_142501`.
pub fn timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y%m%d_%H%M%S").to_string()
}
