//! `batchbridge.json` loading and saving

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

#[cfg(test)]
mod tests;

pub const DEFAULT_APP_KEY: &str = "App";
pub const DEFAULT_RENDEZVOUS_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the application script is loaded from (`file://` or `http(s)://`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_url: Option<Url>,

    /// Key the bundle registered its root component under
    #[serde(default = "default_app_key")]
    pub app_key: String,

    /// Props handed to the root component
    #[serde(default = "default_initial_props")]
    pub initial_props: Value,

    /// Minimum wait at each lifecycle rendezvous
    #[serde(default = "default_rendezvous_delay_ms")]
    pub rendezvous_delay_ms: u64,

    /// Plugin modules registered after the internal set
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    #[serde(skip)]
    path: Utf8PathBuf,
}

fn default_app_key() -> String {
    DEFAULT_APP_KEY.to_string()
}

fn default_initial_props() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_rendezvous_delay_ms() -> u64 {
    DEFAULT_RENDEZVOUS_DELAY_MS
}

fn default_plugins() -> Vec<String> {
    vec!["ScrollView".into(), "Navigator".into(), "Page".into()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bundle_url: None,
            app_key: default_app_key(),
            initial_props: default_initial_props(),
            rendezvous_delay_ms: default_rendezvous_delay_ms(),
            plugins: default_plugins(),
            path: Self::default_path(),
        }
    }
}

impl Config {
    pub fn default_path() -> Utf8PathBuf {
        Utf8PathBuf::from("batchbridge.json")
    }

    /// Reads the config at `path`.
    ///
    /// A missing file is an error; use [`Config::default`] and [`Config::save`] to create one.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid config document
    pub fn load(path: &Utf8PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let cfg: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {path}"))?;

        debug!("Loaded config from {path}");
        Ok(cfg.with_path(path))
    }

    #[must_use]
    pub fn with_path(mut self, path: &Utf8PathBuf) -> Self {
        self.path.clone_from(path);
        self
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Writes the config back to the path it was loaded from (or given with [`Config::with_path`])
    ///
    /// # Errors
    ///
    /// Fails if the parent directory cannot be created or the file cannot be written
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.path, contents + "\n").context("Failed to write config file")?;

        debug!("Saved config to {}", self.path);
        Ok(())
    }
}
