use anyhow::Result;
use batchbridge_config::Config;
use camino::Utf8PathBuf;
use clap::Parser;
use log::info;

use crate::utils::styles::{fmt_bold, fmt_dimmed, fmt_success};

#[derive(Debug, Clone, Parser)]
pub struct InitCmd {
    /// Bundle to record in the config, a file path or URL
    #[arg(long)]
    pub bundle: Option<String>,

    /// Overwrite an existing config
    #[arg(long, short)]
    pub force: bool,
}

impl InitCmd {
    pub(crate) fn handle(&self, path: &Utf8PathBuf) -> Result<Config> {
        if path.exists() && !self.force {
            anyhow::bail!(
                "A config already exists at {}, pass {} to overwrite it",
                fmt_dimmed(path.as_str()),
                fmt_bold("--force")
            );
        }

        let mut cfg = Config::default().with_path(path);
        if let Some(bundle) = &self.bundle {
            cfg.bundle_url = Some(super::bundle_url(bundle)?);
        }
        cfg.save()?;

        info!(
            "{}",
            fmt_success(&format!(
                "{name} configuration created: {path}",
                name = fmt_bold("batchbridge"),
                path = fmt_dimmed(cfg.path().as_str()),
            ))
        );

        Ok(cfg)
    }
}
