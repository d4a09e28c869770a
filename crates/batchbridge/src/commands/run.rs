use std::time::Duration;

use anyhow::{Context, Result};
use batchbridge_config::Config;
use bridge_core::{BridgeEngine, Rendezvous};
use clap::Parser;
use deno_channel::DenoChannel;
use log::{error, info, warn};
use serde_json::Value;

use crate::{
    plugins,
    utils::styles::{fmt_bold, fmt_dimmed, fmt_success},
};

#[derive(Debug, Clone, Parser)]
pub struct RunCmd {
    /// Application bundle, a file path or an http(s) URL. Overrides `bundle_url` from the config
    pub bundle: Option<String>,

    /// Key the bundle registered its root component under
    #[arg(long)]
    pub app_key: Option<String>,

    /// Initial props for the root component, as a JSON object
    #[arg(long, value_parser = parse_props)]
    pub props: Option<Value>,

    /// Print the view tree as JSON on exit
    #[arg(long)]
    pub dump_tree: bool,

    /// Stop once no call, callback or timer is pending instead of waiting for Ctrl-C
    #[arg(long)]
    pub until_idle: bool,
}

pub(crate) fn parse_props(raw: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(props @ Value::Object(_)) => Ok(props),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}

impl RunCmd {
    pub(crate) async fn handle(&self, cfg: Config) -> Result<Config> {
        let bundle_url = match &self.bundle {
            Some(bundle) => super::bundle_url(bundle)?,
            None => cfg.bundle_url.clone().with_context(|| {
                format!(
                    "No bundle given: pass {} or set bundle_url in {}",
                    fmt_bold("BUNDLE"),
                    fmt_dimmed(cfg.path().as_str())
                )
            })?,
        };
        let app_key = self.app_key.clone().unwrap_or_else(|| cfg.app_key.clone());
        let props = self
            .props
            .clone()
            .unwrap_or_else(|| cfg.initial_props.clone());

        let mut engine = BridgeEngine::builder(DenoChannel::new()?)
            .plugins(plugins::factories(&cfg.plugins))
            .bundle_url(bundle_url.clone())
            .network_client(reqwest::Client::new())
            .rendezvous(Rendezvous::new(Duration::from_millis(
                cfg.rendezvous_delay_ms,
            )))
            .build();

        let ui = engine.ui_manager().clone();
        let started_key = app_key.clone();
        engine.on_ready(move || {
            let root_tag = ui.add_root_view();
            info!(
                "Running {} in root view {root_tag}",
                fmt_bold(&started_key)
            );
            if let Err(e) = ui.run_application(&started_key, root_tag, props) {
                error!("Failed to start {started_key}: {e}");
            }
        });

        info!("Loading {}", fmt_dimmed(bundle_url.as_str()));
        engine.init().await?;

        if self.until_idle {
            engine.run_until_idle().await;
        } else {
            info!("Press {} to stop", fmt_bold("Ctrl-C"));
            engine
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl-C: {e}");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }

        if !engine.is_ready() {
            anyhow::bail!(
                "The bridge never became ready (stopped while {:?}), check the bundle for script errors",
                engine.state()
            );
        }

        let ui = engine.ui_manager();
        info!(
            "{}",
            fmt_success(&format!(
                "{app} rendered {count} views",
                app = fmt_bold(&app_key),
                count = ui.view_count()
            ))
        );

        if self.dump_tree {
            println!("{}", serde_json::to_string_pretty(&ui.snapshot())?);
        }

        Ok(cfg)
    }
}
