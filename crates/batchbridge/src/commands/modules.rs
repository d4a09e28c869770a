use anyhow::Result;
use batchbridge_config::Config;
use bridge_core::{BridgeEngine, ChannelError, ExecutionChannel};
use clap::Parser;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::info;
use serde_json::Value;
use url::Url;

use crate::{
    plugins,
    utils::styles::{fmt_bold, fmt_cyan, fmt_dimmed},
};

#[derive(Debug, Clone, Parser)]
pub struct ModulesCmd {
    /// Print the configuration payload injected into the runtime
    #[arg(long)]
    pub json: bool,
}

impl ModulesCmd {
    pub(crate) fn handle(&self, cfg: Config) -> Result<Config> {
        let mut builder =
            BridgeEngine::builder(Offline).plugins(plugins::factories(&cfg.plugins));
        if let Some(url) = &cfg.bundle_url {
            builder = builder.bundle_url(url.clone());
        }
        let mut engine = builder.build();
        let registry = engine.register_modules();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&registry.build_config())?);
            return Ok(cfg);
        }

        for module in registry.modules() {
            info!(
                "{id} {name}",
                id = fmt_cyan(&format!("{:>3}", module.id())),
                name = fmt_bold(module.name())
            );
            for method in module.methods() {
                info!(
                    "      {}",
                    fmt_dimmed(&format!("{}: {}", method.id(), method.name()))
                );
            }
        }

        Ok(cfg)
    }
}

/// Channel for inspecting the registry without a script runtime; every request fails
#[derive(Debug, Clone, Copy)]
pub(crate) struct Offline;

impl Offline {
    fn refuse<T: 'static>() -> LocalBoxFuture<'static, Result<T, ChannelError>> {
        futures::future::ready(Err(ChannelError::Init(
            "no script runtime in this command".to_string(),
        )))
        .boxed_local()
    }
}

impl ExecutionChannel for Offline {
    fn init(&self) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        Self::refuse()
    }

    fn inject_json(
        &self,
        _name: &str,
        _value: Value,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        Self::refuse()
    }

    fn execute_js_call(
        &self,
        _module: &str,
        _method: &str,
        _args: Vec<Value>,
    ) -> LocalBoxFuture<'static, Result<Value, ChannelError>> {
        Self::refuse()
    }

    fn execute_application_script(
        &self,
        _source: String,
        _origin: Url,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        Self::refuse()
    }
}
