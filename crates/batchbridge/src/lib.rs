pub mod commands;
pub mod plugins;
pub mod utils;


use batchbridge_config::Config;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use log::debug;

use crate::commands::{init::InitCmd, modules::ModulesCmd, run::RunCmd};

#[derive(Parser)]
#[command(name = "batchbridge")]
#[command(version)]
#[command(about = "batchbridge - headless host for batched-bridge application bundles")]
#[command(
    long_about = "batchbridge loads an application bundle into an embedded V8 runtime, exposes the native \
module table to it and dispatches the batched calls it sends back, rendering into a headless view tree."
)]
#[command(after_help = "EXAMPLES:\n  \
    batchbridge init\n  \
    batchbridge modules --json\n  \
    batchbridge run ./index.bundle.js --until-idle --dump-tree\n  \
    batchbridge run http://localhost:8081/index.bundle --app-key Gallery\n\
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path, defaults to ./batchbridge.json
    #[arg(long, short = 'c', global = true, default_value_t = Config::default_path())]
    pub config: Utf8PathBuf,

    /// No logging except for errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose logging (-v) or trace logging (-vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    #[allow(clippy::missing_errors_doc)]
    pub async fn handle(&self) -> anyhow::Result<()> {
        let _updated_cfg = match &self.command {
            Commands::Init(cmd) => cmd.handle(&self.config)?,
            Commands::Modules(cmd) => cmd.handle(self.load_config()?)?,
            Commands::Run(cmd) => cmd.handle(self.load_config()?).await?,
        };

        Ok(())
    }

    /// The config at `--config`, or the defaults when no file exists there
    fn load_config(&self) -> anyhow::Result<Config> {
        if self.config.exists() {
            Config::load(&self.config)
        } else {
            debug!("No config at {}, using defaults", self.config);
            Ok(Config::default().with_path(&self.config))
        }
    }
}

#[derive(Debug, Subcommand)]
#[command(styles=utils::styles::get_styles())]
pub enum Commands {
    /// Run an application bundle
    #[command(
        long_about = "Load the bundle, start the bridge and run the application once the bridge is ready. \
Runs until Ctrl-C, or until nothing is left to do with --until-idle."
    )]
    Run(RunCmd),

    /// List the native modules exposed to scripts
    #[command(long_about = "Print every native module with its id and method table, \
or the exact configuration payload injected into the runtime with --json.")]
    Modules(ModulesCmd),

    /// Initialize configuration file
    #[command(long_about = "Initialize batchbridge.json configuration file.")]
    Init(InitCmd),
}
