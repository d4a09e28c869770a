use batchbridge::{Cli, utils};
use clap::Parser;
use log::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    utils::logger::init_logger(cli.quiet, cli.verbose);

    if let Err(e) = cli.handle().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
