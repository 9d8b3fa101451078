mod cli;

use clap::Parser;
use remote_code_launcher::utils::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
