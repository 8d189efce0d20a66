use clap::Parser;
use segroute::cli::{run_cli, Cli};
use segroute::telemetry::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;
    run_cli(cli)
}
