//! Basin CLI - spatial joins and monthly factor adjustment of basin series.

use basin_cmd::Output;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "basin-cli",
    version,
    about = "Basin auxiliary-feature join and monthly factor toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: basin_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("basin-cli {}", env!("CARGO_PKG_VERSION"));
    match basin_cmd::run(cli.command)? {
        Output::None => {}
        Output::Report(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        Output::Value(value) => println!("{value}"),
    }
    Ok(())
}
