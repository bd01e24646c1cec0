mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{census, demand, geography};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Demographics(args) => census::demographics(&cli, args),
        Commands::Neighbors(args) => geography::neighbors(&cli, args),
        Commands::Crosswalk(args) => geography::crosswalk(&cli, args),
        Commands::Distance(args) => geography::distance(&cli, args),
        Commands::Commuters(args) => demand::commuters(&cli, args),
        Commands::Trips(args) => demand::trips(&cli, args),
        Commands::Fuse(args) => demand::fuse(&cli, args),
        Commands::Run(args) => commands::run(&cli, args),
    }
}

/// Default filter from the -v count; RUST_LOG overrides it.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() -> anyhow::Result<()> { run() }
