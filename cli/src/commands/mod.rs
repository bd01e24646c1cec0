pub mod census;
pub mod demand;
pub mod geography;

use anyhow::Result;
use tractflow::{Pipeline, PipelineConfig};

use crate::cli::{Cli, RunArgs};

/// Load the configuration file (if any) and point the pipeline at the output directory.
pub fn pipeline(cli: &Cli, configure: impl FnOnce(&mut PipelineConfig)) -> Result<Pipeline> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    configure(&mut config);
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| "output".into());
    Ok(Pipeline::new(config, output_dir).force(cli.force))
}

pub fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    pipeline(cli, |_| {})?.run(&args.tracts.tracts, &args.zones.zones)
}
