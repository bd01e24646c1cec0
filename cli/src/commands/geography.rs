use anyhow::Result;

use crate::cli::{Cli, CrosswalkArgs, NeighborsArgs, TractsArg};

pub fn neighbors(cli: &Cli, args: &NeighborsArgs) -> Result<()> {
    let pipeline = super::pipeline(cli, |config| {
        if let Some(distance) = args.distance_ft {
            config.neighbors.distance_ft = distance;
        }
        if let Some(symmetry) = args.symmetry {
            config.neighbors.symmetry = symmetry;
        }
    })?;
    pipeline.neighbors(&args.tracts.tracts)?;
    Ok(())
}

pub fn crosswalk(cli: &Cli, args: &CrosswalkArgs) -> Result<()> {
    let pipeline = super::pipeline(cli, |config| {
        if let Some(min_weight) = args.min_weight {
            config.crosswalk.min_weight = min_weight;
        }
    })?;
    pipeline.crosswalk(&args.zones.zones, &args.tracts.tracts)?;
    Ok(())
}

pub fn distance(cli: &Cli, args: &TractsArg) -> Result<()> {
    super::pipeline(cli, |_| {})?.distance(&args.tracts)?;
    Ok(())
}
