use anyhow::Result;

use crate::cli::{Cli, CommutersArgs, FuseArgs, TripsArgs};

pub fn commuters(cli: &Cli, args: &CommutersArgs) -> Result<()> {
    let pipeline = super::pipeline(cli, |config| {
        if let Some(years) = &args.years {
            config.lodes.years = years.clone();
        }
        if let Some(dir) = &args.local_dir {
            config.lodes.local_dir = Some(dir.clone());
        }
    })?;
    pipeline.commuters()?;
    Ok(())
}

pub fn trips(cli: &Cli, args: &TripsArgs) -> Result<()> {
    let pipeline = super::pipeline(cli, |config| {
        if let Some(start) = args.start {
            config.tlc.start = start;
        }
        if let Some(end) = args.end {
            config.tlc.end = end;
        }
        if let Some(dir) = &args.local_dir {
            config.tlc.local_dir = Some(dir.clone());
        }
    })?;
    pipeline.trips()?;
    Ok(())
}

pub fn fuse(cli: &Cli, args: &FuseArgs) -> Result<()> {
    let pipeline = super::pipeline(cli, |config| {
        config.fusion.complete_cross_product |= args.complete_cross_product;
    })?;
    pipeline.fuse()?;
    Ok(())
}
