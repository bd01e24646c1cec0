use anyhow::Result;

use crate::cli::{Cli, DemographicsArgs};

pub fn demographics(cli: &Cli, args: &DemographicsArgs) -> Result<()> {
    let pipeline = super::pipeline(cli, |config| {
        config.acs.impute_median |= args.impute_median;
        if let Some(path) = &args.from_file {
            config.acs.local_file = Some(path.clone());
        }
    })?;
    pipeline.demographics()?;
    Ok(())
}
