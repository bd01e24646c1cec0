use std::path::PathBuf;

use tractflow::{sources::trips::Month, SymmetryPolicy};

/// NYC census-tract origin-destination demand pipeline
#[derive(clap::Parser, Debug)]
#[command(name = "tractflow", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// TOML file overriding the default stage settings
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory holding stage inputs and outputs, defaults to "./output"
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Fetch tract population and median income from the ACS API
    Demographics(DemographicsArgs),

    /// Find tracts within the buffer distance of each tract
    Neighbors(NeighborsArgs),

    /// Build the area-weighted taxi zone → tract crosswalk
    Crosswalk(CrosswalkArgs),

    /// Aggregate LODES commuter flows per tract pair
    Commuters(CommutersArgs),

    /// Aggregate TLC taxi trips per tract pair
    Trips(TripsArgs),

    /// Fuse trips and commuters into the universal demand map
    Fuse(FuseArgs),

    /// Add centroid distances to the universal demand map
    Distance(TractsArg),

    /// Run every stage in order
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct TractsArg {
    /// Tract polygons (shapefile or GeoJSON with BoroCT2020 or GEOID)
    #[arg(long, default_value = "nyc_tracts/nyct2020.shp", value_hint = clap::ValueHint::FilePath)]
    pub tracts: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ZonesArg {
    /// Taxi zone polygons (shapefile or GeoJSON with LocationID)
    #[arg(long, default_value = "taxi_zones/taxi_zones.shp", value_hint = clap::ValueHint::FilePath)]
    pub zones: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct DemographicsArgs {
    /// Fill missing values with the column median
    #[arg(long)]
    pub impute_median: bool,

    /// Read the API response from a saved JSON file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub from_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct NeighborsArgs {
    #[command(flatten)]
    pub tracts: TractsArg,

    /// Buffer distance in feet
    #[arg(long)]
    pub distance_ft: Option<f64>,

    /// Handling of one-directional pairs: union or as-detected
    #[arg(long)]
    pub symmetry: Option<SymmetryPolicy>,
}

#[derive(clap::Args, Debug)]
pub struct CrosswalkArgs {
    #[command(flatten)]
    pub zones: ZonesArg,

    #[command(flatten)]
    pub tracts: TractsArg,

    /// Minimum share of a zone's area for a tract to be kept
    #[arg(long)]
    pub min_weight: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct CommutersArgs {
    /// Years to read, e.g. --years 2020,2021
    #[arg(long, value_delimiter = ',')]
    pub years: Option<Vec<u16>>,

    /// Read archives from this directory instead of downloading
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub local_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct TripsArgs {
    /// First month to read (YYYY-MM)
    #[arg(long)]
    pub start: Option<Month>,

    /// Last month to read (YYYY-MM)
    #[arg(long)]
    pub end: Option<Month>,

    /// Read archives from this directory instead of downloading
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub local_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct FuseArgs {
    /// Add zero rows for every missing origin × destination pair
    #[arg(long)]
    pub complete_cross_product: bool,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub zones: ZonesArg,

    #[command(flatten)]
    pub tracts: TractsArg,
}
