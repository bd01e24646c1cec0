#![doc = "tractflow: census-tract origin-destination demand for New York City"]
mod adjacency;
mod common;
mod config;
mod crosswalk;
mod fusion;
mod geom;
mod io;
mod layer;
mod od;
mod pipeline;
pub mod sources;
mod types;

#[doc(inline)]
pub use adjacency::{AdjacencyMap, AdjacencyStats, SymmetryPolicy};

#[doc(inline)]
pub use config::{CrosswalkConfig, FusionConfig, NeighborsConfig, PipelineConfig};

#[doc(inline)]
pub use crosswalk::{Crosswalk, Simplicity};

#[doc(inline)]
pub use fusion::{
    attach_distances, complete_cross_product, fuse, haversine_km, normalize, overlap,
    DemandRow, FusionWeights, OverlapSummary,
};

#[doc(inline)]
pub use geom::Crs;

#[doc(inline)]
pub use layer::Layer;

#[doc(inline)]
pub use od::{FilterStats, OdColumns, OdMatrix, OdRow};

#[doc(inline)]
pub use pipeline::*;

#[doc(inline)]
pub use types::{Borough, TractId, TractIdError, ZoneId};
