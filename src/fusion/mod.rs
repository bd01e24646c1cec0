mod demand;
mod distance;
mod io;

pub use demand::{complete_cross_product, fuse, normalize, overlap, DemandRow, FusionWeights, OverlapSummary};
pub use distance::{attach_distances, haversine_km};
