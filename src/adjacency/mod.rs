mod adjacency;
mod io;

pub use adjacency::{AdjacencyMap, AdjacencyStats, SymmetryPolicy};
