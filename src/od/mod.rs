mod io;
mod matrix;

pub use io::OdColumns;
pub use matrix::{FilterStats, OdMatrix, OdRow};
