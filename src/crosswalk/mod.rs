mod crosswalk;
mod io;

pub use crosswalk::{Crosswalk, Simplicity};
