mod fs;
#[cfg(feature = "download")]
mod download;
mod source;

pub(crate) use fs::*;
#[cfg(feature = "download")]
pub(crate) use download::*;
pub(crate) use source::*;
