//! Parquet reading for archives too large to hold as one table.
//!
//! This module is only available when the `parquet` feature is enabled.

mod read;

pub(crate) use read::*;
