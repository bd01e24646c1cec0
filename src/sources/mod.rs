//! Remote data sources: commuter flows, taxi trips and tract demographics.

pub mod commuters;
pub mod demographics;
pub mod trips;
