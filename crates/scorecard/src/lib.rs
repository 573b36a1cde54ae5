//! Provider evaluation scorecards: turns the operational evaluation records
//! into a star-schema reporting model of dimensions and fact tables.

pub mod config;
pub mod error;
pub mod export;
pub mod source;
pub mod telemetry;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;

pub use transform::{transform, TransformError, WarehouseBundle};
