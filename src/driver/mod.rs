pub mod error;
#[cfg(test)]
pub mod fake;
pub mod traits;
#[cfg(feature = "web")]
pub mod web;

pub use error::PageError;
pub use traits::{NodeSummary, PageCapability, PageResult};
