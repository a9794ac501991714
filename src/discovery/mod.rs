//! Feature discovery: scanners, selector resolution and aggregation.

pub mod aggregator;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use aggregator::{merge_batches, DiscoveryAggregator};
pub use resolver::SelectorResolver;
pub use types::{Action, ActionSet, Category, CategoryBatch, DiscoveredFeature, FeatureType, RankedFeature};
