pub mod discovery;
pub mod driver;
pub mod report;
pub mod runner;
pub mod synth;
pub mod utils;

// Re-export common items
pub use discovery::{DiscoveredFeature, DiscoveryAggregator, SelectorResolver};
pub use driver::{PageCapability, PageError};
pub use report::generate_report;
pub use runner::{run_cases, TestExecutor};
pub use synth::{TestCase, TestCaseSynthesizer};
pub use utils::config::ExplorerConfig;
