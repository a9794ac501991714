pub mod events;
pub mod executor;
pub mod state;

use crate::driver::traits::PageCapability;
use crate::synth::types::TestCase;
use crate::utils::config::ExecutionConfig;

pub use events::*;
pub use executor::{ExecutionError, TestExecutor};
pub use state::*;

/// Run test cases against a page, rendering progress on the console
pub async fn run_cases<P: PageCapability>(
    page: &P,
    cases: &[TestCase],
    config: ExecutionConfig,
) -> BatchReport {
    let executor = TestExecutor::new(page, config);

    // Start console listener in background
    let listener = tokio::spawn(ConsoleEventListener::listen(executor.subscribe()));

    let report = executor.execute_all(cases).await;

    // Dropping the executor closes the channel so the listener drains and exits
    drop(executor);
    let _ = listener.await;
    report
}
