use crate::synth::types::TestCase;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Test case execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaseStatus {
    Pending,
    RunningSteps { step: usize },
    VerifyingAssertions { assertion: usize },
    Passed,
    Failed { error: String },
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Passed | CaseStatus::Failed { .. })
    }
}

/// State for a single test case execution.
///
/// Moves pending → running-steps → verifying-assertions → passed, or to
/// failed from either running phase.
#[derive(Debug, Clone)]
pub struct CaseState {
    pub name: String,
    pub status: CaseStatus,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

impl CaseState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CaseStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            screenshot_path: None,
        }
    }

    pub fn start(&mut self) {
        self.status = CaseStatus::RunningSteps { step: 0 };
        self.started_at = Some(Instant::now());
    }

    pub fn step(&mut self, step: usize) {
        self.status = CaseStatus::RunningSteps { step };
    }

    pub fn verify(&mut self, assertion: usize) {
        self.status = CaseStatus::VerifyingAssertions { assertion };
    }

    pub fn pass(&mut self) {
        self.finish(CaseStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(CaseStatus::Failed { error });
    }

    fn finish(&mut self, status: CaseStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }
}

/// Outcome of one test case. `error` and `screenshot` are `None` on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionResult {
    pub test_case: TestCase,
    pub success: bool,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
    pub error: Option<String>,
    pub screenshot: Option<String>,
}

impl TestExecutionResult {
    /// Build the result from a finished case state
    pub fn from_state(test_case: &TestCase, state: &CaseState) -> Self {
        let (success, error) = match &state.status {
            CaseStatus::Passed => (true, None),
            CaseStatus::Failed { error } => (false, Some(error.clone())),
            other => (false, Some(format!("case did not finish: {:?}", other))),
        };
        Self {
            test_case: test_case.clone(),
            success,
            duration: state.duration_ms.unwrap_or(0),
            error,
            screenshot: if success { None } else { state.screenshot_path.clone() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Percentage of passed cases, 0 for an empty batch
    pub success_rate: f64,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn from_results(results: &[TestExecutionResult]) -> Self {
        let total = results.len() as u32;
        let passed = results.iter().filter(|r| r.success).count() as u32;
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        Self {
            total,
            passed,
            failed: total - passed,
            success_rate,
            total_duration_ms: results.iter().map(|r| r.duration).sum(),
        }
    }
}

/// Results of one executor batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub session_id: String,
    pub results: Vec<TestExecutionResult>,
    pub summary: BatchSummary,
    pub generated_at: String,
}

impl BatchReport {
    pub fn new(session_id: &str, results: Vec<TestExecutionResult>) -> Self {
        Self {
            session_id: session_id.to_string(),
            summary: BatchSummary::from_results(&results),
            results,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
