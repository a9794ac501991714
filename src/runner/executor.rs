use super::events::{EventEmitter, ExecutionEvent};
use super::state::{BatchReport, CaseState, TestExecutionResult};
use crate::discovery::types::Action;
use crate::driver::error::PageError;
use crate::driver::traits::PageCapability;
use crate::synth::types::{Assertion, AssertionType, TestCase, TestStep};
use crate::utils::config::ExecutionConfig;
use colored::Colorize;
use log::{info, warn};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Why a test case failed
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("step {index} ({action}) failed on '{selector}': {source}")]
    Step {
        index: usize,
        action: Action,
        selector: String,
        #[source]
        source: PageError,
    },

    #[error("no element matches '{0}'")]
    ElementNotFound(String),

    #[error("unsupported action '{0}'")]
    UnsupportedAction(Action),

    #[error("step {index} ({action}) requires a value")]
    MissingValue { index: usize, action: Action },

    #[error("assertion failed: {description} (expected {expected}, got {actual})")]
    AssertionFailed {
        description: String,
        expected: String,
        actual: String,
    },

    #[error("assertion '{description}' could not be evaluated: {source}")]
    AssertionError {
        description: String,
        #[source]
        source: PageError,
    },
}

type StepResult<T> = std::result::Result<T, ExecutionError>;

/// File-name-safe version of a case name
pub(crate) fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Compare an expected JSON value against what the page reported
fn value_matches(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    let as_text = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    as_text(expected) == as_text(actual)
}

pub struct TestExecutor<'a, P: PageCapability> {
    page: &'a P,
    config: ExecutionConfig,
    emitter: EventEmitter,
    session_id: String,
}

impl<'a, P: PageCapability> TestExecutor<'a, P> {
    pub fn new(page: &'a P, config: ExecutionConfig) -> Self {
        Self {
            page,
            config,
            emitter: EventEmitter::default(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.emitter.subscribe()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run every case in order. A failing case never stops the batch.
    pub async fn execute_all(&self, cases: &[TestCase]) -> BatchReport {
        self.emitter.emit(ExecutionEvent::BatchStarted {
            session_id: self.session_id.clone(),
            case_count: cases.len(),
        });

        let mut results = Vec::with_capacity(cases.len());
        for (i, case) in cases.iter().enumerate() {
            results.push(self.execute_indexed(i + 1, case).await);
        }

        let report = BatchReport::new(&self.session_id, results);
        info!(
            "Batch finished: {}/{} passed ({:.1}%)",
            report.summary.passed, report.summary.total, report.summary.success_rate
        );
        self.emitter.emit(ExecutionEvent::BatchFinished {
            summary: report.summary.clone(),
        });
        report
    }

    /// Run a single case
    pub async fn execute(&self, case: &TestCase) -> TestExecutionResult {
        self.execute_indexed(1, case).await
    }

    async fn execute_indexed(&self, index: usize, case: &TestCase) -> TestExecutionResult {
        let name = case.name();
        let mut state = CaseState::new(&name);
        self.emitter.emit(ExecutionEvent::CaseStarted {
            index,
            name: name.clone(),
            step_count: case.steps.len(),
        });

        state.start();
        match self.run_case(case, &mut state).await {
            Ok(()) => state.pass(),
            Err(e) => {
                let error = e.to_string();
                state.screenshot_path = self.handle_failure(&name, &error).await;
                state.fail(error);
            }
        }

        let result = TestExecutionResult::from_state(case, &state);
        self.emitter.emit(ExecutionEvent::CaseFinished {
            index,
            name,
            success: result.success,
            duration_ms: result.duration,
            error: result.error.clone(),
            screenshot: result.screenshot.clone(),
        });
        result
    }

    async fn run_case(&self, case: &TestCase, state: &mut CaseState) -> StepResult<()> {
        for (i, step) in case.steps.iter().enumerate() {
            state.step(i);
            self.run_step(i, step).await?;
            self.page
                .wait_for_timeout(self.config.step_settle_ms)
                .await
                .map_err(|source| ExecutionError::Step {
                    index: i,
                    action: step.action,
                    selector: step.selector.clone(),
                    source,
                })?;
        }

        for (i, assertion) in case.assertions.iter().enumerate() {
            state.verify(i);
            self.check(assertion).await?;
        }
        Ok(())
    }

    async fn locate(&self, selector: &str) -> Result<Option<P::Handle>, PageError> {
        Ok(self.page.locate_all(selector).await?.into_iter().next())
    }

    async fn run_step(&self, index: usize, step: &TestStep) -> StepResult<()> {
        let step_err = |source: PageError| ExecutionError::Step {
            index,
            action: step.action,
            selector: step.selector.clone(),
            source,
        };
        let value = || {
            step.value.as_deref().ok_or(ExecutionError::MissingValue {
                index,
                action: step.action,
            })
        };

        let handle = self
            .locate(&step.selector)
            .await
            .map_err(step_err)?
            .ok_or_else(|| ExecutionError::ElementNotFound(step.selector.clone()))?;

        let outcome = match step.action {
            Action::Click => self.page.click(&handle).await,
            Action::Fill => self.page.fill(&handle, value()?).await,
            Action::Hover => self.page.hover(&handle).await,
            Action::Focus => self.page.focus(&handle).await,
            Action::Select => self.page.select_option(&handle, value()?).await,
            Action::Check => self.page.check(&handle).await,
            Action::Uncheck => self.page.uncheck(&handle).await,
            Action::Press => {
                self.page
                    .press(&handle, step.value.as_deref().unwrap_or("Enter"))
                    .await
            }
            Action::Screenshot => {
                if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
                    warn!("Failed to create {}: {}", self.config.output_dir.display(), e);
                }
                let path = self.artifact_path("step", &step.selector);
                self.page.screenshot(Some(&handle), &path).await
            }
            Action::Clear | Action::Blur | Action::Drag => {
                return Err(ExecutionError::UnsupportedAction(step.action))
            }
        };
        outcome.map_err(step_err)
    }

    async fn check(&self, assertion: &Assertion) -> StepResult<()> {
        let eval_err = |source: PageError| ExecutionError::AssertionError {
            description: assertion.description.clone(),
            source,
        };
        let failed = |expected: String, actual: String| ExecutionError::AssertionFailed {
            description: assertion.description.clone(),
            expected,
            actual,
        };
        let timeout = self.config.assertion_timeout_ms;

        if assertion.assertion_type == AssertionType::Count {
            let actual = self.page.count(&assertion.selector).await.map_err(eval_err)?;
            let expected = assertion.expected.clone().unwrap_or(Value::from(1));
            return if value_matches(&expected, &Value::from(actual)) {
                Ok(())
            } else {
                Err(failed(format!("count {}", expected), format!("count {}", actual)))
            };
        }

        let handle = self.locate(&assertion.selector).await.map_err(eval_err)?;
        if assertion.assertion_type == AssertionType::Hidden {
            let visible = match &handle {
                Some(h) => self.page.is_visible(h, 0).await.map_err(eval_err)?,
                None => false,
            };
            return if visible {
                Err(failed("hidden".into(), "visible".into()))
            } else {
                Ok(())
            };
        }
        let Some(handle) = handle else {
            return Err(failed("element present".into(), "no match".into()));
        };

        match assertion.assertion_type {
            AssertionType::Visible => {
                if self.page.is_visible(&handle, timeout).await.map_err(eval_err)? {
                    Ok(())
                } else {
                    Err(failed("visible".into(), "hidden".into()))
                }
            }
            AssertionType::Enabled | AssertionType::Disabled => {
                let want = assertion.assertion_type == AssertionType::Enabled;
                let enabled = self.page.is_enabled(&handle, timeout).await.map_err(eval_err)?;
                if enabled == want {
                    Ok(())
                } else {
                    let label = |e: bool| (if e { "enabled" } else { "disabled" }).to_string();
                    Err(failed(label(want), label(enabled)))
                }
            }
            AssertionType::Text => {
                let expected = assertion.expected.as_ref().map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
                let actual = self
                    .page
                    .text_content(&handle)
                    .await
                    .map_err(eval_err)?
                    .unwrap_or_default();
                match expected {
                    Some(text) if !actual.contains(&text) => Err(failed(text, actual)),
                    _ => Ok(()),
                }
            }
            AssertionType::Class => {
                let expected = assertion
                    .expected
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let classes = self
                    .page
                    .get_attribute(&handle, "class")
                    .await
                    .map_err(eval_err)?
                    .unwrap_or_default();
                if classes.split_whitespace().any(|c| c == expected) {
                    Ok(())
                } else {
                    Err(failed(format!("class '{}'", expected), classes))
                }
            }
            AssertionType::Attribute => {
                let attribute = assertion.attribute.as_deref().unwrap_or("value");
                let actual = match attribute {
                    "value" => self
                        .page
                        .input_value(&handle)
                        .await
                        .map_err(eval_err)?
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                    "checked" => Value::Bool(self.page.is_checked(&handle).await.map_err(eval_err)?),
                    name => self
                        .page
                        .get_attribute(&handle, name)
                        .await
                        .map_err(eval_err)?
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                };
                match &assertion.expected {
                    Some(expected) if !value_matches(expected, &actual) => {
                        Err(failed(expected.to_string(), actual.to_string()))
                    }
                    Some(_) => Ok(()),
                    None if actual.is_null() => Err(failed(format!("attribute '{}'", attribute), "absent".into())),
                    None => Ok(()),
                }
            }
            AssertionType::Count | AssertionType::Hidden => Ok(()),
        }
    }

    fn artifact_path(&self, prefix: &str, name: &str) -> PathBuf {
        let uuid = Uuid::new_v4().to_string();
        let timestamp = chrono::Local::now().format("%H%M%S");
        let filename = format!("{}_{}_{}_{}.png", prefix, safe_name(name), timestamp, &uuid[..8]);
        self.config.output_dir.join(filename)
    }

    /// Take one best-effort page screenshot. Its own failure is only logged.
    async fn handle_failure(&self, case_name: &str, error: &str) -> Option<String> {
        self.emitter.emit(ExecutionEvent::Log {
            message: format!("{} Case failed: {}", "❌".red(), error),
        });

        if !self.config.screenshot_on_failure {
            return None;
        }

        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            warn!("Failed to create {}: {}", self.config.output_dir.display(), e);
            return None;
        }

        let path = self.artifact_path("fail", case_name);
        match self.page.screenshot(None, &path).await {
            Ok(()) => Some(path.to_string_lossy().to_string()),
            Err(e) => {
                warn!("Failed to take failure screenshot: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::types::{DiscoveredFeature, FeatureType};
    use crate::driver::fake::{FakeNode, FakePage, BODY};
    use crate::synth::TestCaseSynthesizer;

    fn config() -> ExecutionConfig {
        ExecutionConfig {
            output_dir: std::env::temp_dir().join(format!("lumi-explorer-{}", Uuid::new_v4())),
            ..Default::default()
        }
    }

    fn click_case(selector: &str, assertions: Vec<Assertion>) -> TestCase {
        let feature = DiscoveredFeature::new("Target", FeatureType::Button, selector).with_actions([Action::Click]);
        TestCase::new(
            feature,
            vec![TestStep::new(Action::Click, selector, "Click target")],
            assertions,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_case_is_deterministic() {
        let page = FakePage::new();
        page.add(BODY, FakeNode::new("button").attr("id", "go").text("Go"));
        let case = click_case("#go", vec![Assertion::visible("#go", "Go visible")]);

        let executor = TestExecutor::new(&page, config());
        for _ in 0..2 {
            let result = executor.execute(&case).await;
            assert!(result.success);
            assert_eq!(result.error, None);
            assert_eq!(result.screenshot, None);
        }
    }

    #[tokio::test]
    async fn test_failed_assertion_captures_screenshot_after_steps_ran_once() {
        let page = FakePage::new();
        let close = page.add(BODY, FakeNode::new("button").attr("id", "close").hides_on_click());
        let case = click_case(
            "#close",
            vec![
                Assertion::visible("#close", "Close stays visible"),
                Assertion::visible("#close", "never evaluated"),
            ],
        );

        let result = TestExecutor::new(&page, config()).execute(&case).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("Close stays visible"), "{}", error);
        assert_eq!(page.actions_on(close), vec!["click"]);
        assert_eq!(page.screenshots().len(), 1);
        let shot = result.screenshot.unwrap();
        assert!(shot.contains("fail_button_Target_"), "{}", shot);
        assert!(shot.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_unsupported_action_fails_case() {
        let page = FakePage::new();
        let input = page.add(BODY, FakeNode::new("input").attr("id", "name"));
        let feature = DiscoveredFeature::new("Name", FeatureType::Input, "#name");
        let case = TestCase::new(feature, vec![TestStep::new(Action::Blur, "#name", "Blur name")], vec![]).unwrap();

        let result = TestExecutor::new(&page, config()).execute(&case).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("unsupported action 'blur'"));
        assert!(page.actions_on(input).is_empty());
    }

    #[tokio::test]
    async fn test_screenshot_failure_is_swallowed() {
        let page = FakePage::new();
        page.fail_screenshots();
        let case = click_case("#missing", vec![]);

        let result = TestExecutor::new(&page, config()).execute(&case).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no element matches '#missing'"));
        assert_eq!(result.screenshot, None);
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let page = FakePage::new();
        page.add(BODY, FakeNode::new("button").attr("id", "ok").text("Ok"));
        let cases = vec![click_case("#gone", vec![]), click_case("#ok", vec![])];

        let report = TestExecutor::new(&page, config()).execute_all(&cases).await;

        assert_eq!(report.results.len(), 2);
        assert!(!report.results[0].success);
        assert!(report.results[1].success);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.success_rate, 50.0);
    }

    #[tokio::test]
    async fn test_synthesized_cases_pass_against_page() {
        let page = FakePage::new();
        let email = page.add(BODY, FakeNode::new("input").attr("type", "email").attr("id", "email"));
        page.add(BODY, FakeNode::new("input").attr("type", "checkbox").attr("id", "agree"));
        let select = page.add(BODY, FakeNode::new("select").attr("id", "country"));
        page.add(select, FakeNode::new("option").attr("value", "vn"));

        let features = vec![
            DiscoveredFeature::new("Email", FeatureType::Input, "#email")
                .with_attribute("type", "email")
                .with_actions([Action::Fill, Action::Clear]),
            DiscoveredFeature::new("Agree", FeatureType::Input, "#agree")
                .with_attribute("type", "checkbox")
                .with_actions([Action::Check, Action::Uncheck, Action::Click]),
            DiscoveredFeature::new("Country", FeatureType::Dropdown, "#country")
                .with_attribute("options", "vn")
                .with_actions([Action::Select]),
        ];
        let cases = TestCaseSynthesizer::new().synthesize_all(&features);
        let report = TestExecutor::new(&page, config()).execute_all(&cases).await;

        for result in &report.results {
            assert!(result.success, "{:?}", result.error);
        }
        assert_eq!(page.node(email).value.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn test_disabled_field_fill_fails() {
        let page = FakePage::new();
        page.add(BODY, FakeNode::new("input").attr("id", "locked").disabled());
        let feature = DiscoveredFeature::new("Locked", FeatureType::Input, "#locked").with_actions([Action::Fill]);
        let case = TestCaseSynthesizer::new().synthesize(&feature).unwrap();

        let result = TestExecutor::new(&page, config()).execute(&case).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("step 0 (fill) failed on '#locked'"));
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let page = FakePage::new();
        page.add(BODY, FakeNode::new("button").attr("id", "go"));
        let executor = TestExecutor::new(&page, config());
        let mut events = executor.subscribe();

        executor.execute_all(&[click_case("#go", vec![])]).await;

        assert!(matches!(events.recv().await.unwrap(), ExecutionEvent::BatchStarted { case_count: 1, .. }));
        assert!(matches!(events.recv().await.unwrap(), ExecutionEvent::CaseStarted { index: 1, .. }));
        assert!(matches!(
            events.recv().await.unwrap(),
            ExecutionEvent::CaseFinished { success: true, .. }
        ));
        assert!(matches!(events.recv().await.unwrap(), ExecutionEvent::BatchFinished { .. }));
    }
}
