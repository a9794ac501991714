//! Export synthesized test cases as replayable YAML flows.
//!
//! A flow is a header document (url, platform, tags) followed by `---`
//! and a list of single-key command mappings, e.g. `- tapOn: {css: "#go"}`.
//! Only commands the flow runner understands are emitted. Steps and
//! assertions with no such command are listed as comments above the header.

use crate::discovery::types::Action;
use crate::synth::types::{Assertion, AssertionType, TestCase, TestStep};
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Every command name a flow may contain
pub const FLOW_COMMANDS: &[&str] = &[
    "tapOn",
    "inputText",
    "pressKey",
    "takeScreenshot",
    "assertVisible",
    "assertNotVisible",
];

fn command(name: &str, params: Value) -> Value {
    let mut map = Mapping::new();
    map.insert(Value::from(name), params);
    Value::Mapping(map)
}

fn params<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    let mut map = Mapping::new();
    for (key, value) in pairs {
        map.insert(Value::from(key), value);
    }
    Value::Mapping(map)
}

fn css(selector: &str) -> Value {
    params([("css", Value::from(selector))])
}

fn expected_text(assertion: &Assertion) -> Option<String> {
    assertion.expected.as_ref().map(|v| match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Flow commands for one step, empty for actions flows cannot express
fn step_commands(step: &TestStep) -> Vec<Value> {
    let value = step.value.clone().unwrap_or_default();
    match step.action {
        Action::Click | Action::Check | Action::Uncheck | Action::Focus => {
            vec![command("tapOn", css(&step.selector))]
        }
        Action::Fill => vec![
            command("tapOn", css(&step.selector)),
            command("inputText", Value::from(value)),
        ],
        Action::Press => {
            let key = if value.is_empty() { "Enter".to_string() } else { value };
            vec![
                command("tapOn", css(&step.selector)),
                command("pressKey", Value::from(key)),
            ]
        }
        Action::Screenshot => {
            let path = if value.is_empty() {
                format!("{}.png", crate::runner::executor::safe_name(&step.selector))
            } else {
                value
            };
            vec![command("takeScreenshot", Value::from(path))]
        }
        Action::Hover
        | Action::Select
        | Action::Clear
        | Action::Blur
        | Action::Drag => Vec::new(),
    }
}

fn assertion_command(assertion: &Assertion) -> Option<Value> {
    let selector = assertion.selector.as_str();
    match assertion.assertion_type {
        AssertionType::Visible => Some(command("assertVisible", css(selector))),
        AssertionType::Hidden => Some(command("assertNotVisible", css(selector))),
        AssertionType::Text => {
            let mut pairs = vec![("css", Value::from(selector))];
            if let Some(text) = expected_text(assertion) {
                pairs.push(("text", Value::from(text)));
            }
            let mut map = Mapping::new();
            for (key, value) in pairs {
                map.insert(Value::from(key), value);
            }
            Some(command("assertVisible", Value::Mapping(map)))
        }
        AssertionType::Enabled
        | AssertionType::Disabled
        | AssertionType::Count
        | AssertionType::Attribute
        | AssertionType::Class => None,
    }
}

/// Render one test case as a flow document
pub fn render_flow(case: &TestCase, url: Option<&str>) -> Result<String> {
    let mut header = Mapping::new();
    if let Some(url) = url {
        header.insert(Value::from("url"), Value::from(url));
    }
    header.insert(Value::from("platform"), Value::from("web"));
    header.insert(
        Value::from("tags"),
        Value::Sequence(vec![
            Value::from("explorer"),
            Value::from(case.feature.feature_type.as_str()),
        ]),
    );

    let mut commands = Vec::new();
    let mut skipped = Vec::new();
    for step in &case.steps {
        let emitted = step_commands(step);
        if emitted.is_empty() {
            skipped.push(format!("{} on {}", step.action, step.selector));
        }
        commands.extend(emitted);
    }
    for assertion in &case.assertions {
        match assertion_command(assertion) {
            Some(cmd) => commands.push(cmd),
            None => skipped.push(format!("assert: {}", assertion.description)),
        }
    }

    let mut out = format!("# {}\n", case.name());
    for item in &skipped {
        out.push_str(&format!("# not replayable: {}\n", item.replace('\n', " ")));
    }
    out.push_str(&serde_yaml::to_string(&Value::Mapping(header))?);
    out.push_str("---\n");
    out.push_str(&serde_yaml::to_string(&Value::Sequence(commands))?);
    Ok(out)
}

/// Write one flow file per case into `dir`
pub fn write_flows(cases: &[TestCase], url: Option<&str>, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut written = Vec::with_capacity(cases.len());
    for (index, case) in cases.iter().enumerate() {
        let file_name = format!(
            "{:03}_{}.yaml",
            index + 1,
            crate::runner::executor::safe_name(&case.name())
        );
        let path = dir.join(file_name);
        std::fs::write(&path, render_flow(case, url)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
