use crate::discovery::types::{Action, DiscoveredFeature};
use serde::{Deserialize, Serialize};

/// One interaction of a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub action: Action,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub description: String,
}

impl TestStep {
    pub fn new(action: Action, selector: &str, description: impl Into<String>) -> Self {
        Self {
            action,
            selector: selector.to_string(),
            value: None,
            description: description.into(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionType {
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Text,
    Count,
    Attribute,
    Class,
}

/// Expected page state checked after the steps ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    #[serde(rename = "type")]
    pub assertion_type: AssertionType,
    pub selector: String,
    /// Attribute or property inspected by `attribute` assertions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
    pub description: String,
}

impl Assertion {
    pub fn new(assertion_type: AssertionType, selector: &str, description: impl Into<String>) -> Self {
        Self {
            assertion_type,
            selector: selector.to_string(),
            attribute: None,
            expected: None,
            description: description.into(),
        }
    }

    pub fn visible(selector: &str, description: impl Into<String>) -> Self {
        Self::new(AssertionType::Visible, selector, description)
    }

    /// `attribute` equality assertion
    pub fn attribute_equals(
        selector: &str,
        attribute: &str,
        expected: impl Into<serde_json::Value>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            attribute: Some(attribute.to_string()),
            expected: Some(expected.into()),
            ..Self::new(AssertionType::Attribute, selector, description)
        }
    }
}

/// Steps and assertions generated for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub feature: DiscoveredFeature,
    pub steps: Vec<TestStep>,
    pub assertions: Vec<Assertion>,
}

impl TestCase {
    /// Build a test case, `None` when there is nothing to execute
    pub fn new(feature: DiscoveredFeature, steps: Vec<TestStep>, assertions: Vec<Assertion>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            feature,
            steps,
            assertions,
        })
    }

    /// Display name used in reports and file names
    pub fn name(&self) -> String {
        format!("{} {}", self.feature.feature_type, self.feature.name)
    }
}
