use super::types::{Assertion, TestCase, TestStep};
use crate::discovery::types::{Action, DiscoveredFeature, FeatureType};
use log::debug;

/// Literal fill value for an input type
pub fn default_fill_value(input_type: &str) -> &'static str {
    match input_type {
        "email" => "test@example.com",
        "password" => "TestPassword123!",
        "number" => "42",
        "tel" => "+1234567890",
        "url" => "https://example.com",
        "date" => "2024-01-01",
        "time" => "12:00",
        "search" => "test search query",
        _ => "Test Value",
    }
}

/// Converts discovered features into executable test cases
#[derive(Debug, Default, Clone)]
pub struct TestCaseSynthesizer;

impl TestCaseSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize_all(&self, features: &[DiscoveredFeature]) -> Vec<TestCase> {
        features.iter().filter_map(|f| self.synthesize(f)).collect()
    }

    /// Build the test case for one feature.
    ///
    /// Rules apply in a fixed order (click, fill, hover, screenshot, select,
    /// check) regardless of the order actions were declared in. Actions
    /// without a rule produce nothing.
    pub fn synthesize(&self, feature: &DiscoveredFeature) -> Option<TestCase> {
        if feature.actions.is_empty() {
            return None;
        }

        let selector = feature.selector.as_str();
        let mut steps = Vec::new();
        let mut assertions = vec![Assertion::visible(
            selector,
            format!("{} should be visible", feature.name),
        )];

        if feature.actions.contains(Action::Click) {
            steps.push(TestStep::new(Action::Click, selector, format!("Click {}", feature.name)));
            if matches!(feature.feature_type, FeatureType::Button | FeatureType::Menu) {
                assertions.push(Assertion::visible(
                    selector,
                    format!("{} should remain visible after click", feature.name),
                ));
            }
        }

        if feature.actions.contains(Action::Fill) && feature.feature_type == FeatureType::Input {
            let input_type = feature
                .attribute("type")
                .or(feature.input_type.as_deref())
                .unwrap_or("text");
            let value = default_fill_value(input_type);
            steps.push(
                TestStep::new(Action::Fill, selector, format!("Fill {} with \"{}\"", feature.name, value))
                    .with_value(value),
            );
            assertions.push(Assertion::attribute_equals(
                selector,
                "value",
                value,
                format!("{} should contain \"{}\"", feature.name, value),
            ));
        }

        if feature.actions.contains(Action::Hover) {
            steps.push(TestStep::new(Action::Hover, selector, format!("Hover over {}", feature.name)));
        }

        if feature.actions.contains(Action::Screenshot) {
            steps.push(TestStep::new(
                Action::Screenshot,
                selector,
                format!("Capture {}", feature.name),
            ));
        }

        if feature.actions.contains(Action::Select) && feature.feature_type == FeatureType::Dropdown {
            let option = feature
                .attribute("options")
                .and_then(|opts| opts.split(',').map(str::trim).find(|o| !o.is_empty()))
                .unwrap_or("first-option")
                .to_string();
            steps.push(
                TestStep::new(Action::Select, selector, format!("Select \"{}\" in {}", option, feature.name))
                    .with_value(option.clone()),
            );
            assertions.push(Assertion::attribute_equals(
                selector,
                "value",
                option.clone(),
                format!("{} should have \"{}\" selected", feature.name, option),
            ));
        }

        if feature.actions.contains(Action::Check) || feature.actions.contains(Action::Uncheck) {
            let toggle = match feature.attribute("type").or(feature.input_type.as_deref()) {
                Some("checkbox") => Some(Action::Check),
                Some("radio") => Some(Action::Click),
                _ => None,
            };
            if let Some(action) = toggle {
                steps.push(TestStep::new(action, selector, format!("Check {}", feature.name)));
                assertions.push(Assertion::attribute_equals(
                    selector,
                    "checked",
                    true,
                    format!("{} should be checked", feature.name),
                ));
            }
        }

        let case = TestCase::new(feature.clone(), steps, assertions);
        if case.is_none() {
            debug!("No steps generated for {}", feature.selector);
        }
        case
    }
}
