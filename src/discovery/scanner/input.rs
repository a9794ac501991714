use super::{clean_text, read_attr, sweep, ElementScanner};
use crate::discovery::resolver::escape_attr_value;
use crate::discovery::types::{Action, Category, CategoryBatch, DiscoveredFeature, FeatureType};
use crate::driver::traits::{PageCapability, PageResult};
use crate::utils::config::DiscoveryConfig;
use async_trait::async_trait;
use std::collections::HashSet;

pub const INPUT_PATTERNS: &[&str] = &[
    "input",
    "textarea",
    "[contenteditable=\"true\"]",
    "[role=\"textbox\"]",
    "[role=\"searchbox\"]",
];

/// Input types that are buttons or invisible carriers, not fields
const SKIPPED_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

/// Capabilities implied by an input type
pub fn actions_for_input_type(input_type: &str) -> Vec<Action> {
    match input_type {
        "checkbox" | "radio" => vec![Action::Check, Action::Uncheck, Action::Click],
        "range" => vec![Action::Fill, Action::Drag],
        _ => vec![Action::Fill, Action::Clear, Action::Focus, Action::Blur],
    }
}

pub struct InputScanner<'a, P: PageCapability> {
    page: &'a P,
    config: &'a DiscoveryConfig,
}

impl<'a, P: PageCapability> InputScanner<'a, P> {
    pub fn new(page: &'a P, config: &'a DiscoveryConfig) -> Self {
        Self { page, config }
    }

    pub async fn scan_inputs(&self) -> PageResult<Vec<DiscoveredFeature>> {
        let mut visited = HashSet::new();
        sweep(
            self.page,
            self.config.visibility_timeout_ms,
            INPUT_PATTERNS,
            &mut visited,
            |handle, selector| self.extract(handle, selector),
        )
        .await
    }

    async fn extract(&self, handle: P::Handle, selector: String) -> PageResult<Option<DiscoveredFeature>> {
        let tag = self.page.tag_name(&handle).await?;
        let input_type = match tag.as_str() {
            "input" => read_attr(self.page, &handle, "type")
                .await?
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "text".to_string()),
            "textarea" => "textarea".to_string(),
            _ => "text".to_string(),
        };
        if SKIPPED_TYPES.contains(&input_type.as_str()) {
            return Ok(None);
        }

        let id = read_attr(self.page, &handle, "id").await?;
        let name_attr = read_attr(self.page, &handle, "name").await?;
        let placeholder = read_attr(self.page, &handle, "placeholder").await?;
        let required = self.page.get_attribute(&handle, "required").await?.is_some();
        let label = self.label_for(&handle, id.as_deref()).await?;

        let name = label
            .clone()
            .or_else(|| placeholder.clone())
            .or_else(|| name_attr.clone())
            .or_else(|| id.clone())
            .unwrap_or_else(|| format!("Input ({})", input_type));

        let mut feature = DiscoveredFeature::new(name, FeatureType::Input, selector)
            .with_text(label)
            .with_input_type(input_type.clone())
            .with_attribute("type", input_type.clone())
            .with_optional_attribute("name", name_attr)
            .with_optional_attribute("placeholder", placeholder)
            .with_optional_attribute("id", id)
            .with_actions(actions_for_input_type(&input_type));
        if required {
            feature = feature.with_attribute("required", "true");
        }
        Ok(Some(feature))
    }

    /// Text of `<label for=id>`, falling back to `aria-label`
    async fn label_for(&self, handle: &P::Handle, id: Option<&str>) -> PageResult<Option<String>> {
        if let Some(id) = id {
            let selector = format!("label[for=\"{}\"]", escape_attr_value(id));
            if let Some(label) = self.page.locate_all(&selector).await?.into_iter().next() {
                if let Some(text) = clean_text(self.page.text_content(&label).await?) {
                    return Ok(Some(text));
                }
            }
        }
        read_attr(self.page, handle, "aria-label").await
    }
}

#[async_trait]
impl<P: PageCapability> ElementScanner for InputScanner<'_, P> {
    fn label(&self) -> &'static str {
        "inputs"
    }

    async fn scan(&self) -> PageResult<Vec<CategoryBatch>> {
        Ok(vec![CategoryBatch::new(Category::Inputs, self.scan_inputs().await?)])
    }
}
