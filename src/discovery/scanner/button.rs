use super::{clean_text, read_attr, sweep, tolerate, ElementScanner};
use crate::discovery::types::{Action, Category, CategoryBatch, DiscoveredFeature, FeatureType};
use crate::driver::traits::{PageCapability, PageResult};
use crate::utils::config::DiscoveryConfig;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashSet;

pub const BUTTON_PATTERNS: &[&str] = &[
    "button",
    "[role=\"button\"]",
    "input[type=\"button\"]",
    "input[type=\"submit\"]",
    "input[type=\"reset\"]",
    "a.btn",
    "a.button",
    "[class*=\"btn\"]",
    "[onclick]",
];

pub const TOOLTIP_SELECTOR: &str = "[role=\"tooltip\"], .tooltip, [class*=\"tooltip\"]";

pub struct ButtonScanner<'a, P: PageCapability> {
    page: &'a P,
    config: &'a DiscoveryConfig,
}

impl<'a, P: PageCapability> ButtonScanner<'a, P> {
    pub fn new(page: &'a P, config: &'a DiscoveryConfig) -> Self {
        Self { page, config }
    }

    pub async fn scan_buttons(&self) -> PageResult<Vec<DiscoveredFeature>> {
        let mut visited = HashSet::new();
        sweep(
            self.page,
            self.config.visibility_timeout_ms,
            BUTTON_PATTERNS,
            &mut visited,
            |handle, selector| self.extract(handle, selector),
        )
        .await
    }

    async fn extract(&self, handle: P::Handle, selector: String) -> PageResult<Option<DiscoveredFeature>> {
        let aria_label = read_attr(self.page, &handle, "aria-label").await?;
        let title = read_attr(self.page, &handle, "title").await?;
        let tag = self.page.tag_name(&handle).await?;
        let text = if tag == "input" {
            read_attr(self.page, &handle, "value").await?
        } else {
            clean_text(self.page.text_content(&handle).await?)
        };

        let name = text
            .clone()
            .or_else(|| title.clone())
            .or_else(|| aria_label.clone())
            .unwrap_or_else(|| "Unnamed Button".to_string());

        Ok(Some(
            DiscoveredFeature::new(name, FeatureType::Button, selector)
                .with_text(text)
                .with_optional_attribute("title", title)
                .with_optional_attribute("aria-label", aria_label)
                .with_actions([Action::Click, Action::Hover, Action::Focus]),
        ))
    }

    /// Hover the first buttons and record any tooltip that appears.
    /// Per-element failures are skipped.
    pub async fn discover_tooltips(&self, features: &mut [DiscoveredFeature]) -> PageResult<usize> {
        let mut found = 0;
        let buttons = features
            .iter_mut()
            .filter(|f| f.feature_type == FeatureType::Button)
            .take(self.config.tooltip_limit);

        for feature in buttons {
            match self.read_tooltip(&feature.selector).await {
                Ok(Some(tooltip)) => {
                    feature.attributes.insert("tooltip".to_string(), tooltip);
                    found += 1;
                }
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("Tooltip lookup failed for {}: {}", feature.selector, e),
            }
        }

        if found > 0 {
            info!("Found {} tooltip(s)", found);
        }
        Ok(found)
    }

    async fn read_tooltip(&self, selector: &str) -> PageResult<Option<String>> {
        let Some(handle) = self.page.locate_all(selector).await?.into_iter().next() else {
            return Ok(None);
        };
        self.page.hover(&handle).await?;

        let tips = self.page.locate_all(TOOLTIP_SELECTOR).await?;
        for tip in tips {
            let visible = tolerate(
                self.page.is_visible(&tip, self.config.tooltip_timeout_ms).await,
                TOOLTIP_SELECTOR,
            )?;
            if visible == Some(true) {
                if let Some(text) = clean_text(self.page.text_content(&tip).await?) {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<P: PageCapability> ElementScanner for ButtonScanner<'_, P> {
    fn label(&self) -> &'static str {
        "buttons"
    }

    async fn scan(&self) -> PageResult<Vec<CategoryBatch>> {
        Ok(vec![CategoryBatch::new(Category::Buttons, self.scan_buttons().await?)])
    }
}
