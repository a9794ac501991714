use super::resolver::SelectorResolver;
use super::scanner::input::actions_for_input_type;
use super::scanner::{
    clean_text, read_attr, tolerate, truncate, ButtonScanner, ComponentScanner, ElementScanner,
    InputScanner, NavigationScanner,
};
use super::types::{Action, Category, CategoryBatch, DiscoveredFeature, FeatureType, RankedFeature};
use crate::driver::traits::{PageCapability, PageResult};
use crate::utils::config::DiscoveryConfig;
use log::{debug, info, warn};
use std::collections::HashSet;

/// Elements that typically appear only after hovering a trigger
pub const REVEAL_SELECTORS: &[&str] = &[
    ".dropdown-menu:visible",
    ".submenu:visible",
    "[class*=\"popup\"]:visible",
    "[class*=\"overlay\"]:visible",
    "[class*=\"modal\"]:visible",
];

/// Selector or class fragments marking a hover trigger
const TRIGGER_KEYWORDS: &[&str] = &["nav", "menu", "dropdown"];

pub const ESSENTIAL_SELECTORS: &[&str] = &[
    "button",
    "[role=\"button\"]",
    "a[href]",
    "input",
    "select",
    "textarea",
    "[data-testid]",
];

const REVEALED_NAME_LEN: usize = 50;

pub struct DiscoveryAggregator<'a, P: PageCapability> {
    page: &'a P,
    config: &'a DiscoveryConfig,
}

impl<'a, P: PageCapability> DiscoveryAggregator<'a, P> {
    pub fn new(page: &'a P, config: &'a DiscoveryConfig) -> Self {
        Self { page, config }
    }

    /// Run every scanner concurrently and merge their results.
    ///
    /// Fails with the first fatal scanner error unless
    /// `isolate_scanner_failures` is set, in which case failing scanners
    /// are logged and skipped.
    pub async fn discover_all(&self) -> PageResult<Vec<DiscoveredFeature>> {
        let buttons = ButtonScanner::new(self.page, self.config);
        let inputs = InputScanner::new(self.page, self.config);
        let navigation = NavigationScanner::new(self.page, self.config);
        let components = ComponentScanner::new(self.page, self.config);

        info!("🔍 Scanning page with {} backend", self.page.backend_name());

        let batches: Vec<CategoryBatch> = if self.config.isolate_scanner_failures {
            let results = futures::join!(buttons.scan(), inputs.scan(), navigation.scan(), components.scan());
            let labelled = [
                (buttons.label(), results.0),
                (inputs.label(), results.1),
                (navigation.label(), results.2),
                (components.label(), results.3),
            ];
            let mut batches = Vec::new();
            for (label, result) in labelled {
                match result {
                    Ok(found) => batches.extend(found),
                    Err(e) => warn!("Scanner '{}' failed, continuing without it: {}", label, e),
                }
            }
            batches
        } else {
            let (b, i, n, c) =
                futures::try_join!(buttons.scan(), inputs.scan(), navigation.scan(), components.scan())?;
            [b, i, n, c].into_iter().flatten().collect()
        };

        let features = merge_batches(batches);
        info!("✓ Discovered {} feature(s)", features.len());
        Ok(features)
    }

    /// Hover-driven pass revealing elements hidden until interaction.
    ///
    /// Attaches tooltips to button features in place and returns the newly
    /// revealed features, none of which repeat a known selector.
    pub async fn discover_dynamic(&self, features: &mut [DiscoveredFeature]) -> PageResult<Vec<DiscoveredFeature>> {
        ButtonScanner::new(self.page, self.config)
            .discover_tooltips(features)
            .await?;

        let mut known: HashSet<String> = features.iter().map(|f| f.selector.clone()).collect();
        let triggers: Vec<String> = features
            .iter()
            .filter(|f| is_hover_trigger(f))
            .take(self.config.dynamic_hover_limit)
            .map(|f| f.selector.clone())
            .collect();

        let mut revealed = Vec::new();
        for trigger in triggers {
            match self.hover_reveals(&trigger, &mut known).await {
                Ok(found) => revealed.extend(found),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("Hover reveal failed for {}: {}", trigger, e),
            }
        }

        if !revealed.is_empty() {
            info!("✓ Revealed {} dynamic element(s)", revealed.len());
        }
        Ok(revealed)
    }

    async fn hover_reveals(
        &self,
        trigger: &str,
        known: &mut HashSet<String>,
    ) -> PageResult<Vec<DiscoveredFeature>> {
        let Some(handle) = self.page.locate_all(trigger).await?.into_iter().next() else {
            return Ok(Vec::new());
        };
        self.page.hover(&handle).await?;
        self.page.wait_for_timeout(self.config.dynamic_settle_ms).await?;

        let resolver = SelectorResolver::new(self.page);
        let mut found = Vec::new();
        for pattern in REVEAL_SELECTORS {
            let Some(handles) = tolerate(self.page.locate_all(pattern).await, pattern)? else {
                continue;
            };
            for element in handles {
                let selector = resolver.resolve(&element).await;
                if known.contains(&selector) {
                    continue;
                }
                let text = tolerate(self.page.text_content(&element).await, &selector)?.and_then(clean_text);
                let name = text
                    .as_deref()
                    .map(|t| truncate(t, REVEALED_NAME_LEN))
                    .unwrap_or_else(|| "Revealed Element".to_string());
                known.insert(selector.clone());
                found.push(
                    DiscoveredFeature::new(name, FeatureType::Other, selector)
                        .with_text(text)
                        .with_attribute("revealedBy", trigger)
                        .with_actions([Action::Click, Action::Screenshot]),
                );
            }
        }
        Ok(found)
    }

    /// Fast pass over a few core selectors with capped element counts,
    /// scoring each feature by how stable its selector is likely to be.
    pub async fn discover_essentials(&self) -> PageResult<Vec<RankedFeature>> {
        let resolver = SelectorResolver::new(self.page);
        let mut seen = HashSet::new();
        let mut ranked = Vec::new();

        for pattern in ESSENTIAL_SELECTORS {
            let Some(handles) = tolerate(self.page.locate_all(pattern).await, pattern)? else {
                continue;
            };
            for handle in handles.into_iter().take(self.config.essentials_limit) {
                let selector = resolver.resolve(&handle).await;
                if seen.contains(&selector) {
                    continue;
                }
                let visible = tolerate(
                    self.page
                        .is_visible(&handle, self.config.essentials_visibility_timeout_ms)
                        .await,
                    &selector,
                )?;
                if visible != Some(true) {
                    continue;
                }
                if let Some(entry) = tolerate(self.essential(&handle, selector.clone()).await, &selector)? {
                    seen.insert(selector);
                    ranked.push(entry);
                }
            }
        }

        info!("✓ Essentials pass found {} feature(s)", ranked.len());
        Ok(ranked)
    }

    async fn essential(&self, handle: &P::Handle, selector: String) -> PageResult<RankedFeature> {
        let tag = self.page.tag_name(handle).await?;
        let role = read_attr(self.page, handle, "role").await?;
        let input_type = read_attr(self.page, handle, "type")
            .await?
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| "text".to_string());
        let test_id = read_attr(self.page, handle, "data-testid").await?;
        let id = read_attr(self.page, handle, "id").await?;

        let (feature_type, actions) = match tag.as_str() {
            "button" => (FeatureType::Button, vec![Action::Click]),
            "input" if matches!(input_type.as_str(), "submit" | "button" | "reset") => {
                (FeatureType::Button, vec![Action::Click])
            }
            "input" => (FeatureType::Input, actions_for_input_type(&input_type)),
            "textarea" => (FeatureType::Input, actions_for_input_type("textarea")),
            "select" => (FeatureType::Dropdown, vec![Action::Select, Action::Click]),
            _ if role.as_deref() == Some("button") => (FeatureType::Button, vec![Action::Click]),
            _ => (FeatureType::Other, vec![Action::Click]),
        };

        let text = clean_text(self.page.text_content(handle).await?);
        let name = text
            .as_deref()
            .map(|t| truncate(t, REVEALED_NAME_LEN))
            .or(read_attr(self.page, handle, "aria-label").await?)
            .or(read_attr(self.page, handle, "placeholder").await?)
            .or(read_attr(self.page, handle, "name").await?)
            .or(id.clone())
            .unwrap_or_else(|| tag.clone());

        let confidence = if test_id.is_some() {
            1.0
        } else if id.is_some() {
            0.9
        } else {
            0.7
        };

        let mut feature = DiscoveredFeature::new(name, feature_type, selector)
            .with_text(text)
            .with_actions(actions);
        if feature_type == FeatureType::Input {
            feature = feature
                .with_input_type(input_type.clone())
                .with_attribute("type", input_type);
        }
        Ok(RankedFeature { feature, confidence })
    }
}

fn is_hover_trigger(feature: &DiscoveredFeature) -> bool {
    if feature.feature_type == FeatureType::Menu {
        return true;
    }
    let selector = feature.selector.to_lowercase();
    let class = feature.attribute("class").unwrap_or_default().to_lowercase();
    TRIGGER_KEYWORDS
        .iter()
        .any(|k| selector.contains(k) || class.contains(k))
}

/// Merge scanner output in category precedence order.
///
/// Invalid features are dropped; the first feature claiming a selector wins.
/// A feature's type is the one its batch's category implies.
pub fn merge_batches(batches: Vec<CategoryBatch>) -> Vec<DiscoveredFeature> {
    let mut batches = batches;
    batches.sort_by_key(|b| {
        Category::PRECEDENCE
            .iter()
            .position(|c| *c == b.category)
            .unwrap_or(Category::PRECEDENCE.len())
    });

    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        let feature_type = batch.category.feature_type();
        for mut feature in batch.features {
            if !feature.is_valid() {
                debug!("Dropping invalid feature from {:?}", batch.category);
                continue;
            }
            if feature.feature_type != feature_type {
                debug!(
                    "Retyping {} from {} to {} to match {:?}",
                    feature.selector, feature.feature_type, feature_type, batch.category
                );
                feature.feature_type = feature_type;
            }
            if seen.insert(feature.selector.clone()) {
                merged.push(feature);
            }
        }
    }
    merged
}
