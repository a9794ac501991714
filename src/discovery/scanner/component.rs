use super::{clean_text, read_attr, sweep, tolerate, truncate, ElementScanner};
use crate::discovery::types::{Action, Category, CategoryBatch, DiscoveredFeature, FeatureType};
use crate::driver::traits::{PageCapability, PageResult};
use crate::utils::config::DiscoveryConfig;
use async_trait::async_trait;
use std::collections::HashSet;

pub const PANEL_PATTERNS: &[&str] = &[
    "[role=\"region\"]",
    ".panel",
    ".card",
    "section",
    "aside",
    "[class*=\"panel\"]",
];

pub const CHART_PATTERNS: &[&str] = &[
    "canvas",
    "svg[class*=\"chart\"]",
    "[class*=\"chart\"]",
    "[data-chart]",
    ".highcharts-container",
    "[class*=\"graph\"]",
];

pub const MODAL_PATTERNS: &[&str] = &[
    "[role=\"dialog\"]",
    "[role=\"alertdialog\"]",
    "[aria-modal=\"true\"]",
    ".modal",
    "dialog",
];

pub const TABLE_PATTERNS: &[&str] = &["table", "[role=\"grid\"]", "[role=\"table\"]"];

pub const CUSTOM_PATTERNS: &[&str] = &[
    "[data-component]",
    "[data-widget]",
    "[class*=\"widget\"]",
    "[class*=\"component\"]",
];

const HEADING_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Panel,
    Chart,
    Modal,
    Table,
    Custom,
}

/// Scans passive page regions: panels, charts, modals, tables and custom widgets
pub struct ComponentScanner<'a, P: PageCapability> {
    page: &'a P,
    config: &'a DiscoveryConfig,
}

impl<'a, P: PageCapability> ComponentScanner<'a, P> {
    pub fn new(page: &'a P, config: &'a DiscoveryConfig) -> Self {
        Self { page, config }
    }

    async fn scan_kind(
        &self,
        kind: Kind,
        patterns: &[&str],
        visited: &mut HashSet<String>,
    ) -> PageResult<Vec<DiscoveredFeature>> {
        sweep(
            self.page,
            self.config.visibility_timeout_ms,
            patterns,
            visited,
            |handle, selector| self.extract(kind, handle, selector),
        )
        .await
    }

    async fn extract(&self, kind: Kind, handle: P::Handle, selector: String) -> PageResult<Option<DiscoveredFeature>> {
        let aria_label = read_attr(self.page, &handle, "aria-label").await?;
        let id = read_attr(self.page, &handle, "id").await?;

        let feature = match kind {
            Kind::Panel => {
                let heading = self.heading(&selector).await?;
                let name = aria_label.or(heading).or(id).unwrap_or_else(|| "Panel".to_string());
                DiscoveredFeature::new(name, FeatureType::Panel, selector).with_actions([Action::Screenshot])
            }
            Kind::Chart => {
                let tag = self.page.tag_name(&handle).await?;
                let name = aria_label.or(id).unwrap_or_else(|| format!("Chart ({})", tag));
                DiscoveredFeature::new(name, FeatureType::Chart, selector)
                    .with_actions([Action::Hover, Action::Screenshot])
            }
            Kind::Modal => {
                let heading = self.heading(&selector).await?;
                let name = aria_label.or(heading).or(id).unwrap_or_else(|| "Modal".to_string());
                DiscoveredFeature::new(name, FeatureType::Modal, selector).with_actions([Action::Screenshot])
            }
            Kind::Table => return self.extract_table(aria_label, id, selector).await.map(Some),
            Kind::Custom => {
                let name = read_attr(self.page, &handle, "data-component")
                    .await?
                    .or(read_attr(self.page, &handle, "data-widget").await?)
                    .or(aria_label)
                    .or(id)
                    .unwrap_or_else(|| "Component".to_string());
                DiscoveredFeature::new(name, FeatureType::Other, selector).with_actions([Action::Click, Action::Hover])
            }
        };
        Ok(Some(feature))
    }

    async fn extract_table(
        &self,
        aria_label: Option<String>,
        id: Option<String>,
        selector: String,
    ) -> PageResult<DiscoveredFeature> {
        let caption = self.first_text(&format!("{selector} caption")).await?;
        let headers = self
            .texts(&format!("{selector} th, {selector} [role=\"columnheader\"]"))
            .await?;
        let rows = self
            .count(&format!("{selector} tr, {selector} [role=\"row\"]"))
            .await?;

        let name = caption.or(aria_label).or(id).unwrap_or_else(|| "Table".to_string());
        let mut feature = DiscoveredFeature::new(name, FeatureType::Table, selector)
            .with_attribute("rows", rows.to_string())
            .with_attribute("columns", headers.len().to_string())
            .with_actions([Action::Screenshot]);
        if !headers.is_empty() {
            feature = feature.with_attribute("headers", headers.join(","));
        }
        Ok(feature)
    }

    async fn heading(&self, scope: &str) -> PageResult<Option<String>> {
        let pattern = ["h1", "h2", "h3", "h4", "h5", "h6", ".title", "[class*=\"header\"]"]
            .iter()
            .map(|h| format!("{scope} {h}"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(self.first_text(&pattern).await?.map(|t| truncate(&t, HEADING_LEN)))
    }

    async fn first_text(&self, pattern: &str) -> PageResult<Option<String>> {
        Ok(self.texts(pattern).await?.into_iter().next())
    }

    async fn texts(&self, pattern: &str) -> PageResult<Vec<String>> {
        let Some(handles) = tolerate(self.page.locate_all(pattern).await, pattern)? else {
            return Ok(Vec::new());
        };
        let mut texts = Vec::new();
        for handle in handles {
            if let Some(text) = clean_text(self.page.text_content(&handle).await?) {
                texts.push(text);
            }
        }
        Ok(texts)
    }

    async fn count(&self, pattern: &str) -> PageResult<usize> {
        Ok(tolerate(self.page.count(pattern).await, pattern)?.unwrap_or(0))
    }
}

#[async_trait]
impl<P: PageCapability> ElementScanner for ComponentScanner<'_, P> {
    fn label(&self) -> &'static str {
        "components"
    }

    async fn scan(&self) -> PageResult<Vec<CategoryBatch>> {
        let mut visited = HashSet::new();
        let passes = [
            (Category::Panels, Kind::Panel, PANEL_PATTERNS),
            (Category::Charts, Kind::Chart, CHART_PATTERNS),
            (Category::Modals, Kind::Modal, MODAL_PATTERNS),
            (Category::Tables, Kind::Table, TABLE_PATTERNS),
            (Category::CustomComponents, Kind::Custom, CUSTOM_PATTERNS),
        ];

        let mut batches = Vec::with_capacity(passes.len());
        for (category, kind, patterns) in passes {
            let features = self.scan_kind(kind, patterns, &mut visited).await?;
            batches.push(CategoryBatch::new(category, features));
        }
        Ok(batches)
    }
}
