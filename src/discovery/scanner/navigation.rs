use super::{clean_text, read_attr, sweep, tolerate, truncate, ElementScanner};
use crate::discovery::resolver::SelectorResolver;
use crate::discovery::types::{Action, Category, CategoryBatch, DiscoveredFeature, FeatureType};
use crate::driver::traits::{PageCapability, PageResult};
use crate::utils::config::DiscoveryConfig;
use async_trait::async_trait;
use std::collections::HashSet;

pub const MENU_PATTERNS: &[&str] = &[
    "nav",
    "[role=\"navigation\"]",
    "[role=\"menu\"]",
    "[role=\"menubar\"]",
    ".menu",
    ".navbar",
    ".nav",
    ".sidebar",
];

pub const DROPDOWN_PATTERNS: &[&str] = &[
    "select",
    "[role=\"listbox\"]",
    "[role=\"combobox\"]",
    ".dropdown",
    "[aria-haspopup=\"true\"]",
    "[aria-haspopup=\"listbox\"]",
    "[aria-haspopup=\"menu\"]",
];

pub const TAB_PATTERNS: &[&str] = &[
    "[role=\"tab\"]",
    ".tab",
    ".nav-tabs a",
    "[data-toggle=\"tab\"]",
    "[data-bs-toggle=\"tab\"]",
];

const MENU_NAME_LEN: usize = 30;

pub struct NavigationScanner<'a, P: PageCapability> {
    page: &'a P,
    config: &'a DiscoveryConfig,
}

impl<'a, P: PageCapability> NavigationScanner<'a, P> {
    pub fn new(page: &'a P, config: &'a DiscoveryConfig) -> Self {
        Self { page, config }
    }

    pub async fn scan_menus(&self, visited: &mut HashSet<String>) -> PageResult<Vec<DiscoveredFeature>> {
        sweep(
            self.page,
            self.config.visibility_timeout_ms,
            MENU_PATTERNS,
            visited,
            |handle, selector| self.extract_menu(handle, selector),
        )
        .await
    }

    pub async fn scan_dropdowns(&self, visited: &mut HashSet<String>) -> PageResult<Vec<DiscoveredFeature>> {
        sweep(
            self.page,
            self.config.visibility_timeout_ms,
            DROPDOWN_PATTERNS,
            visited,
            |handle, selector| self.extract_dropdown(handle, selector),
        )
        .await
    }

    pub async fn scan_tabs(&self, visited: &mut HashSet<String>) -> PageResult<Vec<DiscoveredFeature>> {
        sweep(
            self.page,
            self.config.visibility_timeout_ms,
            TAB_PATTERNS,
            visited,
            |handle, selector| self.extract_tab(handle, selector),
        )
        .await
    }

    async fn extract_menu(&self, handle: P::Handle, selector: String) -> PageResult<Option<DiscoveredFeature>> {
        let aria_label = read_attr(self.page, &handle, "aria-label").await?;
        let id = read_attr(self.page, &handle, "id").await?;
        let text = clean_text(self.page.text_content(&handle).await?);

        let name = aria_label
            .clone()
            .or(id)
            .or_else(|| text.as_deref().map(|t| truncate(t, MENU_NAME_LEN)))
            .unwrap_or_else(|| "Navigation Menu".to_string());

        let mut feature = DiscoveredFeature::new(name, FeatureType::Menu, selector.clone())
            .with_optional_attribute("aria-label", aria_label)
            .with_optional_attribute("class", read_attr(self.page, &handle, "class").await?)
            .with_actions([Action::Click, Action::Hover]);
        feature.children = self.menu_items(&selector).await?;
        Ok(Some(feature))
    }

    /// Visible links and menu items inside a menu
    async fn menu_items(&self, menu_selector: &str) -> PageResult<Vec<DiscoveredFeature>> {
        let pattern = format!("{menu_selector} a, {menu_selector} [role=\"menuitem\"]");
        let Some(handles) = tolerate(self.page.locate_all(&pattern).await, &pattern)? else {
            return Ok(Vec::new());
        };

        let resolver = SelectorResolver::new(self.page);
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for handle in handles {
            if items.len() >= self.config.menu_children_limit {
                break;
            }
            let selector = resolver.resolve(&handle).await;
            if !seen.insert(selector.clone()) {
                continue;
            }
            let visible = tolerate(self.page.is_visible(&handle, self.config.visibility_timeout_ms).await, &selector)?;
            if visible != Some(true) {
                continue;
            }
            let text = tolerate(self.page.text_content(&handle).await, &selector)?
                .and_then(clean_text);
            let name = text.clone().unwrap_or_else(|| "Menu Item".to_string());
            items.push(
                DiscoveredFeature::new(name, FeatureType::Other, selector)
                    .with_text(text)
                    .with_actions([Action::Click]),
            );
        }
        Ok(items)
    }

    async fn extract_dropdown(&self, handle: P::Handle, selector: String) -> PageResult<Option<DiscoveredFeature>> {
        let tag = self.page.tag_name(&handle).await?;
        let name = read_attr(self.page, &handle, "aria-label")
            .await?
            .or(read_attr(self.page, &handle, "name").await?)
            .or(read_attr(self.page, &handle, "id").await?)
            .or(clean_text(self.page.text_content(&handle).await?).map(|t| truncate(&t, MENU_NAME_LEN)))
            .unwrap_or_else(|| "Dropdown".to_string());

        let options = self.dropdown_options(&selector, tag == "select").await?;
        let actions = if tag == "select" {
            [Action::Select, Action::Click]
        } else {
            [Action::Click, Action::Hover]
        };

        let mut feature = DiscoveredFeature::new(name, FeatureType::Dropdown, selector).with_actions(actions);
        if !options.is_empty() {
            feature = feature.with_attribute("options", options.join(","));
        }
        Ok(Some(feature))
    }

    /// Option values of a dropdown, falling back to option text
    async fn dropdown_options(&self, selector: &str, is_select: bool) -> PageResult<Vec<String>> {
        let pattern = if is_select {
            format!("{selector} option")
        } else {
            format!("{selector} [role=\"option\"], {selector} li")
        };
        let Some(handles) = tolerate(self.page.locate_all(&pattern).await, &pattern)? else {
            return Ok(Vec::new());
        };

        let mut options = Vec::new();
        for handle in handles {
            let value = match read_attr(self.page, &handle, "value").await? {
                Some(value) => Some(value),
                None => clean_text(self.page.text_content(&handle).await?),
            };
            if let Some(value) = value {
                options.push(value);
            }
        }
        Ok(options)
    }

    async fn extract_tab(&self, handle: P::Handle, selector: String) -> PageResult<Option<DiscoveredFeature>> {
        let text = clean_text(self.page.text_content(&handle).await?);
        let aria_label = read_attr(self.page, &handle, "aria-label").await?;
        let name = text
            .clone()
            .or_else(|| aria_label.clone())
            .unwrap_or_else(|| "Tab".to_string());

        Ok(Some(
            DiscoveredFeature::new(name, FeatureType::Tab, selector)
                .with_text(text)
                .with_optional_attribute("aria-selected", read_attr(self.page, &handle, "aria-selected").await?)
                .with_actions([Action::Click]),
        ))
    }
}

#[async_trait]
impl<P: PageCapability> ElementScanner for NavigationScanner<'_, P> {
    fn label(&self) -> &'static str {
        "navigation"
    }

    async fn scan(&self) -> PageResult<Vec<CategoryBatch>> {
        let mut visited = HashSet::new();
        let menus = self.scan_menus(&mut visited).await?;
        let dropdowns = self.scan_dropdowns(&mut visited).await?;
        let tabs = self.scan_tabs(&mut visited).await?;
        Ok(vec![
            CategoryBatch::new(Category::Menus, menus),
            CategoryBatch::new(Category::Dropdowns, dropdowns),
            CategoryBatch::new(Category::Tabs, tabs),
        ])
    }
}
