use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Discovery tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoveryConfig {
    /// Bounded wait for each element visibility check (ms)
    pub visibility_timeout_ms: u64,

    /// Bounded wait when probing for a tooltip after hover (ms)
    pub tooltip_timeout_ms: u64,

    /// Maximum button features checked for tooltips
    pub tooltip_limit: usize,

    /// Maximum trigger elements hovered during dynamic discovery
    pub dynamic_hover_limit: usize,

    /// Settle interval after each dynamic-discovery hover (ms)
    pub dynamic_settle_ms: u64,

    /// Maximum elements processed per selector in the essentials pass
    pub essentials_limit: usize,

    /// Visibility wait used by the essentials pass (ms)
    pub essentials_visibility_timeout_ms: u64,

    /// Maximum child items recorded per menu
    pub menu_children_limit: usize,

    /// Keep partial results when a scanner fails instead of aborting discovery
    pub isolate_scanner_failures: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: 1000,
            tooltip_timeout_ms: 500,
            tooltip_limit: 10,
            dynamic_hover_limit: 5,
            dynamic_settle_ms: 500,
            essentials_limit: 10,
            essentials_visibility_timeout_ms: 500,
            menu_children_limit: 10,
            isolate_scanner_failures: false,
        }
    }
}

/// Test execution tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Settle delay after every step (ms)
    pub step_settle_ms: u64,

    /// Bounded wait for visibility and enabled assertions (ms)
    pub assertion_timeout_ms: u64,

    /// Capture a page screenshot when a case fails
    pub screenshot_on_failure: bool,

    /// Directory for screenshots and artifacts
    pub output_dir: PathBuf,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_settle_ms: 100,
            assertion_timeout_ms: 1000,
            screenshot_on_failure: true,
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserConfig {
    pub headless: bool,

    /// Connect to an existing browser over CDP instead of launching one
    pub cdp_endpoint: Option<String>,

    pub viewport_width: i32,
    pub viewport_height: i32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            cdp_endpoint: None,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    pub discovery: DiscoveryConfig,
    pub execution: ExecutionConfig,
    pub browser: BrowserConfig,
}

impl ExplorerConfig {
    /// Load from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `LUMI_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("LUMI_OUTPUT_DIR").filter(|d| !d.is_empty()) {
            self.execution.output_dir = PathBuf::from(dir);
        }
        if let Some(headless) = lookup("LUMI_HEADLESS") {
            self.browser.headless = headless != "false" && headless != "0";
        }
        if let Some(endpoint) = lookup("LUMI_CDP_ENDPOINT").filter(|e| !e.is_empty()) {
            self.browser.cdp_endpoint = Some(endpoint);
        }
    }
}
