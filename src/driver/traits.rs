use super::error::PageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub type PageResult<T> = std::result::Result<T, PageError>;

/// Shallow description of a DOM node, used when walking ancestors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// 1-based position among the node's same-tag siblings
    #[serde(default)]
    pub nth_of_type: usize,
}

/// Narrow capability interface over a rendered page.
///
/// This trait is the only environment boundary of discovery, synthesis and
/// execution. It abstracts away the automation backend so the pipeline can run
/// against a real browser or an in-memory document alike.
#[async_trait]
pub trait PageCapability: Send + Sync {
    /// Live reference to a located element
    type Handle: Clone + Send + Sync;

    /// Get the backend name (e.g., "playwright")
    fn backend_name(&self) -> &str;

    /// Query every element matching `selector`, in document order
    async fn locate_all(&self, selector: &str) -> PageResult<Vec<Self::Handle>>;

    /// Count elements matching `selector`
    async fn count(&self, selector: &str) -> PageResult<usize>;

    /// Read an attribute, `None` when absent
    async fn get_attribute(&self, handle: &Self::Handle, name: &str)
        -> PageResult<Option<String>>;

    /// Read the element's text content
    async fn text_content(&self, handle: &Self::Handle) -> PageResult<Option<String>>;

    /// Lower-case tag name of the element
    async fn tag_name(&self, handle: &Self::Handle) -> PageResult<String>;

    /// Ancestors of the element, nearest first, excluding the element itself
    async fn ancestors(&self, handle: &Self::Handle) -> PageResult<Vec<NodeSummary>>;

    /// 1-based position of the element among its parent's children of the same tag
    async fn nth_of_type(&self, handle: &Self::Handle) -> PageResult<usize>;

    /// Check visibility, waiting at most `timeout_ms` for the element to become visible
    async fn is_visible(&self, handle: &Self::Handle, timeout_ms: u64) -> PageResult<bool>;

    /// Check whether the element is enabled, waiting at most `timeout_ms`
    async fn is_enabled(&self, handle: &Self::Handle, timeout_ms: u64) -> PageResult<bool>;

    /// Checked state of a checkbox or radio
    async fn is_checked(&self, handle: &Self::Handle) -> PageResult<bool>;

    /// Current value of a form control
    async fn input_value(&self, handle: &Self::Handle) -> PageResult<Option<String>> {
        self.get_attribute(handle, "value").await
    }

    async fn click(&self, handle: &Self::Handle) -> PageResult<()>;

    /// Replace the element's value with `value`
    async fn fill(&self, handle: &Self::Handle, value: &str) -> PageResult<()>;

    async fn hover(&self, handle: &Self::Handle) -> PageResult<()>;

    async fn focus(&self, handle: &Self::Handle) -> PageResult<()>;

    /// Select an option of a `<select>` by value or label
    async fn select_option(&self, handle: &Self::Handle, value: &str) -> PageResult<()>;

    async fn check(&self, handle: &Self::Handle) -> PageResult<()>;

    async fn uncheck(&self, handle: &Self::Handle) -> PageResult<()>;

    /// Press a key while the element is focused
    ///
    /// # Arguments
    /// * `key` - Key name (e.g., "Enter", "Escape", "ArrowDown")
    async fn press(&self, handle: &Self::Handle, key: &str) -> PageResult<()>;

    /// Take a screenshot
    ///
    /// # Arguments
    /// * `handle` - Element to capture, or `None` for the whole page
    /// * `path` - Where to save the screenshot
    async fn screenshot(&self, handle: Option<&Self::Handle>, path: &Path) -> PageResult<()>;

    /// Let the page settle for `ms` milliseconds
    async fn wait_for_timeout(&self, ms: u64) -> PageResult<()>;
}
