//! Category scanners.
//!
//! Each scanner owns an ordered list of candidate selector patterns and turns
//! the visible matches into [`DiscoveredFeature`] records. Patterns and
//! elements are processed sequentially; the visited-selector set lives for one
//! `scan()` call only.

pub mod button;
pub mod component;
pub mod input;
pub mod navigation;

pub use button::ButtonScanner;
pub use component::ComponentScanner;
pub use input::InputScanner;
pub use navigation::NavigationScanner;

use super::resolver::SelectorResolver;
use super::types::{CategoryBatch, DiscoveredFeature};
use crate::driver::traits::{PageCapability, PageResult};
use async_trait::async_trait;
use log::debug;
use std::collections::HashSet;
use std::future::Future;

/// A category-specific element scanner
#[async_trait]
pub trait ElementScanner: Send + Sync {
    /// Short name used in logs
    fn label(&self) -> &'static str;

    /// Scan the page. Only fatal page errors are returned.
    async fn scan(&self) -> PageResult<Vec<CategoryBatch>>;
}

/// Drop non-fatal errors, keep fatal ones.
pub(crate) fn tolerate<T>(result: PageResult<T>, context: &str) -> PageResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("Skipping {}: {}", context, e);
            Ok(None)
        }
    }
}

/// Run `extract` on every visible, not-yet-visited element matching `patterns`.
///
/// `extract` receives the element and its resolved selector and returns
/// `None` to reject it. Rejected elements are not marked visited.
pub(crate) async fn sweep<P, F, Fut>(
    page: &P,
    visibility_timeout_ms: u64,
    patterns: &[&str],
    visited: &mut HashSet<String>,
    mut extract: F,
) -> PageResult<Vec<DiscoveredFeature>>
where
    P: PageCapability,
    F: FnMut(P::Handle, String) -> Fut,
    Fut: Future<Output = PageResult<Option<DiscoveredFeature>>>,
{
    let resolver = SelectorResolver::new(page);
    let mut features = Vec::new();

    for pattern in patterns {
        let Some(handles) = tolerate(page.locate_all(pattern).await, pattern)? else {
            continue;
        };

        for handle in handles {
            let selector = resolver.resolve(&handle).await;
            if visited.contains(&selector) {
                continue;
            }

            let visible = tolerate(page.is_visible(&handle, visibility_timeout_ms).await, &selector)?;
            if visible != Some(true) {
                continue;
            }

            if let Some(feature) = tolerate(extract(handle, selector.clone()).await, &selector)?.flatten() {
                visited.insert(selector);
                features.push(feature);
            }
        }
    }

    Ok(features)
}

/// Trimmed, whitespace-collapsed text, `None` when blank
pub(crate) fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|t| super::resolver::normalize_text(&t))
        .filter(|t| !t.is_empty())
}

/// Truncate to `max` characters
pub(crate) fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Attribute value, `None` when absent or blank
pub(crate) async fn read_attr<P: PageCapability>(
    page: &P,
    handle: &P::Handle,
    name: &str,
) -> PageResult<Option<String>> {
    Ok(page
        .get_attribute(handle, name)
        .await?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::types::FeatureType;
    use crate::driver::fake::{FakeNode, FakePage, BODY};

    #[tokio::test]
    async fn test_sweep_skips_hidden_broken_and_visited() {
        let page = FakePage::new();
        page.add(BODY, FakeNode::new("button").attr("id", "a"));
        page.add(BODY, FakeNode::new("button").attr("id", "b").hidden());
        page.break_selector("[broken]");

        let mut visited = HashSet::new();
        let features = sweep(&page, 100, &["button", "[broken]", "#a"], &mut visited, |_, sel| async move {
            Ok(Some(DiscoveredFeature::new("x", FeatureType::Button, sel)))
        })
        .await
        .unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].selector, "#a");
        assert!(visited.contains("#a"));
    }

    #[tokio::test]
    async fn test_sweep_propagates_fatal_errors() {
        let page = FakePage::new();
        page.fail_fatally_on("button");

        let mut visited = HashSet::new();
        let result = sweep(&page, 100, &["button"], &mut visited, |_, sel| async move {
            Ok(Some(DiscoveredFeature::new("x", FeatureType::Button, sel)))
        })
        .await;

        assert!(matches!(result, Err(e) if e.is_fatal()));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  Save \n  draft ".into())), Some("Save draft".into()));
        assert_eq!(clean_text(Some("   ".into())), None);
        assert_eq!(truncate("abcdef", 3), "abc");
    }
}
