//! Unique selector resolution.
//!
//! Turns a located element into a locator expression that, at resolution
//! time, matches exactly that element. Tiers are tried in order:
//!
//! 1. `[data-testid="..."]`
//! 2. `#id`
//! 3. joined class list (verified unique)
//! 4. `[role][aria-label]`
//! 5. `button`/`a` text content (verified unique)
//! 6. structural: `nth-of-type` child path from a landmark ancestor (verified unique)
//! 7. tag + title / aria-label / short text, then the `nth-of-type` path from
//!    `body`, or `tag:first-of-type` for a detached element

use crate::driver::error::PageError;
use crate::driver::traits::{NodeSummary, PageCapability, PageResult};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Class keywords marking an ancestor as a structural landmark
const STRUCTURAL_KEYWORDS: &[&str] = &["nav", "menu", "toolbar", "panel", "container", "header"];

const MAX_TEXT_LEN: usize = 50;
const SHORT_TEXT_LEN: usize = 20;

static CSS_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").unwrap());

/// Escape a value for use inside a double-quoted attribute selector
pub fn escape_attr_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape an identifier (class or id) for use after `.` or `#`
pub fn css_escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, ch) in ident.chars().enumerate() {
        if i == 0 && ch.is_ascii_digit() {
            out.push_str(&format!("\\3{} ", ch));
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

/// Collapse internal whitespace runs and trim
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn id_selector(id: &str) -> String {
    if CSS_IDENT.is_match(id) {
        format!("#{}", id)
    } else {
        format!("[id=\"{}\"]", escape_attr_value(id))
    }
}

fn has_text(tag: &str, text: &str) -> String {
    format!("{}:has-text(\"{}\")", tag, escape_attr_value(text))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Scope selector for a landmark ancestor, if the ancestor qualifies
fn scope_of(ancestor: &NodeSummary) -> Option<String> {
    if let Some(id) = ancestor.id.as_deref().filter(|id| !id.is_empty()) {
        return Some(id_selector(id));
    }
    ancestor
        .classes
        .iter()
        .find(|class| {
            let lower = class.to_lowercase();
            STRUCTURAL_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|class| format!(".{}", css_escape_ident(class)))
}

pub struct SelectorResolver<'a, P: PageCapability> {
    page: &'a P,
}

impl<'a, P: PageCapability> SelectorResolver<'a, P> {
    pub fn new(page: &'a P) -> Self {
        Self { page }
    }

    /// Resolve a selector for `handle`. Never fails: any error degrades to a
    /// tag-based selector.
    pub async fn resolve(&self, handle: &P::Handle) -> String {
        match self.try_resolve(handle).await {
            Ok(selector) => selector,
            Err(e) => {
                debug!("Selector resolution failed, using tag fallback: {}", e);
                match self.page.tag_name(handle).await {
                    Ok(tag) if !tag.is_empty() => tag,
                    _ => "*".to_string(),
                }
            }
        }
    }

    /// Whether `selector` currently matches exactly one element.
    /// Non-fatal query errors count as "not unique".
    async fn is_unique(&self, selector: &str) -> PageResult<bool> {
        match self.page.count(selector).await {
            Ok(n) => Ok(n == 1),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("Uniqueness check for '{}' failed: {}", selector, e);
                Ok(false)
            }
        }
    }

    async fn attr(&self, handle: &P::Handle, name: &str) -> PageResult<Option<String>> {
        Ok(non_empty(self.page.get_attribute(handle, name).await?))
    }

    async fn try_resolve(&self, handle: &P::Handle) -> PageResult<String> {
        let tag = self.page.tag_name(handle).await?;
        if tag.is_empty() {
            return Err(PageError::Driver("element has no tag name".into()));
        }

        if let Some(test_id) = self.attr(handle, "data-testid").await? {
            return Ok(format!("[data-testid=\"{}\"]", escape_attr_value(&test_id)));
        }

        if let Some(id) = self.attr(handle, "id").await? {
            return Ok(id_selector(&id));
        }

        if let Some(class) = self.attr(handle, "class").await? {
            let selector: String = class
                .split_whitespace()
                .map(|c| format!(".{}", css_escape_ident(c)))
                .collect();
            if !selector.is_empty() && self.is_unique(&selector).await? {
                return Ok(selector);
            }
        }

        let aria_label = self.attr(handle, "aria-label").await?;
        if let (Some(role), Some(label)) = (self.attr(handle, "role").await?, aria_label.as_ref()) {
            return Ok(format!(
                "[role=\"{}\"][aria-label=\"{}\"]",
                escape_attr_value(&role),
                escape_attr_value(label)
            ));
        }

        let text = self
            .page
            .text_content(handle)
            .await?
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty());
        let short_text = text
            .as_ref()
            .map(|t| t.chars().take(SHORT_TEXT_LEN).collect::<String>());

        if tag == "button" || tag == "a" {
            if let Some(text) = &text {
                let len = text.chars().count();
                if len <= MAX_TEXT_LEN {
                    let selector = has_text(&tag, text);
                    if self.is_unique(&selector).await? {
                        return Ok(selector);
                    }
                }
                if len > SHORT_TEXT_LEN {
                    if let Some(short) = &short_text {
                        let selector = has_text(&tag, short);
                        if self.is_unique(&selector).await? {
                            return Ok(selector);
                        }
                    }
                }
            }
        }

        let path = self.structural(handle, &tag).await?;
        if let Some(path) = &path {
            if self.is_unique(&path.scoped).await? {
                return Ok(path.scoped.clone());
            }
        }

        let mut candidates = Vec::new();
        if let Some(title) = self.attr(handle, "title").await? {
            candidates.push(format!("{}[title=\"{}\"]", tag, escape_attr_value(&title)));
        }
        if let Some(label) = &aria_label {
            candidates.push(format!("{}[aria-label=\"{}\"]", tag, escape_attr_value(label)));
        }
        if let Some(short) = &short_text {
            candidates.push(has_text(&tag, short));
        }
        for candidate in &candidates {
            if self.is_unique(candidate).await? {
                return Ok(candidate.clone());
            }
        }

        Ok(path
            .map(|p| p.absolute)
            .unwrap_or_else(|| format!("{}:first-of-type", tag)))
    }

    /// Child-combinator paths down to the element, one anchored at the
    /// nearest landmark ancestor and one anchored at `body`.
    async fn structural(&self, handle: &P::Handle, tag: &str) -> PageResult<Option<StructuralPath>> {
        let ancestors = self.page.ancestors(handle).await?;
        let Some(body) = ancestors.iter().position(|a| a.tag == "body") else {
            return Ok(None);
        };
        let nth = self.page.nth_of_type(handle).await?;
        let leaf = format!("{}:nth-of-type({})", tag, nth);

        let path_below = |depth: usize, anchor: String| {
            let mut parts = vec![anchor];
            parts.extend(
                ancestors[..depth]
                    .iter()
                    .rev()
                    .map(|a| format!("{}:nth-of-type({})", a.tag, a.nth_of_type)),
            );
            parts.push(leaf.clone());
            parts.join(" > ")
        };

        let absolute = path_below(body, "body".to_string());
        let scoped = ancestors[..body]
            .iter()
            .enumerate()
            .find_map(|(depth, a)| scope_of(a).map(|scope| path_below(depth, scope)))
            .unwrap_or_else(|| absolute.clone());
        Ok(Some(StructuralPath { scoped, absolute }))
    }
}

/// Structural candidates for one element. `absolute` matches exactly that
/// element; `scoped` is shorter but only unique when its landmark is.
struct StructuralPath {
    scoped: String,
    absolute: String,
}
