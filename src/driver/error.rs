use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static TIMEOUT_MS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*ms\b").unwrap());

/// Duration named in a timeout message such as "Timeout 30000ms exceeded", 0 when absent
fn timeout_ms(message: &str) -> u64 {
    TIMEOUT_MS
        .captures(message)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// Errors raised by a [`PageCapability`](super::traits::PageCapability) backend.
///
/// Only [`PageError::Disconnected`] is fatal: it means the page itself stopped
/// answering. Every other variant concerns a single element or selector and is
/// recoverable by skipping that element.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("element is detached from the document")]
    Detached,

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("page disconnected: {0}")]
    Disconnected(String),

    #[error("driver error: {0}")]
    Driver(String),
}

impl PageError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PageError::Disconnected(_))
    }

    /// Classify a backend error message into the taxonomy above.
    pub fn from_driver(message: impl std::fmt::Display) -> Self {
        let message = message.to_string();
        let lower = message.to_lowercase();
        if lower.contains("target closed")
            || lower.contains("browser has been closed")
            || lower.contains("page has been closed")
            || lower.contains("disconnected")
        {
            PageError::Disconnected(message)
        } else if lower.contains("not attached") || lower.contains("detached") {
            PageError::Detached
        } else if lower.contains("selector") && (lower.contains("parse") || lower.contains("valid"))
        {
            PageError::InvalidSelector {
                selector: String::new(),
                reason: message,
            }
        } else if lower.contains("timeout") {
            PageError::Timeout(timeout_ms(&message))
        } else {
            PageError::Driver(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_disconnect_is_fatal() {
        assert!(PageError::Disconnected("gone".into()).is_fatal());
        assert!(!PageError::Detached.is_fatal());
        assert!(!PageError::Timeout(500).is_fatal());
        assert!(!PageError::ElementNotFound("#x".into()).is_fatal());
    }

    #[test]
    fn test_classify_driver_messages() {
        assert!(PageError::from_driver("Target closed").is_fatal());
        assert_eq!(
            PageError::from_driver("Element is not attached to the DOM"),
            PageError::Detached
        );
        assert!(matches!(
            PageError::from_driver("Unexpected token while parsing selector"),
            PageError::InvalidSelector { .. }
        ));
        assert_eq!(
            PageError::from_driver("Timeout 500ms exceeded"),
            PageError::Timeout(500)
        );
        assert_eq!(
            PageError::from_driver("locator.click: Timeout 30000 ms exceeded."),
            PageError::Timeout(30000)
        );
        assert_eq!(PageError::from_driver("navigation timeout"), PageError::Timeout(0));
        assert!(matches!(
            PageError::from_driver("something odd"),
            PageError::Driver(_)
        ));
    }
}
