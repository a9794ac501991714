//! Test case synthesis from discovered features.

pub mod synthesizer;
pub mod types;

pub use synthesizer::{default_fill_value, TestCaseSynthesizer};
pub use types::{Assertion, AssertionType, TestCase, TestStep};
