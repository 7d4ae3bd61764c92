//! Input resolution: turning what the user submitted into article text.
//!
//! Pasted text is used as-is. A URL is fetched and run through a
//! three-step extractor:
//!
//! | Step | Source | Notes |
//! |------|--------|-------|
//! | 1 | JSON-LD `articleBody` | Most news sites embed the full body for search engines |
//! | 2 | Main-content paragraphs | Paragraphs outside nav/header/footer/aside, grouped by container |
//! | 3 | Visible body text | Fallback when no paragraph survives |
//!
//! The first step that yields text wins. A page where all three come up
//! empty is a fetch error.

pub mod article;

pub use article::resolve;
