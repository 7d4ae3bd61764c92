//! Error type shared by every pipeline stage.
//!
//! Each variant maps to one user-visible failure. A geocoding miss is not an
//! error: the location is dropped and the request still succeeds.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsMapError {
    /// The article URL could not be fetched or yielded no extractable text.
    #[error("Could not fetch article: {0}")]
    Fetch(String),

    /// Neither the URL nor the pasted text produced usable article text.
    #[error("No valid article text found")]
    EmptyArticle,

    /// The LLM request itself failed (network, status, empty candidate).
    #[error("Location extraction failed: {0}")]
    Llm(String),

    /// The LLM answered, but not with a list of locations.
    #[error("Could not parse the model response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl NewsMapError {
    /// Short machine-readable kind used by the JSON API.
    pub fn kind(&self) -> &'static str {
        match self {
            NewsMapError::Fetch(_) => "fetch",
            NewsMapError::EmptyArticle => "empty_article",
            NewsMapError::Llm(_) => "llm",
            NewsMapError::Parse(_) => "parse",
            NewsMapError::Config(_) => "config",
        }
    }

    /// True when the failure came from a third-party service rather than
    /// from what the user submitted or what the model said.
    pub fn is_upstream(&self) -> bool {
        matches!(self, NewsMapError::Fetch(_) | NewsMapError::Llm(_))
    }
}

pub type Result<T> = std::result::Result<T, NewsMapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            NewsMapError::EmptyArticle.to_string(),
            "No valid article text found"
        );
        assert_eq!(
            NewsMapError::Parse("expected a list".into()).to_string(),
            "Could not parse the model response: expected a list"
        );
    }

    #[test]
    fn test_upstream_classification() {
        assert!(NewsMapError::Fetch("timeout".into()).is_upstream());
        assert!(NewsMapError::Llm("503".into()).is_upstream());
        assert!(!NewsMapError::Parse("bad".into()).is_upstream());
        assert!(!NewsMapError::EmptyArticle.is_upstream());
        assert_eq!(NewsMapError::Config("x".into()).kind(), "config");
    }
}
