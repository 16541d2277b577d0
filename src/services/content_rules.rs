//! Text rules for user-submitted content
//!
//! Lengths are counted in characters after trimming surrounding whitespace.
//! Forbidden words match as case-insensitive substrings.

use chrono::Duration;

use crate::config::{ModerationConfig, MAX_EDIT_WINDOW_MINUTES};
use crate::services::error::{ServiceError, ServiceResult};

pub const POST_TITLE_MAX: usize = 200;
pub const POST_BODY_MAX: usize = 20_000;
pub const REPORT_REASON_MAX: usize = 500;
pub const DISPLAY_NAME_MAX: usize = 50;

/// Configured content rules
#[derive(Debug, Clone)]
pub struct ContentRules {
    forbidden_words: Vec<String>,
    comment_max_length: usize,
    edit_window: Duration,
}

impl ContentRules {
    pub fn new(config: &ModerationConfig) -> anyhow::Result<Self> {
        let minutes = config.comment_edit_window_minutes;
        let edit_window = Some(minutes)
            .filter(|m| (0..=MAX_EDIT_WINDOW_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .ok_or_else(|| anyhow::anyhow!("Invalid comment edit window: {} minutes", minutes))?;
        Ok(Self {
            forbidden_words: config
                .forbidden_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            comment_max_length: config.comment_max_length,
            edit_window,
        })
    }

    /// How long after creation a comment stays editable by its author
    pub fn edit_window(&self) -> Duration {
        self.edit_window
    }

    /// First forbidden word contained in `text`, if any
    pub fn find_forbidden(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.forbidden_words
            .iter()
            .find(|word| lowered.contains(word.as_str()))
            .map(String::as_str)
    }

    /// Reject `text` if it contains a forbidden word
    pub fn check_forbidden(&self, field: &str, text: &str) -> ServiceResult<()> {
        match self.find_forbidden(text) {
            Some(word) => Err(ServiceError::validation(format!(
                "{} contains a forbidden word: {}",
                field, word
            ))),
            None => Ok(()),
        }
    }

    /// Validate comment content, returning the trimmed text
    pub fn comment_content(&self, content: &str) -> ServiceResult<String> {
        let content = bounded_text("Comment content", content, self.comment_max_length)?;
        self.check_forbidden("Comment content", &content)?;
        Ok(content)
    }

    /// Validate post title and body, returning both trimmed
    pub fn post_content(&self, title: &str, body: &str) -> ServiceResult<(String, String)> {
        let title = bounded_text("Title", title, POST_TITLE_MAX)?;
        let body = bounded_text("Body", body, POST_BODY_MAX)?;
        self.check_forbidden("Title", &title)?;
        self.check_forbidden("Body", &body)?;
        Ok((title, body))
    }
}

/// Trim `text` and require `1..=max` characters
pub fn bounded_text(field: &str, text: &str, max: usize) -> ServiceResult<String> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(ServiceError::validation(format!("{} cannot be empty", field)));
    }
    if len > max {
        return Err(ServiceError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}
