//! On-disk prompt record format.
//!
//! A record is a Markdown file with a YAML frontmatter block:
//!
//! ```text
//! ---
//! created_at: 2026-02-03T14:30:12.045000Z
//! ---
//!
//! <verbatim prompt text>
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::CoreError;

const DELIMITER: &str = "---";

/// A single saved prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRecord {
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Prompt text exactly as supplied.
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    created_at: DateTime<Utc>,
}

impl PromptRecord {
    /// Create a record for `body` stamped at `created_at`.
    pub fn new(body: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            body: body.into(),
        }
    }

    /// Render the file content: frontmatter, a blank line, the body and a
    /// trailing newline.
    pub fn render(&self) -> String {
        format!(
            "{DELIMITER}\ncreated_at: {}\n{DELIMITER}\n\n{}\n",
            self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.body
        )
    }

    /// Parse file content produced by [`render`](Self::render).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Frontmatter` if the frontmatter block is missing
    /// or does not carry a valid `created_at`.
    pub fn parse(content: &str) -> Result<Self, CoreError> {
        let rest = content
            .strip_prefix("---\n")
            .ok_or_else(|| CoreError::Frontmatter("missing opening delimiter".to_owned()))?;
        let (yaml, rest) = rest
            .split_once("\n---\n")
            .ok_or_else(|| CoreError::Frontmatter("missing closing delimiter".to_owned()))?;

        let frontmatter: Frontmatter =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::Frontmatter(e.to_string()))?;

        let body = rest.strip_prefix('\n').unwrap_or(rest);
        let body = body.strip_suffix('\n').unwrap_or(body);

        Ok(Self {
            created_at: frontmatter.created_at,
            body: body.to_owned(),
        })
    }
}
