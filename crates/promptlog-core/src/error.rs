use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("prompt is empty")]
    EmptyInput,

    #[error("no git repository found at {}", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("prompts folder must be a relative path inside the repository: {0}")]
    InvalidPromptsFolder(String),

    #[error("push enabled but no remote configured (set GIT_REMOTE or PROMPT_REPO_URL)")]
    PushMisconfigured,

    #[error("git {command} failed{}: {stderr}", code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    GitCommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("git {command} timed out after {}s", timeout.as_secs())]
    GitTimeout { command: String, timeout: Duration },

    #[error("invalid frontmatter: {0}")]
    Frontmatter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
