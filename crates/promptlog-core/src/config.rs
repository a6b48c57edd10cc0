//! Persistence configuration.
//!
//! [`PersistConfig`] is an explicit value handed to
//! [`PromptPersister::save`](crate::PromptPersister::save). It is normally
//! built fresh from the process environment at each call boundary with
//! [`PersistConfig::from_env`], so changes take effect on the next save
//! without a restart. Tests construct it directly with the builder or with
//! [`PersistConfig::from_lookup`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Repository root used when `REPO_PATH` is unset, relative to the working directory.
pub const DEFAULT_REPO_DIR: &str = ".prompt-repo";

/// Prompts subfolder used when `PROMPTS_FOLDER` is unset.
pub const DEFAULT_PROMPTS_FOLDER: &str = "prompts";

/// Upper bound for a single git invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(60);

// ── Environment variable names ───────────────────────────────

pub const ENV_REPO_PATH: &str = "REPO_PATH";
pub const ENV_PROMPTS_FOLDER: &str = "PROMPTS_FOLDER";
pub const ENV_AUTHOR_NAME: &str = "GIT_AUTHOR_NAME";
pub const ENV_AUTHOR_EMAIL: &str = "GIT_AUTHOR_EMAIL";
pub const ENV_REMOTE: &str = "GIT_REMOTE";
pub const ENV_REMOTE_FALLBACK: &str = "PROMPT_REPO_URL";
pub const ENV_PUSH: &str = "GIT_PUSH";
pub const ENV_AUTO_INIT: &str = "PROMPTLOG_AUTO_INIT";
pub const ENV_GIT_TIMEOUT_SECS: &str = "PROMPTLOG_GIT_TIMEOUT_SECS";

/// Where and how prompts are persisted.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use promptlog_core::PersistConfig;
///
/// let config = PersistConfig::builder()
///     .repo_path(PathBuf::from("/tmp/prompts-repo"))
///     .prompts_folder("notes")
///     .author_name("Prompt Bot")
///     .build();
///
/// assert_eq!(config.prompts_folder(), "notes");
/// assert!(!config.push());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct PersistConfig {
    /// Repository root directory.
    repo_path: PathBuf,

    /// Subfolder (relative to the root) that receives prompt files.
    #[builder(default = DEFAULT_PROMPTS_FOLDER.to_owned(), setter(into))]
    prompts_folder: String,

    /// Repository-local `user.name`.
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    author_name: Option<String>,

    /// Repository-local `user.email`.
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    author_email: Option<String>,

    /// Remote URL used for clone, `origin` registration and push.
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,

    /// Push `HEAD` to `origin` after each commit.
    #[builder(default)]
    push: bool,

    /// Initialize (or clone) a repository when the root has none.
    /// When `false`, a missing repository is an error.
    #[builder(default = true)]
    auto_init: bool,

    /// Bound applied to every git invocation.
    #[builder(default = DEFAULT_GIT_TIMEOUT)]
    git_timeout: Duration,
}

impl PersistConfig {
    /// Build a configuration from the process environment.
    ///
    /// Relative paths in `REPO_PATH` and the default root are resolved
    /// against the current working directory.
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(&cwd, |key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset. `GIT_REMOTE` wins over
    /// `PROMPT_REPO_URL` when both are present.
    pub fn from_lookup(cwd: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let repo_path = match get(ENV_REPO_PATH) {
            Some(path) => cwd.join(path),
            None => cwd.join(DEFAULT_REPO_DIR),
        };

        let git_timeout = get(ENV_GIT_TIMEOUT_SECS)
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GIT_TIMEOUT);

        Self {
            repo_path,
            prompts_folder: get(ENV_PROMPTS_FOLDER)
                .unwrap_or_else(|| DEFAULT_PROMPTS_FOLDER.to_owned()),
            author_name: get(ENV_AUTHOR_NAME),
            author_email: get(ENV_AUTHOR_EMAIL),
            remote: get(ENV_REMOTE).or_else(|| get(ENV_REMOTE_FALLBACK)),
            push: get(ENV_PUSH).is_some_and(|v| is_truthy(&v)),
            auto_init: get(ENV_AUTO_INIT).is_none_or(|v| !is_falsey(&v)),
            git_timeout,
        }
    }

    /// Returns the repository root.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Returns the prompts subfolder name.
    pub fn prompts_folder(&self) -> &str {
        &self.prompts_folder
    }

    /// Returns the absolute prompts directory.
    pub fn prompts_dir(&self) -> PathBuf {
        self.repo_path.join(&self.prompts_folder)
    }

    /// Returns the configured author name, if any.
    pub fn author_name(&self) -> Option<&str> {
        self.author_name.as_deref()
    }

    /// Returns the configured author email, if any.
    pub fn author_email(&self) -> Option<&str> {
        self.author_email.as_deref()
    }

    /// Returns the configured remote URL, if any.
    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    /// Returns whether pushing is enabled.
    pub fn push(&self) -> bool {
        self.push
    }

    /// Returns whether a missing repository may be created.
    pub fn auto_init(&self) -> bool {
        self.auto_init
    }

    /// Returns the per-invocation git timeout.
    pub fn git_timeout(&self) -> Duration {
        self.git_timeout
    }

    /// Replace the repository root.
    pub fn with_repo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_path = path.into();
        self
    }

    /// Replace the prompts subfolder.
    pub fn with_prompts_folder(mut self, folder: impl Into<String>) -> Self {
        self.prompts_folder = folder.into();
        self
    }

    /// Replace the remote URL.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Enable or disable pushing.
    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn is_falsey(value: &str) -> bool {
    value.eq_ignore_ascii_case("false") || value == "0"
}
