//! Version-control capability and its `git` CLI implementation.
//!
//! [`VersionControl`] is the narrow set of operations the persister needs.
//! [`GitCli`] implements it by spawning the `git` executable through
//! `tokio::process::Command`; every invocation is bounded by a timeout and
//! a timed-out child is killed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::DEFAULT_GIT_TIMEOUT;
use crate::error::CoreError;

/// Operations on a repository working tree.
///
/// Every method receives the repository root explicitly; implementations
/// hold no per-repository state.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Returns whether `root` already holds repository metadata.
    async fn is_repository(&self, root: &Path) -> bool {
        tokio::fs::metadata(root.join(".git"))
            .await
            .is_ok_and(|m| m.is_dir())
    }

    /// Create an empty repository in `root`.
    async fn init(&self, root: &Path) -> Result<(), CoreError>;

    /// Clone `remote` into the (empty) directory `root`.
    async fn clone_remote(&self, remote: &str, root: &Path) -> Result<(), CoreError>;

    /// Set a repository-local configuration value.
    async fn set_config(&self, root: &Path, key: &str, value: &str) -> Result<(), CoreError>;

    /// Register `url` as the remote `name`.
    async fn add_remote(&self, root: &Path, name: &str, url: &str) -> Result<(), CoreError>;

    /// Stage exactly `path` (relative to `root`) and commit only that path.
    async fn stage_and_commit(
        &self,
        root: &Path,
        path: &str,
        message: &str,
    ) -> Result<(), CoreError>;

    /// Drop `path` from the index, leaving the working tree untouched.
    async fn unstage(&self, root: &Path, path: &str) -> Result<(), CoreError>;

    /// Returns the full identifier of `HEAD`.
    async fn current_commit_id(&self, root: &Path) -> Result<String, CoreError>;

    /// Push `HEAD` to `remote`.
    async fn push(&self, root: &Path, remote: &str) -> Result<(), CoreError>;
}

/// Captured output of a successful git invocation.
#[derive(Debug, Clone)]
pub(crate) struct GitOutput {
    pub stdout: String,
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Executable to run.
    program: PathBuf,
    /// Bound applied to each invocation.
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT)
    }
}

impl GitCli {
    /// Create a `git` runner with the given per-invocation timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
        }
    }

    /// Use a different executable (for example an absolute path to `git`).
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Returns the per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `git <args>` in `cwd`, failing on a non-zero exit.
    #[instrument(skip(self, args), fields(command = tracing::field::Empty))]
    async fn run<I, S>(&self, cwd: &Path, args: I) -> Result<GitOutput, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::Span::current().record("command", command.as_str());
        debug!(cwd = %cwd.display(), "running git");

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(CoreError::GitTimeout {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            debug!(code = ?output.status.code(), stderr = %stderr, "git failed");
            return Err(CoreError::GitCommandFailed {
                command,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn init(&self, root: &Path) -> Result<(), CoreError> {
        self.run(root, ["init"]).await.map(drop)
    }

    async fn clone_remote(&self, remote: &str, root: &Path) -> Result<(), CoreError> {
        self.run(root, ["clone", remote, "."]).await.map(drop)
    }

    async fn set_config(&self, root: &Path, key: &str, value: &str) -> Result<(), CoreError> {
        self.run(root, ["config", key, value]).await.map(drop)
    }

    async fn add_remote(&self, root: &Path, name: &str, url: &str) -> Result<(), CoreError> {
        self.run(root, ["remote", "add", name, url]).await.map(drop)
    }

    async fn stage_and_commit(
        &self,
        root: &Path,
        path: &str,
        message: &str,
    ) -> Result<(), CoreError> {
        self.run(root, ["add", "--", path]).await?;
        self.run(root, ["commit", "-m", message, "--", path]).await?;
        Ok(())
    }

    async fn unstage(&self, root: &Path, path: &str) -> Result<(), CoreError> {
        self.run(root, ["rm", "--cached", "-q", "--ignore-unmatch", "--", path])
            .await
            .map(drop)
    }

    async fn current_commit_id(&self, root: &Path) -> Result<String, CoreError> {
        let output = self.run(root, ["rev-parse", "HEAD"]).await?;
        Ok(output.stdout.trim().to_owned())
    }

    async fn push(&self, root: &Path, remote: &str) -> Result<(), CoreError> {
        self.run(root, ["push", remote, "HEAD"]).await.map(drop)
    }
}
