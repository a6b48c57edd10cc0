//! Prompt persistence pipeline.
//!
//! [`PromptPersister::save`] turns raw prompt text into one committed
//! Markdown file: resolve (or bootstrap) the repository, apply the author
//! identity, synthesize a filename, write the record, commit exactly that
//! file and optionally push. Commit is the durability boundary; steps after
//! it never turn a save into a failure.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::config::PersistConfig;
use crate::error::CoreError;
use crate::git::{GitCli, VersionControl};
use crate::naming::{prompt_filename, slugify};
use crate::record::PromptRecord;

/// Name under which the configured remote is registered.
pub const REMOTE_NAME: &str = "origin";

/// Attempts made to find a free filename before giving up.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Outcome of a save: the committed prompt, or why nothing was committed.
pub type SaveResult = Result<SavedPrompt, CoreError>;

/// A prompt that has been written and committed.
#[derive(Debug)]
pub struct SavedPrompt {
    /// Path of the file relative to the repository root, `/`-separated.
    pub relative_path: String,
    /// Identifier of the commit, when it could be read back.
    pub commit_id: Option<String>,
    /// What happened after the commit.
    pub push: PushStatus,
    /// Non-fatal steps that degraded along the way.
    pub advisories: Vec<Advisory>,
}

impl SavedPrompt {
    /// Returns whether `HEAD` reached the remote.
    pub fn pushed(&self) -> bool {
        matches!(self.push, PushStatus::Pushed)
    }
}

/// Push outcome, reported independently of the commit.
#[derive(Debug)]
pub enum PushStatus {
    /// Pushing is disabled.
    NotRequested,
    /// `HEAD` was pushed to the remote.
    Pushed,
    /// Push was requested but did not happen. The commit is still local.
    Failed(CoreError),
}

/// Pipeline step whose failure is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryStep {
    /// Cloning the remote into an empty root.
    Clone,
    /// Registering the remote after a fresh init.
    RemoteRegistration,
    /// Writing `user.name` / `user.email`.
    Identity,
    /// Reading the commit identifier back.
    CommitId,
}

impl fmt::Display for AdvisoryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clone => "clone",
            Self::RemoteRegistration => "remote registration",
            Self::Identity => "identity configuration",
            Self::CommitId => "commit id lookup",
        };
        f.write_str(name)
    }
}

/// A tolerated failure.
#[derive(Debug)]
pub struct Advisory {
    pub step: AdvisoryStep,
    pub error: CoreError,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// Persists prompts into a git repository.
///
/// The persister keeps no per-repository state: the [`PersistConfig`] passed
/// to each [`save`](Self::save) call decides where and how to write.
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use promptlog_core::{PersistConfig, PromptPersister};
///
/// # async fn example() {
/// let persister = PromptPersister::default();
/// let config = PersistConfig::builder()
///     .repo_path(PathBuf::from("/tmp/prompts-repo"))
///     .build();
///
/// match persister.save(&config, "Remember to buy milk").await {
///     Ok(saved) => println!("saved {}", saved.relative_path),
///     Err(e) => eprintln!("error: {e}"),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct PromptPersister {
    vcs: Arc<dyn VersionControl>,
}

impl fmt::Debug for PromptPersister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptPersister").finish_non_exhaustive()
    }
}

impl Default for PromptPersister {
    fn default() -> Self {
        Self::new(Arc::new(GitCli::default()))
    }
}

impl PromptPersister {
    /// Create a persister over the given version-control implementation.
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Create a persister that runs `git` with the timeout from `config`.
    pub fn for_config(config: &PersistConfig) -> Self {
        Self::new(Arc::new(GitCli::new(config.git_timeout())))
    }

    /// Save `text` as a new prompt file and commit it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyInput` for blank text, before any side effect.
    /// Returns `CoreError::InvalidPromptsFolder` when the prompts folder is
    /// absolute or climbs out of the repository, also before any side effect.
    /// Returns `CoreError::RepositoryNotFound` when the root has no repository
    /// and `auto_init` is disabled.
    /// Returns `CoreError::Io` if a directory or the file cannot be created.
    /// Returns `CoreError::GitCommandFailed` / `CoreError::GitTimeout` if
    /// init, stage or commit fails.
    #[instrument(skip(self, config, text), fields(repo = %config.repo_path().display()))]
    pub async fn save(&self, config: &PersistConfig, text: &str) -> SaveResult {
        self.save_at(config, text, Utc::now()).await
    }

    /// [`save`](Self::save) with an explicit creation time.
    pub async fn save_at(
        &self,
        config: &PersistConfig,
        text: &str,
        now: DateTime<Utc>,
    ) -> SaveResult {
        if text.trim().is_empty() {
            return Err(CoreError::EmptyInput);
        }
        check_prompts_folder(config.prompts_folder())?;

        let root = config.repo_path();
        let mut advisories = Vec::new();

        self.resolve_repository(config, &mut advisories).await?;
        self.configure_identity(config, &mut advisories).await;

        tokio::fs::create_dir_all(config.prompts_dir()).await?;

        let record = PromptRecord::new(text, now);
        let file_name = write_new_file(&config.prompts_dir(), &record, &slugify(text)).await?;
        let relative_path = match config.prompts_folder().trim_matches('/') {
            "" => file_name.clone(),
            folder => format!("{folder}/{file_name}"),
        };
        debug!(path = %relative_path, "wrote prompt file");

        if let Err(error) = self
            .vcs
            .stage_and_commit(root, &relative_path, &format!("Add prompt {file_name}"))
            .await
        {
            self.discard(config, &relative_path).await;
            return Err(error);
        }

        let commit_id = match self.vcs.current_commit_id(root).await {
            Ok(id) => Some(id),
            Err(error) => {
                advise(&mut advisories, AdvisoryStep::CommitId, error);
                None
            }
        };

        let push = self.push(config).await;

        info!(
            path = %relative_path,
            commit = commit_id.as_deref().unwrap_or("unknown"),
            pushed = matches!(push, PushStatus::Pushed),
            "saved prompt"
        );

        Ok(SavedPrompt {
            relative_path,
            commit_id,
            push,
            advisories,
        })
    }

    /// Make sure `config.repo_path()` is a repository, cloning or
    /// initializing it when allowed.
    async fn resolve_repository(
        &self,
        config: &PersistConfig,
        advisories: &mut Vec<Advisory>,
    ) -> Result<(), CoreError> {
        let root = config.repo_path();
        if self.vcs.is_repository(root).await {
            return Ok(());
        }
        if !config.auto_init() {
            return Err(CoreError::RepositoryNotFound(root.to_path_buf()));
        }

        tokio::fs::create_dir_all(root).await?;

        if let Some(remote) = config.remote()
            && is_empty_dir(root).await?
        {
            info!(remote, root = %root.display(), "cloning remote");
            if let Err(error) = self.vcs.clone_remote(remote, root).await {
                advise(advisories, AdvisoryStep::Clone, error);
                clear_dir(root).await?;
            }
        }

        if self.vcs.is_repository(root).await {
            return Ok(());
        }

        info!(root = %root.display(), "initializing repository");
        self.vcs.init(root).await?;

        if let Some(remote) = config.remote()
            && let Err(error) = self.vcs.add_remote(root, REMOTE_NAME, remote).await
        {
            advise(advisories, AdvisoryStep::RemoteRegistration, error);
        }

        Ok(())
    }

    /// Undo the write of an uncommitted prompt: drop it from the index and
    /// delete the file. Failures are logged, the commit error wins.
    async fn discard(&self, config: &PersistConfig, relative_path: &str) {
        if let Err(error) = self.vcs.unstage(config.repo_path(), relative_path).await {
            warn!(path = relative_path, error = %error, "failed to unstage prompt");
        }
        let path = config.repo_path().join(relative_path);
        if let Err(error) = tokio::fs::remove_file(&path).await
            && error.kind() != ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %error, "failed to remove prompt file");
        }
    }

    async fn configure_identity(&self, config: &PersistConfig, advisories: &mut Vec<Advisory>) {
        let root = config.repo_path();
        let settings = [
            ("user.name", config.author_name()),
            ("user.email", config.author_email()),
        ];
        for (key, value) in settings {
            let Some(value) = value else { continue };
            if let Err(error) = self.vcs.set_config(root, key, value).await {
                advise(advisories, AdvisoryStep::Identity, error);
            }
        }
    }

    async fn push(&self, config: &PersistConfig) -> PushStatus {
        if !config.push() {
            return PushStatus::NotRequested;
        }
        if config.remote().is_none() {
            warn!("push enabled without a remote; commit kept local");
            return PushStatus::Failed(CoreError::PushMisconfigured);
        }
        match self.vcs.push(config.repo_path(), REMOTE_NAME).await {
            Ok(()) => PushStatus::Pushed,
            Err(error) => {
                warn!(error = %error, "push failed; commit kept local");
                PushStatus::Failed(error)
            }
        }
    }
}

fn advise(advisories: &mut Vec<Advisory>, step: AdvisoryStep, error: CoreError) {
    warn!(step = %step, error = %error, "non-fatal step failed");
    advisories.push(Advisory { step, error });
}

/// Reject folders that would place prompts outside the repository root.
fn check_prompts_folder(folder: &str) -> Result<(), CoreError> {
    let escapes = Path::new(folder).components().any(|c| {
        matches!(
            c,
            Component::Prefix(_) | Component::RootDir | Component::ParentDir
        )
    });
    if escapes {
        return Err(CoreError::InvalidPromptsFolder(folder.to_owned()));
    }
    Ok(())
}

/// Remove everything a failed clone left in `dir`, which was empty before.
async fn clear_dir(dir: &Path) -> Result<(), CoreError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
    }
    Ok(())
}

async fn is_empty_dir(dir: &Path) -> Result<bool, CoreError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Create the record file under `dir` with create-new semantics, moving to
/// the next suffixed name when one is already taken. Returns the file name.
async fn write_new_file(
    dir: &Path,
    record: &PromptRecord,
    slug: &str,
) -> Result<String, CoreError> {
    let content = record.render();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = prompt_filename(record.created_at, slug, attempt);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&name))
            .await;
        match file {
            Ok(mut file) => {
                file.write_all(content.as_bytes()).await?;
                file.flush().await?;
                return Ok(name);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(name = %name, "prompt filename taken");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free prompt filename after {MAX_NAME_ATTEMPTS} attempts"),
    )))
}
