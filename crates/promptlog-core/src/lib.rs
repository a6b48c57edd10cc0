//! Git-backed, append-only persistence for free-text prompts.
//!
//! The entry point is [`PromptPersister::save`], which writes one
//! frontmatter-annotated Markdown file per call into a git repository,
//! commits it and optionally pushes.

mod config;
mod error;
mod git;
mod naming;
mod persister;
mod record;

pub use config::{DEFAULT_PROMPTS_FOLDER, DEFAULT_REPO_DIR, PersistConfig};
pub use error::CoreError;
pub use git::{GitCli, VersionControl};
pub use naming::{MAX_SLUG_LEN, prompt_filename, slugify};
pub use persister::{
    Advisory, AdvisoryStep, PromptPersister, PushStatus, REMOTE_NAME, SaveResult, SavedPrompt,
};
pub use record::PromptRecord;
