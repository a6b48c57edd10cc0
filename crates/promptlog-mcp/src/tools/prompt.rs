//! `save_prompt` and `get_prompt`.

use promptlog_core::{PushStatus, SaveResult};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use super::{ToolContext, ToolDefinition, ToolResult, parse_args};
use crate::error::McpError;

pub(super) const SAVE_PROMPT: &str = "save_prompt";
pub(super) const GET_PROMPT: &str = "get_prompt";

#[derive(Debug, Deserialize)]
struct PromptArgs {
    prompt: String,
}

pub(super) fn save_prompt_definition() -> ToolDefinition {
    ToolDefinition {
        name: SAVE_PROMPT,
        description: "Save a prompt into the configured git-backed prompt repository.\n\
            Writes a Markdown file with YAML frontmatter, commits it locally, and optionally \
            pushes to the remote. Returns the repository-relative path, commit SHA, and push status.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Plain-text prompt to save (can be multi-line). Example: 'What is the weather in Sofia'"
                }
            },
            "required": ["prompt"]
        }),
    }
}

pub(super) fn get_prompt_definition() -> ToolDefinition {
    ToolDefinition {
        name: GET_PROMPT,
        description: "Retrieve a saved prompt by its repository-relative path or id.\n\
            Returns the prompt body and stored metadata if present.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The prompt id or repo-relative file path, e.g. 'prompts/prompt-20250824...md'"
                }
            },
            "required": ["prompt"]
        }),
    }
}

/// Save the prompt with a freshly read configuration.
///
/// The save runs on its own task and is awaited to completion, so dropping
/// the request future cannot interrupt a write/commit halfway.
pub(super) async fn save_prompt(ctx: &ToolContext, arguments: Value) -> Result<ToolResult, McpError> {
    let PromptArgs { prompt } = parse_args(arguments)?;
    let config = ctx.persist_config();
    let persister = ctx.persister_for(&config);

    let result = tokio::spawn(async move { persister.save(&config, &prompt).await })
        .await
        .map_err(|e| {
            error!(error = %e, "save task aborted");
            McpError::Task(e.to_string())
        })?;

    let text = render_save_result(&result);
    Ok(if result.is_ok() {
        ToolResult::text(text)
    } else {
        ToolResult::error(text)
    })
}

/// Placeholder lookup: echoes the requested identifier.
pub(super) fn get_prompt(arguments: Value) -> Result<ToolResult, McpError> {
    let PromptArgs { prompt } = parse_args(arguments)?;
    Ok(ToolResult::text(format!("Prompt retrieved: {prompt}")))
}

/// Render a save outcome as the multi-line summary returned to callers.
///
/// ```text
/// Saved: prompts/prompt-20260203_143012045-hello.md
/// Commit: 0123abc...
/// Pushed: False
/// ```
///
/// A failed push adds a `Push error:` line and each advisory a `Warning:`
/// line. Failures render as `Error: <message>`.
pub fn render_save_result(result: &SaveResult) -> String {
    let saved = match result {
        Ok(saved) => saved,
        Err(e) => return format!("Error: {e}"),
    };

    let mut lines = vec![
        format!("Saved: {}", saved.relative_path),
        format!(
            "Commit: {}",
            saved.commit_id.as_deref().unwrap_or("(unavailable)")
        ),
        format!("Pushed: {}", if saved.pushed() { "True" } else { "False" }),
    ];
    if let PushStatus::Failed(e) = &saved.push {
        lines.push(format!("Push error: {e}"));
    }
    lines.extend(saved.advisories.iter().map(|a| format!("Warning: {a}")));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use promptlog_core::{
        Advisory, AdvisoryStep, CoreError, PersistConfig, PromptPersister, SavedPrompt,
        VersionControl,
    };

    use super::*;

    /// Accepts every operation and pretends `.git` exists once `init` ran.
    #[derive(Debug, Default)]
    struct AcceptingVcs;

    #[async_trait]
    impl VersionControl for AcceptingVcs {
        async fn init(&self, root: &Path) -> Result<(), CoreError> {
            std::fs::create_dir_all(root.join(".git"))?;
            Ok(())
        }
        async fn clone_remote(&self, _remote: &str, _root: &Path) -> Result<(), CoreError> {
            Ok(())
        }
        async fn set_config(&self, _root: &Path, _key: &str, _value: &str) -> Result<(), CoreError> {
            Ok(())
        }
        async fn add_remote(&self, _root: &Path, _name: &str, _url: &str) -> Result<(), CoreError> {
            Ok(())
        }
        async fn stage_and_commit(
            &self,
            _root: &Path,
            _path: &str,
            _message: &str,
        ) -> Result<(), CoreError> {
            Ok(())
        }
        async fn unstage(&self, _root: &Path, _path: &str) -> Result<(), CoreError> {
            Ok(())
        }
        async fn current_commit_id(&self, _root: &Path) -> Result<String, CoreError> {
            Ok("abc123".to_owned())
        }
        async fn push(&self, _root: &Path, _remote: &str) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn context(root: &Path, folder: &str) -> ToolContext {
        let config = PersistConfig::builder()
            .repo_path(root.to_path_buf())
            .prompts_folder(folder)
            .build();
        ToolContext::new(Arc::new(move || config.clone()))
            .with_persister(PromptPersister::new(Arc::new(AcceptingVcs)))
    }

    #[test]
    fn test_should_render_success_summary() {
        let result: SaveResult = Ok(SavedPrompt {
            relative_path: "prompts/prompt-1.md".to_owned(),
            commit_id: Some("abc123".to_owned()),
            push: PushStatus::Pushed,
            advisories: Vec::new(),
        });
        assert_eq!(
            render_save_result(&result),
            "Saved: prompts/prompt-1.md\nCommit: abc123\nPushed: True"
        );
    }

    #[test]
    fn test_should_render_push_error_and_warnings() {
        let result: SaveResult = Ok(SavedPrompt {
            relative_path: "prompts/prompt-1.md".to_owned(),
            commit_id: None,
            push: PushStatus::Failed(CoreError::PushMisconfigured),
            advisories: vec![Advisory {
                step: AdvisoryStep::Identity,
                error: CoreError::GitCommandFailed {
                    command: "config user.name x".to_owned(),
                    code: Some(1),
                    stderr: "locked".to_owned(),
                },
            }],
        });
        let text = render_save_result(&result);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Saved: prompts/prompt-1.md");
        assert_eq!(lines[1], "Commit: (unavailable)");
        assert_eq!(lines[2], "Pushed: False");
        assert!(lines[3].starts_with("Push error: push enabled but no remote configured"));
        assert!(lines[4].starts_with("Warning: identity configuration: git config user.name x failed"));
    }

    #[test]
    fn test_should_render_failure() {
        let result: SaveResult = Err(CoreError::EmptyInput);
        assert_eq!(render_save_result(&result), "Error: prompt is empty");
    }

    #[tokio::test]
    async fn test_should_save_prompt_through_tool() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let ctx = context(dir.path(), "notes");

        let result = save_prompt(&ctx, json!({"prompt": "Remember to buy milk"}))
            .await
            .expect("tool should run");

        assert!(!result.is_error);
        let text = result.joined_text();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("Saved: notes/prompt-"));
        assert!(lines[0].ends_with("-remember-to-buy-milk.md"));
        assert_eq!(lines[1], "Commit: abc123");
        assert_eq!(lines[2], "Pushed: False");

        let rel = lines[0].trim_start_matches("Saved: ");
        assert!(dir.path().join(rel).is_file());
    }

    #[tokio::test]
    async fn test_should_flag_empty_prompt_as_error() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let ctx = context(dir.path(), "prompts");

        let result = save_prompt(&ctx, json!({"prompt": "   "}))
            .await
            .expect("tool should run");

        assert!(result.is_error);
        assert_eq!(result.joined_text(), "Error: prompt is empty");
        assert!(!dir.path().join("prompts").exists());
    }

    #[tokio::test]
    async fn test_should_reject_missing_prompt_argument() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let ctx = context(dir.path(), "prompts");

        let err = save_prompt(&ctx, json!({"text": "hi"})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments(_)));
    }

    #[test]
    fn test_should_echo_prompt_id() {
        let result = get_prompt(json!({"prompt": "prompts/prompt-1.md"})).expect("tool should run");
        assert_eq!(result.joined_text(), "Prompt retrieved: prompts/prompt-1.md");
    }
}
