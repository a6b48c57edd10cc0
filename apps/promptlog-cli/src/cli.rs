use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promptlog_core::{PersistConfig, PromptPersister};
use promptlog_mcp::{McpServer, ToolRegistry, render_save_result};
use tokio::io::AsyncReadExt;

#[derive(Debug, Parser)]
#[command(name = "promptlog", version, about = "Git-backed prompt log exposed as MCP tools")]
pub struct Cli {
    /// Also write JSON logs into this directory
    #[arg(long, global = true, env = "PROMPTLOG_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the prompt tools over MCP on stdin/stdout
    Serve,

    /// Save one prompt and print the result summary
    Save {
        /// Prompt text (read from stdin until EOF when omitted)
        text: Option<String>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

/// Flags that take precedence over the environment.
#[derive(Debug, Default, clap::Args)]
pub struct ConfigOverrides {
    /// Repository root
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Prompts subfolder inside the repository
    #[arg(long)]
    pub folder: Option<String>,

    /// Remote URL for clone and push
    #[arg(long)]
    pub remote: Option<String>,

    /// Push after committing
    #[arg(long)]
    pub push: bool,
}

impl ConfigOverrides {
    /// Apply the flags on top of an environment-derived config.
    pub fn apply(self, mut config: PersistConfig) -> PersistConfig {
        if let Some(repo) = self.repo {
            config = config.with_repo_path(repo);
        }
        if let Some(folder) = self.folder {
            config = config.with_prompts_folder(folder);
        }
        if let Some(remote) = self.remote {
            config = config.with_remote(remote);
        }
        if self.push {
            config = config.with_push(true);
        }
        config
    }
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        match self.command {
            Commands::Serve => {
                McpServer::new(ToolRegistry::default())
                    .run_stdio()
                    .await
                    .context("MCP server failed")?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Save { text, overrides } => {
                let text = match text {
                    Some(text) => text,
                    None => read_stdin().await?,
                };
                let config = overrides.apply(PersistConfig::from_env());
                let result = PromptPersister::for_config(&config)
                    .save(&config, &text)
                    .await;

                eprintln!("{}", render_save_result(&result));
                Ok(if result.is_ok() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
        }
    }
}

async fn read_stdin() -> Result<String> {
    eprintln!("Enter prompt text, finish with EOF (Ctrl+D):");
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("failed to read prompt from stdin")?;
    Ok(text)
}
