//! Tool registry.
//!
//! Tools are plain async functions over JSON arguments. The registry lists
//! their definitions for `tools/list` and routes `tools/call` by name.

mod prompt;
mod random;
mod weather;

use std::fmt;
use std::sync::Arc;

use promptlog_core::{PersistConfig, PromptPersister};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::McpError;

pub use prompt::render_save_result;

/// Produces the persistence configuration for one call.
pub type ConfigSource = Arc<dyn Fn() -> PersistConfig + Send + Sync>;

/// Looks up a named setting (normally an environment variable).
type SettingSource = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Tool metadata advertised through `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Output of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
}

impl ToolResult {
    /// A successful single-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A failed single-text result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Concatenated text of all content blocks.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|ToolContent::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything tools read at call time.
#[derive(Clone)]
pub struct ToolContext {
    /// Builds a fresh [`PersistConfig`] for every save.
    config: ConfigSource,
    /// Fixed persister; when absent one is built per call from the config.
    persister: Option<PromptPersister>,
    settings: SettingSource,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("persister", &self.persister)
            .finish_non_exhaustive()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ToolContext {
    /// Read configuration and settings from the process environment per call.
    pub fn from_env() -> Self {
        Self::new(Arc::new(PersistConfig::from_env))
    }

    /// Use `config` for every save; other settings come from the environment.
    pub fn new(config: ConfigSource) -> Self {
        Self {
            config,
            persister: None,
            settings: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Use a fixed persister instead of one built from each config.
    pub fn with_persister(mut self, persister: PromptPersister) -> Self {
        self.persister = Some(persister);
        self
    }

    /// Replace the setting lookup used by the mock tools.
    pub fn with_settings(
        mut self,
        settings: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub(crate) fn persist_config(&self) -> PersistConfig {
        (self.config)()
    }

    pub(crate) fn persister_for(&self, config: &PersistConfig) -> PromptPersister {
        self.persister
            .clone()
            .unwrap_or_else(|| PromptPersister::for_config(config))
    }

    pub(crate) fn setting(&self, key: &str) -> Option<String> {
        (self.settings)(key)
    }
}

/// Registry of the tools exposed by the server.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    context: ToolContext,
    definitions: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ToolContext::from_env())
    }
}

impl ToolRegistry {
    /// Create the registry with every built-in tool.
    pub fn new(context: ToolContext) -> Self {
        let definitions = vec![
            prompt::save_prompt_definition(),
            prompt::get_prompt_definition(),
            weather::get_city_weather_definition(),
            weather::ask_weather_definition(),
            random::get_random_number_definition(),
        ];
        Self {
            context,
            definitions,
        }
    }

    /// Returns all tool definitions in registration order.
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Gets a tool definition by name.
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Execute the tool `name`.
    ///
    /// # Errors
    ///
    /// Returns `McpError::UnknownTool` for an unregistered name and
    /// `McpError::InvalidArguments` when the arguments do not match the
    /// tool's schema.
    #[instrument(skip(self, arguments))]
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult, McpError> {
        debug!(%arguments, "executing tool");
        match name {
            prompt::SAVE_PROMPT => prompt::save_prompt(&self.context, arguments).await,
            prompt::GET_PROMPT => prompt::get_prompt(arguments),
            weather::GET_CITY_WEATHER | weather::ASK_WEATHER => {
                weather::get_city_weather(&self.context, arguments)
            }
            random::GET_RANDOM_NUMBER => random::get_random_number(arguments),
            _ => Err(McpError::UnknownTool(name.to_owned())),
        }
    }
}

/// Deserialize tool arguments, mapping failures to `InvalidArguments`.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments).map_err(|e| McpError::InvalidArguments(e.to_string()))
}
