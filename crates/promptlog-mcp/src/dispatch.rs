//! MCP method identifiers.

use std::fmt;

/// Methods understood by the server.
///
/// Anything else is kept as [`McpMethod::Unknown`] so it can be reported
/// back as "method not found".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum McpMethod {
    /// Session handshake.
    Initialize,
    /// Client acknowledgement of the handshake (notification).
    Initialized,
    /// List available tools.
    ListTools,
    /// Call a tool.
    CallTool,
    /// Health check.
    Ping,
    /// Anything else.
    Unknown(String),
}

impl McpMethod {
    /// Returns the wire name of the method.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::Ping => "ping",
            Self::Unknown(s) => s.as_str(),
        }
    }
}

impl From<&str> for McpMethod {
    fn from(s: &str) -> Self {
        match s {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "ping" => Self::Ping,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
