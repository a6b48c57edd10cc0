//! MCP server over newline-delimited JSON-RPC.
//!
//! Each input line is one request. Responses are written one per line;
//! notifications (requests without an `id`) get none. Requests are handled
//! in arrival order.

use serde_json::{Value, json};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::dispatch::McpMethod;
use crate::error::McpError;
use crate::protocol::{
    DispatchResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::{ToolRegistry, ToolResult};

/// MCP protocol revision implemented here.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "promptlog";

/// Maximum accepted request line, in bytes.
const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// MCP server exposing the promptlog tools.
#[derive(Debug, Clone, Default)]
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    /// Create a server over the given tool registry.
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Serve on the process stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns `McpError::Io` if stdin cannot be read or stdout written.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        info!(server = SERVER_NAME, "serving MCP over stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    ///
    /// Lines longer than the request limit are skipped without being
    /// buffered and answered with an invalid-request error; lines that are
    /// not UTF-8 get a parse error. Neither stops the loop.
    ///
    /// # Errors
    ///
    /// Returns `McpError::Io` on read or write failure.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        while let Some(frame) = read_frame(&mut reader, &mut buf).await? {
            let response = match frame {
                Frame::TooLarge => {
                    warn!(max = MAX_REQUEST_SIZE, "request too large");
                    let message = format!("Request too large (max: {MAX_REQUEST_SIZE} bytes)");
                    Some(JsonRpcResponse::new(None, Err((INVALID_REQUEST, message))).to_line())
                }
                Frame::Line => match std::str::from_utf8(&buf) {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => self.handle_request(line.trim_end_matches(['\r', '\n'])).await,
                    Err(e) => {
                        warn!(error = %e, "request is not valid UTF-8");
                        let error = (PARSE_ERROR, format!("Parse error: {e}"));
                        Some(JsonRpcResponse::new(None, Err(error)).to_line())
                    }
                },
            };
            if let Some(response) = response {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        debug!("input closed; stopping server");
        Ok(())
    }

    /// Handle one JSON-RPC line, returning the response line if one is due.
    pub async fn handle_request(&self, line: &str) -> Option<String> {
        if line.len() > MAX_REQUEST_SIZE {
            warn!(size = line.len(), max = MAX_REQUEST_SIZE, "request too large");
            let message = format!(
                "Request too large: {} bytes (max: {MAX_REQUEST_SIZE} bytes)",
                line.len()
            );
            return Some(JsonRpcResponse::new(None, Err((INVALID_REQUEST, message))).to_line());
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                let error = (PARSE_ERROR, format!("Parse error: {e}"));
                return Some(JsonRpcResponse::new(None, Err(error)).to_line());
            }
        };

        if request.jsonrpc != "2.0" {
            let error = (INVALID_REQUEST, "jsonrpc must be \"2.0\"".to_owned());
            return Some(JsonRpcResponse::new(request.id, Err(error)).to_line());
        }

        let method = McpMethod::from(request.method.as_str());
        let span = info_span!("mcp.request", rpc.method = %method);

        let Some(id) = request.id else {
            debug!(parent: &span, "notification received");
            return None;
        };

        let result = self.dispatch(&method, request.params).instrument(span).await;
        Some(JsonRpcResponse::new(Some(id), result).to_line())
    }

    async fn dispatch(&self, method: &McpMethod, params: Option<Value>) -> DispatchResult {
        match method {
            McpMethod::Initialize => Ok(initialize_result()),
            McpMethod::Ping => Ok(json!({})),
            McpMethod::ListTools => Ok(json!({ "tools": self.tools.list_tools() })),
            McpMethod::CallTool => self.call_tool(params).await,
            McpMethod::Initialized | McpMethod::Unknown(_) => {
                Err((METHOD_NOT_FOUND, format!("Method not found: {method}")))
            }
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> DispatchResult {
        let params = params.ok_or((INVALID_PARAMS, "Missing params".to_owned()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or((INVALID_PARAMS, "Missing tool name".to_owned()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        info!(tool = name, "calling tool");
        let result = match self.tools.execute(name, arguments).await {
            Ok(result) => result,
            Err(McpError::UnknownTool(name)) => {
                return Err((INVALID_PARAMS, format!("Unknown tool: {name}")));
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool failed");
                ToolResult::error(e.to_string())
            }
        };

        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }
}

/// One newline-delimited input frame.
enum Frame {
    /// A complete line, held in the caller's buffer.
    Line,
    /// A line over `MAX_REQUEST_SIZE`, already discarded.
    TooLarge,
}

/// Read the next line into `buf`, reading at most `MAX_REQUEST_SIZE + 1`
/// bytes of it. Returns `None` at end of input.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_REQUEST_SIZE as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(None);
    }
    if buf.len() as u64 >= limit && buf.last() != Some(&b'\n') {
        buf.clear();
        skip_line(reader).await?;
        return Ok(Some(Frame::TooLarge));
    }
    Ok(Some(Frame::Line))
}

/// Consume input up to and including the next newline.
async fn skip_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use promptlog_core::PersistConfig;

    use super::*;
    use crate::tools::ToolContext;

    fn server_for(root: &Path) -> McpServer {
        let config = PersistConfig::builder()
            .repo_path(root.to_path_buf())
            .auto_init(false)
            .build();
        McpServer::new(ToolRegistry::new(ToolContext::new(Arc::new(move || {
            config.clone()
        }))))
    }

    async fn call(server: &McpServer, request: Value) -> Value {
        let line = server
            .handle_request(&request.to_string())
            .await
            .expect("response expected");
        serde_json::from_str(&line).expect("valid json response")
    }

    #[tokio::test]
    async fn test_should_handle_initialize() {
        let server = McpServer::default();
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_should_list_tools() {
        let server = McpServer::default();
        let response = call(&server, json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"})).await;

        let tools = response["result"]["tools"].as_array().expect("tools array");
        assert!(tools.iter().any(|t| t["name"] == "save_prompt"));
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_should_answer_ping() {
        let server = McpServer::default();
        let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})).await;
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_should_not_respond_to_notifications() {
        let server = McpServer::default();
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(server.handle_request(&line).await.is_none());
    }

    #[tokio::test]
    async fn test_should_report_parse_error() {
        let server = McpServer::default();
        let line = server.handle_request("{not json").await.expect("response");
        let response: Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_should_report_unknown_method() {
        let server = McpServer::default();
        let response =
            call(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_tool_as_invalid_params() {
        let server = McpServer::default();
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "nope"}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_should_return_tool_errors_as_content() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let server = server_for(dir.path());
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": {"name": "save_prompt", "arguments": {"prompt": "hello"}}
            }),
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        assert!(text.starts_with("Error: no git repository found at"), "{text}");
    }

    #[tokio::test]
    async fn test_should_return_invalid_arguments_as_error_content() {
        let server = McpServer::default();
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "tools/call",
                "params": {"name": "get_prompt", "arguments": {}}
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
    }

    async fn serve_bytes(server: &McpServer, input: &[u8]) -> Vec<Value> {
        let mut output = Vec::new();
        server
            .serve(input, &mut output)
            .await
            .expect("serve should finish");
        String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("valid json"))
            .collect()
    }

    #[tokio::test]
    async fn test_should_keep_serving_after_invalid_utf8_line() {
        let server = McpServer::default();
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(
            json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})
                .to_string()
                .as_bytes(),
        );
        input.push(b'\n');

        let responses = serve_bytes(&server, &input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["id"], 9);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_should_skip_oversized_line_and_continue() {
        let server = McpServer::default();
        let mut input = vec![b'x'; MAX_REQUEST_SIZE + 10];
        input.push(b'\n');
        input.extend_from_slice(
            json!({"jsonrpc": "2.0", "id": 10, "method": "ping"})
                .to_string()
                .as_bytes(),
        );

        let responses = serve_bytes(&server, &input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(responses[1]["id"], 10);
    }

    #[tokio::test]
    async fn test_should_accept_line_at_size_limit() {
        let mut buf = Vec::new();
        let mut input = vec![b' '; MAX_REQUEST_SIZE];
        input.push(b'\n');
        let mut reader = input.as_slice();

        let frame = read_frame(&mut reader, &mut buf).await.expect("read");
        assert!(matches!(frame, Some(Frame::Line)));
        assert_eq!(buf.len(), MAX_REQUEST_SIZE + 1);
        assert!(read_frame(&mut reader, &mut buf).await.expect("read").is_none());
    }

    #[tokio::test]
    async fn test_should_serve_lines_in_order() {
        let server = McpServer::default();
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            String::new(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "get_prompt", "arguments": {"prompt": "x"}}})
            .to_string(),
        ]
        .join("\n");

        let mut output = Vec::new();
        server
            .serve(input.as_bytes(), &mut output)
            .await
            .expect("serve should finish");

        let responses: Vec<Value> = String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("valid json"))
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(
            responses[1]["result"]["content"][0]["text"],
            "Prompt retrieved: x"
        );
    }
}
