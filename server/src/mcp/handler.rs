//! MCP request dispatch plus the HTTP and WebSocket transports

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::api::BearerAuth;
use crate::AppState;

use super::{
    codes, get_mcp_resources, methods, parse_resource_uri, MCPPrompt, MCPPromptArgument, MCPRequest, MCPResponse,
    ResourceTarget, PROTOCOL_VERSION,
};

/// Per-connection protocol state
#[derive(Debug, Clone, Default)]
pub struct McpSession {
    pub initialized: bool,
    pub client_name: Option<String>,
}

impl McpSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for transports without a handshake, such as plain HTTP POST
    pub fn stateless() -> Self {
        Self {
            initialized: true,
            client_name: None,
        }
    }
}

/// Parse one message and dispatch it. `None` means nothing to send back.
pub async fn handle_mcp_message(text: &str, session: &mut McpSession, state: &AppState) -> Option<MCPResponse> {
    match serde_json::from_str::<MCPRequest>(text) {
        Ok(request) => handle_mcp_request(request, session, state).await,
        Err(e) => Some(MCPResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {}", e))),
    }
}

/// Dispatch one request; notifications get no response
pub async fn handle_mcp_request(request: MCPRequest, session: &mut McpSession, state: &AppState) -> Option<MCPResponse> {
    if request.is_notification() {
        match request.method.as_str() {
            methods::INITIALIZED => session.initialized = true,
            methods::CANCELLED => debug!("Client cancelled a request"),
            other => debug!(method = other, "Ignoring notification"),
        }
        return None;
    }

    if !request.jsonrpc.is_empty() && request.jsonrpc != "2.0" {
        return Some(MCPResponse::error(
            request.id,
            codes::INVALID_REQUEST,
            "jsonrpc must be '2.0'".to_string(),
        ));
    }

    let requires_init = !matches!(request.method.as_str(), methods::INITIALIZE | methods::PING);
    if requires_init && !session.initialized {
        return Some(MCPResponse::error(request.id, codes::NOT_INITIALIZED, "Not initialized".to_string()));
    }

    let response = match request.method.as_str() {
        methods::INITIALIZE => {
            session.initialized = true;
            session.client_name = request
                .params
                .as_ref()
                .and_then(|p| p.pointer("/clientInfo/name"))
                .and_then(Value::as_str)
                .map(str::to_string);
            info!(client = ?session.client_name, "MCP session initialized");

            MCPResponse::success(
                request.id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {},
                        "resources": {},
                        "prompts": {}
                    },
                    "serverInfo": {
                        "name": "opsi-mcp",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
        }

        methods::PING => MCPResponse::success(request.id, json!({})),

        methods::LIST_TOOLS => {
            let tools = state.tools.list_tools();
            MCPResponse::success(request.id, json!({ "tools": tools }))
        }

        methods::CALL_TOOL => handle_tool_call(request, state).await,

        methods::LIST_RESOURCES => {
            let resources = get_mcp_resources(&state.registry.active_profile());
            MCPResponse::success(request.id, json!({ "resources": resources }))
        }

        methods::READ_RESOURCE => handle_read_resource(request, state).await,

        methods::LIST_PROMPTS => {
            let prompts: Vec<MCPPrompt> = state
                .skills
                .iter()
                .map(|skill| MCPPrompt {
                    name: skill.name.clone(),
                    description: skill.description.clone(),
                    arguments: vec![MCPPromptArgument {
                        name: "question".to_string(),
                        description: "What the user wants to know".to_string(),
                        required: false,
                    }],
                })
                .collect();
            MCPResponse::success(request.id, json!({ "prompts": prompts }))
        }

        methods::GET_PROMPT => handle_get_prompt(request, state),

        _ => MCPResponse::error(
            request.id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    };

    Some(response)
}

/// Handle MCP tool call
async fn handle_tool_call(request: MCPRequest, state: &AppState) -> MCPResponse {
    let params = match &request.params {
        Some(p) if p.is_object() => p,
        _ => return MCPResponse::error(request.id, codes::INVALID_PARAMS, "Invalid params".to_string()),
    };

    let tool_name = match params.get("name").and_then(Value::as_str) {
        Some(n) => n,
        None => return MCPResponse::error(request.id, codes::INVALID_PARAMS, "Missing tool name".to_string()),
    };

    if !state.tools.has_tool(tool_name) {
        return MCPResponse::error(
            request.id,
            codes::METHOD_NOT_FOUND,
            format!("Unknown tool: {}", tool_name),
        );
    }

    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    state.total_tool_calls.fetch_add(1, Ordering::Relaxed);
    let (payload, is_error) = state.tools.call_tool(tool_name, arguments).await;
    if is_error {
        state.total_tool_errors.fetch_add(1, Ordering::Relaxed);
    }

    let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    MCPResponse::success(
        request.id,
        json!({
            "content": [{
                "type": "text",
                "text": text
            }],
            "isError": is_error
        }),
    )
}

async fn handle_read_resource(request: MCPRequest, state: &AppState) -> MCPResponse {
    let uri = match request.params.as_ref().and_then(|p| p.get("uri")).and_then(Value::as_str) {
        Some(u) => u.to_string(),
        None => return MCPResponse::error(request.id, codes::INVALID_PARAMS, "Missing uri".to_string()),
    };

    let (profile, statistics) = match parse_resource_uri(&uri) {
        Some(ResourceTarget::Summary(p)) => (p, false),
        Some(ResourceTarget::Statistics(p)) => (p, true),
        None => {
            return MCPResponse::error(request.id, codes::INVALID_PARAMS, format!("Unknown resource: {}", uri))
        }
    };

    let doc = state.registry.cache(Some(&profile)).await.snapshot().await;
    let body = if statistics {
        serde_json::to_string_pretty(&doc.statistics)
    } else {
        serde_json::to_string_pretty(&doc.summary())
    };

    match body {
        Ok(text) => MCPResponse::success(
            request.id,
            json!({
                "contents": [{
                    "uri": uri,
                    "mimeType": "application/json",
                    "text": text
                }]
            }),
        ),
        Err(e) => MCPResponse::error(request.id, codes::INTERNAL_ERROR, e.to_string()),
    }
}

fn handle_get_prompt(request: MCPRequest, state: &AppState) -> MCPResponse {
    let params = request.params.as_ref();
    let name = match params.and_then(|p| p.get("name")).and_then(Value::as_str) {
        Some(n) => n,
        None => return MCPResponse::error(request.id, codes::INVALID_PARAMS, "Missing prompt name".to_string()),
    };

    let skill = match state.skills.get(name) {
        Some(s) => s,
        None => return MCPResponse::error(request.id, codes::INVALID_PARAMS, format!("Unknown prompt: {}", name)),
    };

    let question = params
        .and_then(|p| p.pointer("/arguments/question"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let mut text = format!("# {}\n\n{}", skill.title, skill.body);
    if let Some(q) = question {
        text.push_str("\n\nRequest: ");
        text.push_str(q);
    }

    MCPResponse::success(
        request.id,
        json!({
            "description": skill.description,
            "messages": [{
                "role": "user",
                "content": {
                    "type": "text",
                    "text": text
                }
            }]
        }),
    )
}

/// Stateless JSON-RPC over HTTP POST
pub async fn mcp_http_handler(_auth: BearerAuth, State(state): State<Arc<AppState>>, body: String) -> Response {
    let mut session = McpSession::stateless();
    match handle_mcp_message(&body, &mut session, &state).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handle MCP WebSocket upgrade
pub async fn mcp_websocket_handler(
    _auth: BearerAuth,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_mcp_socket(socket, state))
}

/// Handle MCP WebSocket connection
async fn handle_mcp_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    info!("MCP WebSocket connection established");

    let mut session = McpSession::new();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                debug!("MCP message received: {}", text);

                let Some(response) = handle_mcp_message(&text, &mut session, &state).await else {
                    continue;
                };

                if sender.send(Message::Text(response.to_json())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("MCP WebSocket connection closed");
                break;
            }
            Ok(Message::Ping(data)) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::models::fixtures::abc_document;
    use crate::registry::test_support::test_registry;
    use crate::skills::SkillLibrary;
    use pretty_assertions::assert_eq;

    fn state(dir: &std::path::Path) -> AppState {
        AppState::new(
            crate::config::AppConfig::default(),
            Arc::new(test_registry(dir)),
            Arc::new(SkillLibrary::builtin()),
        )
    }

    async fn send(state: &AppState, session: &mut McpSession, value: Value) -> Option<Value> {
        handle_mcp_message(&value.to_string(), session, state)
            .await
            .map(|r| serde_json::to_value(r).unwrap())
    }

    #[tokio::test]
    async fn test_handshake_then_list_tools() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let mut session = McpSession::new();

        let early = send(&state, &mut session, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
            .await
            .unwrap();
        assert_eq!(early["error"]["code"], codes::NOT_INITIALIZED);

        let init = send(
            &state,
            &mut session,
            json!({"jsonrpc": "2.0", "id": 2, "method": "initialize", "params": {"clientInfo": {"name": "test"}}}),
        )
        .await
        .unwrap();
        assert_eq!(init["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(session.client_name.as_deref(), Some("test"));

        let none = send(&state, &mut session, json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).await;
        assert!(none.is_none());

        let tools = send(&state, &mut session, json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}))
            .await
            .unwrap();
        let count = tools["result"]["tools"].as_array().unwrap().len();
        assert_eq!(count, state.tools.list_tools().len());
    }

    #[tokio::test]
    async fn test_tool_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let mut session = McpSession::stateless();

        let unknown = send(
            &state,
            &mut session,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "nope"}}),
        )
        .await
        .unwrap();
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);

        let failed = send(
            &state,
            &mut session,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "get_cached_database", "arguments": {}}}),
        )
        .await
        .unwrap();
        assert_eq!(failed["result"]["isError"], true);
        let payload: Value = serde_json::from_str(failed["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["type"], "InvalidArgument");
        assert_eq!(state.total_tool_calls.load(Ordering::Relaxed), 1);
        assert_eq!(state.total_tool_errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_resources_and_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        assert!(state.registry.cache(None).await.save(abc_document()).await);
        let mut session = McpSession::stateless();

        let read = send(
            &state,
            &mut session,
            json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read", "params": {"uri": "opsi://cache/DEFAULT"}}),
        )
        .await
        .unwrap();
        let summary: Value = serde_json::from_str(read["result"]["contents"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(summary["databases"], 1);

        let prompt = send(
            &state,
            &mut session,
            json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/get",
                   "params": {"name": "fleet-overview", "arguments": {"question": "How many databases?"}}}),
        )
        .await
        .unwrap();
        let text = prompt["result"]["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.ends_with("Request: How many databases?"));

        let missing = send(
            &state,
            &mut session,
            json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/get", "params": {"name": "nope"}}),
        )
        .await
        .unwrap();
        assert_eq!(missing["error"]["code"], codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_parse_error_and_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let mut session = McpSession::stateless();

        let parsed = handle_mcp_message("{not json", &mut session, &state).await.unwrap();
        assert_eq!(parsed.error.unwrap().code, codes::PARSE_ERROR);

        let unknown = send(&state, &mut session, json!({"jsonrpc": "2.0", "id": 9, "method": "bogus"}))
            .await
            .unwrap();
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);
    }
}
