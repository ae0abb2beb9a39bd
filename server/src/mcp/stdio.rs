//! MCP server over stdio
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! Logs go to stderr so they never mix with protocol output.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::handler::{handle_mcp_message, McpSession};
use crate::AppState;

/// Serve stdin/stdout until EOF
pub async fn run_stdio(state: Arc<AppState>) -> Result<()> {
    info!("MCP server started, listening on stdin");
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve_lines(state, reader, writer).await?;
    info!("MCP server shutting down");
    Ok(())
}

/// Line loop shared by stdio and tests
pub async fn serve_lines<R, W>(state: Arc<AppState>, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = McpSession::new();
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Received EOF, shutting down");
                break;
            }
            Ok(_) => {
                let message = line.trim();
                if message.is_empty() {
                    continue;
                }
                debug!("Received request: {}", message);

                let Some(response) = handle_mcp_message(message, &mut session, &state).await else {
                    continue;
                };

                let mut out = response.to_json();
                out.push('\n');
                if let Err(e) = writer.write_all(out.as_bytes()).await {
                    error!("Failed to write response: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    error!("Failed to flush stdout: {}", e);
                    break;
                }
            }
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::test_registry;
    use crate::skills::SkillLibrary;
    use serde_json::Value;

    #[tokio::test]
    async fn test_line_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(
            crate::config::AppConfig::default(),
            Arc::new(test_registry(dir.path())),
            Arc::new(SkillLibrary::builtin()),
        ));

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve_lines(state, input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert!(lines[1]["result"].is_object());
    }
}
