//! Line-delimited JSON front door: one request per input line, one response per output line.

use crate::dashboard::{CallOutcome, DashboardCore};
use crate::errors::{AppError, AppResult};
use crate::gate::StagedProposal;
use crate::models::{AgentState, ToolReply};
use crate::tools::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    Call {
        name: String,
        #[serde(default)]
        arguments: Value,
        #[serde(default)]
        confirm: Option<bool>,
    },
    Accept {
        proposal_id: String,
    },
    Decline {
        proposal_id: String,
    },
    State,
    Tools,
    Pending,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    Reply {
        outcome: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<&'static str>,
        reply: ToolReply,
        #[serde(skip_serializing_if = "Option::is_none")]
        preview: Option<Value>,
    },
    Staged {
        proposal: StagedProposal,
    },
    State {
        state: AgentState,
    },
    Tools {
        tools: &'static [ToolDefinition],
    },
    Pending {
        proposals: Vec<StagedProposal>,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl From<CallOutcome> for Response {
    fn from(outcome: CallOutcome) -> Self {
        let reply = |outcome: &'static str, code: Option<&'static str>, reply: ToolReply, preview: Option<Value>| Self::Reply {
            outcome,
            code,
            reply,
            preview,
        };
        match outcome {
            CallOutcome::Committed { reply: message, preview } => reply("committed", None, message, Some(preview)),
            CallOutcome::Read { reply: message } => reply("read", None, message, None),
            CallOutcome::Failed { code, reply: message } => reply("failed", Some(code), message, None),
            CallOutcome::Declined { reply: message } => reply("declined", None, message, None),
            CallOutcome::Staged { proposal } => Self::Staged { proposal },
        }
    }
}

impl From<AppError> for Response {
    fn from(error: AppError) -> Self {
        Self::Error {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Handle one input line. Blank lines produce no response.
pub fn handle_line(core: &DashboardCore, line: &str) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(error) => {
            tracing::warn!(error = %error, "malformed request line");
            return Some(AppError::InvalidInput(format!("Malformed request: {}", error)).into());
        }
    };

    let response: Response = match request {
        Request::Call {
            name,
            arguments,
            confirm,
        } => core.handle_tool_call(&name, arguments, confirm).into(),
        Request::Accept { proposal_id } => core.accept(&proposal_id).into(),
        Request::Decline { proposal_id } => core.decline(&proposal_id).into(),
        Request::State => match core.state() {
            Ok(state) => Response::State { state },
            Err(error) => error.into(),
        },
        Request::Tools => Response::Tools { tools: core.tools() },
        Request::Pending => match core.pending() {
            Ok(proposals) => Response::Pending { proposals },
            Err(error) => error.into(),
        },
    };
    Some(response)
}

/// Serve requests until the reader is exhausted.
pub async fn serve<R, W>(core: &DashboardCore, reader: R, mut writer: W) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let Some(response) = handle_line(core, &line) else {
            continue;
        };
        let mut encoded = serde_json::to_string(&response).map_err(|error| {
            tracing::error!(error = %error, "failed to encode response");
            AppError::from(error)
        })?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }
    tracing::info!("input closed, shutting down");
    Ok(())
}
