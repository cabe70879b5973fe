/// Socket frame formats
///
/// Every frame is a JSON text message with an `event` field.
///
/// ```text
/// client -> server   {"event":"join:board","data":{"boardId":"..."}}
///                    {"event":"leave:board","data":{"boardId":"..."}}
/// server -> client   {"event":"joined","boardId":"..."}
///                    {"event":"left","boardId":"..."}
///                    {"event":"task:moved","data":{...}}
///                    {"event":"error","message":"..."}
/// ```

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::middleware::bearer_token;

/// Inbound frame
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "join:board")]
    JoinBoard {
        #[serde(rename = "boardId")]
        board_id: Uuid,
    },

    #[serde(rename = "leave:board")]
    LeaveBoard {
        #[serde(rename = "boardId")]
        board_id: Uuid,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Acknowledgment for a join or leave
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub event: &'static str,
    pub board_id: Uuid,
}

impl Ack {
    pub fn joined(board_id: Uuid) -> Self {
        Self {
            event: "joined",
            board_id,
        }
    }

    pub fn left(board_id: Uuid) -> Self {
        Self {
            event: "left",
            board_id,
        }
    }

    pub fn to_frame(&self) -> String {
        json!(self).to_string()
    }
}

/// Outbound board event frame
pub fn event_frame(event: &str, data: &Value) -> String {
    json!({ "event": event, "data": data }).to_string()
}

/// Frame sent back for input the server could not understand
pub fn error_frame(message: &str) -> String {
    json!({ "event": "error", "message": message }).to_string()
}

/// Handshake credential: `?token=` wins, then `Authorization: Bearer`
pub fn extract_token(query_token: Option<&str>, headers: &HeaderMap) -> Option<String> {
    query_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| bearer_token(headers).ok().map(str::to_string))
}
