//! Request handlers for the message endpoint.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::debug;

use colloquy_types::identity::UserId;

use crate::state::AppState;

/// One inbound line from a user.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Stable identity of the sender.
    pub user_id: String,
    /// The raw line, slash command or chat text.
    pub text: String,
}

/// The reply produced for one inbound line.
#[derive(Debug, Serialize)]
pub struct MessageReply {
    pub reply: String,
}

/// POST /api/v1/messages
///
/// Never fails with a protocol error for user mistakes: unknown
/// commands, missing sessions and model failures all come back as
/// reply text, the way a chat front end would show them.
pub async fn post_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Json<MessageReply> {
    let owner = UserId::new(request.user_id);
    debug!(user = %owner.as_str(), len = request.text.len(), "inbound message");
    let reply = state.router.handle_inbound(&owner, &request.text).await;
    Json(MessageReply { reply })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_request_deserializes() {
        let request: MessageRequest =
            serde_json::from_str(r#"{"user_id": "dave", "text": "/ls"}"#).unwrap();
        assert_eq!(request.user_id, "dave");
        assert_eq!(request.text, "/ls");
    }

    #[test]
    fn test_message_reply_serializes() {
        let reply = MessageReply {
            reply: "no sessions (use /new to create one)".to_string(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"reply\""));
    }
}
