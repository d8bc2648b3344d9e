//! Built-in agent for trying out `agent_call` without a remote agent.

use armature_agent::{AgentClient, AgentResult, Message, SendMessageRequest, SendMessageResponse};
use armature_core::CancellationToken;
use async_trait::async_trait;

pub const ECHO_AGENT_ID: &str = "echo";

/// Answers every message with `Echo: <text>`.
pub struct EchoAgent;

#[async_trait]
impl AgentClient for EchoAgent {
    async fn send_message(
        &self,
        request: SendMessageRequest,
        _cancel: &CancellationToken,
    ) -> AgentResult<SendMessageResponse> {
        let text = request.message.text();
        let reply = if text.is_empty() {
            "No input".to_string()
        } else {
            format!("Echo: {}", text)
        };
        Ok(SendMessageResponse::Message(Message::agent(
            format!("{}-reply", request.message.message_id),
            reply,
        )))
    }
}
