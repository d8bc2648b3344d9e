//! Agent clients and the directory that resolves them.

use armature_core::CancellationToken;
use async_trait::async_trait;
use futures::Stream;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AgentError, AgentResult};
use crate::types::{Message, SendMessageRequest, SendMessageResponse, StreamEvent};

/// Stream of events produced by a streaming agent call.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = AgentResult<StreamEvent>> + Send>>;

/// An agent that answers one message at a time.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn send_message(
        &self,
        request: SendMessageRequest,
        cancel: &CancellationToken,
    ) -> AgentResult<SendMessageResponse>;
}

/// An agent that can also report progress while it works.
#[async_trait]
pub trait StreamingAgentClient: AgentClient {
    async fn stream_message(
        &self,
        message: Message,
        cancel: &CancellationToken,
    ) -> AgentResult<AgentEventStream>;
}

/// A resolved agent, tagged with what it can do.
#[derive(Clone)]
pub enum AgentHandle {
    Basic(Arc<dyn AgentClient>),
    Streaming(Arc<dyn StreamingAgentClient>),
}

impl AgentHandle {
    pub fn basic(client: impl AgentClient + 'static) -> Self {
        AgentHandle::Basic(Arc::new(client))
    }

    pub fn streaming(client: impl StreamingAgentClient + 'static) -> Self {
        AgentHandle::Streaming(Arc::new(client))
    }

    pub fn supports_streaming(&self) -> bool {
        matches!(self, AgentHandle::Streaming(_))
    }

    /// Blocking send, available on every handle.
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
        cancel: &CancellationToken,
    ) -> AgentResult<SendMessageResponse> {
        match self {
            AgentHandle::Basic(client) => client.send_message(request, cancel).await,
            AgentHandle::Streaming(client) => client.send_message(request, cancel).await,
        }
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentHandle::Basic(_) => f.write_str("AgentHandle::Basic"),
            AgentHandle::Streaming(_) => f.write_str("AgentHandle::Streaming"),
        }
    }
}

/// Resolves agents by exact id.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Look up an agent.
    ///
    /// # Errors
    ///
    /// [`AgentError::AgentNotFound`] listing the known ids when `agent_id`
    /// is not registered.
    async fn resolve_agent(&self, agent_id: &str) -> AgentResult<AgentHandle>;

    /// Known agent ids, sorted.
    async fn agent_ids(&self) -> Vec<String>;
}

/// Directory backed by an in-process map.
#[derive(Debug, Default)]
pub struct InMemoryAgentDirectory {
    agents: RwLock<BTreeMap<String, AgentHandle>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an agent.
    pub async fn register(&self, agent_id: impl Into<String>, handle: AgentHandle) {
        self.agents.write().await.insert(agent_id.into(), handle);
    }

    pub async fn remove(&self, agent_id: &str) -> Option<AgentHandle> {
        self.agents.write().await.remove(agent_id)
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn resolve_agent(&self, agent_id: &str) -> AgentResult<AgentHandle> {
        let agents = self.agents.read().await;
        match agents.get(agent_id) {
            Some(handle) => Ok(handle.clone()),
            None => Err(AgentError::not_found(
                agent_id,
                agents.keys().cloned().collect(),
            )),
        }
    }

    async fn agent_ids(&self) -> Vec<String> {
        self.agents.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    struct Echo;

    #[async_trait]
    impl AgentClient for Echo {
        async fn send_message(
            &self,
            request: SendMessageRequest,
            _cancel: &CancellationToken,
        ) -> AgentResult<SendMessageResponse> {
            Ok(SendMessageResponse::Message(Message::agent(
                "reply",
                request.message.text(),
            )))
        }
    }

    #[tokio::test]
    async fn test_resolve_registered_agent() {
        let directory = InMemoryAgentDirectory::new();
        directory.register("echo", AgentHandle::basic(Echo)).await;

        let handle = directory.resolve_agent("echo").await.unwrap();
        assert!(!handle.supports_streaming());

        let response = handle
            .send_message(
                SendMessageRequest::blocking(Message::user("m1", "ping")),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        match response {
            SendMessageResponse::Message(message) => assert_eq!(message.text(), "ping"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_agent_lists_known_ids() {
        let directory = InMemoryAgentDirectory::new();
        directory.register("planner", AgentHandle::basic(Echo)).await;
        directory.register("coder", AgentHandle::basic(Echo)).await;

        let err = directory.resolve_agent("Coder").await.unwrap_err();
        assert_eq!(
            err,
            AgentError::not_found("Coder", vec!["coder".into(), "planner".into()])
        );
        assert_eq!(directory.agent_ids().await, vec!["coder", "planner"]);
    }

    #[tokio::test]
    async fn test_remove_agent() {
        let directory = InMemoryAgentDirectory::new();
        directory.register("echo", AgentHandle::basic(Echo)).await;
        assert!(directory.remove("echo").await.is_some());
        assert!(directory.is_empty().await);
    }
}
