//! Message and task types exchanged with agents.
//!
//! These follow the Agent2Agent shapes closely enough that an adapter for a
//! remote agent only has to map field names.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Content part of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    File {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Concatenated text of all text parts.
fn parts_text(parts: &[Part]) -> String {
    parts.iter().filter_map(Part::as_text).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl Message {
    pub fn new(message_id: impl Into<String>, role: Role, parts: Vec<Part>) -> Self {
        Self {
            message_id: message_id.into(),
            context_id: None,
            task_id: None,
            role,
            parts,
            metadata: HashMap::new(),
        }
    }

    /// A user message with a single text part.
    pub fn user(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(message_id, Role::User, vec![Part::text(text)])
    }

    /// An agent message with a single text part.
    pub fn agent(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(message_id, Role::Agent, vec![Part::text(text)])
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn text(&self) -> String {
        parts_text(&self.parts)
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Failed,
    Cancelled,
    Rejected,
    Unknown,
}

impl TaskState {
    /// Whether the task can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled | TaskState::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input_required",
            TaskState::AuthRequired => "auth_required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
            TaskState::Rejected => "rejected",
            TaskState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Message attached to the latest state change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Message>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            update: None,
        }
    }

    pub fn with_update(mut self, update: Message) -> Self {
        self.update = Some(update);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn text(artifact_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            name: None,
            parts: vec![Part::text(text)],
        }
    }

    pub fn content_text(&self) -> String {
        parts_text(&self.parts)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
}

impl Task {
    pub fn new(id: impl Into<String>, state: TaskState) -> Self {
        Self {
            id: id.into(),
            context_id: None,
            status: Some(TaskStatus::new(state)),
            artifacts: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_history(mut self, message: Message) -> Self {
        self.history.push(message);
        self
    }

    pub fn with_status_update(mut self, update: Message) -> Self {
        if let Some(status) = self.status.as_mut() {
            status.update = Some(update);
        }
        self
    }

    pub fn state(&self) -> Option<TaskState> {
        self.status.as_ref().map(|s| s.state)
    }

    /// Best text answer carried by the task.
    ///
    /// Artifacts come first, then the status update message, then the most
    /// recent agent message in the history. Empty if none has text.
    pub fn answer_text(&self) -> String {
        let artifacts: String = self
            .artifacts
            .iter()
            .map(Artifact::content_text)
            .collect();
        if !artifacts.is_empty() {
            return artifacts;
        }

        if let Some(update) = self.status.as_ref().and_then(|s| s.update.as_ref()) {
            let text = update.text();
            if !text.is_empty() {
                return text;
            }
        }

        self.history
            .iter()
            .rev()
            .filter(|m| m.role == Role::Agent)
            .map(Message::text)
            .find(|t| !t.is_empty())
            .unwrap_or_default()
    }
}

/// Options for a blocking send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: Message,
    /// Wait for the task to reach a terminal state before answering.
    #[serde(default)]
    pub blocking: bool,
}

impl SendMessageRequest {
    pub fn blocking(message: Message) -> Self {
        Self {
            message,
            blocking: true,
        }
    }
}

/// Answer to a blocking send: a direct message or the task it created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMessageResponse {
    Message(Message),
    Task(Task),
}

/// One event from a streaming agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    Message(Message),
    Task(Task),
    StatusUpdate {
        task_id: String,
        status: TaskStatus,
    },
    ArtifactUpdate {
        task_id: String,
        artifact: Artifact,
    },
}
