//! Conversation content model: entries, roles and the parts they carry.
//!
//! These are the values the model client hands to a [`Session`](super::Session).
//! The session never builds provider payloads from them; it stores, trims,
//! serializes and exports them.

use serde_json::{Map, Value};

/// Who authored an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    /// Parses the persisted role name. Returns `None` for anything unknown.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "model" => Some(Role::Model),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function/tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    pub args: Map<String, Value>,
}

/// The result of a function/tool invocation, sent back to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Map<String, Value>,
}

/// The payload of a single part.
#[derive(Clone, Debug, PartialEq)]
pub enum PartKind {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

/// One fragment of an entry.
///
/// `thought` marks model reasoning and `thought_signature` is an opaque blob
/// some models require to be replayed verbatim; both are carried untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub kind: PartKind,
    pub thought: bool,
    pub thought_signature: Option<Vec<u8>>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_kind(PartKind::Text(text.into()))
    }

    pub fn function_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self::from_kind(PartKind::FunctionCall(FunctionCall {
            id: id.into(),
            name: name.into(),
            args,
        }))
    }

    pub fn function_response(
        id: impl Into<String>,
        name: impl Into<String>,
        response: Map<String, Value>,
    ) -> Self {
        Self::from_kind(PartKind::FunctionResponse(FunctionResponse {
            id: id.into(),
            name: name.into(),
            response,
        }))
    }

    fn from_kind(kind: PartKind) -> Self {
        Self {
            kind,
            thought: false,
            thought_signature: None,
        }
    }

    /// Marks this part as model reasoning.
    pub fn into_thought(mut self) -> Self {
        self.thought = true;
        self
    }

    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.thought_signature = Some(signature);
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// One turn in the conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Create a user entry with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create a model entry with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Concatenated text of all non-reasoning text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| !part.thought)
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
