//! Conversion between [`Content`] and its durable JSON record.
//!
//! Serialization is lossless except for one normalization: an empty text part
//! is written as a single space, since a zero-length part is rejected by the
//! model APIs on replay. Deserialization never aborts a history restore over a
//! single odd field: unknown tags and missing payloads degrade to text, an
//! unknown role reads as the user, and an undecodable signature is dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    PINNED_PREFIX,
    content::{Content, FunctionCall, FunctionResponse, Part, PartKind, Role},
    error::{Result, SessionError},
    state::SessionState,
};

const TEXT_TAG: &str = "text";
const FUNCTION_CALL_TAG: &str = "function_call";
const FUNCTION_RESPONSE_TAG: &str = "function_response";

/// Placeholder written for empty or unrecoverable text.
const BLANK_TEXT: &str = " ";

const SUMMARY_MAX_CHARS: usize = 100;

/// Durable form of one history entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedContent {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<SerializedPart>,
}

/// Durable form of one part. `kind` selects which payload field is read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<SerializedFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<SerializedFunctionResponse>,
    #[serde(default)]
    pub thought: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "signature_base64"
    )]
    pub thought_signature: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedFunctionCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedFunctionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub response: Map<String, Value>,
}

/// Signature bytes travel as standard base64 in JSON.
mod signature_base64 {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        Ok(encoded.and_then(|s| match STANDARD.decode(&s) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("dropping undecodable thought signature: {e}");
                None
            }
        }))
    }
}

/// Map one entry to its durable record.
pub fn serialize(content: &Content) -> SerializedContent {
    SerializedContent {
        role: content.role.as_str().to_string(),
        parts: content.parts.iter().map(serialize_part).collect(),
    }
}

fn serialize_part(part: &Part) -> SerializedPart {
    let mut record = SerializedPart {
        thought: part.thought,
        thought_signature: part.thought_signature.clone(),
        ..SerializedPart::default()
    };
    match &part.kind {
        PartKind::Text(text) => {
            record.kind = TEXT_TAG.to_string();
            record.text = Some(if text.is_empty() {
                BLANK_TEXT.to_string()
            } else {
                text.clone()
            });
        }
        PartKind::FunctionCall(call) => {
            record.kind = FUNCTION_CALL_TAG.to_string();
            record.function_call = Some(SerializedFunctionCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: call.args.clone(),
            });
        }
        PartKind::FunctionResponse(response) => {
            record.kind = FUNCTION_RESPONSE_TAG.to_string();
            record.function_response = Some(SerializedFunctionResponse {
                id: response.id.clone(),
                name: response.name.clone(),
                response: response.response.clone(),
            });
        }
    }
    record
}

/// Map a durable record back to an entry. An unknown role reads as the user.
pub fn deserialize(record: &SerializedContent) -> Content {
    let role = Role::parse(&record.role).unwrap_or_else(|| {
        tracing::warn!(role = %record.role, "unknown role in session record, reading as user");
        Role::User
    });
    Content {
        role,
        parts: record.parts.iter().map(deserialize_part).collect(),
    }
}

fn deserialize_part(record: &SerializedPart) -> Part {
    let kind = match record.kind.as_str() {
        FUNCTION_CALL_TAG => match &record.function_call {
            Some(call) => PartKind::FunctionCall(FunctionCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            None => PartKind::Text(BLANK_TEXT.to_string()),
        },
        FUNCTION_RESPONSE_TAG => match &record.function_response {
            Some(response) => PartKind::FunctionResponse(FunctionResponse {
                id: response.id.clone(),
                name: response.name.clone(),
                response: response.response.clone(),
            }),
            None => PartKind::Text(BLANK_TEXT.to_string()),
        },
        _ => match &record.text {
            Some(text) if !text.is_empty() => PartKind::Text(text.clone()),
            _ => PartKind::Text(BLANK_TEXT.to_string()),
        },
    };
    Part {
        kind,
        thought: record.thought,
        thought_signature: record.thought_signature.clone(),
    }
}

/// Deserialize an untyped JSON value holding one entry record.
///
/// Fails only when the value is not shaped like a record at all.
pub fn from_value(value: &Value) -> Result<Content> {
    if !value.is_object() {
        return Err(SessionError::InvalidRecord(format!(
            "expected an object, got {value}"
        )));
    }
    let record: SerializedContent = serde_json::from_value(value.clone())
        .map_err(|e| SessionError::InvalidRecord(e.to_string()))?;
    Ok(deserialize(&record))
}

pub fn serialize_history(history: &[Content]) -> Vec<SerializedContent> {
    history.iter().map(serialize).collect()
}

pub fn deserialize_history(records: &[SerializedContent]) -> Vec<Content> {
    records.iter().map(deserialize).collect()
}

/// The first user text after the pinned prefix, cut to 100 characters.
pub fn generate_summary(state: &SessionState) -> String {
    let first_user_text = state
        .history
        .iter()
        .skip(PINNED_PREFIX)
        .filter(|entry| entry.role == Role::User.as_str())
        .flat_map(|entry| entry.parts.iter())
        .filter(|part| part.kind != FUNCTION_CALL_TAG && part.kind != FUNCTION_RESPONSE_TAG)
        .filter_map(|part| part.text.as_deref())
        .find(|text| !text.trim().is_empty());

    match first_user_text {
        Some(text) if text.chars().count() > SUMMARY_MAX_CHARS => {
            let cut: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
            format!("{cut}...")
        }
        Some(text) => text.to_string(),
        None => String::new(),
    }
}
