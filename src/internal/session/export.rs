//! Shareable renderings of a session.
//!
//! Both formats pass every piece of user- or model-authored text through the
//! redactor, including nested tool arguments and results.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use super::{
    content::{Content, PartKind, Role},
    conversation::Session,
    error::Result,
    redact::{redact, redact_map},
    serializer::{SerializedPart, deserialize_history},
    state::SessionState,
};

impl Session {
    /// Human-readable transcript with role headers and fenced tool blocks.
    ///
    /// Rendered from one snapshot, so the header always matches the transcript.
    pub fn export_markdown(&self) -> String {
        let state = self.snapshot();
        render_markdown(&state, &deserialize_history(&state.history))
    }

    /// Full persisted state as pretty JSON, with secrets redacted.
    pub fn export_json(&self) -> Result<String> {
        let state = redact_state(self.snapshot());
        Ok(serde_json::to_string_pretty(&state)?)
    }
}

fn render_markdown(state: &SessionState, history: &[Content]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Session {}\n", state.id);
    let _ = writeln!(out, "- Started: {}", state.start_time.to_rfc3339());
    let _ = writeln!(out, "- Last active: {}", state.last_active.to_rfc3339());
    if !state.working_dir.is_empty() {
        let _ = writeln!(out, "- Working directory: `{}`", state.working_dir);
    }
    let _ = writeln!(out, "- Messages: {}", history.len());
    let _ = writeln!(out, "- Total tokens: {}", state.total_tokens);

    if !state.system_instruction.is_empty() {
        let _ = writeln!(
            out,
            "\n## System instruction\n\n{}",
            redact(&state.system_instruction)
        );
    }

    for entry in history {
        render_entry(&mut out, entry);
    }

    if !state.scratchpad.is_empty() {
        let _ = writeln!(out, "\n## Scratchpad\n\n{}", redact(&state.scratchpad));
    }
    out
}

fn render_entry(out: &mut String, entry: &Content) {
    let header = match entry.role {
        Role::User => "User",
        Role::Model => "Model",
    };
    let _ = writeln!(out, "\n## {header}\n");

    for part in &entry.parts {
        match &part.kind {
            PartKind::Text(text) if part.thought => {
                for line in redact(text).lines() {
                    let _ = writeln!(out, "> {line}");
                }
                out.push('\n');
            }
            PartKind::Text(text) => {
                let _ = writeln!(out, "{}\n", redact(text));
            }
            PartKind::FunctionCall(call) => {
                let _ = writeln!(out, "**Tool call:** `{}` (`{}`)\n", call.name, call.id);
                write_json_block(out, &call.args);
            }
            PartKind::FunctionResponse(response) => {
                let _ = writeln!(
                    out,
                    "**Tool result:** `{}` (`{}`)\n",
                    response.name, response.id
                );
                write_json_block(out, &response.response);
            }
        }
    }
}

fn write_json_block(out: &mut String, map: &Map<String, Value>) {
    let redacted = Value::Object(redact_map(map));
    let body = serde_json::to_string_pretty(&redacted).unwrap_or_else(|_| redacted.to_string());
    let _ = writeln!(out, "```json\n{body}\n```\n");
}

fn redact_state(mut state: SessionState) -> SessionState {
    for entry in &mut state.history {
        for part in &mut entry.parts {
            redact_part(part);
        }
    }
    state.summary = redact(&state.summary);
    state.scratchpad = redact(&state.scratchpad);
    state.system_instruction = redact(&state.system_instruction);
    state
}

fn redact_part(part: &mut SerializedPart) {
    if let Some(text) = part.text.as_mut() {
        *text = redact(text);
    }
    if let Some(call) = part.function_call.as_mut() {
        call.args = redact_map(&call.args);
    }
    if let Some(response) = part.function_response.as_mut() {
        response.response = redact_map(&response.response);
    }
}
