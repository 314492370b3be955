//! Candidate request bodies.
//!
//! A logical call can be serialized in more than one way when the provider's
//! accepted schema is not reliably known. Candidates are ordered from the
//! documented shape to the most permissive one.

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// `{model, messages, temperature}` for chat-completions providers.
    Chat,
    /// Agent-run body with content as a typed content-part array.
    Structured,
    /// Agent-run body with content as a bare string.
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateBody {
    pub shape: BodyShape,
    pub body: Value,
}

impl CandidateBody {
    fn new(shape: BodyShape, mut body: Value, stream: bool) -> Self {
        if stream {
            if let Some(map) = body.as_object_mut() {
                map.insert("stream".to_string(), Value::Bool(true));
            }
        }
        Self { shape, body }
    }
}

/// Single chat-completions candidate with the system prompt first.
pub fn chat_candidates(
    model: &str,
    system_prompt: &str,
    content: &str,
    temperature: f32,
    stream: bool,
) -> Vec<CandidateBody> {
    let body = json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": content},
        ],
        "temperature": temperature,
    });
    vec![CandidateBody::new(BodyShape::Chat, body, stream)]
}

/// Structured then plain agent-run candidates.
pub fn agent_candidates(agent: &str, content: &str, stream: bool) -> Vec<CandidateBody> {
    let response_mode = if stream { "streaming" } else { "blocking" };

    let structured = json!({
        "agent": agent,
        "input": [{
            "role": "user",
            "content": [{"type": "input_text", "text": content}],
        }],
        "response_mode": {"type": response_mode},
    });
    let plain = json!({
        "agent": agent,
        "input": [{"role": "user", "content": content}],
        "response_mode": {"type": response_mode},
    });

    vec![
        CandidateBody::new(BodyShape::Structured, structured, stream),
        CandidateBody::new(BodyShape::Plain, plain, stream),
    ]
}
