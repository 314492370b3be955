//! Answer-text extraction from loosely typed provider responses.
//!
//! Providers wrap the generated text in envelopes that drift between API
//! versions. An [`Extractor`] holds a prioritized list of [`EnvelopeRule`]s;
//! the first rule that yields non-empty text wins. New envelope shapes are
//! supported by adding a rule.

use serde_json::Value;

/// Keys whose subtrees describe the envelope rather than the answer.
const METADATA_KEYS: [&str; 5] = ["type", "role", "id", "name", "agent"];

/// Keys that carry answer text directly.
const TEXT_KEYS: [&str; 2] = ["text", "output_text"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeRule {
    /// `choices[].message.content`, concatenated.
    ChatChoices,
    /// Walk the value found at a JSON pointer, e.g. `/output` or `/run/response`.
    Pointer(&'static str),
    /// Walk the whole document.
    Document,
}

impl EnvelopeRule {
    fn apply(&self, document: &Value) -> String {
        match self {
            EnvelopeRule::ChatChoices => chat_choices(document),
            EnvelopeRule::Pointer(pointer) => document
                .pointer(pointer)
                .map(extract_text)
                .unwrap_or_default(),
            EnvelopeRule::Document => extract_text(document),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extractor {
    rules: Vec<EnvelopeRule>,
}

impl Extractor {
    pub fn new(rules: Vec<EnvelopeRule>) -> Self {
        Self { rules }
    }

    /// Chat-completions responses. An empty `choices` list yields `""`.
    pub fn chat() -> Self {
        Self::new(vec![EnvelopeRule::ChatChoices])
    }

    /// Agent-run responses: well-known envelope keys first, then nested
    /// `run`/`response` wrappers, then the whole document.
    pub fn agent_run() -> Self {
        Self::new(vec![
            EnvelopeRule::Pointer("/output"),
            EnvelopeRule::Pointer("/response"),
            EnvelopeRule::Pointer("/output_text"),
            EnvelopeRule::Pointer("/data"),
            EnvelopeRule::Pointer("/run/response"),
            EnvelopeRule::Pointer("/run/output"),
            EnvelopeRule::Pointer("/response/output"),
            EnvelopeRule::Document,
        ])
    }

    pub fn with_rule(mut self, rule: EnvelopeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Never fails; returns `""` when no rule finds text.
    pub fn extract(&self, document: &Value) -> String {
        self.rules
            .iter()
            .map(|rule| rule.apply(document))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

/// Concatenate every string in `value` in traversal order, skipping
/// metadata subtrees, and trim the result.
pub fn extract_text(value: &Value) -> String {
    let mut fragments = Vec::new();
    visit(value, &mut fragments);
    fragments.concat().trim().to_string()
}

fn visit<'a>(node: &'a Value, fragments: &mut Vec<&'a str>) {
    match node {
        Value::String(text) => fragments.push(text),
        Value::Array(items) => {
            for item in items {
                visit(item, fragments);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::String(text) if TEXT_KEYS.contains(&key.as_str()) => {
                        fragments.push(text)
                    }
                    _ if METADATA_KEYS.contains(&key.as_str()) => {}
                    _ => visit(value, fragments),
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn chat_choices(document: &Value) -> String {
    let Some(choices) = document.get("choices").and_then(Value::as_array) else {
        return String::new();
    };

    choices
        .iter()
        .filter_map(|choice| choice.get("message")?.get("content")?.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}
