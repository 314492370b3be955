use super::extract::Extractor;
use super::request::CandidateBody;
use super::streaming::FragmentPath;
use crate::tasks::RunRequest;

/// Base trait for LLM providers (chat-completions, agent-run).
///
/// A provider only describes the protocol: where to send a call, how to
/// serialize it and where the answer text lives. Sending, retrying and
/// decoding are shared and live in [`Transport`](super::transport::Transport)
/// and [`streaming`](super::streaming).
pub trait Provider: Send + Sync {
    /// Human readable provider name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Full URL calls are POSTed to.
    fn endpoint(&self) -> String;

    fn api_key(&self) -> &str;

    /// Request bodies to try, most preferred first. Never empty.
    fn candidates(&self, request: &RunRequest) -> Vec<CandidateBody>;

    /// Reduces a non-streaming response document to answer text.
    fn extractor(&self) -> &Extractor;

    /// Location of fragment text in streamed events.
    fn fragment_path(&self) -> FragmentPath;
}
