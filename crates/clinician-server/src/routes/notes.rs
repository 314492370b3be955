use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use clinician::{AgentTask, TextStream};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

const TRIAGE_SUFFIX: &str = "\n\nOutput as a numbered list.";

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    text: String,
    #[serde(default)]
    stream: Option<bool>,
}

impl NoteRequest {
    fn validate(payload: Result<Json<NoteRequest>, JsonRejection>) -> Result<Self, ApiError> {
        let Json(request) = payload?;
        if request.text.is_empty() {
            return Err(ApiError::Validation(
                "text: must contain at least 1 character".to_string(),
            ));
        }
        Ok(request)
    }

    fn streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriageResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub reply: String,
}

// Raw answer fragments as a text/event-stream body
pub struct SseResponse {
    fragments: TextStream,
}

impl SseResponse {
    fn new(fragments: TextStream) -> Self {
        Self { fragments }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.fragments.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(fragment))) => Poll::Ready(Some(Ok(Bytes::from(fragment)))),
            Poll::Ready(Some(Err(err))) => {
                // Headers are already sent; end the body and keep the cause in the logs.
                tracing::error!("Provider stream failed: {}", err);
                Poll::Ready(None)
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = Body::from_stream(self);
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response()
    }
}

/// Answer lines with list dashes and surrounding spaces removed.
fn split_questions(text: &str) -> Vec<String> {
    let questions: Vec<String> = text
        .lines()
        .map(|line| line.trim_matches(|c| c == ' ' || c == '-'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    if questions.is_empty() {
        vec![text.to_string()]
    } else {
        questions
    }
}

async fn complete(state: &AppState, task: AgentTask, content: &str) -> Result<String, ApiError> {
    let text = state.runner.complete(task, content).await?;
    if text.is_empty() {
        return Err(ApiError::EmptyAnswer);
    }
    Ok(text)
}

async fn stream(state: &AppState, task: AgentTask, content: &str) -> Result<Response, ApiError> {
    let fragments = state.runner.stream(task, content).await?;
    Ok(SseResponse::new(fragments).into_response())
}

async fn summarize_handler(
    State(state): State<AppState>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = NoteRequest::validate(payload)?;
    if request.streaming() {
        return stream(&state, AgentTask::Summarize, &request.text).await;
    }

    let summary = complete(&state, AgentTask::Summarize, &request.text).await?;
    Ok(Json(SummarizeResponse { summary }).into_response())
}

async fn triage_handler(
    State(state): State<AppState>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = NoteRequest::validate(payload)?;
    let content = format!("{}{}", request.text, TRIAGE_SUFFIX);
    if request.streaming() {
        return stream(&state, AgentTask::Triage, &content).await;
    }

    let text = complete(&state, AgentTask::Triage, &content).await?;
    Ok(Json(TriageResponse {
        questions: split_questions(&text),
    })
    .into_response())
}

async fn reply_handler(
    State(state): State<AppState>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = NoteRequest::validate(payload)?;
    if request.streaming() {
        return stream(&state, AgentTask::Reply, &request.text).await;
    }

    let reply = complete(&state, AgentTask::Reply, &request.text).await?;
    Ok(Json(ReplyResponse { reply }).into_response())
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/summarize", post(summarize_handler))
        .route("/api/triage", post(triage_handler))
        .route("/api/reply", post(reply_handler))
        .with_state(state)
}
