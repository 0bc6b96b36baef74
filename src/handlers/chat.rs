use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::client_id::client_id;
use crate::error::ProxyError;
use crate::metrics::{
    ADMITTED_TOTAL, REJECTED_TOTAL, REQUEST_TOTAL, UPSTREAM_ERRORS, UPSTREAM_LATENCY,
};
use crate::models::{ChatRequest, UpstreamRequest};
use crate::rate_limit::Decision;
use crate::state::AppState;

// Longest upstream error text echoed back to the browser
const MAX_UPSTREAM_MESSAGE: usize = 500;

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    REQUEST_TOTAL.inc();

    // Admission runs before the body is even parsed so malformed requests
    // still count against the client.
    let client = client_id(&headers);
    if let Decision::Rejected { window, .. } = state.chat_limiter.check(&client) {
        REJECTED_TOTAL.with_label_values(&[window.as_str()]).inc();
        return Err(ProxyError::RateLimited);
    }
    ADMITTED_TOTAL.inc();

    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| ProxyError::BadRequest(format!("Invalid request body: {}", e)))?;
    if request.messages.is_empty() {
        return Err(ProxyError::BadRequest("messages must not be empty".to_string()));
    }

    let api_key = state
        .upstream
        .api_key
        .as_deref()
        .ok_or(ProxyError::MissingApiKey)?;

    let upstream = UpstreamRequest::from_chat(
        request,
        &state.upstream.model,
        state.upstream.system_prompt.as_deref(),
    );
    debug!(client = %client, model = %upstream.model, turns = upstream.messages.len(), "forwarding chat request");

    let start_time = Instant::now();
    let res = state
        .client
        .post(&state.upstream.url)
        .bearer_auth(api_key)
        .json(&upstream)
        .send()
        .await
        .inspect_err(|_| UPSTREAM_ERRORS.inc())?;
    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let status = res.status();
    if !status.is_success() {
        UPSTREAM_ERRORS.inc();
        let text = res.text().await.unwrap_or_default();
        info!(client = %client, status = %status, "upstream rejected chat request");
        return Err(ProxyError::UpstreamStatus {
            status,
            message: upstream_message(&text),
        });
    }

    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/event-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Body::from_stream(res.bytes_stream()),
    )
        .into_response())
}

// Pulls `error.message` out of an OpenAI style error body, else the raw text
fn upstream_message(text: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(text).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(|m| m.as_str())
        .unwrap_or(text)
        .trim();

    if message.is_empty() {
        return "no details".to_string();
    }
    message.chars().take(MAX_UPSTREAM_MESSAGE).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_prefers_error_field() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(upstream_message(body), "Incorrect API key provided");
    }

    #[test]
    fn upstream_message_falls_back_to_text() {
        assert_eq!(upstream_message("  gateway timeout \n"), "gateway timeout");
        assert_eq!(upstream_message(""), "no details");
        assert_eq!(upstream_message(&"x".repeat(2000)).len(), MAX_UPSTREAM_MESSAGE);
    }
}
