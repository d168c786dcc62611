use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::api::models::{CompletionsRequest, CompletionsResponse, ErrorResponse, Message, StreamChunk};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_PATH: &str = "/chat/completions";

fn build_endpoint(base_url: &str) -> String { format!("{}{}", base_url.trim_end_matches('/'), DEFAULT_PATH) }

fn build_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Turn a non-2xx body into an error, preferring the provider's own message.
fn provider_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => anyhow!("Provider error {}: {}", status, parsed.error.message),
        Err(_) => anyhow!("Provider error {}: {}", status, body),
    }
}

async fn send(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &CompletionsRequest,
) -> Result<reqwest::Response> {
    let endpoint = build_endpoint(base_url);
    debug!(%endpoint, model = %request.model, messages = request.messages.len(), stream = request.stream, "sending completion request");

    let resp = client
        .post(&endpoint)
        .headers(build_headers(api_key)?)
        .json(request)
        .send()
        .await
        .map_err(|e| anyhow!("Network error: {}", e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(provider_error(status, &text));
    }
    Ok(resp)
}

pub async fn chat_complete(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    mut request: CompletionsRequest,
) -> Result<Message> {
    request.stream = false;
    let resp = send(client, base_url, api_key, &request).await?;

    let body: CompletionsResponse = resp.json().await?;
    debug!(total_tokens = body.usage.total_tokens, "completion received");
    body.choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| anyhow!("Response has no choices"))
}

/// Outcome of parsing one SSE line.
#[derive(Debug, PartialEq)]
pub enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

pub fn parse_sse_line(line: &str) -> SseEvent {
    let line = line.trim();
    let data = if let Some(rest) = line.strip_prefix("data: ") { rest } else if let Some(rest) = line.strip_prefix("data:") { rest } else { return SseEvent::Skip };
    if data == "[DONE]" { return SseEvent::Done; }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
            .map(SseEvent::Delta)
            .unwrap_or(SseEvent::Skip),
        Err(_) => SseEvent::Skip,
    }
}

/// Splits a byte stream into SSE lines, holding back any incomplete tail.
#[derive(Debug, Default)]
pub struct SseLines {
    buffer: Vec<u8>,
}

impl SseLines {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            match parse_sse_line(&String::from_utf8_lossy(&line_bytes)) {
                SseEvent::Skip => continue,
                event => events.push(event),
            }
        }
        events
    }

    /// Parse whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        match parse_sse_line(&String::from_utf8_lossy(&rest)) {
            SseEvent::Skip => None,
            event => Some(event),
        }
    }
}

pub async fn chat_complete_stream<F: FnMut(&str)>(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    mut request: CompletionsRequest,
    mut on_chunk: F,
) -> Result<String> {
    request.stream = true;
    let resp = send(client, base_url, api_key, &request).await?;

    let mut stream = resp.bytes_stream();
    let mut lines = SseLines::default();
    let mut final_text = String::new();
    let mut on_event = |event: SseEvent| match event {
        SseEvent::Delta(s) => { on_chunk(&s); final_text.push_str(&s); false }
        SseEvent::Done => true,
        SseEvent::Skip => false,
    };

    let mut done = false;
    'outer: while let Some(chunk) = stream.next().await {
        for event in lines.push(&chunk?) {
            if on_event(event) { done = true; break 'outer; }
        }
    }
    if !done {
        // a final line sent without its trailing newline
        if let Some(event) = lines.finish() { on_event(event); }
    }

    Ok(final_text)
}
