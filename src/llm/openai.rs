use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::{CompletionStream, LlmProvider};
use super::types::ChatMessage;
use crate::core::config::ProviderSettings;
use crate::core::errors::ApiError;

/// Provider speaking the OpenAI-compatible `/v1/embeddings` and
/// `/v1/chat/completions` endpoints (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    embedding_model: String,
    chat_model: String,
    /// Bounds an embedding call, and a completion only until its headers arrive;
    /// the streamed body itself is not time-limited.
    timeout: Duration,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(settings.timeout())
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            embedding_model: settings.embedding_model.clone(),
            chat_model: settings.chat_model.clone(),
            timeout: settings.timeout(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::ServiceUnavailable(format!(
                "embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: EmbeddingResponse = res.json().await.map_err(ApiError::unavailable)?;
        payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| {
                ApiError::ServiceUnavailable("embedding response contained no data".to_string())
            })
    }

    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<CompletionStream, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": self.chat_model,
            "messages": messages,
            "stream": true,
        });

        let request = self.client.post(&url).json(&body).send();
        let res = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                ApiError::ServiceUnavailable(format!(
                    "completion request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::ServiceUnavailable(format!(
                "completion request failed ({}): {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            // SSE events may be split across network chunks; only complete lines are parsed.
            let mut pending: Vec<u8> = Vec::new();
            while let Some(item) = stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!("Completion stream interrupted: {}", e);
                        let _ = tx.send(Err(ApiError::unavailable(e))).await;
                        return;
                    }
                };

                pending.extend_from_slice(&bytes);
                while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=newline).collect();
                    match parse_sse_line(&String::from_utf8_lossy(&line)) {
                        SseLine::Delta(content) => {
                            if tx.send(Ok(content)).await.is_err() {
                                return;
                            }
                        }
                        SseLine::Done => return,
                        SseLine::Skip => {}
                    }
                }
            }

            if let SseLine::Delta(content) = parse_sse_line(&String::from_utf8_lossy(&pending)) {
                let _ = tx.send(Ok(content)).await;
            }
        });

        Ok(rx)
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(json) = serde_json::from_str::<Value>(data) else {
        return SseLine::Skip;
    };
    match json["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => SseLine::Delta(content.to_string()),
        _ => SseLine::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::post;
    use axum::{Json, Router};
    use futures_util::stream;
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider_at(base_url: String, timeout_secs: u64) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(&ProviderSettings {
            base_url,
            embedding_model: "embed".to_string(),
            chat_model: "chat".to_string(),
            timeout_secs,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn slow_completion_streams_past_the_request_timeout() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                let events = stream::unfold(0, |i| async move {
                    if i > 4 {
                        return None;
                    }
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    let event = if i == 4 {
                        "data: [DONE]\n\n".to_string()
                    } else {
                        let delta = json!({ "choices": [{ "delta": { "content": format!("t{} ", i) } }] });
                        format!("data: {}\n\n", delta)
                    };
                    Some((Ok::<_, Infallible>(event), i + 1))
                });
                Body::from_stream(events)
            }),
        );
        let provider = provider_at(serve(app).await, 1);

        let mut rx = provider
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        let mut chunks = Vec::new();
        while let Some(item) = rx.recv().await {
            chunks.push(item.unwrap());
        }

        assert_eq!(chunks, vec!["t0 ", "t1 ", "t2 ", "t3 "]);
    }

    #[tokio::test]
    async fn slow_embedding_times_out() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                Json(json!({ "data": [{ "embedding": [1.0, 0.0] }] }))
            }),
        );
        let provider = provider_at(serve(app).await, 1);

        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn embedding_reads_first_vector() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "embed");
                Json(json!({ "data": [{ "embedding": [0.25, 0.5] }] }))
            }),
        );
        let provider = provider_at(serve(app).await, 5);

        assert_eq!(provider.embed("hello").await.unwrap(), vec![0.25, 0.5]);
    }

    #[test]
    fn parses_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_sse_line(line), SseLine::Delta("Hello".to_string()));
    }

    #[test]
    fn parses_done_marker_with_and_without_space() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line("data:[DONE]\r\n"), SseLine::Done);
    }

    #[test]
    fn skips_role_only_deltas_and_noise() {
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only), SseLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line("data: {not json"), SseLine::Skip);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let settings = ProviderSettings {
            base_url: "http://localhost:1234/".to_string(),
            embedding_model: "embed".to_string(),
            chat_model: "chat".to_string(),
            timeout_secs: 5,
        };
        let provider = OpenAiCompatProvider::new(&settings).unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234");
    }
}
