use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, CompletionStream};
use crate::state::AppState;

/// `POST /api/chat` with `{"message": string, "history"?: [{role, content}]}`.
///
/// Streams the completion back as `text/plain`.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    })?;
    let (message, history) = parse_chat_payload(&payload)?;

    let completion = state.rag.chat(message, history).await.map_err(|err| {
        tracing::error!(status = %err.status(), "Chat request error: {}", err);
        err
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(into_body_stream(completion)),
    )
        .into_response())
}

fn parse_chat_payload(payload: &Value) -> Result<(&str, Vec<ChatMessage>), ApiError> {
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Message is required and must be a string".to_string())
        })?;

    let history = match payload.get("history") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value::<Vec<ChatMessage>>(value.clone())
            .map_err(|err| ApiError::BadRequest(format!("Invalid history: {}", err)))?,
    };

    Ok((message, history))
}

fn into_body_stream(
    completion: CompletionStream,
) -> impl futures_util::Stream<Item = Result<String, ApiError>> {
    stream::unfold(completion, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn parses_message_and_history() {
        let payload = json!({
            "message": "What is a Worker?",
            "history": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ]
        });

        let (message, history) = parse_chat_payload(&payload).unwrap();
        assert_eq!(message, "What is a Worker?");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], ChatMessage::assistant("hello"));
    }

    #[test]
    fn missing_or_non_string_message_is_bad_request() {
        for payload in [
            json!({}),
            json!({ "message": 42 }),
            json!({ "message": "" }),
            json!({ "message": "  \n" }),
        ] {
            let err = parse_chat_payload(&payload).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
    }

    #[test]
    fn malformed_history_is_bad_request() {
        let payload = json!({ "message": "q", "history": [{ "role": "robot", "content": "x" }] });
        assert!(matches!(
            parse_chat_payload(&payload),
            Err(ApiError::BadRequest(_))
        ));

        let payload = json!({ "message": "q", "history": null });
        assert!(parse_chat_payload(&payload).unwrap().1.is_empty());
    }

    #[tokio::test]
    async fn body_stream_forwards_chunks_in_order() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok("Hello, ".to_string())).await.unwrap();
        tx.send(Ok("world".to_string())).await.unwrap();
        drop(tx);

        let chunks: Vec<String> = into_body_stream(rx)
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Hello, ", "world"]);
    }
}
