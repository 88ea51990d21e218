use serde_json::{json, Value};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:1234";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-bge-base-en-v1.5";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instruct";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
/// Retrieval depth used by the chat endpoint (narrower than the store default).
pub const DEFAULT_CHAT_TOP_K: usize = 3;
pub const DEFAULT_CHAT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MAX_HISTORY: usize = 10;
pub const DEFAULT_SUBJECT: &str = "Cloudflare Workers documentation";

pub fn generate_default_config() -> Value {
    json!({
        "server": {
            "host": "127.0.0.1",
            "port": DEFAULT_PORT,
            "cors_allowed_origins": []
        },
        "provider": {
            "base_url": DEFAULT_PROVIDER_URL,
            "embedding_model": DEFAULT_EMBEDDING_MODEL,
            "chat_model": DEFAULT_CHAT_MODEL,
            "timeout_secs": DEFAULT_PROVIDER_TIMEOUT_SECS
        },
        "retrieval": {
            "top_k": DEFAULT_CHAT_TOP_K,
            "similarity_threshold": DEFAULT_CHAT_SIMILARITY_THRESHOLD
        },
        "chat": {
            "max_history": DEFAULT_MAX_HISTORY,
            "subject": DEFAULT_SUBJECT
        },
        "corpus": {
            "path": null
        }
    })
}
