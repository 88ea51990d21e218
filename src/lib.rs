//! Retrieval-augmented chat backend.
//!
//! A small seed corpus is embedded once into an in-memory [`rag::VectorStore`];
//! each chat query is embedded, ranked against the corpus by cosine similarity
//! and rendered into a prompt for an OpenAI-compatible completion service.

pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod vector_math;
