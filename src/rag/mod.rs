//! Retrieval-augmented generation.
//!
//! - `store`: in-memory `VectorStore` with cosine top-k / threshold search
//! - `prompt`: renders a query and ranked fragments into one instruction string
//! - `corpus`: embeds the seed corpus once behind a single-flight cache
//! - `service`: the per-request pipeline used by the chat endpoint

mod corpus;
mod error;
mod fragment;
mod prompt;
pub mod seed;
mod service;
mod store;


pub use corpus::{build_store, CorpusCache};
pub use error::RagError;
pub use fragment::{Fragment, FragmentMetadata, ScoredFragment, SeedDocument};
pub use prompt::{build_prompt, PromptTemplate};
pub use service::{assemble_messages, validate_query, RagService};
pub use store::{SearchOptions, VectorStore, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K};
