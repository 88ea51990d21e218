use std::fs;
use std::path::Path;

use anyhow::Context;

use super::fragment::SeedDocument;

const BUNDLED_CORPUS: &str = include_str!("../../data/seed_corpus.json");

/// The Cloudflare Workers documentation excerpts shipped with the binary.
pub fn sample_documents() -> anyhow::Result<Vec<SeedDocument>> {
    parse_corpus(BUNDLED_CORPUS).context("bundled seed corpus is malformed")
}

/// Loads a JSON array of `{title, url, type, content}` documents.
pub fn load_corpus_file(path: &Path) -> anyhow::Result<Vec<SeedDocument>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed corpus {}", path.display()))?;
    parse_corpus(&contents)
        .with_context(|| format!("Failed to parse seed corpus {}", path.display()))
}

/// Bundled corpus unless a file is configured.
pub fn resolve_corpus(path: Option<&Path>) -> anyhow::Result<Vec<SeedDocument>> {
    match path {
        Some(path) => load_corpus_file(path),
        None => sample_documents(),
    }
}

fn parse_corpus(contents: &str) -> anyhow::Result<Vec<SeedDocument>> {
    let documents: Vec<SeedDocument> = serde_json::from_str(contents)?;
    if let Some(index) = documents
        .iter()
        .position(|doc| doc.content.trim().is_empty())
    {
        anyhow::bail!("document {} has empty content", index);
    }
    Ok(documents)
}
