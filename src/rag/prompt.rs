//! Prompt assembly for retrieval-augmented answers.
//!
//! Output is a pure function of the template, query and fragment order, so the
//! same inputs always render the same string.

use std::borrow::Borrow;

use super::fragment::Fragment;
use crate::core::config::defaults::DEFAULT_SUBJECT;

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    /// What the assistant helps with, e.g. "Cloudflare Workers documentation".
    pub subject: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// Renders the instruction string. Fragments are numbered from 1 in the order
    /// given, which is the ranking order when fed from a search.
    pub fn render<F: Borrow<Fragment>>(&self, query: &str, fragments: &[F]) -> String {
        let context = fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| format!("[{}] {}", index + 1, fragment.borrow().content))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "You are a helpful assistant for {subject}. Use the following context to answer the user's question. If the context doesn't contain relevant information, say so politely and provide general guidance.\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question: {query}\n\
             \n\
             Please provide a helpful and accurate response based on the context above. Include references to specific section numbers when relevant.",
            subject = self.subject,
            context = context,
            query = query,
        )
    }
}

/// Renders with the default template.
pub fn build_prompt<F: Borrow<Fragment>>(query: &str, fragments: &[F]) -> String {
    PromptTemplate::default().render(query, fragments)
}
