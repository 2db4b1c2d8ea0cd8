//! Extractive answer synthesis.
//!
//! Retrieved chunk texts are joined in rank order, cleaned of extraction
//! noise, split into sentences, filtered for domain relevance, deduplicated,
//! and assembled into a short answer carrying a citation tag. Every step is a
//! pure function; the same input always yields the same answer.

use tracing::{debug, warn};

use rtiqa_core::config::SynthesisConfig;

pub mod clean;
pub mod select;

use select::RelevanceFilter;

pub const ANSWER_HEADER: &str = "Based on the RTI Act:";
pub const CITATION_TAG: &str = "[Source: RTI Act document sections]";
pub const UNPARSEABLE_CONTENT_MESSAGE: &str = "I found information about the RTI Act in the documents, but the text appears to be corrupted. Please try rephrasing your question or check if the document source needs to be updated.";

const CHUNK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct Synthesizer {
    filter: RelevanceFilter,
    max_candidates: usize,
    max_sentences: usize,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(&SynthesisConfig::default())
    }
}

impl Synthesizer {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            filter: RelevanceFilter::new(config),
            max_candidates: config.max_candidates,
            max_sentences: config.max_sentences,
        }
    }

    /// Build an answer from retrieved chunk texts, best match first.
    ///
    /// The query does not influence sentence choice; relevance comes from
    /// retrieval rank plus the keyword filter.
    pub fn synthesize<S: AsRef<str>>(&self, chunks: &[S], query: &str) -> String {
        let context = chunks.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(CHUNK_SEPARATOR);
        let cleaned = clean::clean(&context);
        let sentences = select::segment(&cleaned);
        let candidates = select::select(&sentences, &self.filter, self.max_candidates);
        let unique = select::dedup(&candidates);
        debug!(
            query_len = query.len(),
            chunks = chunks.len(),
            sentences = sentences.len(),
            candidates = candidates.len(),
            unique = unique.len(),
            "synthesized answer"
        );
        match assemble(&unique, self.max_sentences) {
            Some(answer) => answer,
            None => {
                warn!(chunks = chunks.len(), "no usable sentence in retrieved text");
                unparseable_content()
            }
        }
    }
}

/// Join up to `max_sentences` sentences under the header and citation tag.
/// Returns `None` when there is nothing to say.
pub fn assemble(sentences: &[&str], max_sentences: usize) -> Option<String> {
    let body = sentences.iter().take(max_sentences).copied().collect::<Vec<&str>>().join(". ");
    if body.trim().is_empty() {
        return None;
    }
    Some(format!("{ANSWER_HEADER}\n\n{body}.\n\n{CITATION_TAG}"))
}

/// Fallback when retrieved text yields no qualifying sentence.
pub fn unparseable_content() -> String {
    format!("{UNPARSEABLE_CONTENT_MESSAGE}\n\n{CITATION_TAG}")
}
