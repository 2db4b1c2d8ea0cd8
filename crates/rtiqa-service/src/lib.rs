//! Query orchestration: retrieve, then synthesize.
//!
//! [`QueryService`] is built once with its collaborators and shared read-only
//! across requests. [`QueryService::answer`] never fails; every error becomes
//! a user-visible message.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use rtiqa_answer::Synthesizer;
use rtiqa_core::error::Result;
use rtiqa_core::traits::ChunkRetriever;

pub const NO_RELEVANT_CONTENT_MESSAGE: &str = "I couldn't find relevant information about your query in the RTI Act.";
pub const ERROR_PREFIX: &str = "Error processing query:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answered(String),
    NoRelevantContent,
}

/// Wire-level classification of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Answered,
    NoRelevantContent,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub response: String,
    pub outcome: ReplyKind,
}

pub struct QueryService {
    retriever: Arc<dyn ChunkRetriever>,
    synthesizer: Synthesizer,
    k: usize,
}

impl QueryService {
    pub fn new(retriever: Arc<dyn ChunkRetriever>, synthesizer: Synthesizer, k: usize) -> Self {
        Self { retriever, synthesizer, k }
    }

    pub fn respond(&self, query: &str) -> Result<Outcome> {
        let hits = self.retriever.retrieve(query, self.k)?;
        if hits.is_empty() {
            debug!("retrieval returned nothing");
            return Ok(Outcome::NoRelevantContent);
        }
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        Ok(Outcome::Answered(self.synthesizer.synthesize(&texts, query)))
    }

    pub fn reply(&self, query: &str) -> Reply {
        let start = Instant::now();
        let reply = match self.respond(query) {
            Ok(Outcome::Answered(response)) => Reply { response, outcome: ReplyKind::Answered },
            Ok(Outcome::NoRelevantContent) => {
                Reply { response: NO_RELEVANT_CONTENT_MESSAGE.to_string(), outcome: ReplyKind::NoRelevantContent }
            }
            Err(e) => {
                warn!(error = %e, "query failed");
                Reply { response: format!("{ERROR_PREFIX} {e}"), outcome: ReplyKind::Error }
            }
        };
        info!(outcome = ?reply.outcome, ms = start.elapsed().as_millis() as u64, "answered query");
        reply
    }

    pub fn answer(&self, query: &str) -> String {
        self.reply(query).response
    }
}
