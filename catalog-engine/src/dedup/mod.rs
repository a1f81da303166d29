//! Deduplication candidates.
//!
//! Works name their contributors through `authority#local_id#display_name` tokens.
//! The generator looks every such name up in the person core with fuzzy matching and
//! files the resulting candidates per catalog and publication into a task queue, which
//! the editorial UI drains.

pub mod generator;
pub mod job;
pub mod queue;

pub use generator::{
    parse_authorities, probability, AuthorityRef, Candidate, CandidateGenerator, Task,
};
pub use job::{DedupHandle, DedupJob, DedupProgress, DedupRun};
pub use queue::{CandidateQueue, InMemoryQueue, PostgresQueue, QueueSource, TaskMap};

/// Configuration for a generator run.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Person records fetched per name lookup.
    pub max_candidates: usize,
    /// Candidates scoring below this are dropped.
    pub min_probability: u8,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_candidates: 10,
            min_probability: 0,
        }
    }
}
