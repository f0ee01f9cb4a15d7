//! The four pipeline stages. Each reads and writes the stores directly and
//! returns a report; the orchestrator passes reports between them.

pub mod collector;
pub mod generator;
pub mod publisher;
pub mod researcher;

pub use collector::{apply_retention, Collector, CollectorReport, RetentionStats, SourceFailure};
pub use generator::{
    ArticleDraft, DuplicateMatch, GeneratedArticle, Generator, GeneratorOutcome, GeneratorSummary,
};
pub use publisher::{Publisher, PublisherReport, ValidationReport};
pub use researcher::{CandidateFailure, Researcher, ResearcherReport};
