//! Persisted records.

pub mod candidate;
pub mod image;
pub mod post;
pub mod tag;
pub mod topic;

pub use candidate::{
    Candidate, CandidateStatus, QueryMethod, SearchQuery, SearchSummary, SourceDescriptor,
    StageError, SummaryMethod, VideoSnapshot,
};
pub use image::{ImageAsset, ImageCatalog};
pub use post::PostRecord;
pub use tag::{NormalizedTag, Tag, TagDefinition, TagDictionary};
pub use topic::TopicHistoryEntry;
