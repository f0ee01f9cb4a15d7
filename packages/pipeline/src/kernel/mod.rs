//! Kernel module - external service seams and their implementations.

pub mod deps;
pub mod page_fetcher;
pub mod search;
pub mod test_dependencies;
pub mod traits;

pub use deps::{OpenAIAdapter, PipelineDeps, YouTubeAdapter};
pub use page_fetcher::SimpleFetcher;
pub use search::{GoogleSearchClient, TavilyClient};
pub use test_dependencies::TestDependencies;
pub use traits::*;
