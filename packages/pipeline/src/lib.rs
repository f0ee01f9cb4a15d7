// Video-to-blog content pipeline - core library
//
// Watches YouTube channels, researches each new video's topic on the web,
// drafts an article with a language model and publishes it as static HTML.
// State lives in JSON files; each run re-derives progress from candidate
// statuses.

pub mod config;
pub mod error;
pub mod kernel;
pub mod models;
pub mod orchestrator;
pub mod outcome;
pub mod snapshot;
pub mod stages;
pub mod store;
pub mod text;

pub use config::{Catalogs, Config, Settings};
pub use error::{PipelineError, Result};
pub use orchestrator::Pipeline;
pub use outcome::Outcome;
