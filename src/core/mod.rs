//! Processing and review logic.
//!
//! - `pipeline`: queue item → transcript → candidates → pending events
//! - `review`: approve / reject / edit pending events
//! - `retry`: backoff for adapter calls
//! - `category`: free-text category normalization
//! - `tags`: tag suggestions

pub mod category;
pub mod pipeline;
pub mod retry;
pub mod review;
pub mod tags;

pub use category::normalize_category;
pub use pipeline::{BatchSummary, ExtractionPipeline, PipelineError, StageChange};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use review::{Approval, EventIndexer, ReviewError, ReviewService};
pub use tags::{suggest_tags, TagSuggestion};
