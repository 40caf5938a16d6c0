//! Pipeline controller: ingestion, answering, deletion and reset.

mod prompt;
mod service;
pub mod types;

pub use prompt::{build_context, build_prompt};
pub use service::{RagApi, RagService};
pub use types::{
    AnswerResult, IngestOutcome, NO_CONTEXT_ANSWER, OperationStatus, PipelineError,
    PipelineSettings,
};
