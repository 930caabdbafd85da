//! Augment: populate schema-only databases with oracle-generated programs.
//!
//! # Modules
//!
//! - [`oracle`]  — `CodeOracle` trait, code-block extraction
//! - [`prompt`]  — `PromptTemplates`
//! - [`attempt`] — `GenerationAttempt`, `AttemptOutcome`, `LoopState`
//! - [`engine`]  — `AugmentationLoop`, `AugmentConfig`, `LoopReport`
//! - [`result`]  — `AugmentationResult`, `TargetDatabase`, manifest loading
//! - [`batch`]   — `augment_all()` across many dbids
//! - [`error`]   — `AugmentError` / `AugmentResult`

pub mod attempt;
pub mod batch;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod prompt;
pub mod result;

pub use attempt::{AttemptOutcome, GenerationAttempt, LoopState};
pub use batch::augment_all;
pub use engine::{AugmentConfig, AugmentationLoop, LoopReport, NO_CODE_MESSAGE, SUCCESS_TOKEN};
pub use error::{AugmentError, AugmentResult};
pub use oracle::{extract_code_block, extract_program, CodeOracle, ENTRY_POINT};
pub use prompt::PromptTemplates;
pub use result::{
    load_manifest, load_results, read_schema, save_results, AugmentationResult,
    AugmentationResults, ManifestEntry, TargetDatabase, RESULT_FILE,
};
