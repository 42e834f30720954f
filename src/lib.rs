// THEORY:
// This file is the main entry point for the `mark_sense` library crate. It
// exposes the `FormPipeline` (one form at a time) and the `BatchPipeline` (many
// forms over a worker pool) together with their configuration and report types.
// The analysis layers in `core_modules` are public for callers who want to run
// a single stage, such as classifying one pre-cropped bubble.

pub mod batch_pipeline;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use batch_pipeline::{BatchConfig, BatchItem, BatchPipeline};
pub use core_modules::form_layout::{DEFAULT_TEMPLATE_ID, FormTemplate};
pub use error::{ErrorKind, OmrError, OmrResult};
pub use pipeline::{FormPipeline, FormReport};
