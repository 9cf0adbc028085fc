//! # vscat
//!
//! Concatenates the source files of a project into one Markdown document,
//! optionally replacing each file's content with an AI-generated summary.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vscat::{AiConfig, Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./src")
//!     .output_path("./project.md")
//!     .ai(AiConfig::new(std::env::var("OPENAI_API_KEY")?))
//!     .build()?;
//!
//! let state = Pipeline::new(config)?.run()?;
//! assert!(!state.interrupted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Scanner**: lists files under the root in sorted order
//! 2. **Chunker**: cuts content to fit the model's context budget
//! 3. **Summarizer**: one request per chunk, plus a consolidation request
//!    when there were several
//! 4. **Writer**: appends one flushed section per file

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

pub mod chunker;
mod completion;
mod config;
mod error;
mod file;
mod filter;
mod pipeline;
mod scanner;
mod signal;
mod summarizer;
mod token;
mod writer;

pub use completion::{Completion, CompletionClient, OpenAiClient};
pub use config::{
    AiConfig, Config, ConfigBuilder, DEFAULT_API_BASE_URL, DEFAULT_CONSOLIDATE_INSTRUCTION,
    DEFAULT_CONTEXT_LIMIT, DEFAULT_MAX_TOKENS_PER_CALL, DEFAULT_MODEL, DEFAULT_PROMPT,
    DEFAULT_SYSTEM_INSTRUCTION, DEFAULT_TEMPERATURE,
};
pub use error::{Error, Result};
pub use file::{DEFAULT_LANGUAGE, SourceFile, is_eligible, language_for_extension};
pub use pipeline::{Pipeline, RunState};
pub use signal::{CancellationFlag, install_ctrlc_handler};
pub use summarizer::{Summarizer, Summary};
pub use token::{CHARS_PER_TOKEN_DIVISOR, ContextBudget, TokenUsage};
pub use writer::render_section;

/// Runs the whole pipeline against the configured completion API.
///
/// The run stops early, keeping every completed section, once `cancel` is
/// set.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - Root directory doesn't exist or is inaccessible
/// - The output document cannot be created or written
pub fn run(config: Config, cancel: CancellationFlag) -> Result<RunState> {
    Pipeline::new(config)?.with_cancellation(cancel).run()
}
