use crate::{
    completion::{CompletionClient, OpenAiClient},
    config::Config,
    error::Result,
    file::SourceFile,
    scanner::Scanner,
    signal::CancellationFlag,
    summarizer::{Summarizer, Summary},
    token::TokenUsage,
    writer::DocumentWriter,
};
use std::{fmt, path::PathBuf};
use tracing::{debug, info, instrument, warn};

/// Counters describing a run, printed once when the run ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// The Markdown document being written
    pub output_path: PathBuf,

    /// Files whose section was written
    pub files_processed: usize,

    /// Files left out: not allow-listed, or unreadable
    pub files_skipped: usize,

    /// Tokens consumed by AI comments across all files
    pub usage: TokenUsage,

    /// True if the run stopped early on request
    pub interrupted: bool,
}

impl RunState {
    /// Creates empty counters for a run writing to `output_path`.
    #[must_use]
    pub const fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            files_processed: 0,
            files_skipped: 0,
            usage: TokenUsage::total(0),
            interrupted: false,
        }
    }

    /// Total tokens consumed so far.
    #[must_use]
    pub const fn total_tokens(&self) -> usize {
        self.usage.total_tokens
    }

    /// Prints the summary to stdout.
    pub fn print_summary(&self) {
        println!("{self}");
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generated file at: {}", self.output_path.display())?;
        writeln!(f, "Processed {} files", self.files_processed)?;
        write!(f, "Total tokens used: {}", self.total_tokens())
    }
}

/// Owns the run state and prints it exactly once: through
/// [`finish`](Self::finish) on success, or on drop when the run bails out.
///
/// The printing is shared with the Ctrl+C handler, which prints the last
/// published state instead when a second interrupt forces an exit.
struct SummaryOnExit {
    state: RunState,
    cancel: CancellationFlag,
    reported: bool,
}

impl SummaryOnExit {
    fn new(state: RunState, cancel: CancellationFlag) -> Self {
        let guard = Self {
            state,
            cancel,
            reported: false,
        };
        guard.publish();
        guard
    }

    fn publish(&self) {
        self.cancel.publish_summary(self.state.to_string());
    }

    fn report(&mut self) {
        if !self.reported {
            self.reported = true;
            if self.cancel.claim_summary() {
                self.state.print_summary();
            }
        }
    }

    fn finish(mut self) -> RunState {
        self.report();
        std::mem::take(&mut self.state)
    }
}

impl Drop for SummaryOnExit {
    fn drop(&mut self) {
        self.report();
    }
}

/// What happened to one scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Processed(TokenUsage),
    Skipped,
    Cancelled,
}

/// Drives a run: scan, optionally summarize, append, repeat.
pub struct Pipeline<C = OpenAiClient> {
    config: Config,
    scanner: Scanner,
    summarizer: Option<Summarizer<C>>,
    cancel: CancellationFlag,
}

impl Pipeline<OpenAiClient> {
    /// Creates a pipeline that talks to the configured OpenAI-compatible API
    /// when AI comments are enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The HTTP client cannot be constructed
    pub fn new(config: Config) -> Result<Self> {
        let client = config.ai.as_ref().map(OpenAiClient::new).transpose()?;
        Self::build(config, client)
    }
}

impl<C: CompletionClient> Pipeline<C> {
    /// Creates a pipeline that sends AI requests to `client`.
    ///
    /// The client is unused unless the configuration enables AI comments.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn with_client(config: Config, client: C) -> Result<Self> {
        Self::build(config, Some(client))
    }

    fn build(config: Config, client: Option<C>) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?;
        let summarizer = match (config.ai.as_ref(), client) {
            (Some(ai), Some(client)) => Some(Summarizer::new(client, ai)?),
            _ => None,
        };

        Ok(Self {
            config,
            scanner,
            summarizer,
            cancel: CancellationFlag::new(),
        })
    }

    /// Stops the run between files, and between AI requests, once `flag` is
    /// set.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.summarizer = self
            .summarizer
            .map(|s| s.with_cancellation(flag.clone()));
        self.cancel = flag;
        self
    }

    /// Executes the run and returns its final state.
    ///
    /// The summary is printed exactly once however the run ends: on
    /// completion, on cancellation, or when an error aborts it. Sections
    /// already written stay on disk in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if the output document cannot be created or written,
    /// or the source root cannot be read.
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(mut self) -> Result<RunState> {
        let mut report = SummaryOnExit::new(
            RunState::new(self.config.output_path.clone()),
            self.cancel.clone(),
        );

        let mut writer = DocumentWriter::create(&self.config.output_path)?;
        self.scanner.skip_file(writer.path());
        let files = self.scanner.scan()?;

        info!(
            "Found {} files{}",
            files.len(),
            if self.summarizer.is_some() {
                ", adding AI comments"
            } else {
                ""
            }
        );

        for file in &files {
            if self.cancel.is_cancelled() {
                report.state.interrupted = true;
                break;
            }

            match self.process_file(file, &mut writer)? {
                FileOutcome::Processed(usage) => {
                    report.state.files_processed += 1;
                    report.state.usage += usage;
                }
                FileOutcome::Skipped => report.state.files_skipped += 1,
                FileOutcome::Cancelled => {
                    report.state.interrupted = true;
                    break;
                }
            }
            report.publish();
        }

        if report.state.interrupted {
            warn!(
                "Interrupted after {} of {} files",
                report.state.files_processed + report.state.files_skipped,
                files.len()
            );
        }

        Ok(report.finish())
    }

    fn process_file(&self, file: &SourceFile, writer: &mut DocumentWriter) -> Result<FileOutcome> {
        if !file.is_eligible() {
            info!("Skipped {}", file.relative_path);
            return Ok(FileOutcome::Skipped);
        }

        let content = match file.read_content() {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipped {}: {}", file.relative_path, e);
                return Ok(FileOutcome::Skipped);
            }
        };

        debug!(
            "Read {} ({}, {} bytes)",
            file.relative_path,
            file.language,
            content.len()
        );

        let summary = self
            .summarizer
            .as_ref()
            .map_or_else(|| Summary::unchanged(&content), |s| s.summarize(&content));

        // The in-flight file is dropped rather than written half-commented.
        if self.cancel.is_cancelled() {
            debug!("Not writing {} after interrupt", file.relative_path);
            return Ok(FileOutcome::Cancelled);
        }

        writer.append_section(file, &summary.text)?;

        if summary.usage.is_zero() {
            info!("Processed {}", file.relative_path);
        } else {
            info!(
                "Processed {}, tokens: {}",
                file.relative_path, summary.usage.total_tokens
            );
        }

        Ok(FileOutcome::Processed(summary.usage))
    }
}
