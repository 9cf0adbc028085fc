use crate::error::{Error, Result};
use crate::filter::PathFilter;
use crate::token::ContextBudget;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Root of the OpenAI-compatible REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
/// Context window of [`DEFAULT_MODEL`], in tokens.
pub const DEFAULT_CONTEXT_LIMIT: usize = 16_385;
/// Output cap requested on every completion call.
pub const DEFAULT_MAX_TOKENS_PER_CALL: usize = 150;
/// Sampling temperature for every completion call.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
/// User prompt prefix used when none is configured.
pub const DEFAULT_PROMPT: &str =
    "Summarize what the following source file does and comment on its key parts.";
/// System message sent with every request.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that analyzes code and adds comments.";
/// Instruction prefixed to the per-chunk outputs when they are merged.
pub const DEFAULT_CONSOLIDATE_INSTRUCTION: &str =
    "Consolidate these multiple code summaries into a single entry";

const MAX_TEMPERATURE: f32 = 2.0;

/// Settings for the AI commenting pass.
///
/// Present in [`Config::ai`] only when comments were requested.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct AiConfig {
    /// Bearer credential for the completion API
    pub api_key: String,

    /// Model name sent with each request
    pub model: String,

    /// Base URL; `/chat/completions` is appended
    pub api_base_url: String,

    /// Prefix placed before every chunk in the user message
    pub prompt: String,

    /// System message sent with every request
    pub system_instruction: String,

    /// Prefix of the consolidation request
    pub consolidate_instruction: String,

    /// Model context window in tokens
    pub context_limit: usize,

    /// Output tokens requested per call, also reserved in the budget
    pub max_tokens_per_call: usize,

    /// Sampling temperature
    pub temperature: f32,

    /// HTTP timeout; `None` leaves the client default in place
    pub request_timeout: Option<Duration>,
}

impl AiConfig {
    /// Creates settings with every field except the credential defaulted.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            consolidate_instruction: DEFAULT_CONSOLIDATE_INSTRUCTION.to_string(),
            context_limit: DEFAULT_CONTEXT_LIMIT,
            max_tokens_per_call: DEFAULT_MAX_TOKENS_PER_CALL,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: None,
        }
    }

    /// Sets the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the user prompt prefix.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the model context window.
    #[must_use]
    pub const fn context_limit(mut self, tokens: usize) -> Self {
        self.context_limit = tokens;
        self
    }

    /// Sets the per-call output cap.
    #[must_use]
    pub const fn max_tokens_per_call(mut self, tokens: usize) -> Self {
        self.max_tokens_per_call = tokens;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The context budget implied by these settings.
    #[must_use]
    pub fn context_budget(&self) -> ContextBudget {
        ContextBudget::for_prompt(self.context_limit, &self.prompt, self.max_tokens_per_call)
    }

    /// Maximum characters of file content per request.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the prompt and the response
    /// reservation leave no room for content.
    pub fn chunk_budget(&self) -> Result<NonZeroUsize> {
        let budget = self.context_budget();
        NonZeroUsize::new(budget.max_chars_per_chunk()).ok_or_else(|| {
            Error::config(format!(
                "context limit {} leaves no room for content after a {}-char prompt \
                 and {} reserved response tokens",
                budget.context_limit, budget.prompt_overhead, budget.reserved_response_tokens
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::config(
                "an API key is required for AI comments (set OPENAI_API_KEY or pass --api-key)",
            ));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model name must not be empty"));
        }

        if self.max_tokens_per_call == 0 {
            return Err(Error::config("max_tokens_per_call must be greater than 0"));
        }

        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature ({}) must be between 0 and {MAX_TEMPERATURE}",
                self.temperature
            )));
        }

        self.chunk_budget()?;
        Ok(())
    }
}

/// Configuration for a vscat run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Root directory to scan for files
    pub root_dir: PathBuf,

    /// Markdown document to create
    pub output_path: PathBuf,

    /// AI commenting settings; `None` copies content verbatim
    pub ai: Option<AiConfig>,

    /// Glob patterns for paths to leave out
    pub exclude_patterns: Vec<String>,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vscat::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir("./src")
    ///     .output_path("./project.md")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns true if files will be sent for AI comments.
    #[must_use]
    pub const fn adds_ai_comments(&self) -> bool {
        self.ai.is_some()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or isn't a directory
    /// - Output path is a directory
    /// - An exclude pattern is not a valid glob
    /// - AI settings are incomplete or leave no room for content
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Root path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("Output document path must not be empty"));
        }

        if self.output_path.is_dir() {
            return Err(Error::config(format!(
                "Output document path is a directory: {}",
                self.output_path.display()
            )));
        }

        PathFilter::new(&self.exclude_patterns)?;

        if let Some(ai) = &self.ai {
            ai.validate()?;
        }

        Ok(())
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    ai: Option<AiConfig>,
    exclude_patterns: Vec<String>,
}

impl ConfigBuilder {
    /// Sets the root directory to scan.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the Markdown document to write.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Enables AI comments with the given settings.
    #[must_use]
    pub fn ai(mut self, ai: AiConfig) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Adds glob patterns for paths to leave out.
    #[must_use]
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the output path is missing or validation fails.
    pub fn build(self) -> Result<Config> {
        let output_path = self
            .output_path
            .ok_or_else(|| Error::config("an output document path is required"))?;

        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_path,
            ai: self.ai,
            exclude_patterns: self.exclude_patterns,
        };

        config.validate()?;
        Ok(config)
    }
}
