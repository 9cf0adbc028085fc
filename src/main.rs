use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vscat::{
    AiConfig, Config, DEFAULT_API_BASE_URL, DEFAULT_CONTEXT_LIMIT, DEFAULT_MAX_TOKENS_PER_CALL,
    DEFAULT_MODEL, DEFAULT_PROMPT, DEFAULT_TEMPERATURE,
};

#[derive(Parser, Debug)]
#[command(
    name = "vscat",
    version,
    about = "Concatenate project files into a Markdown document",
    long_about = "Concatenate project files into a Markdown document.\n\n\
    Every .cs, .cpp, .h, .vb, .fs, .sql, .txt and .md file under the source \
    directory becomes one section of the output. With --add-ai-comments each \
    file's content is replaced by a summary from an OpenAI-compatible API.\n\n\
    USAGE EXAMPLES:\n  \
      # Concatenate a project\n  \
      vscat --source-directory ./MyApp --output-document myapp.md\n\n  \
      # Summarize every file instead\n  \
      OPENAI_API_KEY=sk-... vscat --source-directory ./MyApp --output-document myapp.md --add-ai-comments"
)]
struct Cli {
    /// Path to the source project directory
    #[arg(long, value_name = "PATH")]
    source_directory: PathBuf,

    /// Output Markdown filename (created or truncated)
    #[arg(long, value_name = "FILE")]
    output_document: PathBuf,

    /// Replace each file's content with an AI-generated summary
    #[arg(long)]
    add_ai_comments: bool,

    /// API key for the completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Prompt placed before each piece of file content
    #[arg(long, env = "AI_PROMPT", default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Model name
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Model context window in tokens
    #[arg(long, env = "MODEL_CONTEXT_LIMIT", default_value_t = DEFAULT_CONTEXT_LIMIT)]
    context_limit: usize,

    /// Maximum tokens generated per request
    #[arg(long, env = "MAX_TOKENS_PER_CALL", default_value_t = DEFAULT_MAX_TOKENS_PER_CALL)]
    max_tokens_per_call: usize,

    /// Sampling temperature
    #[arg(long, env = "AI_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// HTTP request timeout in seconds
    #[arg(long, env = "AI_REQUEST_TIMEOUT", value_name = "SECONDS")]
    request_timeout: Option<u64>,

    /// Glob of paths to leave out (can be used multiple times)
    ///
    /// Example: --exclude '**/obj' --exclude '**/*.Designer.cs'
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn ai_config(&self) -> anyhow::Result<Option<AiConfig>> {
        if !self.add_ai_comments {
            return Ok(None);
        }

        let api_key = self.api_key.clone().context(
            "--add-ai-comments requires an API key (set OPENAI_API_KEY or pass --api-key)",
        )?;

        Ok(Some(
            AiConfig::new(api_key)
                .model(self.model.clone())
                .api_base_url(self.api_base_url.clone())
                .prompt(self.prompt.clone())
                .context_limit(self.context_limit)
                .max_tokens_per_call(self.max_tokens_per_call)
                .temperature(self.temperature)
                .request_timeout(self.request_timeout.map(Duration::from_secs)),
        ))
    }
}

fn main() -> anyhow::Result<()> {
    // Must run before parsing so `env` fallbacks see the values.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring .env file: {}", e),
    }

    let mut builder = Config::builder()
        .root_dir(&cli.source_directory)
        .output_path(&cli.output_document)
        .exclude(cli.exclude.iter().cloned());

    if let Some(ai) = cli.ai_config()? {
        builder = builder.ai(ai);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let cancel = vscat::install_ctrlc_handler().context("Failed to set up interrupt handling")?;

    // The summary is printed by the run itself, interrupted or not.
    vscat::run(config, cancel).context("Run failed")?;

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("vscat=info"),
        1 => EnvFilter::new("vscat=debug"),
        _ => EnvFilter::new("vscat=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}
