//! Access to a chat-completion language model.
//!
//! [`CompletionClient`] is the only capability the summarizer needs: send a
//! system instruction and a user message, get text and token usage back.
//! [`OpenAiClient`] implements it against any OpenAI-compatible
//! `/chat/completions` endpoint.

use crate::{
    config::AiConfig,
    error::{Error, Result},
    token::TokenUsage,
};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const TOP_P: f32 = 1.0;

/// Text generated by the model plus what it cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Generated text, trimmed of surrounding whitespace
    pub text: String,

    /// Token usage reported for the call
    pub usage: TokenUsage,
}

impl Completion {
    /// Creates a completion.
    #[must_use]
    pub fn new(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// A language model that answers one chat exchange at a time.
pub trait CompletionClient {
    /// Sends a system instruction and a user message, returning the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Completion`] on transport failures, error statuses,
    /// and malformed or empty responses.
    fn complete(&self, system: &str, user: &str) -> Result<Completion>;
}

impl<C: CompletionClient + ?Sized> CompletionClient for &C {
    fn complete(&self, system: &str, user: &str) -> Result<Completion> {
        (**self).complete(system, user)
    }
}

impl<C: CompletionClient + ?Sized> CompletionClient for Box<C> {
    fn complete(&self, system: &str, user: &str) -> Result<Completion> {
        (**self).complete(system, user)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: usize,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Blocking client for OpenAI-compatible chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

impl OpenAiClient {
    /// Creates a client from the AI settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            endpoint: chat_endpoint(&config.api_base_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens_per_call,
            temperature: config.temperature,
        })
    }

    fn request_body<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: TOP_P,
        }
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, system: &str, user: &str) -> Result<Completion> {
        trace!(
            "POST {} ({} chars of user content)",
            self.endpoint,
            user.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, user))
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(Error::completion(format!(
                "{status}: {}",
                error_message(&body)
            )));
        }

        let completion = parse_chat_response(&body)?;
        debug!(
            "Completion returned {} chars, {} tokens",
            completion.text.len(),
            completion.usage.total_tokens
        );
        Ok(completion)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Extracts the first choice's text and the usage from a response body.
fn parse_chat_response(body: &str) -> Result<Completion> {
    let response: ChatResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::completion("response contained no choices"))?;

    let text = choice.message.content.unwrap_or_default().trim().to_string();

    Ok(Completion {
        text,
        usage: response.usage.unwrap_or_default(),
    })
}

/// Best-effort message from an error response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
