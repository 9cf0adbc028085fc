//! AI comments for whole files, however large.
//!
//! Content is split into chunks that fit the model's context budget. Each
//! chunk gets one completion request; when there was more than one chunk, a
//! final consolidation request merges the per-chunk answers into one.

use crate::{
    chunker,
    completion::{Completion, CompletionClient},
    config::AiConfig,
    error::{Error, Result},
    signal::CancellationFlag,
    token::TokenUsage,
};
use std::num::NonZeroUsize;
use tracing::{debug, warn};

const PART_SEPARATOR: &str = "\n\n";

/// The text that replaces a file's content, and what producing it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Generated commentary, or the original content on fallback
    pub text: String,

    /// Tokens consumed across every request for the file
    pub usage: TokenUsage,
}

impl Summary {
    /// The content itself, at no cost.
    #[must_use]
    pub fn unchanged(content: &str) -> Self {
        Self {
            text: content.to_string(),
            usage: TokenUsage::default(),
        }
    }
}

enum Abort {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Abort {
    fn from(e: Error) -> Self {
        Self::Failed(e)
    }
}

/// Produces AI comments for file content through a [`CompletionClient`].
pub struct Summarizer<C> {
    client: C,
    max_chars_per_chunk: NonZeroUsize,
    prompt: String,
    system_instruction: String,
    consolidate_instruction: String,
    cancel: CancellationFlag,
}

impl<C: CompletionClient> Summarizer<C> {
    /// Creates a summarizer with the prompts and budget from `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the budget leaves no room for
    /// content.
    pub fn new(client: C, config: &AiConfig) -> Result<Self> {
        Ok(Self {
            client,
            max_chars_per_chunk: config.chunk_budget()?,
            prompt: config.prompt.clone(),
            system_instruction: config.system_instruction.clone(),
            consolidate_instruction: config.consolidate_instruction.clone(),
            cancel: CancellationFlag::new(),
        })
    }

    /// Stops issuing requests once `flag` is set.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Summarizes `content`.
    ///
    /// Never fails: if any request fails, or the run is cancelled mid-way,
    /// the original content is returned with zero usage and every partial
    /// result is dropped. Empty content is returned as-is without a request.
    pub fn summarize(&self, content: &str) -> Summary {
        match self.try_summarize(content) {
            Ok(summary) => summary,
            Err(Abort::Cancelled) => {
                debug!("Summarization cancelled, keeping original content");
                Summary::unchanged(content)
            }
            Err(Abort::Failed(e)) => {
                warn!("Error processing AI request, keeping original content: {}", e);
                Summary::unchanged(content)
            }
        }
    }

    fn try_summarize(&self, content: &str) -> std::result::Result<Summary, Abort> {
        if content.is_empty() {
            return Ok(Summary::unchanged(content));
        }

        let count = chunker::chunk_count(content, self.max_chars_per_chunk);
        debug!("Splitting {} chars into {} chunk(s)", content.chars().count(), count);

        let mut parts = Vec::with_capacity(count);
        let mut usage = TokenUsage::default();

        for chunk in chunker::chunks(content, self.max_chars_per_chunk) {
            let user = format!("{}{PART_SEPARATOR}{chunk}", self.prompt);
            let completion = self.request(&user)?;
            usage += completion.usage;
            parts.push(completion.text);
        }

        debug!(
            "Summarized {} chunk(s) using {} tokens",
            parts.len(),
            usage.total_tokens
        );

        if parts.len() == 1 {
            let text = parts.pop().unwrap_or_default();
            return Ok(Summary { text, usage });
        }

        let user = format!(
            "{}{PART_SEPARATOR}{}",
            self.consolidate_instruction,
            parts.join(PART_SEPARATOR)
        );
        let consolidated = self.request(&user)?;
        usage += consolidated.usage;

        Ok(Summary {
            text: consolidated.text,
            usage,
        })
    }

    fn request(&self, user: &str) -> std::result::Result<Completion, Abort> {
        if self.cancel.is_cancelled() {
            return Err(Abort::Cancelled);
        }
        Ok(self.client.complete(&self.system_instruction, user)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Scripted client: answers `reply-N` with `N * 10` tokens, fails on the
    /// configured call, and records every user message.
    #[derive(Default)]
    pub(crate) struct ScriptedClient {
        pub(crate) calls: RefCell<Vec<(String, String)>>,
        pub(crate) fail_on: Option<usize>,
        pub(crate) cancel_after: Option<(usize, CancellationFlag)>,
        pub(crate) count: Cell<usize>,
    }

    impl ScriptedClient {
        pub(crate) fn failing_on(call: usize) -> Self {
            Self {
                fail_on: Some(call),
                ..Self::default()
            }
        }

        pub(crate) fn user_messages(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(_, u)| u.clone()).collect()
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete(&self, system: &str, user: &str) -> Result<Completion> {
            let n = self.count.get() + 1;
            self.count.set(n);
            self.calls
                .borrow_mut()
                .push((system.to_string(), user.to_string()));

            if let Some((after, flag)) = &self.cancel_after {
                if n >= *after {
                    flag.cancel();
                }
            }

            if self.fail_on == Some(n) {
                return Err(Error::completion("429 Too Many Requests"));
            }

            Ok(Completion::new(
                format!("reply-{n}"),
                TokenUsage::total(n * 10),
            ))
        }
    }

    /// Settings whose chunk budget is exactly `chars`.
    pub(crate) fn ai_config_with_budget(chars: usize) -> AiConfig {
        // budget = (limit - (0 + 2) - 10) / 2
        AiConfig::new("sk-test")
            .prompt("")
            .max_tokens_per_call(10)
            .context_limit(chars * 2 + 12)
    }

    fn summarizer(client: &ScriptedClient, budget: usize) -> Summarizer<&ScriptedClient> {
        let summarizer = Summarizer::new(client, &ai_config_with_budget(budget)).unwrap();
        assert_eq!(summarizer.max_chars_per_chunk.get(), budget);
        summarizer
    }

    #[test]
    fn test_single_chunk_skips_consolidation() {
        let client = ScriptedClient::default();
        let summary = summarizer(&client, 100).summarize("int main() { return 0; }");

        assert_eq!(summary.text, "reply-1");
        assert_eq!(summary.usage.total_tokens, 10);

        let calls = client.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, crate::config::DEFAULT_SYSTEM_INSTRUCTION);
        assert_eq!(calls[0].1, "\n\nint main() { return 0; }");
    }

    #[test]
    fn test_content_exactly_at_budget_is_one_chunk() {
        let client = ScriptedClient::default();
        let summary = summarizer(&client, 8).summarize("abcdefgh");

        assert_eq!(summary.text, "reply-1");
        assert_eq!(client.calls.borrow().len(), 1);
    }

    #[test]
    fn test_three_chunks_then_consolidation() {
        let client = ScriptedClient::default();
        let summary = summarizer(&client, 4).summarize("aaaabbbbcc");

        let users = client.user_messages();
        assert_eq!(users.len(), 4);
        assert_eq!(users[0], "\n\naaaa");
        assert_eq!(users[1], "\n\nbbbb");
        assert_eq!(users[2], "\n\ncc");
        assert_eq!(
            users[3],
            format!(
                "{}\n\nreply-1\n\nreply-2\n\nreply-3",
                crate::config::DEFAULT_CONSOLIDATE_INSTRUCTION
            )
        );

        assert_eq!(summary.text, "reply-4");
        assert_eq!(summary.usage.total_tokens, 10 + 20 + 30 + 40);
    }

    #[test]
    fn test_prompt_prefixes_every_chunk() {
        let client = ScriptedClient::default();
        let config = AiConfig::new("sk-test")
            .prompt("Explain:")
            .max_tokens_per_call(10)
            // (limit - 10 - 10) / 2 = 5
            .context_limit(30);
        let summarizer = Summarizer::new(&client, &config).unwrap();

        summarizer.summarize("0123456789");

        let users = client.user_messages();
        assert_eq!(users[0], "Explain:\n\n01234");
        assert_eq!(users[1], "Explain:\n\n56789");
        assert_eq!(users.len(), 3);
    }

    #[test]
    fn test_failure_returns_original_content() {
        for fail_on in 1..=4 {
            let client = ScriptedClient::failing_on(fail_on);
            let summary = summarizer(&client, 4).summarize("aaaabbbbcc");

            assert_eq!(summary, Summary::unchanged("aaaabbbbcc"), "fail on {fail_on}");
            assert_eq!(client.calls.borrow().len(), fail_on, "no retries");
        }
    }

    #[test]
    fn test_empty_content_makes_no_request() {
        let client = ScriptedClient::default();
        let summary = summarizer(&client, 4).summarize("");

        assert_eq!(summary, Summary::unchanged(""));
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn test_cancellation_stops_requests() {
        let flag = CancellationFlag::new();
        let client = ScriptedClient {
            cancel_after: Some((2, flag.clone())),
            ..ScriptedClient::default()
        };
        let summary = summarizer(&client, 4)
            .with_cancellation(flag)
            .summarize("aaaabbbbcc");

        assert_eq!(summary, Summary::unchanged("aaaabbbbcc"));
        assert_eq!(client.calls.borrow().len(), 2);
    }
}
