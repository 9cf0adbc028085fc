use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Characters are counted instead of tokens; dividing the free token space by
/// this value leaves headroom for dense text (~2 chars per token).
pub const CHARS_PER_TOKEN_DIVISOR: usize = 2;

/// Characters added to the prompt length for the `"\n\n"` separator.
const PROMPT_SEPARATOR_CHARS: usize = 2;

/// Token usage reported by the completion service.
///
/// Mirrors the `usage` object of an OpenAI-style response; fields missing
/// from the wire default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the request messages
    #[serde(default)]
    pub prompt_tokens: usize,

    /// Tokens generated in the response
    #[serde(default)]
    pub completion_tokens: usize,

    /// Total billed tokens
    #[serde(default)]
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Usage with only a total, as some compatible servers report it.
    #[must_use]
    pub const fn total(total_tokens: usize) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens,
        }
    }

    /// Returns true if nothing was consumed.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.total_tokens == 0
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The pieces that make up a model's context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Maximum combined input + output tokens for one call
    pub context_limit: usize,

    /// Estimated size of the fixed prompt prefix
    pub prompt_overhead: usize,

    /// Tokens reserved for the model's response
    pub reserved_response_tokens: usize,
}

impl ContextBudget {
    /// Builds a budget for the given prompt prefix.
    #[must_use]
    pub fn for_prompt(context_limit: usize, prompt: &str, reserved_response_tokens: usize) -> Self {
        Self {
            context_limit,
            prompt_overhead: prompt_overhead(prompt),
            reserved_response_tokens,
        }
    }

    /// Maximum characters of file content that may go into one request.
    ///
    /// Returns 0 when the prompt and response reservation already exhaust
    /// the context window.
    #[must_use]
    pub const fn max_chars_per_chunk(&self) -> usize {
        self.context_limit
            .saturating_sub(self.prompt_overhead)
            .saturating_sub(self.reserved_response_tokens)
            / CHARS_PER_TOKEN_DIVISOR
    }
}

/// Estimated overhead of a prompt prefix, in characters.
#[must_use]
pub(crate) fn prompt_overhead(prompt: &str) -> usize {
    prompt.chars().count() + PROMPT_SEPARATOR_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_matches_default_model() {
        // 16385 context, 10-char prompt (+2), 150 reserved
        let budget = ContextBudget::for_prompt(16_385, "0123456789", 150);
        assert_eq!(budget.prompt_overhead, 12);
        assert_eq!(budget.max_chars_per_chunk(), (16_385 - 12 - 150) / 2);
    }

    #[test]
    fn test_budget_floors_odd_remainder() {
        let budget = ContextBudget {
            context_limit: 11,
            prompt_overhead: 0,
            reserved_response_tokens: 0,
        };
        assert_eq!(budget.max_chars_per_chunk(), 5);
    }

    #[test]
    fn test_budget_exhausted() {
        let budget = ContextBudget::for_prompt(100, &"p".repeat(90), 50);
        assert_eq!(budget.max_chars_per_chunk(), 0);
    }

    #[test]
    fn test_prompt_overhead_counts_chars_not_bytes() {
        assert_eq!(prompt_overhead(""), 2);
        assert_eq!(prompt_overhead("héllo"), 7);
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage += TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        usage += TokenUsage::total(7);

        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 22);
        assert!(!usage.is_zero());
    }

    #[test]
    fn test_usage_saturates() {
        let total = TokenUsage::total(usize::MAX) + TokenUsage::total(5);
        assert_eq!(total.total_tokens, usize::MAX);
        assert!(TokenUsage::default().is_zero());
    }

    #[test]
    fn test_usage_deserializes_partial_object() {
        let usage: TokenUsage = serde_json::from_str(r#"{"total_tokens": 42}"#).unwrap();
        assert_eq!(usage, TokenUsage::total(42));
    }
}
