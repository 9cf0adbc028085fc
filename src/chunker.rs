//! Splits file content into pieces that fit a model's context window.

use std::iter::FusedIterator;
use std::num::NonZeroUsize;

/// Splits `text` into consecutive chunks of at most `max_chars` characters.
///
/// Chunks borrow from `text` and, concatenated in order, reproduce it
/// exactly. Boundaries always fall on `char` boundaries. Empty input yields
/// no chunks.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
/// use vscat::chunker::chunks;
///
/// let budget = NonZeroUsize::new(4).unwrap();
/// let parts: Vec<&str> = chunks("abcdefghij", budget).collect();
/// assert_eq!(parts, ["abcd", "efgh", "ij"]);
/// ```
#[must_use]
pub const fn chunks(text: &str, max_chars: NonZeroUsize) -> Chunks<'_> {
    Chunks {
        remaining: text,
        max_chars,
    }
}

/// Number of chunks [`chunks`] produces: `ceil(chars / max_chars)`.
#[must_use]
pub fn chunk_count(text: &str, max_chars: NonZeroUsize) -> usize {
    text.chars().count().div_ceil(max_chars.get())
}

/// Iterator over fixed-size character chunks of a string.
///
/// Cloning the iterator restarts from the clone point.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    remaining: &'a str,
    max_chars: NonZeroUsize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let split_at = self
            .remaining
            .char_indices()
            .nth(self.max_chars.get())
            .map_or(self.remaining.len(), |(idx, _)| idx);

        let (chunk, rest) = self.remaining.split_at(split_at);
        self.remaining = rest;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining.is_empty() {
            return (0, Some(0));
        }
        // Every char is at least one byte and at most four.
        let max = self.max_chars.get();
        let lower = self.remaining.len().div_ceil(4).div_ceil(max);
        let upper = self.remaining.len().div_ceil(max);
        (lower.max(1), Some(upper))
    }
}

impl FusedIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert_eq!(chunks("", budget(10)).count(), 0);
        assert_eq!(chunk_count("", budget(10)), 0);
    }

    #[test]
    fn test_text_within_budget_is_single_chunk() {
        let parts: Vec<_> = chunks("fn main() {}", budget(12)).collect();
        assert_eq!(parts, ["fn main() {}"]);

        let parts: Vec<_> = chunks("short", budget(1000)).collect();
        assert_eq!(parts, ["short"]);
    }

    #[test]
    fn test_round_trip_and_count() {
        let text = (0..257)
            .map(|i| format!("line {i}\n"))
            .collect::<String>();

        for b in [1, 2, 3, 7, 64, 100, text.len(), text.len() + 1] {
            let parts: Vec<_> = chunks(&text, budget(b)).collect();
            assert_eq!(parts.concat(), text, "budget {b}");
            assert_eq!(parts.len(), text.len().div_ceil(b), "budget {b}");
            assert_eq!(parts.len(), chunk_count(&text, budget(b)));
            assert!(parts.iter().all(|p| p.chars().count() <= b));
            assert!(
                parts[..parts.len() - 1]
                    .iter()
                    .all(|p| p.chars().count() == b)
            );
        }
    }

    #[test]
    fn test_multibyte_chars_are_not_split() {
        let text = "héllo wörld ✓✓✓";
        let parts: Vec<_> = chunks(text, budget(4)).collect();

        assert_eq!(parts.concat(), text);
        assert_eq!(parts.len(), chunk_count(text, budget(4)));
        assert_eq!(parts[0], "héll");
        assert!(parts.iter().all(|p| p.chars().count() <= 4));
    }

    #[test]
    fn test_iterator_is_restartable() {
        let iter = chunks("abcdefg", budget(3));
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first, ["abc", "def", "g"]);
    }

    #[test]
    fn test_size_hint_brackets_count() {
        let text = "a".repeat(10);
        let iter = chunks(&text, budget(3));
        let (lower, upper) = iter.size_hint();
        let actual = iter.count();
        assert!(lower <= actual);
        assert!(upper.is_some_and(|u| actual <= u));
    }
}
