//! Free-text to candidate ticker extraction.

use std::collections::HashSet;

use crate::config::{ScoringWeights, TickwiseConfig};

/// Picks the single most ticker-like token out of a user query.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    stop_words: HashSet<String>,
    weights: ScoringWeights,
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self::from_config(&TickwiseConfig::default())
    }
}

impl CandidateExtractor {
    pub fn new(stop_words: impl IntoIterator<Item = String>, weights: ScoringWeights) -> Self {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|word| word.trim().to_ascii_lowercase())
                .collect(),
            weights,
        }
    }

    pub fn from_config(config: &TickwiseConfig) -> Self {
        Self::new(config.stop_words.iter().cloned(), config.scoring)
    }

    /// Returns the best-scoring token upper-cased, or `None` when the text has no
    /// alphanumeric character at all.
    pub fn extract(&self, text: &str) -> Option<String> {
        let cleaned: String = text
            .trim()
            .to_lowercase()
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '&' | '.' | '_' | '-') {
                    ch
                } else {
                    ' '
                }
            })
            .collect();

        let tokens: Vec<&str> = cleaned
            .split_whitespace()
            .map(|token| token.trim_matches(|ch| matches!(ch, '.' | '-' | '_')))
            .filter(|token| token.chars().any(|ch| ch.is_ascii_alphanumeric()))
            .collect();

        let candidates: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|token| !self.stop_words.contains(*token))
            .collect();

        let best = if candidates.is_empty() {
            longest(&tokens)?
        } else {
            self.highest_scoring(&candidates)?
        };

        Some(best.to_ascii_uppercase())
    }

    pub fn score(&self, token: &str) -> usize {
        let mut score = token.chars().count();
        if token.chars().any(|ch| ch.is_ascii_digit()) {
            score += self.weights.digit_bonus;
        }
        if token.chars().any(|ch| matches!(ch, '-' | '&' | '.')) {
            score += self.weights.punctuation_bonus;
        }
        score
    }

    fn highest_scoring<'t>(&self, tokens: &[&'t str]) -> Option<&'t str> {
        let mut best: Option<(&str, usize)> = None;
        for &token in tokens {
            let score = self.score(token);
            // strict comparison keeps the first occurrence on ties
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((token, score));
            }
        }
        best.map(|(token, _)| token)
    }
}

fn longest<'t>(tokens: &[&'t str]) -> Option<&'t str> {
    let mut best: Option<&str> = None;
    for &token in tokens {
        if best.map_or(true, |top| token.len() > top.len()) {
            best = Some(token);
        }
    }
    best
}

/// Convenience wrapper over the default extractor.
pub fn extract_candidate(text: &str) -> Option<String> {
    CandidateExtractor::default().extract(text)
}
