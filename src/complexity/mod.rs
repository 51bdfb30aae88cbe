//! Query complexity estimation.
//!
//! Scores free text in `[0, 1]` from four signals:
//! - **Length**: saturating in word count, with a second, rising segment for
//!   very long prompts
//! - **Vocabulary**: technical-term hits from a fixed lexicon, saturating at
//!   three terms
//! - **Interrogative structure**: analytical question words score high,
//!   factual ones low
//! - **Multi-question bonus**: scaled by the number of `?` characters
//!
//! The estimator is deterministic and side-effect free. Blank input scores
//! exactly `0.0`.
//!
//! # Example
//!
//! ```
//! use deep_thinking::complexity::ComplexityEstimator;
//!
//! let estimator = ComplexityEstimator::default();
//! assert_eq!(estimator.estimate("   "), 0.0);
//! assert!(estimator.estimate("What is 2+2?") < 0.25);
//! assert!(estimator.estimate("Explain why quantum entanglement violates Bell's theorem") > 0.5);
//! ```

#![allow(clippy::cast_precision_loss)]

mod lexicon;

pub use lexicon::{ANALYTICAL_WORDS, FACTUAL_WORDS, TECHNICAL_TERMS};

use serde::{Deserialize, Serialize};

/// Weights and saturation points for the complexity signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityWeights {
    /// Weight of the length signal.
    pub length: f64,
    /// Weight of the vocabulary signal.
    pub vocabulary: f64,
    /// Weight of the interrogative signal.
    pub question: f64,
    /// Weight of the multi-question bonus.
    pub multi_question: f64,
    /// Words per unit of length score below the long-query threshold.
    pub words_per_unit: f64,
    /// Length score ceiling below the long-query threshold. Must stay below 1
    /// so the long-query segment still raises the score.
    pub short_length_cap: f64,
    /// Word count above which the long-query segment applies.
    pub long_query_words: usize,
    /// Extra words per unit of length score above the threshold.
    pub long_words_per_unit: f64,
    /// Technical-term count at which the vocabulary signal saturates.
    pub vocabulary_saturation: usize,
    /// Interrogative score for analytical questions.
    pub analytical_score: f64,
    /// Interrogative score for factual questions.
    pub factual_score: f64,
    /// Interrogative score when no question word is present.
    pub neutral_score: f64,
    /// Bonus per `?` character.
    pub per_question_bonus: f64,
    /// Cap on the multi-question bonus.
    pub multi_question_cap: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            length: 0.20,
            vocabulary: 0.45,
            question: 0.25,
            multi_question: 0.10,
            words_per_unit: 50.0,
            short_length_cap: 0.9,
            long_query_words: 100,
            long_words_per_unit: 1000.0,
            vocabulary_saturation: 3,
            analytical_score: 0.7,
            factual_score: 0.3,
            neutral_score: 0.5,
            per_question_bonus: 0.1,
            multi_question_cap: 0.15,
        }
    }
}

/// Per-signal breakdown of a complexity score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySignals {
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Distinct technical terms found.
    pub technical_terms: usize,
    /// Length signal in [0, 1].
    pub length: f64,
    /// Vocabulary signal in [0, 1].
    pub vocabulary: f64,
    /// Interrogative signal in [0, 1].
    pub question: f64,
    /// Multi-question bonus.
    pub multi_question: f64,
    /// Weighted, clamped total.
    pub score: f64,
}

/// Heuristic complexity estimator.
#[derive(Debug, Clone, Default)]
pub struct ComplexityEstimator {
    weights: ComplexityWeights,
}

impl ComplexityEstimator {
    /// Create an estimator with custom weights.
    #[must_use]
    pub const fn new(weights: ComplexityWeights) -> Self {
        Self { weights }
    }

    /// The weights in use.
    #[must_use]
    pub const fn weights(&self) -> &ComplexityWeights {
        &self.weights
    }

    /// Score `text` in `[0, 1]`.
    #[must_use]
    pub fn estimate(&self, text: &str) -> f64 {
        self.signals(text).score
    }

    /// Score `text` and return every contributing signal.
    #[must_use]
    pub fn signals(&self, text: &str) -> ComplexitySignals {
        if text.trim().is_empty() {
            return ComplexitySignals::default();
        }

        let w = &self.weights;
        let lower = text.to_lowercase();

        let word_count = text.split_whitespace().count();
        let length = self.length_score(word_count);

        let technical_terms = TECHNICAL_TERMS
            .iter()
            .filter(|term| lower.contains(*term))
            .count();
        let saturation = w.vocabulary_saturation.max(1) as f64;
        let vocabulary = (technical_terms as f64 / saturation).min(1.0);

        let question = self.question_score(&lower);

        let question_marks = text.chars().filter(|c| *c == '?').count();
        let multi_question =
            (question_marks as f64 * w.per_question_bonus).min(w.multi_question_cap);

        let raw = length * w.length
            + vocabulary * w.vocabulary
            + question * w.question
            + multi_question * w.multi_question;
        let score = if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            0.0
        };

        ComplexitySignals {
            word_count,
            technical_terms,
            length,
            vocabulary,
            question,
            multi_question,
            score,
        }
    }

    fn length_score(&self, word_count: usize) -> f64 {
        let w = &self.weights;
        if word_count > w.long_query_words {
            let extra = (word_count - w.long_query_words) as f64;
            (w.short_length_cap + extra / w.long_words_per_unit).min(1.0)
        } else {
            (word_count as f64 / w.words_per_unit).min(w.short_length_cap)
        }
    }

    fn question_score(&self, lower: &str) -> f64 {
        let mut factual = false;
        for token in lower.split(|c: char| !c.is_alphanumeric()) {
            if ANALYTICAL_WORDS.contains(&token) {
                return self.weights.analytical_score;
            }
            factual |= FACTUAL_WORDS.contains(&token);
        }
        if factual {
            self.weights.factual_score
        } else {
            self.weights.neutral_score
        }
    }
}

/// Score `text` with the default weights.
#[must_use]
pub fn estimate_complexity(text: &str) -> f64 {
    ComplexityEstimator::default().estimate(text)
}
