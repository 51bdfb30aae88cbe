//! Reasoning strategy tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of inference a reasoning step performs.
///
/// Tags feed the diversity term of the search value and chain analytics.
/// They never change how the search selects or expands nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningStrategy {
    /// General to specific.
    Deductive,
    /// Specific to general.
    Inductive,
    /// Inference to the best explanation.
    Abductive,
    /// Reasoning by similarity.
    Analogical,
    /// Cause and effect.
    Causal,
    /// Procedure following.
    Algorithmic,
}

/// Keyword lists in classification precedence order.
const KEYWORDS: [(ReasoningStrategy, &[&str]); 6] = [
    (
        ReasoningStrategy::Deductive,
        &["therefore", "thus", "conclude", "deduce"],
    ),
    (
        ReasoningStrategy::Inductive,
        &["pattern", "observe", "notice", "generalize"],
    ),
    (
        ReasoningStrategy::Abductive,
        &["likely", "probably", "best explanation", "hypothesis"],
    ),
    (
        ReasoningStrategy::Analogical,
        &["similar to", "like", "analogy", "comparable"],
    ),
    (
        ReasoningStrategy::Causal,
        &["because", "causes", "leads to", "results in"],
    ),
    (
        ReasoningStrategy::Algorithmic,
        &["step", "next", "then", "procedure", "algorithm"],
    ),
];

impl ReasoningStrategy {
    /// Every strategy, in classification precedence order.
    pub const ALL: [Self; 6] = [
        Self::Deductive,
        Self::Inductive,
        Self::Abductive,
        Self::Analogical,
        Self::Causal,
        Self::Algorithmic,
    ];

    /// Classify `content` by keyword presence. Defaults to deductive.
    #[must_use]
    pub fn infer(content: &str) -> Self {
        let lower = content.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|word| lower.contains(word)))
            .map_or(Self::Deductive, |(strategy, _)| *strategy)
    }

    /// Returns the strategy name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deductive => "deductive",
            Self::Inductive => "inductive",
            Self::Abductive => "abductive",
            Self::Analogical => "analogical",
            Self::Causal => "causal",
            Self::Algorithmic => "algorithmic",
        }
    }
}

impl fmt::Display for ReasoningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Therefore the claim holds", ReasoningStrategy::Deductive)]
    #[test_case("I notice a recurring shape", ReasoningStrategy::Inductive)]
    #[test_case("The most likely cause is wear", ReasoningStrategy::Abductive)]
    #[test_case("This is similar to a pendulum", ReasoningStrategy::Analogical)]
    #[test_case("Heat rises because it is less dense", ReasoningStrategy::Causal)]
    #[test_case("First, sort the list", ReasoningStrategy::Deductive; "no keyword")]
    #[test_case("Next, sort the list", ReasoningStrategy::Algorithmic)]
    #[test_case("", ReasoningStrategy::Deductive; "empty")]
    fn test_infer(content: &str, expected: ReasoningStrategy) {
        assert_eq!(ReasoningStrategy::infer(content), expected);
    }

    #[test]
    fn test_precedence_prefers_earlier_strategy() {
        // "thus" (deductive) outranks "because" (causal)
        let strategy = ReasoningStrategy::infer("It fails because of load, thus we redesign");
        assert_eq!(strategy, ReasoningStrategy::Deductive);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            ReasoningStrategy::infer("HYPOTHESIS: friction dominates"),
            ReasoningStrategy::Abductive
        );
    }

    #[test]
    fn test_all_matches_keyword_order() {
        for (index, (strategy, _)) in KEYWORDS.iter().enumerate() {
            assert_eq!(ReasoningStrategy::ALL[index], *strategy);
        }
    }
}
