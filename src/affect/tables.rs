//! Swappable affect lookup tables.
//!
//! Each table is plain data: a map from tag to factor plus a fallback for
//! anything unmapped. The mode selector and the budget allocator each hold
//! their own tables, so either can be retuned without touching the other.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Emotion, ReadinessTier};

/// Emotion tag to factor mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionTable {
    entries: HashMap<Emotion, f64>,
    fallback: f64,
}

impl EmotionTable {
    /// An empty table returning `fallback` for every tag.
    #[must_use]
    pub fn new(fallback: f64) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    /// Set the factor for one tag.
    #[must_use]
    pub fn with_entry(mut self, emotion: Emotion, value: f64) -> Self {
        self.entries.insert(emotion, value);
        self
    }

    /// Factor for `emotion`, or the fallback.
    #[must_use]
    pub fn lookup(&self, emotion: Emotion) -> f64 {
        self.entries.get(&emotion).copied().unwrap_or(self.fallback)
    }

    /// The value returned for unmapped tags.
    #[must_use]
    pub const fn fallback(&self) -> f64 {
        self.fallback
    }

    /// Base confidence per tag, used by mode selection.
    #[must_use]
    pub fn mode_confidence() -> Self {
        Self::new(0.5)
            .with_entry(Emotion::Confused, 0.2)
            .with_entry(Emotion::Frustrated, 0.3)
            .with_entry(Emotion::Anxious, 0.3)
            .with_entry(Emotion::Overwhelmed, 0.1)
            .with_entry(Emotion::Neutral, 0.5)
            .with_entry(Emotion::Curious, 0.6)
            .with_entry(Emotion::Interested, 0.6)
            .with_entry(Emotion::Confident, 0.9)
            .with_entry(Emotion::Engaged, 0.8)
            .with_entry(Emotion::Excited, 0.8)
            .with_entry(Emotion::Satisfied, 0.9)
    }

    /// Budget multipliers per tag. Struggling tags buy more tokens.
    #[must_use]
    pub fn budget_multipliers() -> Self {
        Self::new(1.0)
            .with_entry(Emotion::Confused, 1.5)
            .with_entry(Emotion::Frustrated, 1.4)
            .with_entry(Emotion::Anxious, 1.3)
            .with_entry(Emotion::Overwhelmed, 0.6)
            .with_entry(Emotion::Curious, 1.2)
            .with_entry(Emotion::Engaged, 1.0)
            .with_entry(Emotion::Confident, 0.9)
            .with_entry(Emotion::Excited, 1.1)
            .with_entry(Emotion::Neutral, 1.0)
            .with_entry(Emotion::Bored, 0.8)
    }
}

impl Default for EmotionTable {
    fn default() -> Self {
        Self::mode_confidence()
    }
}

/// Readiness tier to factor mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessTable {
    entries: HashMap<ReadinessTier, f64>,
    fallback: f64,
}

impl ReadinessTable {
    /// An empty table returning `fallback` for every tier.
    #[must_use]
    pub fn new(fallback: f64) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    /// Set the factor for one tier.
    #[must_use]
    pub fn with_entry(mut self, tier: ReadinessTier, value: f64) -> Self {
        self.entries.insert(tier, value);
        self
    }

    /// Factor for `tier`, or the fallback.
    #[must_use]
    pub fn lookup(&self, tier: ReadinessTier) -> f64 {
        self.entries.get(&tier).copied().unwrap_or(self.fallback)
    }

    /// Readiness factor per tier, used by mode selection.
    #[must_use]
    pub fn mode_factors() -> Self {
        Self::new(0.5)
            .with_entry(ReadinessTier::NotReady, 0.1)
            .with_entry(ReadinessTier::Low, 0.3)
            .with_entry(ReadinessTier::Moderate, 0.5)
            .with_entry(ReadinessTier::High, 0.8)
            .with_entry(ReadinessTier::Optimal, 1.0)
    }

    /// Budget multipliers per tier. Ready learners can absorb more.
    #[must_use]
    pub fn budget_multipliers() -> Self {
        Self::new(1.0)
            .with_entry(ReadinessTier::NotReady, 0.5)
            .with_entry(ReadinessTier::Low, 0.7)
            .with_entry(ReadinessTier::Moderate, 0.9)
            .with_entry(ReadinessTier::High, 1.0)
            .with_entry(ReadinessTier::Optimal, 1.2)
    }
}

impl Default for ReadinessTable {
    fn default() -> Self {
        Self::mode_factors()
    }
}
