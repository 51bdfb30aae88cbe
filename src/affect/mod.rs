//! Affect input types.
//!
//! An [`AffectState`] is produced upstream by emotion detection and consumed
//! read-only by every component here. Nothing in this crate mutates one.

mod tables;

pub use tables::{EmotionTable, ReadinessTable};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primary emotion tag.
///
/// Unrecognised tags parse to [`Emotion::Unknown`] rather than failing, so an
/// upstream detector can add labels without breaking this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Lost the thread of the problem.
    Confused,
    /// Repeatedly blocked.
    Frustrated,
    /// Worried about failing.
    Anxious,
    /// Too much at once.
    Overwhelmed,
    /// No strong signal.
    Neutral,
    /// Wants to know more.
    Curious,
    /// Paying attention.
    Interested,
    /// Sure of their footing.
    Confident,
    /// Actively participating.
    Engaged,
    /// Energised by the topic.
    Excited,
    /// Content with progress.
    Satisfied,
    /// Disengaged.
    Bored,
    /// Any tag this crate does not know.
    #[serde(other)]
    Unknown,
}

impl Emotion {
    /// Tags that call for slower, more explicit reasoning.
    #[must_use]
    pub const fn is_struggling(self) -> bool {
        matches!(self, Self::Confused | Self::Frustrated | Self::Anxious)
    }

    /// Tags that tolerate a terse answer.
    #[must_use]
    pub const fn is_confident(self) -> bool {
        matches!(self, Self::Confident | Self::Engaged)
    }

    /// Lowercase tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confused => "confused",
            Self::Frustrated => "frustrated",
            Self::Anxious => "anxious",
            Self::Overwhelmed => "overwhelmed",
            Self::Neutral => "neutral",
            Self::Curious => "curious",
            Self::Interested => "interested",
            Self::Confident => "confident",
            Self::Engaged => "engaged",
            Self::Excited => "excited",
            Self::Satisfied => "satisfied",
            Self::Bored => "bored",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "confused" => Self::Confused,
            "frustrated" => Self::Frustrated,
            "anxious" => Self::Anxious,
            "overwhelmed" => Self::Overwhelmed,
            "neutral" => Self::Neutral,
            "curious" => Self::Curious,
            "interested" => Self::Interested,
            "confident" => Self::Confident,
            "engaged" => Self::Engaged,
            "excited" => Self::Excited,
            "satisfied" => Self::Satisfied,
            "bored" => Self::Bored,
            _ => Self::Unknown,
        })
    }
}

/// How ready the user is to take in new material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessTier {
    /// Cannot absorb anything right now.
    NotReady,
    /// Limited capacity.
    Low,
    /// Average capacity.
    Moderate,
    /// Above average capacity.
    High,
    /// Peak capacity.
    Optimal,
}

impl ReadinessTier {
    /// Low and not-ready tiers count as struggling.
    #[must_use]
    pub const fn is_struggling(self) -> bool {
        matches!(self, Self::NotReady | Self::Low)
    }

    /// High and optimal tiers count as confident.
    #[must_use]
    pub const fn is_confident(self) -> bool {
        matches!(self, Self::High | Self::Optimal)
    }
}

/// Snapshot of the user's emotional and cognitive condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectState {
    /// Primary emotion tag.
    pub primary_emotion: Emotion,
    /// Pleasantness in [-1, 1].
    pub valence: f64,
    /// Activation in [0, 1].
    pub arousal: f64,
    /// Sense of control in [0, 1].
    pub dominance: f64,
    /// Learning readiness tier.
    pub readiness: ReadinessTier,
    /// Cognitive load in [0, 1].
    pub cognitive_load: f64,
}

impl AffectState {
    /// Create an affect state with neutral arousal and dominance.
    #[must_use]
    pub const fn new(
        primary_emotion: Emotion,
        valence: f64,
        readiness: ReadinessTier,
        cognitive_load: f64,
    ) -> Self {
        Self {
            primary_emotion,
            valence,
            arousal: 0.5,
            dominance: 0.5,
            readiness,
            cognitive_load,
        }
    }

    /// The default substituted when no affect is available.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::new(Emotion::Neutral, 0.0, ReadinessTier::Moderate, 0.5)
    }

    /// Set arousal and dominance.
    #[must_use]
    pub const fn with_activation(mut self, arousal: f64, dominance: f64) -> Self {
        self.arousal = arousal;
        self.dominance = dominance;
        self
    }

    /// Valence rescaled from [-1, 1] to [0, 1], clamped.
    #[must_use]
    pub fn valence_unit(&self) -> f64 {
        if !self.valence.is_finite() {
            return 0.5;
        }
        (self.valence.clamp(-1.0, 1.0) + 1.0) / 2.0
    }
}

impl Default for AffectState {
    fn default() -> Self {
        Self::neutral()
    }
}
