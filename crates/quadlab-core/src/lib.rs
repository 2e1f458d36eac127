//! Pure quadratic engine: solving, curve sampling and challenge validation.

pub mod challenge;
pub mod coefficients;
pub mod config;
pub mod curve;
pub mod error;
pub mod solver;

use serde::{Deserialize, Serialize};

pub use challenge::{ChallengeValidator, FALLBACK_HINT, ValidatedChallenge, Verdict};
pub use coefficients::{Coefficients, MAX_COEFFICIENT};
pub use config::{Config, ConfigError, ServerConfig, TutorConfig};
pub use curve::{Axes, CurvePoint, CurveSample, GridLines, Origin, RootMarker, Viewport, sample};
pub use error::Error;
pub use solver::{Derivation, Root, RootKind, Solution, solve};

/// Role for chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the tutoring conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}
