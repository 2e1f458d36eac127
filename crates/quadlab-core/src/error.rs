use thiserror::Error;

/// Errors produced by the quadratic engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A coefficient cannot be used with the quadratic formula.
    #[error("invalid coefficient `{name}`: {reason}")]
    InvalidCoefficient { name: &'static str, reason: String },
    /// The plotting viewport has no drawable area or a degenerate scale.
    #[error("invalid viewport: {0}")]
    InvalidViewport(String),
    /// An externally suggested challenge failed validation.
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),
}
