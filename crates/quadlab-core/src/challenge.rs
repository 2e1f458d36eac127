use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coefficients::Coefficients;
use crate::error::Error;

/// Hint shown with the fallback equation `x² - 4x + 4 = 0`.
pub const FALLBACK_HINT: &str = "A perfect square!";

/// Outcome of validating a suggested challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "lowercase")]
pub enum Verdict {
    Accepted,
    /// The candidate was discarded; the reason is kept for logging.
    Fallback(String),
}

/// A challenge that is safe to load into the live equation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedChallenge {
    pub coefficients: Coefficients,
    pub hint: String,
    pub verdict: Verdict,
}

impl ValidatedChallenge {
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

/// Gatekeeper for externally suggested `(a, b, c, hint)` tuples.
#[derive(Debug, Clone)]
pub struct ChallengeValidator {
    fallback: Coefficients,
    fallback_hint: String,
    bound: Option<f64>,
}

impl Default for ChallengeValidator {
    fn default() -> Self {
        Self {
            fallback: fallback_coefficients(),
            fallback_hint: FALLBACK_HINT.into(),
            bound: None,
        }
    }
}

fn fallback_coefficients() -> Coefficients {
    Coefficients::clamped(1.0, -4.0, 4.0, f64::MAX)
}

impl ChallengeValidator {
    /// Also reject candidates whose coefficients leave `[-bound, bound]`.
    pub fn with_bound(mut self, bound: f64) -> Self {
        self.bound = Some(bound.abs());
        self
    }

    /// Validate a decoded JSON candidate.
    pub fn validate(&self, candidate: &Value) -> ValidatedChallenge {
        match self.check(candidate) {
            Ok((coefficients, hint)) => ValidatedChallenge {
                coefficients,
                hint,
                verdict: Verdict::Accepted,
            },
            Err(err) => self.fallback(err),
        }
    }

    /// Validate raw model output, tolerating code fences and surrounding prose.
    pub fn validate_text(&self, text: &str) -> ValidatedChallenge {
        let candidate = extract_json_candidate(text);
        match serde_json::from_str::<Value>(&candidate) {
            Ok(value) => self.validate(&value),
            Err(err) => self.fallback(Error::MalformedChallenge(format!("invalid JSON: {err}"))),
        }
    }

    fn fallback(&self, err: Error) -> ValidatedChallenge {
        ValidatedChallenge {
            coefficients: self.fallback,
            hint: self.fallback_hint.clone(),
            verdict: Verdict::Fallback(err.to_string()),
        }
    }

    fn check(&self, candidate: &Value) -> Result<(Coefficients, String), Error> {
        let obj = candidate
            .as_object()
            .ok_or_else(|| Error::MalformedChallenge("expected a JSON object".into()))?;

        let number = |key: &str| -> Result<f64, Error> {
            let value = obj
                .get(key)
                .ok_or_else(|| Error::MalformedChallenge(format!("missing field `{key}`")))?;
            let n = value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| Error::MalformedChallenge(format!("`{key}` is not a number")))?;
            match self.bound {
                Some(bound) if n.abs() > bound => Err(Error::MalformedChallenge(format!(
                    "`{key}` = {n} is outside [-{bound}, {bound}]"
                ))),
                _ => Ok(n),
            }
        };
        let (a, b, c) = (number("a")?, number("b")?, number("c")?);

        let hint = obj
            .get("hint")
            .ok_or_else(|| Error::MalformedChallenge("missing field `hint`".into()))?
            .as_str()
            .ok_or_else(|| Error::MalformedChallenge("`hint` is not a string".into()))?;

        let coefficients = Coefficients::new(a, b, c)
            .map_err(|err| Error::MalformedChallenge(err.to_string()))?;
        Ok((coefficients, hint.trim().to_string()))
    }
}

// Strip a markdown code fence if present and take the first balanced
// {...} object; otherwise return the trimmed input.
fn extract_json_candidate(text: &str) -> String {
    let s = text.trim();
    let s = strip_code_fence(s).unwrap_or(s);
    extract_balanced_object(s).unwrap_or(s).to_string()
}

fn strip_code_fence(s: &str) -> Option<&str> {
    let rest = s.strip_prefix("```")?;
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    Some(body.rfind("```").map_or(body, |end| &body[..end]).trim())
}

fn extract_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in s[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_fallback(ch: &ValidatedChallenge) -> bool {
        let coef = ch.coefficients;
        matches!(ch.verdict, Verdict::Fallback(_))
            && (coef.a(), coef.b(), coef.c()) == (1.0, -4.0, 4.0)
            && ch.hint == FALLBACK_HINT
    }

    #[test]
    fn accepts_well_formed_candidate() {
        let ch = ChallengeValidator::default().validate(&json!({
            "a": 2, "b": -8, "c": 6, "hint": "Factor out the 2 first."
        }));
        assert!(ch.is_accepted());
        assert_eq!(ch.coefficients, Coefficients::new(2.0, -8.0, 6.0).unwrap());
        assert_eq!(ch.hint, "Factor out the 2 first.");
    }

    #[test]
    fn zero_a_falls_back() {
        let ch = ChallengeValidator::default().validate(&json!({"a": 0, "b": 2, "c": 3, "hint": "x"}));
        assert!(is_fallback(&ch));
    }

    #[test]
    fn non_numeric_falls_back() {
        let v = ChallengeValidator::default();
        assert!(is_fallback(&v.validate(&json!({"a": "bad"}))));
        assert!(is_fallback(&v.validate(&json!({"a": 1, "b": "2", "c": 3, "hint": "x"}))));
    }

    #[test]
    fn missing_fields_fall_back() {
        let v = ChallengeValidator::default();
        assert!(is_fallback(&v.validate(&json!({"a": 1, "b": 2, "c": 3}))));
        assert!(is_fallback(&v.validate(&json!({"b": 2, "c": 3, "hint": "x"}))));
        assert!(is_fallback(&v.validate(&json!([1, 2, 3]))));
        assert!(is_fallback(&v.validate(&json!({"a": 1, "b": 2, "c": 3, "hint": 7}))));
    }

    #[test]
    fn bound_rejects_out_of_range() {
        let v = ChallengeValidator::default().with_bound(10.0);
        let ch = v.validate(&json!({"a": 1, "b": 50, "c": 3, "hint": "big"}));
        assert!(is_fallback(&ch));
        assert!(v.validate(&json!({"a": 1, "b": 10, "c": -10, "hint": "edge"})).is_accepted());
    }

    #[test]
    fn text_with_code_fence_is_parsed() {
        let text = "```json\n{\"a\": 1, \"b\": -5, \"c\": 6, \"hint\": \"Think {2} and 3\"}\n```";
        let ch = ChallengeValidator::default().validate_text(text);
        assert!(ch.is_accepted());
        assert_eq!(ch.hint, "Think {2} and 3");
    }

    #[test]
    fn text_with_prose_is_parsed() {
        let text = "Sure! Here you go: {\"a\": -1, \"b\": 0, \"c\": 9, \"hint\": \"Difference of squares\"} Good luck.";
        let ch = ChallengeValidator::default().validate_text(text);
        assert!(ch.is_accepted());
        assert_eq!(ch.coefficients.a(), -1.0);
    }

    #[test]
    fn garbage_text_falls_back() {
        let v = ChallengeValidator::default();
        assert!(is_fallback(&v.validate_text("not json at all")));
        assert!(is_fallback(&v.validate_text("{\"a\": 1, ")));
        assert!(is_fallback(&v.validate_text("")));
    }
}
