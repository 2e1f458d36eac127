use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Largest accepted coefficient magnitude; keeps `b² - 4ac` finite.
pub const MAX_COEFFICIENT: f64 = 1e150;

/// A validated coefficient triple for `ax² + bx + c = 0`.
///
/// `a` is never zero and every coefficient is finite with magnitude at most
/// [`MAX_COEFFICIENT`], so the quadratic formula is always defined and never
/// overflows for values of this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoefficients")]
pub struct Coefficients {
    a: f64,
    b: f64,
    c: f64,
}

#[derive(Deserialize)]
struct RawCoefficients {
    a: f64,
    b: f64,
    c: f64,
}

impl TryFrom<RawCoefficients> for Coefficients {
    type Error = Error;

    fn try_from(raw: RawCoefficients) -> Result<Self, Self::Error> {
        Self::new(raw.a, raw.b, raw.c)
    }
}

impl Coefficients {
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self, Error> {
        for (name, value) in [("a", a), ("b", b), ("c", c)] {
            if !value.is_finite() {
                return Err(Error::InvalidCoefficient {
                    name,
                    reason: format!("{value} is not a finite number"),
                });
            }
            if value.abs() > MAX_COEFFICIENT {
                return Err(Error::InvalidCoefficient {
                    name,
                    reason: format!("{value} exceeds the magnitude limit {MAX_COEFFICIENT:e}"),
                });
            }
        }
        if a == 0.0 {
            return Err(Error::InvalidCoefficient {
                name: "a",
                reason: "must be non-zero for a quadratic equation".into(),
            });
        }
        // `-0.0 + 0.0` is `+0.0`; keeps `-0` out of rendered equations.
        Ok(Self {
            a,
            b: b + 0.0,
            c: c + 0.0,
        })
    }

    /// Build a triple from raw user input the way the slider panel does:
    /// every value is clamped into `[-limit, limit]` and a zero (or
    /// non-finite) `a` falls back to `1`.
    pub fn clamped(a: f64, b: f64, c: f64, limit: f64) -> Self {
        let limit = if limit.is_nan() {
            MAX_COEFFICIENT
        } else {
            limit.abs().min(MAX_COEFFICIENT)
        };
        let clamp = |v: f64| {
            if v.is_finite() {
                v.clamp(-limit, limit) + 0.0
            } else {
                0.0
            }
        };
        let a = clamp(a);
        let a = if a == 0.0 { 1.0 } else { a };
        Self {
            a,
            b: clamp(b),
            c: clamp(c),
        }
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// True when every coefficient is a whole number.
    pub fn is_integral(&self) -> bool {
        [self.a, self.b, self.c].iter().all(|v| v.fract() == 0.0)
    }

    /// Evaluate `ax² + bx + c`.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }

    /// The live equation as rendered in the sidebar, e.g. `1x² -3x -2 = 0`.
    pub fn equation_label(&self) -> String {
        let sign = |v: f64| if v >= 0.0 { "+" } else { "" };
        format!(
            "{}x² {}{}x {}{} = 0",
            fmt_number(self.a),
            sign(self.b),
            fmt_number(self.b),
            sign(self.c),
            fmt_number(self.c)
        )
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: -3.0,
            c: -2.0,
        }
    }
}

/// Shortest decimal rendering of a number, with `-0` shown as `0`.
pub(crate) fn fmt_number(v: f64) -> String {
    if v == 0.0 {
        "0".into()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_leading_coefficient() {
        let err = Coefficients::new(0.0, 2.0, 3.0).unwrap_err();
        assert!(matches!(err, Error::InvalidCoefficient { name: "a", .. }));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(Coefficients::new(1.0, f64::NAN, 0.0).is_err());
        assert!(Coefficients::new(1.0, 0.0, f64::INFINITY).is_err());
        assert!(Coefficients::new(f64::NEG_INFINITY, 0.0, 0.0).is_err());
    }

    #[test]
    fn rejects_values_whose_discriminant_would_overflow() {
        let err = Coefficients::new(1.0, 1e200, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidCoefficient { name: "b", .. }));
        assert!(Coefficients::new(-1e151, 0.0, 0.0).is_err());
        assert!(Coefficients::new(MAX_COEFFICIENT, -MAX_COEFFICIENT, MAX_COEFFICIENT).is_ok());
    }

    #[test]
    fn clamped_respects_magnitude_limit() {
        let coef = Coefficients::clamped(1e300, -1e300, 5.0, f64::INFINITY);
        assert_eq!(coef.a(), MAX_COEFFICIENT);
        assert_eq!(coef.b(), -MAX_COEFFICIENT);
        assert!(coef.solve().discriminant.is_finite());
    }

    #[test]
    fn clamped_keeps_a_away_from_zero() {
        let coef = Coefficients::clamped(0.0, 25.0, -40.0, 10.0);
        assert_eq!((coef.a(), coef.b(), coef.c()), (1.0, 10.0, -10.0));
    }

    #[test]
    fn equation_label_matches_sidebar() {
        let coef = Coefficients::new(1.0, -3.0, -2.0).unwrap();
        assert_eq!(coef.equation_label(), "1x² -3x -2 = 0");
        let coef = Coefficients::new(2.0, 0.0, 1.5).unwrap();
        assert_eq!(coef.equation_label(), "2x² +0x +1.5 = 0");
    }

    #[test]
    fn deserialize_validates() {
        let ok: Coefficients = serde_json::from_str(r#"{"a":1,"b":2,"c":1}"#).unwrap();
        assert_eq!(ok.evaluate(-1.0), 0.0);
        assert!(serde_json::from_str::<Coefficients>(r#"{"a":0,"b":2,"c":1}"#).is_err());
    }
}
