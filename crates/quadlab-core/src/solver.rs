use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coefficients::{Coefficients, fmt_number};
use crate::error::Error;

/// Relative tolerance used to snap a discriminant to zero when the
/// coefficients are not all integers.
pub const DISCRIMINANT_EPSILON: f64 = 1e-9;

/// Decimal places used when displaying real roots.
pub const REAL_PRECISION: usize = 3;

/// Decimal places used when displaying the parts of complex roots.
pub const COMPLEX_PRECISION: usize = 2;

/// Nature of the roots, decided by the sign of the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    /// Two distinct real roots.
    Real,
    /// One real root of multiplicity two.
    Repeated,
    /// A complex conjugate pair.
    Complex,
}

impl RootKind {
    /// Fixed label for the root nature card.
    pub fn label(self) -> &'static str {
        match self {
            RootKind::Real => "Two distinct real roots",
            RootKind::Repeated => "One repeated real root",
            RootKind::Complex => "Complex conjugate roots",
        }
    }
}

/// A single root of the equation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Root {
    Real { value: f64 },
    Complex { re: f64, im: f64 },
}

impl Root {
    /// Real value of the root, if it has no imaginary part.
    pub fn as_real(&self) -> Option<f64> {
        match *self {
            Root::Real { value } => Some(value),
            Root::Complex { .. } => None,
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Root::Real { value } => f.write_str(&fixed(value, REAL_PRECISION)),
            Root::Complex { re, im } => {
                let sign = if im < 0.0 { '-' } else { '+' };
                write!(
                    f,
                    "{} {} {}i",
                    fixed(re, COMPLEX_PRECISION),
                    sign,
                    fixed(im.abs(), COMPLEX_PRECISION)
                )
            }
        }
    }
}

/// Substituted quadratic-formula steps shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    pub discriminant: String,
    pub numerator_plus: String,
    pub numerator_minus: String,
    pub denominator: String,
}

impl Derivation {
    fn new(coef: &Coefficients, disc: f64) -> Self {
        let (a, b, c) = (coef.a(), coef.b(), coef.c());
        let radicand = if disc < 0.0 {
            format!("{}i", fmt_number(disc.abs()))
        } else {
            fmt_number(disc)
        };
        let neg_b = fmt_number(-b);
        Self {
            discriminant: format!(
                "({})² - 4({})({}) = {}",
                fmt_number(b),
                fmt_number(a),
                fmt_number(c),
                fmt_number(disc)
            ),
            numerator_plus: format!("{neg_b} + √{radicand}"),
            numerator_minus: format!("{neg_b} - √{radicand}"),
            denominator: format!("2({}) = {}", fmt_number(a), fmt_number(2.0 * a)),
        }
    }
}

/// Everything derived from one coefficient triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub coefficients: Coefficients,
    pub discriminant: f64,
    pub kind: RootKind,
    pub root1: Root,
    pub root2: Root,
    pub derivation: Derivation,
}

impl Solution {
    /// Both roots as reals, when the discriminant is non-negative.
    pub fn real_roots(&self) -> Option<(f64, f64)> {
        Some((self.root1.as_real()?, self.root2.as_real()?))
    }
}

/// Solve `ax² + bx + c = 0` for raw coefficients.
pub fn solve(a: f64, b: f64, c: f64) -> Result<Solution, Error> {
    Ok(Coefficients::new(a, b, c)?.solve())
}

impl Coefficients {
    /// Apply the quadratic formula.
    pub fn solve(&self) -> Solution {
        let (a, b, c) = (self.a(), self.b(), self.c());
        let mut disc = b * b - 4.0 * a * c;
        let denom = 2.0 * a;

        if disc != 0.0 && !self.is_integral() {
            let magnitude = (b * b).max((4.0 * a * c).abs()).max(1.0);
            if disc.abs() <= DISCRIMINANT_EPSILON * magnitude {
                disc = 0.0;
            }
        }

        let (kind, root1, root2) = if disc < 0.0 {
            let re = -b / denom;
            let im = (-disc).sqrt() / denom;
            (
                RootKind::Complex,
                Root::Complex { re, im },
                Root::Complex { re, im: -im },
            )
        } else if disc == 0.0 {
            let root = Root::Real { value: -b / denom };
            (RootKind::Repeated, root, root)
        } else {
            // q = -(b + sign(b)·√disc) / 2 avoids cancelling `-b` against `√disc`;
            // the roots are then q/a and c/q. q is non-zero since disc > 0.
            let sqrt = disc.sqrt();
            let q = if b < 0.0 {
                (-b + sqrt) / 2.0
            } else {
                -(b + sqrt) / 2.0
            };
            let (plus, minus) = if b < 0.0 {
                (q / a, c / q)
            } else {
                (c / q, q / a)
            };
            (
                RootKind::Real,
                Root::Real { value: plus },
                Root::Real { value: minus },
            )
        };

        Solution {
            coefficients: *self,
            discriminant: disc,
            kind,
            root1,
            root2,
            derivation: Derivation::new(self, disc),
        }
    }
}

/// Fixed-point rendering that never shows a negative zero.
fn fixed(value: f64, precision: usize) -> String {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.precision$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn two_real_roots() {
        let sol = solve(1.0, -3.0, -2.0).unwrap();
        assert_eq!(sol.discriminant, 17.0);
        assert_eq!(sol.kind, RootKind::Real);
        assert_eq!(sol.root1.to_string(), "3.562");
        assert_eq!(sol.root2.to_string(), "-0.562");
    }

    #[test]
    fn repeated_root() {
        let sol = solve(1.0, 2.0, 1.0).unwrap();
        assert_eq!(sol.discriminant, 0.0);
        assert_eq!(sol.kind, RootKind::Repeated);
        assert_eq!(sol.root1, sol.root2);
        assert_eq!(sol.root1.to_string(), "-1.000");
    }

    #[test]
    fn complex_roots() {
        let sol = solve(1.0, 0.0, 1.0).unwrap();
        assert_eq!(sol.discriminant, -4.0);
        assert_eq!(sol.kind, RootKind::Complex);
        assert_eq!(sol.root1.to_string(), "0.00 + 1.00i");
        assert_eq!(sol.root2.to_string(), "0.00 - 1.00i");
    }

    #[test]
    fn derivation_strings() {
        let sol = solve(1.0, -3.0, -2.0).unwrap();
        assert_eq!(sol.derivation.discriminant, "(-3)² - 4(1)(-2) = 17");
        assert_eq!(sol.derivation.numerator_plus, "3 + √17");
        assert_eq!(sol.derivation.numerator_minus, "3 - √17");
        assert_eq!(sol.derivation.denominator, "2(1) = 2");

        let sol = solve(1.0, 0.0, 1.0).unwrap();
        assert_eq!(sol.derivation.numerator_plus, "0 + √4i");
        assert_eq!(sol.derivation.numerator_minus, "0 - √4i");
    }

    #[test]
    fn zero_a_is_rejected() {
        let err = solve(0.0, 2.0, 3.0).unwrap_err();
        assert!(matches!(err, Error::InvalidCoefficient { name: "a", .. }));
    }

    #[test]
    fn discriminant_is_exact_for_integers() {
        for a in (-1000..=1000).step_by(37).filter(|a| *a != 0) {
            for b in (-1000..=1000).step_by(41) {
                for c in (-1000..=1000).step_by(43) {
                    let sol = solve(a as f64, b as f64, c as f64).unwrap();
                    assert_eq!(sol.discriminant, (b * b - 4 * a * c) as f64);
                }
            }
        }
    }

    #[test]
    fn roots_satisfy_the_equation() {
        for a in -10..=10 {
            if a == 0 {
                continue;
            }
            for b in -10..=10 {
                for c in -10..=10 {
                    let coef = Coefficients::new(a as f64, b as f64, c as f64).unwrap();
                    let sol = coef.solve();
                    match sol.kind {
                        RootKind::Real => {
                            let (x1, x2) = sol.real_roots().unwrap();
                            assert_ne!(x1, x2);
                            assert!(coef.evaluate(x1).abs() < EPS, "{a} {b} {c}");
                            assert!(coef.evaluate(x2).abs() < EPS, "{a} {b} {c}");
                        }
                        RootKind::Repeated => {
                            let (x1, x2) = sol.real_roots().unwrap();
                            assert_eq!(x1, x2);
                            assert!(coef.evaluate(x1).abs() < EPS);
                            assert!((2.0 * coef.a() * x1 + coef.b()).abs() < EPS);
                        }
                        RootKind::Complex => match (sol.root1, sol.root2) {
                            (
                                Root::Complex { re: r1, im: i1 },
                                Root::Complex { re: r2, im: i2 },
                            ) => {
                                assert_eq!(r1, r2);
                                assert_eq!(i1, -i2);
                                assert_ne!(i1, 0.0);
                            }
                            other => panic!("expected conjugates, got {other:?}"),
                        },
                    }
                }
            }
        }
    }

    #[test]
    fn overflowing_coefficients_are_rejected() {
        let err = solve(1.0, 1e200, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidCoefficient { name: "b", .. }));
    }

    #[test]
    fn large_b_keeps_small_root_accurate() {
        let sol = solve(1.0, 1e100, 1.0).unwrap();
        assert!(sol.discriminant.is_finite());
        let (x1, x2) = sol.real_roots().unwrap();
        assert!((x1 / -1e-100 - 1.0).abs() < 1e-12, "{x1}");
        assert!((x2 / -1e100 - 1.0).abs() < 1e-12, "{x2}");

        let sol = solve(1.0, -1e8, 1.0).unwrap();
        let (x1, x2) = sol.real_roots().unwrap();
        assert!((x1 / 1e8 - 1.0).abs() < 1e-12, "{x1}");
        assert!((x2 / 1e-8 - 1.0).abs() < 1e-12, "{x2}");
    }

    #[test]
    fn near_zero_discriminant_snaps_for_fractional_input() {
        // (x - 0.1)² = x² - 0.2x + 0.01
        let sol = solve(1.0, -0.2, 0.01).unwrap();
        assert_eq!(sol.kind, RootKind::Repeated);
        assert_eq!(sol.discriminant, 0.0);
        assert_eq!(sol.root1.to_string(), "0.100");
    }

    #[test]
    fn negative_a_complex_display_keeps_conjugate_order() {
        let sol = solve(-1.0, 0.0, -1.0).unwrap();
        assert_eq!(sol.root1.to_string(), "0.00 - 1.00i");
        assert_eq!(sol.root2.to_string(), "0.00 + 1.00i");
    }
}
