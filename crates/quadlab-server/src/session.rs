use quadlab_core::{Coefficients, Message, Role, ValidatedChallenge};

/// Live state of one learner: the single source of truth for the equation.
#[derive(Debug, Clone)]
pub struct Session {
    pub coefficients: Coefficients,
    pub explanation: Option<String>,
    pub chat: Vec<Message>,
    /// An explanation request is pending.
    pub explaining: bool,
    /// A tutor question is pending.
    pub asking: bool,
    limit: f64,
}

/// Partial coefficient update; absent fields keep their value.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct CoefficientUpdate {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
}

impl Session {
    pub fn new(limit: f64) -> Self {
        Self {
            coefficients: Coefficients::default(),
            explanation: None,
            chat: Vec::new(),
            explaining: false,
            asking: false,
            limit,
        }
    }

    pub fn update(&mut self, update: CoefficientUpdate) -> Coefficients {
        let cur = self.coefficients;
        self.coefficients = Coefficients::clamped(
            update.a.unwrap_or(cur.a()),
            update.b.unwrap_or(cur.b()),
            update.c.unwrap_or(cur.c()),
            self.limit,
        );
        self.coefficients
    }

    pub fn load_challenge(&mut self, challenge: &ValidatedChallenge) {
        let coef = challenge.coefficients;
        self.coefficients = Coefficients::clamped(coef.a(), coef.b(), coef.c(), self.limit);
        self.explanation = Some(format!("Challenge: {}", challenge.hint));
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.chat.push(Message {
            role,
            content: content.into(),
        });
    }
}
