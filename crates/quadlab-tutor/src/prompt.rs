//! Outbound prompts and the structured-output schema for challenges.

use quadlab_core::Coefficients;
use serde_json::{Value, json};

pub const CHALLENGE_PROMPT: &str = "Generate a fun quadratic equation challenge. \
Provide a, b, and c as integers. Ensure 'a' is not 0.";

fn equation(coef: &Coefficients) -> String {
    format!("{}x² + {}x + {} = 0", coef.a(), coef.b(), coef.c())
}

pub fn explain_prompt(coef: &Coefficients) -> String {
    format!(
        "You are an expert Math Tutor. Explain the quadratic equation {}.\n\
         1. Analyze the discriminant.\n\
         2. Explain the shape of the parabola (opens up/down).\n\
         3. Describe the roots and what they represent on a graph.\n\
         Keep it encouraging, clear, and use Markdown for formatting.",
        equation(coef)
    )
}

pub fn tutor_prompt(question: &str, coef: &Coefficients) -> String {
    format!(
        "The current quadratic equation is {}. The student asks: \"{}\". \
         Answer them as a helpful math teacher.",
        equation(coef),
        question.trim()
    )
}

/// Response schema in the service's OpenAPI subset: integer `a`, `b`, `c`
/// and a string `hint`, all required.
pub fn challenge_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "a": { "type": "INTEGER" },
            "b": { "type": "INTEGER" },
            "c": { "type": "INTEGER" },
            "hint": { "type": "STRING" }
        },
        "required": ["a", "b", "c", "hint"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_the_equation() {
        let coef = Coefficients::new(1.0, -3.0, -2.0).unwrap();
        assert!(explain_prompt(&coef).contains("1x² + -3x + -2 = 0"));
        let prompt = tutor_prompt("  why two roots? ", &coef);
        assert!(prompt.contains("1x² + -3x + -2 = 0"));
        assert!(prompt.contains("\"why two roots?\""));
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = challenge_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
        assert_eq!(schema["properties"]["hint"]["type"], "STRING");
    }
}
