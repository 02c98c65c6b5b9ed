//! Core data model types for inkmath.
//!
//! These are the fundamental types that the entire inkmath system uses to
//! represent handwritten input, solution steps, and validation outcomes.

use serde::{Deserialize, Serialize};

/// A single sampled point of a handwritten stroke, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One continuous pen stroke: the ordered points between pen-down and pen-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
}

/// A single submitted line of a worked solution.
///
/// Steps are immutable once built; editing a line in the UI produces a new
/// `Step`, it never mutates an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// The expression as typeset math source.
    pub latex: String,
    /// The original problem statement, when known.
    #[serde(default)]
    pub context: Option<String>,
}

impl Step {
    pub fn new(latex: impl Into<String>) -> Self {
        Self {
            latex: latex.into(),
            context: None,
        }
    }

    pub fn with_context(latex: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            latex: latex.into(),
            context: Some(context.into()),
        }
    }
}

/// Output of the Recognizer capability for one drawing capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// The recognized expression as LaTeX source.
    pub latex: String,
    /// A plain-text rendering of the same expression.
    pub plain_text: String,
    /// Recognizer confidence, always within [0, 1].
    pub confidence: f64,
}

impl RecognitionResult {
    pub fn new(latex: impl Into<String>, plain_text: impl Into<String>, confidence: f64) -> Self {
        Self {
            latex: latex.into(),
            plain_text: plain_text.into(),
            confidence: clamp_unit(confidence),
        }
    }
}

/// Outcome of validating one [`Step`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the step is mathematically valid.
    pub is_correct: bool,
    /// Short human-readable feedback, usually with a leading tone marker.
    pub feedback: String,
    /// Present mostly when the step is incorrect.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Confidence in the verdict, always within [0, 1].
    pub confidence: f64,
}

impl ValidationResult {
    /// Build a result with the confidence clamped into [0, 1].
    ///
    /// This is the only constructor; upstream capabilities routinely return
    /// out-of-range or non-finite confidences and they must never escape.
    pub fn new(
        is_correct: bool,
        feedback: impl Into<String>,
        explanation: Option<String>,
        confidence: f64,
    ) -> Self {
        Self {
            is_correct,
            feedback: feedback.into(),
            explanation,
            confidence: clamp_unit(confidence),
        }
    }
}

/// One already-validated step, as fed into whole-solution evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_number: u32,
    pub latex: String,
    pub is_correct: bool,
    pub feedback: String,
}

/// Outcome of evaluating an entire ordered solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionEvaluation {
    /// Overall score, always within [0, 100].
    pub score: f64,
    /// Narrative feedback on the solution as a whole.
    pub feedback: String,
    /// Improvement suggestions; never empty.
    pub suggestions: Vec<String>,
}

impl SolutionEvaluation {
    /// Build an evaluation with the score clamped into [0, 100].
    ///
    /// Empty suggestion lists are replaced with the default set for the
    /// score band, so callers can rely on `suggestions` being non-empty.
    pub fn new(score: f64, feedback: impl Into<String>, suggestions: Vec<String>) -> Self {
        let score = clamp_score(score);
        let suggestions = if suggestions.is_empty() {
            default_suggestions(score)
        } else {
            suggestions
        };
        Self {
            score,
            feedback: feedback.into(),
            suggestions,
        }
    }
}

/// Default improvement suggestions, bucketed by score band.
pub fn default_suggestions(score: f64) -> Vec<String> {
    if score >= 90.0 {
        vec![
            "Keep challenging yourself with harder problems".into(),
            "Try explaining each step out loud as you write it".into(),
        ]
    } else if score >= 70.0 {
        vec![
            "Double-check the sign when moving terms across the equals sign".into(),
            "Verify your answer by substituting it back into the original equation".into(),
        ]
    } else if score >= 50.0 {
        vec![
            "Write out every step instead of combining several at once".into(),
            "Re-check your arithmetic before moving to the next line".into(),
            "Substitute your answer back in to confirm it works".into(),
        ]
    } else {
        vec![
            "Review how to isolate a variable one operation at a time".into(),
            "Practice a few simpler equations of the same form first".into(),
            "Ask for a hint when a step feels uncertain".into(),
        ]
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
