//! Capability trait definitions for completion and recognition backends.
//!
//! These async traits are implemented by the `inkmath-providers` crate; the
//! validator in this crate only ever sees the trait objects, which is what
//! makes the whole pipeline testable against mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{RecognitionResult, Stroke};

// ---------------------------------------------------------------------------
// Completion capability
// ---------------------------------------------------------------------------

/// Trait for LLM backends that judge and comment on math steps.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g. "groq").
    fn name(&self) -> &str;

    /// Run one chat completion.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;
}

/// Request for a single chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "llama-3.3-70b-versatile").
    pub model: String,
    /// System instruction, typically demanding JSON-only output.
    pub system_prompt: String,
    /// The user-turn prompt carrying the step and rubric.
    pub user_prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a completion request.
///
/// `content` is free text that is only *nominally* JSON; everything that
/// consumes it goes through [`crate::normalize`] first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw response text.
    pub content: String,
    /// Model that actually produced the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Recognizer capability
// ---------------------------------------------------------------------------

/// Trait for handwriting recognition backends: strokes in, LaTeX out.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Human-readable provider name (e.g. "mathpix").
    fn name(&self) -> &str;

    /// Recognize one drawing capture.
    async fn recognize(&self, request: &RecognitionRequest) -> anyhow::Result<RecognitionResult>;
}

/// Request to recognize a set of handwritten strokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionRequest {
    /// The stroke geometry of one drawing capture, in drawing order.
    pub strokes: Vec<Stroke>,
}

impl RecognitionRequest {
    pub fn new(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    #[test]
    fn completion_request_serde_roundtrip() {
        let req = CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            system_prompt: "Respond with JSON".into(),
            user_prompt: "Is 2x = 8 a valid step?".into(),
            max_tokens: 512,
            temperature: 0.2,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: CompletionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, "llama-3.3-70b-versatile");
        assert_eq!(back.max_tokens, 512);
    }

    #[test]
    fn recognition_request_holds_strokes() {
        let req = RecognitionRequest::new(vec![Stroke {
            points: vec![Point { x: 1.0, y: 2.0 }, Point { x: 3.0, y: 4.0 }],
        }]);
        assert_eq!(req.strokes.len(), 1);
        assert_eq!(req.strokes[0].points.len(), 2);
    }
}
