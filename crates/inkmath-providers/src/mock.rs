//! Mock providers for testing the validation pipeline without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use inkmath_core::error::ProviderError;
use inkmath_core::model::RecognitionResult;
use inkmath_core::traits::{
    CompletionProvider, CompletionRequest, CompletionResponse, RecognitionRequest, Recognizer,
};

/// A mock completion provider with configurable responses.
///
/// Responses are chosen by prompt-substring matching, with a default when
/// nothing matches. The `unavailable` constructor makes every call fail,
/// which is what the orchestrator's fallback paths are tested against.
pub struct MockCompletion {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    /// Default response if no prompt matches.
    default_response: String,
    /// When set, every call fails with a fresh copy of this error.
    failure: Option<fn() -> ProviderError>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletion {
    /// Create a mock with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: r#"{"isCorrect": true, "feedback": "Looks fine", "confidence": 0.8}"#
                .to_string(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: response.to_string(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock where every call fails with a network error.
    pub fn unavailable() -> Self {
        Self::failing(|| ProviderError::NetworkError("mock offline".into()))
    }

    /// Create a mock where every call fails with the given error.
    pub fn failing(failure: fn() -> ProviderError) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: String::new(),
            failure: Some(failure),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request made to this provider.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(failure) = self.failure {
            return Err(failure().into());
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.user_prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}

/// A mock recognizer returning a fixed result.
pub struct MockRecognizer {
    result: RecognitionResult,
    call_count: AtomicU32,
}

impl MockRecognizer {
    pub fn new(latex: &str, confidence: f64) -> Self {
        Self {
            result: RecognitionResult::new(latex, latex, confidence),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, _request: &RecognitionRequest) -> anyhow::Result<RecognitionResult> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.result.clone())
    }
}
