//! End-to-end pipeline tests: orchestrator + normalizer + heuristics driven
//! through mock and wiremock-backed providers.
//!
//! These verify the failure-tolerance contract: every entry point resolves
//! to a structurally valid result no matter what the completion capability
//! does.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use inkmath_core::heuristics::{FixedPicker, HeuristicValidator};
use inkmath_core::model::{Step, StepRecord};
use inkmath_core::validator::{StepValidator, ValidatorConfig};
use inkmath_providers::{GroqProvider, MockCompletion};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> ValidatorConfig {
    ValidatorConfig {
        max_retries: 1,
        retry_delay: Duration::from_millis(1),
        ..ValidatorConfig::default()
    }
}

fn pinned_validator(provider: Arc<MockCompletion>) -> StepValidator {
    StepValidator::with_config(provider, fast_config())
        .with_heuristics(HeuristicValidator::with_picker(Box::new(FixedPicker(0))))
}

fn records(correct: &[bool]) -> Vec<StepRecord> {
    correct
        .iter()
        .enumerate()
        .map(|(i, &ok)| StepRecord {
            step_number: i as u32 + 1,
            latex: format!("step {}", i + 1),
            is_correct: ok,
            feedback: String::new(),
        })
        .collect()
}

// --- Completion available ---

#[tokio::test]
async fn validates_step_through_fenced_reply() {
    let provider = Arc::new(MockCompletion::with_fixed_response(
        "Here you go:\n```json\n{\"isCorrect\": true, \"feedback\": \"Great isolation step\", \"confidence\": 0.92}\n```",
    ));
    let validator = pinned_validator(provider.clone());

    let result = validator
        .validate_step("2x = 8", Some("Solve 2x + 3 = 11"))
        .await;
    assert!(result.is_correct);
    assert_eq!(result.confidence, 0.92);
    assert!(result.feedback.contains("Great isolation step"));
    assert_eq!(provider.call_count(), 1);

    // The prompt actually carried the step and the problem.
    let request = provider.last_request().unwrap();
    assert!(request.user_prompt.contains("2x = 8"));
    assert!(request.user_prompt.contains("Solve 2x + 3 = 11"));
}

#[tokio::test]
async fn evaluation_survives_malformed_reply_via_salvage() {
    let provider = Arc::new(MockCompletion::with_fixed_response(
        r#"{"score": 82, "feedback": "Nearly perfect", "suggestions": ["mind the signs"], trailing junk}"#,
    ));
    let validator = pinned_validator(provider);

    let evaluation = validator
        .evaluate_solution("Solve 2x + 3 = 11", &records(&[true, true, false]))
        .await;
    assert_eq!(evaluation.score, 82.0);
    assert!(evaluation.feedback.contains("Nearly perfect"));
    assert_eq!(evaluation.suggestions, vec!["mind the signs".to_string()]);
}

#[tokio::test]
async fn per_step_responses_route_by_prompt() {
    let mut responses = HashMap::new();
    responses.insert(
        "x = 4".to_string(),
        r#"{"isCorrect": true, "feedback": "Solved it", "confidence": 0.95}"#.to_string(),
    );
    responses.insert(
        "5 + 3 = 9".to_string(),
        r#"{"isCorrect": false, "feedback": "Arithmetic slip", "explanation": "5 + 3 = 8", "confidence": 0.9}"#
            .to_string(),
    );
    let validator = pinned_validator(Arc::new(MockCompletion::new(responses)));

    let good = validator.validate_step("x = 4", None).await;
    assert!(good.is_correct);

    let bad = validator.validate_step("5 + 3 = 9", None).await;
    assert!(!bad.is_correct);
    assert_eq!(bad.explanation.as_deref(), Some("5 + 3 = 8"));
}

// --- Completion down: heuristic and deterministic fallbacks ---

#[tokio::test]
async fn offline_step_validation_uses_local_rules() {
    let validator = pinned_validator(Arc::new(MockCompletion::unavailable()));

    let arithmetic = validator.validate_step("5 + 3 = 9", None).await;
    assert!(!arithmetic.is_correct);
    assert!(arithmetic.explanation.unwrap().contains('8'));

    let sign = validator.validate_step("2x = 11 + 3", None).await;
    assert!(!sign.is_correct);
    assert!(sign.explanation.unwrap().contains("sign"));

    let check = validator.validate_step("11 = 11", None).await;
    assert!(check.is_correct);
    assert!(check.confidence >= 0.9);
}

#[tokio::test]
async fn offline_empty_step_has_zero_confidence() {
    let validator = pinned_validator(Arc::new(MockCompletion::unavailable()));
    let result = validator.validate_step("", None).await;
    assert!(!result.is_correct);
    assert_eq!(result.confidence, 0.0);
}

#[tokio::test]
async fn offline_evaluation_scores_accuracy() {
    let validator = pinned_validator(Arc::new(MockCompletion::unavailable()));

    let two_of_three = validator
        .evaluate_solution("Solve 2x + 3 = 11", &records(&[true, true, false]))
        .await;
    assert!(
        (60.0..=70.0).contains(&two_of_three.score),
        "got {}",
        two_of_three.score
    );
    assert!(!two_of_three.suggestions.is_empty());

    let perfect = validator
        .evaluate_solution("Solve 2x + 3 = 11", &records(&[true, true, true]))
        .await;
    assert_eq!(perfect.score, 100.0);
}

#[tokio::test]
async fn offline_hint_is_fixed_fallback() {
    let validator = pinned_validator(Arc::new(MockCompletion::unavailable()));
    let hint = validator.step_hint("2x = 8", Some("Solve 2x + 3 = 11")).await;
    assert!(hint.starts_with("💡"));
}

#[tokio::test]
async fn batch_validation_preserves_order_offline() {
    let validator = pinned_validator(Arc::new(MockCompletion::unavailable()));
    let steps = vec![
        Step::with_context("2x = 11 - 3", "Solve 2x + 3 = 11"),
        Step::new("2x = 8"),
        Step::new("x = 4"),
        Step::new("5 + 3 = 9"),
    ];
    let results = validator.validate_steps(&steps).await;
    assert_eq!(results.len(), 4);
    assert!(results[0].is_correct);
    assert!(results[1].is_correct);
    assert!(results[2].is_correct);
    assert!(!results[3].is_correct);
}

// --- Never-reject property ---

#[tokio::test]
async fn every_input_resolves_with_confidence_in_range() {
    let validator = pinned_validator(Arc::new(MockCompletion::unavailable()));
    for latex in ["", "x", "x = 4", "5 + 3 = 9", "@#!", "\\frac{8}{2}", "= = ="] {
        let result = validator.validate_step(latex, None).await;
        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "{latex:?} gave confidence {}",
            result.confidence
        );
        assert!(!result.feedback.is_empty());
    }
}

// --- Real HTTP provider wired into the pipeline ---

#[tokio::test]
async fn groq_backed_validation_end_to_end() {
    let server = MockServer::start().await;

    let response_body = serde_json::json!({
        "choices": [{"message": {
            "content": "```json\n{\"isCorrect\": true, \"feedback\": \"Good division\", \"confidence\": 0.88}\n```",
            "role": "assistant"
        }, "index": 0}],
        "model": "llama-3.3-70b-versatile"
    });

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
        .mount(&server)
        .await;

    let provider = Arc::new(GroqProvider::new("test-key", Some(server.uri())));
    let validator = StepValidator::with_config(provider, fast_config());

    let result = validator.validate_step("x = 4", Some("Solve 2x = 8")).await;
    assert!(result.is_correct);
    assert_eq!(result.confidence, 0.88);
    assert!(result.feedback.contains("Good division"));
}

#[tokio::test]
async fn groq_server_errors_degrade_to_heuristics() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let provider = Arc::new(GroqProvider::new("test-key", Some(server.uri())));
    let validator = StepValidator::with_config(provider, fast_config())
        .with_heuristics(HeuristicValidator::with_picker(Box::new(FixedPicker(0))));

    // Retries exhausted against the failing server, then local rules decide.
    let result = validator.validate_step("11 = 11", None).await;
    assert!(result.is_correct);
    assert!(result.confidence >= 0.9);
}
