//! The step-validation orchestrator.
//!
//! Single entry point for the presentation layer: judge one step, hint at
//! the next one, or grade a whole solution. Every public method resolves to
//! a structurally valid result — capability failures are retried, then
//! downgraded to heuristic or deterministic fallbacks, never surfaced as
//! errors. Degraded confidence is the signal that something went wrong
//! upstream.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::ProviderError;
use crate::heuristics::HeuristicValidator;
use crate::model::{
    default_suggestions, SolutionEvaluation, Step, StepRecord, ValidationResult,
};
use crate::normalize::{clean_feedback, excerpt, normalize, HINT_MARKER, WARN_MARKER};
use crate::prompt;
use crate::traits::{CompletionProvider, CompletionRequest};

/// Tuning knobs for the validator.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Model identifier passed to the completion provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens per completion.
    pub max_tokens: u32,
    /// Retries on transient provider errors before falling back.
    pub max_retries: u32,
    /// Initial delay between retries (doubles per attempt, capped at 30s).
    pub retry_delay: Duration,
    /// Concurrent validations in [`StepValidator::validate_steps`].
    pub parallelism: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            parallelism: 4,
        }
    }
}

/// The validation orchestrator.
///
/// Construct one at application start and hand it to consumers; it is
/// stateless apart from its provider handle and is cheap to share.
pub struct StepValidator {
    provider: Arc<dyn CompletionProvider>,
    heuristics: HeuristicValidator,
    config: ValidatorConfig,
}

impl StepValidator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_config(provider, ValidatorConfig::default())
    }

    pub fn with_config(provider: Arc<dyn CompletionProvider>, config: ValidatorConfig) -> Self {
        Self {
            provider,
            heuristics: HeuristicValidator::new(),
            config,
        }
    }

    /// Swap in a differently-configured heuristic validator (tests use this
    /// to pin the wording picker).
    pub fn with_heuristics(mut self, heuristics: HeuristicValidator) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Judge one step. Resolves to a result in every case.
    pub async fn validate_step(&self, latex: &str, context: Option<&str>) -> ValidationResult {
        let user_prompt = prompt::build_step_prompt(latex, context);
        match self
            .complete_with_retry(prompt::STEP_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(raw) => interpret_step_response(&raw),
            Err(e) => {
                tracing::warn!("completion unavailable, using local rules: {e:#}");
                if latex.trim().is_empty() {
                    ValidationResult::new(
                        false,
                        format!("{WARN_MARKER} Can't validate right now — check your connection."),
                        None,
                        0.0,
                    )
                } else {
                    self.heuristics.validate(latex)
                }
            }
        }
    }

    /// One short hint toward the next step. Fixed fallback on any failure.
    pub async fn step_hint(&self, latex: &str, context: Option<&str>) -> String {
        let user_prompt = prompt::build_hint_prompt(latex, context);
        match self
            .complete_with_retry(prompt::HINT_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(raw) => {
                let text = excerpt(raw.trim().trim_matches('"'), 240);
                if text.is_empty() {
                    fallback_hint()
                } else if text.starts_with(HINT_MARKER) {
                    text
                } else {
                    format!("{HINT_MARKER} {text}")
                }
            }
            Err(e) => {
                tracing::warn!("hint unavailable: {e:#}");
                fallback_hint()
            }
        }
    }

    /// Grade an entire ordered solution. Deterministic fallback when the
    /// capability is down or its response is beyond salvage.
    pub async fn evaluate_solution(
        &self,
        problem: &str,
        steps: &[StepRecord],
    ) -> SolutionEvaluation {
        let user_prompt = prompt::build_solution_prompt(problem, steps);
        match self
            .complete_with_retry(prompt::EVAL_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(raw) => {
                interpret_solution_response(&raw).unwrap_or_else(|| fallback_evaluation(steps))
            }
            Err(e) => {
                tracing::warn!("evaluation unavailable, scoring locally: {e:#}");
                fallback_evaluation(steps)
            }
        }
    }

    /// Validate several independent steps with bounded concurrency,
    /// returning results in input order.
    ///
    /// Per-step sequencing/debouncing stays the caller's concern; this only
    /// makes the independence of the calls explicit.
    pub async fn validate_steps(&self, steps: &[Step]) -> Vec<ValidationResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (index, step) in steps.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = self
                    .validate_step(&step.latex, step.context.as_deref())
                    .await;
                (index, result)
            });
        }

        let mut results: Vec<Option<ValidationResult>> = vec![None; steps.len()];
        while let Some((index, result)) = futures.next().await {
            results[index] = Some(result);
        }
        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    ValidationResult::new(false, format!("{WARN_MARKER} Validation was skipped."), None, 0.0)
                })
            })
            .collect()
    }

    /// Retry transient provider errors with exponential backoff, honoring
    /// rate-limit hints; permanent errors abort immediately.
    async fn complete_with_retry(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<String> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut delay = self.config.retry_delay;
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(30));
            }
            match self.provider.complete(&request).await {
                Ok(response) => return Ok(response.content),
                Err(e) => {
                    if let Some(provider_error) = e.downcast_ref::<ProviderError>() {
                        if provider_error.is_permanent() {
                            return Err(e);
                        }
                        if let Some(ms) = provider_error.retry_after_ms() {
                            delay = Duration::from_millis(ms);
                        }
                    }
                    tracing::debug!("completion attempt {attempt} failed: {e:#}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("completion failed")))
    }
}

/// Turn raw step-validation output into a result: normalize and coerce, or
/// fall back to a coarse keyword scan of the raw text.
fn interpret_step_response(raw: &str) -> ValidationResult {
    if let Some(value) = normalize(raw) {
        let is_correct = coerce_bool(value.get("isCorrect")).unwrap_or(false);
        let confidence = coerce_number(value.get("confidence")).unwrap_or(0.5);
        let feedback = value
            .get("feedback")
            .and_then(Value::as_str)
            .map(clean_feedback)
            .unwrap_or_else(|| default_step_feedback(is_correct));
        let explanation = value
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty());
        return ValidationResult::new(is_correct, feedback, explanation, confidence);
    }

    // No structure at all: scan the prose for a verdict.
    let lower = raw.to_lowercase();
    let negative = ["incorrect", "invalid", "wrong", "not valid"]
        .iter()
        .any(|w| lower.contains(w));
    let positive = !negative
        && ["correct", "valid", "true", "yes"]
            .iter()
            .any(|w| lower.contains(w));
    let confidence = if positive { 0.8 } else { 0.3 };
    ValidationResult::new(positive, clean_feedback(&excerpt(raw, 200)), None, confidence)
}

/// Turn raw solution-evaluation output into an evaluation; `None` means the
/// response was beyond salvage and the caller should score locally.
fn interpret_solution_response(raw: &str) -> Option<SolutionEvaluation> {
    let value = normalize(raw)?;
    let score = coerce_number(value.get("score"))?;
    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .map(clean_feedback)
        .unwrap_or_else(|| banded_brief(score));
    let suggestions: Vec<String> = match value.get("suggestions") {
        // Non-string items and non-array values are discarded.
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    Some(SolutionEvaluation::new(score, feedback, suggestions))
}

/// Deterministic offline grading: step accuracy, rounded, with a +10 bonus
/// (capped at 100) for a perfectly accurate solution.
pub fn fallback_evaluation(steps: &[StepRecord]) -> SolutionEvaluation {
    let total = steps.len();
    let correct = steps.iter().filter(|s| s.is_correct).count();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    };
    let mut score = accuracy.round();
    if accuracy == 100.0 {
        score = (score + 10.0).min(100.0);
    }

    let feedback = if score >= 90.0 {
        format!("✅ Excellent work — {correct} of {total} steps correct!")
    } else if score >= 70.0 {
        format!("✅ Good job — {correct} of {total} steps correct. A little polish and it's perfect.")
    } else if score >= 50.0 {
        format!("📝 Decent effort — {correct} of {total} steps correct. Review the flagged lines.")
    } else {
        format!("⚠️ Keep practicing — {correct} of {total} steps correct. Let's revisit the approach.")
    };

    SolutionEvaluation::new(score, feedback, default_suggestions(score))
}

fn banded_brief(score: f64) -> String {
    if score >= 90.0 {
        "✅ Strong solution overall.".to_string()
    } else if score >= 70.0 {
        "✅ Good solution with minor issues.".to_string()
    } else if score >= 50.0 {
        "📝 A reasonable attempt with some gaps.".to_string()
    } else {
        "⚠️ This solution needs rework.".to_string()
    }
}

fn default_step_feedback(is_correct: bool) -> String {
    if is_correct {
        "✅ This step looks good.".to_string()
    } else {
        "⚠️ This step needs another look.".to_string()
    }
}

fn fallback_hint() -> String {
    format!("{HINT_MARKER} Try isolating the variable by undoing one operation at a time.")
}

fn coerce_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
