//! Mathpix handwriting recognizer.
//!
//! Sends stroke geometry to the Mathpix `/v3/strokes` endpoint and maps the
//! response onto the core `RecognitionResult` shape. Mathpix reports errors
//! both as HTTP statuses and as an `error` field inside a 200 body; both
//! are surfaced as typed provider errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use inkmath_core::error::ProviderError;
use inkmath_core::model::RecognitionResult;
use inkmath_core::traits::{RecognitionRequest, Recognizer};

const DEFAULT_BASE_URL: &str = "https://api.mathpix.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Mathpix strokes-API recognizer.
pub struct MathpixRecognizer {
    app_id: String,
    app_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl MathpixRecognizer {
    pub fn new(app_id: &str, app_key: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            app_id: app_id.to_string(),
            app_key: app_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        }
    }
}

// Mathpix wants per-stroke parallel coordinate arrays rather than point
// structs, so the request marshals geometry into x/y lists.
#[derive(Serialize)]
struct StrokesRequest {
    strokes: StrokesBody,
}

#[derive(Serialize)]
struct StrokesBody {
    strokes: StrokesCoordinates,
}

#[derive(Serialize)]
struct StrokesCoordinates {
    x: Vec<Vec<f64>>,
    y: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct StrokesResponse {
    #[serde(default)]
    latex_styled: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl Recognizer for MathpixRecognizer {
    fn name(&self) -> &str {
        "mathpix"
    }

    #[instrument(skip(self, request), fields(strokes = request.strokes.len()))]
    async fn recognize(&self, request: &RecognitionRequest) -> anyhow::Result<RecognitionResult> {
        let coordinates = StrokesCoordinates {
            x: request
                .strokes
                .iter()
                .map(|s| s.points.iter().map(|p| p.x).collect())
                .collect(),
            y: request
                .strokes
                .iter()
                .map(|s| s.points.iter().map(|p| p.y).collect())
                .collect(),
        };

        let body = StrokesRequest {
            strokes: StrokesBody {
                strokes: coordinates,
            },
        };

        let response = self
            .client
            .post(format!("{}/v3/strokes", self.base_url))
            .header("app_id", &self.app_id)
            .header("app_key", &self.app_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: StrokesResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        if let Some(message) = api_response.error {
            return Err(ProviderError::ApiError {
                status: 200,
                message,
            }
            .into());
        }

        let plain_text = api_response
            .text
            .as_deref()
            .map(strip_math_delimiters)
            .unwrap_or_default();
        let latex = api_response
            .latex_styled
            .unwrap_or_else(|| plain_text.clone());

        Ok(RecognitionResult::new(
            latex,
            plain_text,
            api_response.confidence.unwrap_or(0.0),
        ))
    }
}

/// Drop the inline math delimiters Mathpix wraps its `text` field in.
fn strip_math_delimiters(text: &str) -> String {
    text.replace("\\(", "")
        .replace("\\)", "")
        .trim()
        .to_string()
}
