//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use inkmath_core::traits::{CompletionProvider, Recognizer};

use crate::groq::GroqProvider;
use crate::mathpix::MathpixRecognizer;

/// Configuration for a single external capability.
///
/// Note: Custom Debug impl masks credentials to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Groq {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Mathpix {
        app_id: String,
        app_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Groq {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Groq")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            ProviderConfig::Mathpix {
                app_id,
                app_key: _,
                base_url,
            } => f
                .debug_struct("Mathpix")
                .field("app_id", app_id)
                .field("app_key", &"***")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

/// Top-level inkmath configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InkmathConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Completion provider to use.
    #[serde(default = "default_completion")]
    pub default_completion: String,
    /// Recognizer to use.
    #[serde(default = "default_recognizer")]
    pub default_recognizer: String,
    /// Default model passed to the completion provider.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max concurrent validations in batch mode.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_completion() -> String {
    "groq".to_string()
}
fn default_recognizer() -> String {
    "mathpix".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    500
}
fn default_parallelism() -> usize {
    4
}

impl Default for InkmathConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_completion: default_completion(),
            default_recognizer: default_recognizer(),
            default_model: default_model(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Groq {
            api_key,
            base_url,
            model,
        } => ProviderConfig::Groq {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.clone(),
        },
        ProviderConfig::Mathpix {
            app_id,
            app_key,
            base_url,
        } => ProviderConfig::Mathpix {
            app_id: resolve_env_vars(app_id),
            app_key: resolve_env_vars(app_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `inkmath.toml` in the current directory
/// 2. `~/.config/inkmath/config.toml`
///
/// Environment variable overrides: `INKMATH_GROQ_KEY`,
/// `INKMATH_MATHPIX_APP_ID`, `INKMATH_MATHPIX_APP_KEY`.
pub fn load_config() -> Result<InkmathConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<InkmathConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("inkmath.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<InkmathConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => InkmathConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("INKMATH_GROQ_KEY") {
        config
            .providers
            .entry("groq".into())
            .or_insert(ProviderConfig::Groq {
                api_key: String::new(),
                base_url: None,
                model: None,
            });
        if let Some(ProviderConfig::Groq { api_key, .. }) = config.providers.get_mut("groq") {
            *api_key = key;
        }
    }

    let mathpix_id = std::env::var("INKMATH_MATHPIX_APP_ID").ok();
    let mathpix_key = std::env::var("INKMATH_MATHPIX_APP_KEY").ok();
    if mathpix_id.is_some() || mathpix_key.is_some() {
        config
            .providers
            .entry("mathpix".into())
            .or_insert(ProviderConfig::Mathpix {
                app_id: String::new(),
                app_key: String::new(),
                base_url: None,
            });
        if let Some(ProviderConfig::Mathpix {
            app_id, app_key, ..
        }) = config.providers.get_mut("mathpix")
        {
            if let Some(id) = mathpix_id {
                *app_id = id;
            }
            if let Some(key) = mathpix_key {
                *app_key = key;
            }
        }
    }

    // Resolve env vars in all provider configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("inkmath"))
}

/// Create a completion provider from its configuration.
pub fn create_completion_provider(config: &ProviderConfig) -> Result<Box<dyn CompletionProvider>> {
    match config {
        ProviderConfig::Groq {
            api_key, base_url, ..
        } => Ok(Box::new(GroqProvider::new(api_key, base_url.clone()))),
        ProviderConfig::Mathpix { .. } => {
            anyhow::bail!("mathpix is a recognizer, not a completion provider")
        }
    }
}

/// Create a recognizer from its configuration.
pub fn create_recognizer(config: &ProviderConfig) -> Result<Box<dyn Recognizer>> {
    match config {
        ProviderConfig::Mathpix {
            app_id,
            app_key,
            base_url,
        } => Ok(Box::new(MathpixRecognizer::new(
            app_id,
            app_key,
            base_url.clone(),
        ))),
        ProviderConfig::Groq { .. } => {
            anyhow::bail!("groq is a completion provider, not a recognizer")
        }
    }
}
