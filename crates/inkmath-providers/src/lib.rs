//! inkmath-providers — external capability integrations.
//!
//! Implements the `CompletionProvider` trait for Groq and the `Recognizer`
//! trait for Mathpix, plus in-memory mocks for driving the validation
//! pipeline in tests without network access.

pub mod config;
pub mod groq;
pub mod mathpix;
pub mod mock;

pub use config::{
    create_completion_provider, create_recognizer, load_config, InkmathConfig, ProviderConfig,
};
pub use groq::GroqProvider;
pub use mathpix::MathpixRecognizer;
pub use mock::{MockCompletion, MockRecognizer};
