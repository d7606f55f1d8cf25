//! transdrill-providers: AI-backed scoring and question generation.
//!
//! Implements the `LlmProvider` trait for OpenAI-compatible endpoints and
//! builds the scoring oracle and question generator on top of it, plus the
//! configuration loader that wires them up.

pub mod config;
pub mod generator;
pub mod mock;
pub mod openai;
pub mod oracle;

pub use config::{
    create_generator, create_provider, create_scorer, load_config, load_config_from,
    ProviderConfig, TransdrillConfig,
};
pub use generator::{LlmQuestionGenerator, TemplateGenerator};
pub use oracle::OracleScorer;
