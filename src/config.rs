//! # Configuration Module
//!
//! Loads the driver configuration from a TOML file. The file supplies the
//! two prompt templates and the seven generation parameters forwarded to
//! the inference server with every request:
//!
//! ```toml
//! [prompts]
//! captions = "Describe this image in up to 300 words."
//! tags = "List booru-style tags for this image."
//!
//! [generation_params]
//! temperature = 0.6
//! top_p = 0.9
//! top_k = 40
//! repeat_penalty = 1.1
//! frequency_penalty = 0.0
//! presence_penalty = 0.0
//! max_tokens = 512
//! ```
//!
//! Every key is required. The configuration is read once at startup and a
//! missing file or missing key aborts the run before any network activity.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, CaptionResult};

/// Driver configuration, immutable for the run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub prompts: Prompts,
    pub generation_params: GenerationParams,
}

/// Prompt templates, one per generation mode.
#[derive(Debug, Clone, Deserialize)]
pub struct Prompts {
    /// Template for prose captions. May embed an `up to <N> words` clause
    /// that the driver rewrites to the effective max-words bound.
    pub captions: String,
    /// Template for comma-joined tag lists.
    pub tags: String,
}

/// Sampling parameters merged into every completions request.
///
/// Serialized flat into the request body next to `messages`, matching the
/// OpenAI-style chat-completions schema the server expects. The configured
/// `max_tokens` is overridden per run from the max-words bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub max_tokens: u32,
}

impl Config {
    /// Load and parse the configuration file.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`CaptionError::Config`] if the file cannot be read
    /// or any section or key is missing or has the wrong type.
    pub fn load(path: &Path) -> CaptionResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| CaptionError::config(path, format!("cannot read file: {e}")))?;
        Self::parse(&raw).map_err(|reason| CaptionError::config(path, reason))
    }

    fn parse(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [prompts]
        captions = "Describe this image in up to 300 words."
        tags = "List tags for this image."

        [generation_params]
        temperature = 0.6
        top_p = 0.9
        top_k = 40
        repeat_penalty = 1.1
        frequency_penalty = 0.0
        presence_penalty = 0.0
        max_tokens = 512
    "#;

    #[test]
    fn parses_complete_config() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(
            config.prompts.captions,
            "Describe this image in up to 300 words."
        );
        assert_eq!(config.generation_params.top_k, 40);
        assert_eq!(config.generation_params.max_tokens, 512);
        assert!((config.generation_params.temperature - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_key_is_rejected() {
        let without_tags = FULL.replace("tags = \"List tags for this image.\"", "");
        let err = Config::parse(&without_tags).unwrap_err();
        assert!(err.contains("tags"), "error should name the key: {err}");
    }

    #[test]
    fn missing_section_is_rejected() {
        assert!(Config::parse("[prompts]\ncaptions = \"a\"\ntags = \"b\"").is_err());
    }

    #[test]
    fn missing_file_is_a_fatal_config_error() {
        let err = Config::load(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.is_fatal());
    }
}
