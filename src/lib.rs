//! # Batch Caption Driver
//!
//! Drives a local OpenAI-style inference server to caption or tag a folder
//! of images, one synchronous request per image, and writes numbered
//! image/text pairs to an output folder while reporting progress on stdout
//! in a machine-parseable line format.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `config`: TOML configuration (prompt templates + generation parameters)
//! - `client`: blocking HTTP client for the inference server
//! - `prompt`: prompt template selection and word-limit rewriting
//! - `postprocess`: trigger-word prefixing and paragraph flattening
//! - `progress`: rolling run statistics and the stdout progress protocol
//! - `batch`: the sequential per-image driver loop
//!
//! ## Example
//!
//! ```rust,no_run
//! use caption_batch::{batch, config::Config, Mode, RunOptions};
//! use caption_batch::client::{FixedDelay, InferenceClient};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::load("config.toml".as_ref())?;
//! let options = RunOptions {
//!     mode: Mode::Captions,
//!     trigger_words: String::new(),
//!     single_paragraph: false,
//!     max_words: 300,
//!     input_dir: "input".into(),
//!     output_dir: "output".into(),
//! };
//!
//! let mut client = InferenceClient::new(caption_batch::client::DEFAULT_API_BASE);
//! client.wait_until_ready(&mut FixedDelay::default())?;
//! batch::run(&options, &config, &mut client, &mut std::io::stdout().lock())?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod postprocess;
pub mod progress;
pub mod prompt;

/// Re-export error types for convenience
pub use error::{CaptionError, CaptionResult};

/// Generation mode selecting which prompt template is sent to the server
/// and how trigger words are joined to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Prose descriptions. Trigger words are prepended with a space.
    Captions,
    /// Comma-separated tag lists. Trigger words are prepended with `", "`.
    Tags,
}

impl Mode {
    /// Parse the mode from its process-argument spelling.
    ///
    /// Anything other than the exact strings `captions` or `tags` is a
    /// fatal argument error; the driver must not touch the network after
    /// receiving one.
    pub fn from_arg(value: &str) -> CaptionResult<Self> {
        match value {
            "captions" => Ok(Self::Captions),
            "tags" => Ok(Self::Tags),
            _ => Err(CaptionError::invalid_mode(value)),
        }
    }

    /// The process-argument spelling of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Captions => "captions",
            Self::Tags => "tags",
        }
    }
}

/// Per-run parameters supplied by the supervising process.
///
/// These are validated once at startup and immutable for the run; the
/// driver keeps no state between runs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Generation mode (`captions` or `tags`).
    pub mode: Mode,

    /// Text prepended to every generated output. Empty disables prefixing.
    pub trigger_words: String,

    /// Captions mode only: collapse all whitespace runs (including
    /// newlines) in the generated text to single spaces.
    pub single_paragraph: bool,

    /// Upper bound on caption length in words. Rewritten into the caption
    /// prompt template and used to derive the request `max_tokens`.
    pub max_words: u32,

    /// Directory scanned for input images.
    pub input_dir: PathBuf,

    /// Directory receiving the numbered `{i}.png` / `{i}.txt` pairs.
    pub output_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_exact_spellings_only() {
        assert_eq!(Mode::from_arg("captions").unwrap(), Mode::Captions);
        assert_eq!(Mode::from_arg("tags").unwrap(), Mode::Tags);
        assert!(Mode::from_arg("Captions").is_err());
        assert!(Mode::from_arg("").is_err());
        assert!(Mode::from_arg("caption").is_err());
    }

    #[test]
    fn mode_round_trips_through_as_str() {
        for mode in [Mode::Captions, Mode::Tags] {
            assert_eq!(Mode::from_arg(mode.as_str()).unwrap(), mode);
        }
    }
}
