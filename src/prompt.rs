//! Prompt template selection and rewriting.
//!
//! Captions mode embeds a word budget in the template text as the literal
//! clause `up to <N> words`. Before the run starts the clause is rewritten
//! so `<N>` matches the effective max-words bound, and the request
//! `max_tokens` is derived from the same bound.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Mode, config::Config};

static WORD_LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"up to \d+ words").expect("word limit pattern is valid"));

/// Build the user prompt for the run.
///
/// Selects the template for `mode`; for captions the embedded word-count
/// clause is rewritten to `max_words`. Tag templates pass through
/// unchanged, as do caption templates without the clause.
pub fn build_prompt(config: &Config, mode: Mode, max_words: u32) -> String {
    match mode {
        Mode::Captions => apply_word_limit(&config.prompts.captions, max_words),
        Mode::Tags => config.prompts.tags.clone(),
    }
}

/// Rewrite every `up to <N> words` clause in `template` to `max_words`.
pub fn apply_word_limit(template: &str, max_words: u32) -> String {
    WORD_LIMIT
        .replace_all(template, format!("up to {max_words} words"))
        .into_owned()
}

/// Token budget sent to the server: `round(max_words * 1.5)`.
///
/// Tokens run shorter than words, so the generation window is padded by
/// half again to avoid truncating captions at the requested word bound.
pub fn max_tokens_for(max_words: u32) -> u32 {
    (f64::from(max_words) * 1.5).round() as u32
}
