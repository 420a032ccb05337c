//! Text post-processing applied to every successful generation before it
//! is written to disk.
//!
//! Order matters: trailing whitespace is stripped first, paragraph
//! flattening runs next (captions mode with the single-paragraph flag),
//! and the trigger-word prefix goes on last so it is never flattened into
//! the generated text.

use crate::Mode;

/// Finalize generated text for writing to the `{i}.txt` output file.
pub fn finalize(raw: &str, mode: Mode, single_paragraph: bool, trigger_words: &str) -> String {
    let mut text = raw.trim_end().to_string();

    if mode == Mode::Captions && single_paragraph {
        text = flatten_paragraphs(&text);
    }

    if !trigger_words.is_empty() {
        // Captions are prose, tags are a comma-joined list.
        text = match mode {
            Mode::Captions => format!("{trigger_words} {text}"),
            Mode::Tags => format!("{trigger_words}, {text}"),
        };
    }

    text
}

/// Collapse every whitespace run (spaces, tabs, newlines) to a single
/// space and trim the ends.
fn flatten_paragraphs(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
