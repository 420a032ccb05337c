use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use caption_batch::client::{DEFAULT_API_BASE, FixedDelay, InferenceClient};
use caption_batch::config::Config;
use caption_batch::{Mode, RunOptions, batch};

/// Batch caption driver: one chat-completions request per image against a
/// local inference server, numbered image/text pairs out, structured
/// progress lines on stdout for the supervising process.
///
/// The four positional arguments are order-fixed because the supervisor
/// passes them blindly; the flags exist for running the driver by hand.
#[derive(Parser, Debug)]
#[command(name = "caption-batch")]
#[command(about = "Caption or tag a folder of images through a local inference server")]
struct Args {
    /// Generation mode: "captions" or "tags"
    mode: String,

    /// Trigger words prepended to every output (empty disables)
    #[arg(default_value = "")]
    trigger_words: String,

    /// "true" to collapse captions to a single paragraph
    #[arg(default_value = "false")]
    single_paragraph: String,

    /// Upper bound on caption length in words
    #[arg(default_value = "300")]
    max_words: String,

    /// Directory scanned for input images
    #[arg(long, default_value = "input")]
    input: PathBuf,

    /// Directory receiving the numbered output pairs
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Configuration file with prompts and generation parameters
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Base URL of the inference server
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Everything that can be fatal happens before the first probe: mode,
    // run parameters, configuration.
    let mode = Mode::from_arg(&args.mode)?;
    let options = RunOptions {
        mode,
        trigger_words: args.trigger_words,
        single_paragraph: parse_flag(&args.single_paragraph),
        max_words: parse_max_words(&args.max_words),
        input_dir: args.input,
        output_dir: args.output,
    };
    let config = Config::load(&args.config)?;

    println!("Starting generator in '{}' mode...", mode.as_str());
    println!("Connecting to the inference API...");
    let mut client = InferenceClient::new(&args.api_base);
    client.wait_until_ready(&mut FixedDelay::default())?;
    println!("API connection successful.");

    let mut stdout = std::io::stdout().lock();
    batch::run(&options, &config, &mut client, &mut stdout)?;
    Ok(())
}

/// Only the literal `true` (any case) enables the flag; everything else,
/// including garbage, means `false`.
fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Positive integer, or silently the 300-word default. The supervisor
/// already validates this field, so a bad value here is not worth failing
/// the run over.
fn parse_max_words(value: &str) -> u32 {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(300)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_accepts_true_only() {
        assert!(parse_flag("true"));
        assert!(parse_flag("True"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn max_words_falls_back_to_default() {
        assert_eq!(parse_max_words("120"), 120);
        assert_eq!(parse_max_words(" 120 "), 120);
        assert_eq!(parse_max_words("abc"), 300);
        assert_eq!(parse_max_words(""), 300);
        assert_eq!(parse_max_words("0"), 300);
        assert_eq!(parse_max_words("-5"), 300);
    }

    #[test]
    fn positional_defaults_match_the_supervisor_contract() {
        let args = Args::parse_from(["caption-batch", "captions"]);
        assert_eq!(args.trigger_words, "");
        assert_eq!(args.single_paragraph, "false");
        assert_eq!(args.max_words, "300");
        assert_eq!(args.input, PathBuf::from("input"));
        assert_eq!(args.output, PathBuf::from("output"));
    }

    #[test]
    fn positional_order_is_mode_trigger_flag_words() {
        let args = Args::parse_from(["caption-batch", "tags", "Lara Croft", "true", "150"]);
        assert_eq!(args.mode, "tags");
        assert_eq!(args.trigger_words, "Lara Croft");
        assert!(parse_flag(&args.single_paragraph));
        assert_eq!(parse_max_words(&args.max_words), 150);
    }
}
