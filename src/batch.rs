//! # Batch Driver Loop
//!
//! Turns a folder of images plus a configuration into a folder of numbered
//! image/text pairs, strictly sequentially: task `i + 1` never starts
//! before task `i`'s request has completed, successfully or not.
//!
//! Per-task contract:
//! - the source image is copied to `{i}.png` eagerly, before the request,
//!   so a crash mid-request still leaves the image behind;
//! - a successful generation is post-processed and written to `{i}.txt`;
//! - a failed generation is logged and skipped. The image copy stays and
//!   no text file is written, which is how downstream consumers detect a
//!   partially failed run. Failure is per-item, never fatal to the batch.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Instant,
};

use crate::RunOptions;
use crate::client::{CaptionEngine, CaptionRequest};
use crate::config::Config;
use crate::error::{CaptionError, CaptionResult};
use crate::postprocess;
use crate::progress::{ProgressEvent, RunStats};
use crate::prompt;

/// Extensions accepted from the input directory, compared
/// case-insensitively.
pub const VALID_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One input image with its 1-based position in filename-sorted order.
/// The position determines the output basename and never changes once the
/// task list is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub index: usize,
    pub path: PathBuf,
    pub file_name: String,
}

/// Outcome of one driver invocation.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Tasks enumerated from the input directory.
    pub total: usize,
    /// Tasks that produced both output files.
    pub processed: usize,
    /// Tasks whose generation failed; image copied, text omitted.
    pub failed: usize,
    /// Wall-clock seconds for the whole run.
    pub elapsed_secs: f64,
}

/// Enumerate the task list: regular files with an allowed extension,
/// sorted lexicographically by filename, indexed from 1.
///
/// # Errors
///
/// Fails only if the input directory itself cannot be read. An empty task
/// list is not an error.
pub fn collect_tasks(input_dir: &Path) -> CaptionResult<Vec<ImageTask>> {
    let entries = fs::read_dir(input_dir)
        .map_err(|e| CaptionError::io("reading input directory", input_dir, e))?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CaptionError::io("reading input directory", input_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if has_valid_extension(&path) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, file_name)| ImageTask {
            index: i + 1,
            path: input_dir.join(&file_name),
            file_name,
        })
        .collect())
}

fn has_valid_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            VALID_EXTENSIONS.contains(&ext.as_str())
        })
}

/// MIME type for the request data URI, chosen by source extension.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Run one batch: enumerate, generate, post-process, report.
///
/// Progress records and human-readable status lines are written to `out`
/// (stdout in the binary). Free-form lines never begin with the progress
/// sentinel.
///
/// # Errors
///
/// Returns an error for filesystem failures (unreadable input directory,
/// failed image copy or text write) and for failures writing to `out`.
/// Generation failures are consumed here: logged, counted in the summary,
/// and never propagated.
pub fn run(
    options: &RunOptions,
    config: &Config,
    engine: &mut dyn CaptionEngine,
    out: &mut dyn Write,
) -> CaptionResult<RunSummary> {
    fs::create_dir_all(&options.output_dir)
        .map_err(|e| CaptionError::io("creating output directory", &options.output_dir, e))?;

    let tasks = collect_tasks(&options.input_dir)?;
    let total = tasks.len();
    let run_start = Instant::now();

    if total == 0 {
        writeln!(
            out,
            "No images found in '{}'. Add images and run again.",
            options.input_dir.display()
        )?;
        writeln!(out, "{}", summary_line(0, 0, 0.0))?;
        out.flush()?;
        return Ok(RunSummary {
            total: 0,
            processed: 0,
            failed: 0,
            elapsed_secs: run_start.elapsed().as_secs_f64(),
        });
    }

    writeln!(out, "Found {total} images to process.")?;

    let user_prompt = prompt::build_prompt(config, options.mode, options.max_words);
    let mut params = config.generation_params.clone();
    params.max_tokens = prompt::max_tokens_for(options.max_words);

    let mut stats = RunStats::new();
    let mut processed = 0usize;
    let mut failed = 0usize;

    for task in &tasks {
        let item_start = Instant::now();

        // Eager copy: the image lands in the output folder even when the
        // request afterwards fails or the process dies mid-request.
        let image_out = options.output_dir.join(format!("{}.png", task.index));
        fs::copy(&task.path, &image_out)
            .map_err(|e| CaptionError::io("copying image", &task.path, e))?;

        let image = fs::read(&task.path)
            .map_err(|e| CaptionError::io("reading image", &task.path, e))?;

        let request = CaptionRequest {
            prompt: &user_prompt,
            image: &image,
            mime: mime_for(&task.path),
            params: &params,
        };

        match engine.generate(&request) {
            Ok(raw) => {
                let text = postprocess::finalize(
                    &raw,
                    options.mode,
                    options.single_paragraph,
                    &options.trigger_words,
                );
                let text_out = options.output_dir.join(format!("{}.txt", task.index));
                fs::write(&text_out, text)
                    .map_err(|e| CaptionError::io("writing caption", &text_out, e))?;
                processed += 1;
            }
            Err(err) => {
                log::error!("failed to generate for {}: {err}", task.file_name);
                failed += 1;
            }
        }

        stats.record(item_start.elapsed());
        ProgressEvent {
            current_index: task.index,
            total_images: total,
            current_file: &task.file_name,
            avg_time: stats.average_secs(),
            elapsed: run_start.elapsed().as_secs_f64(),
            eta: stats.eta_secs(total - task.index),
        }
        .emit(out)?;
    }

    let elapsed_secs = run_start.elapsed().as_secs_f64();
    writeln!(out, "{}", summary_line(total, failed, elapsed_secs))?;
    out.flush()?;

    Ok(RunSummary {
        total,
        processed,
        failed,
        elapsed_secs,
    })
}

fn summary_line(total: usize, failed: usize, elapsed_secs: f64) -> String {
    let whole = elapsed_secs as u64;
    let (mins, secs) = (whole / 60, whole % 60);
    if failed == 0 {
        format!("Finished processing {total} images in {mins}m {secs}s.")
    } else {
        format!("Finished processing {total} images in {mins}m {secs}s ({failed} failed).")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tasks_are_sorted_by_filename_and_indexed_from_one() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), b"jpg").unwrap();
        fs::write(dir.path().join("a.png"), b"png").unwrap();

        let tasks = collect_tasks(dir.path()).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].index, 1);
        assert_eq!(tasks[0].file_name, "a.png");
        assert_eq!(tasks[1].index, 2);
        assert_eq!(tasks[1].file_name, "b.jpg");
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("upper.PNG"), b"png").unwrap();
        fs::write(dir.path().join("photo.JPeG"), b"jpg").unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::write(dir.path().join("clip.gif"), b"gif").unwrap();
        fs::write(dir.path().join("noext"), b"raw").unwrap();

        let tasks = collect_tasks(dir.path()).unwrap();
        let names: Vec<&str> = tasks.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, ["photo.JPeG", "upper.PNG"]);
    }

    #[test]
    fn directories_are_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.png")).unwrap();
        fs::write(dir.path().join("real.png"), b"png").unwrap();

        let tasks = collect_tasks(dir.path()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].file_name, "real.png");
    }

    #[test]
    fn missing_input_directory_is_an_io_error() {
        let err = collect_tasks(Path::new("does/not/exist")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn mime_follows_source_extension() {
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.JPEG")), "image/jpeg");
    }

    #[test]
    fn summary_line_formats_minutes_and_seconds() {
        assert_eq!(
            summary_line(14, 0, 75.9),
            "Finished processing 14 images in 1m 15s."
        );
        assert_eq!(
            summary_line(3, 1, 4.2),
            "Finished processing 3 images in 0m 4s (1 failed)."
        );
    }
}
