//! Local file names for downloaded videos.

use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};

const MAX_STEM_CHARS: usize = 40;
const FALLBACK_STEM: &str = "motion";

/// Reduce a prompt to a file-name stem: keep alphanumerics, `_` and `-`,
/// turn whitespace runs into a single `_`, drop everything else, cap the
/// length. Never returns an empty string.
pub fn sanitize_stem(prompt: &str) -> String {
    let mut stem = String::new();
    let mut pending_sep = false;
    for c in prompt.chars() {
        if c.is_whitespace() {
            pending_sep = true;
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            if pending_sep && !stem.is_empty() {
                stem.push('_');
            }
            pending_sep = false;
            stem.push(c);
        }
    }

    let stem: String = stem.trim_matches('_').chars().take(MAX_STEM_CHARS).collect();
    let stem = stem.trim_end_matches('_');
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

pub fn output_path(dir: &Path, prompt: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.mp4", sanitize_stem(prompt), at.format("%Y%m%d_%H%M%S")))
}
