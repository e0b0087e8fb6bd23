// src/engine/extract.rs

//! Metadata derived from the command line and the captured output.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::warn;

/// Hard cap on the stored log snippet, in characters.
pub const LOG_SNIPPET_MAX_CHARS: usize = 500;

const CKPT_FILE_PATTERN: &str =
    r#"(?i)[^\s'"()\[\],;]+\.(?:pth|pt|ckpt|bin|safetensors)\b"#;

const CKPT_KEYWORDS: [&str; 4] = ["checkpoint", "model", "save", "output"];

/// Rebuild the flag-like tokens of `argv` as `"flag value"` fragments.
///
/// A token starting with `-` consumes the next token as its value unless
/// that one is a flag too. Positional tokens are dropped.
pub fn extract_params<S: AsRef<str>>(argv: &[S]) -> String {
    let mut fragments = Vec::new();
    let mut i = 0;
    while i < argv.len() {
        let token = argv[i].as_ref();
        if !token.starts_with('-') {
            i += 1;
            continue;
        }
        match argv.get(i + 1).map(AsRef::as_ref) {
            Some(value) if !value.starts_with('-') => {
                fragments.push(format!("{token} {value}"));
                i += 2;
            }
            _ => {
                fragments.push(token.to_string());
                i += 1;
            }
        }
    }
    fragments.join(" ")
}

/// Last line-count window of `output`, then capped to
/// [`LOG_SNIPPET_MAX_CHARS`] characters from its start.
pub fn log_snippet(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.split('\n').collect();
    let start = lines.len().saturating_sub(max_lines);
    let tail = lines[start..].join("\n");
    tail.chars().take(LOG_SNIPPET_MAX_CHARS).collect()
}

/// Best-effort guess of the saved model file mentioned in `output`.
///
/// A candidate is any token ending in a model-file extension. It counts when
/// the token itself, or the text before it on the same line, mentions
/// checkpoint / model / save / output. The last counted candidate wins;
/// no candidate yields an empty string.
pub fn extract_ckpt_path(output: &str) -> String {
    let pattern = match Regex::new(CKPT_FILE_PATTERN) {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!(error = %e, "checkpoint pattern failed to compile");
            return String::new();
        }
    };

    let mut last = None;
    for line in output.lines() {
        for found in pattern.find_iter(line) {
            let prefix = line[..found.start()].to_lowercase();
            let token = found.as_str().to_lowercase();
            if mentions_keyword(&token) || mentions_keyword(&prefix) {
                last = Some(found.as_str());
            }
        }
    }
    last.map(str::to_string).unwrap_or_default()
}

fn mentions_keyword(text: &str) -> bool {
    CKPT_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// First `.py` argument that exists relative to `cwd`; it becomes the only
/// file staged by the auto snapshot.
pub fn script_target<S: AsRef<str>>(argv: &[S], cwd: &Path) -> Option<PathBuf> {
    argv.iter()
        .map(AsRef::as_ref)
        .filter(|arg| arg.ends_with(".py"))
        .map(PathBuf::from)
        .find(|path| cwd.join(path).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_pairs_flags_with_values() {
        let argv = ["python", "train.py", "--lr", "0.01", "--fp16", "--epochs", "3"];
        assert_eq!(extract_params(&argv), "--lr 0.01 --fp16 --epochs 3");
    }

    #[test]
    fn params_flag_followed_by_flag_stands_alone() {
        let argv = ["-v", "--dry-run", "-o"];
        assert_eq!(extract_params(&argv), "-v --dry-run -o");
        assert_eq!(extract_params::<&str>(&[]), "");
    }

    #[test]
    fn ckpt_last_match_wins() {
        let log = "epoch 0\nsaved model to checkpoint_final.pt\nmore\ncheckpoint_epoch1.ckpt\n";
        assert_eq!(extract_ckpt_path(log), "checkpoint_epoch1.ckpt");
    }

    #[test]
    fn ckpt_keyword_before_path_on_same_line() {
        let log = "Saved to runs/exp3/weights.safetensors.\n";
        assert_eq!(extract_ckpt_path(log), "runs/exp3/weights.safetensors");
    }

    #[test]
    fn ckpt_ignores_unrelated_files() {
        assert_eq!(extract_ckpt_path("loaded data/train.bin\n"), "");
        assert_eq!(extract_ckpt_path(""), "");
    }

    #[test]
    fn ckpt_handles_quotes_and_case() {
        let log = "MODEL written: '/tmp/Best.PTH'\n";
        assert_eq!(extract_ckpt_path(log), "/tmp/Best.PTH");
    }

    #[test]
    fn snippet_keeps_trailing_lines() {
        let out = "a\nb\nc\nd\n";
        // the trailing newline yields an empty last element
        assert_eq!(log_snippet(out, 2), "d\n");
        assert_eq!(log_snippet("a\nb\nc", 2), "b\nc");
        assert_eq!(log_snippet("", 20), "");
    }

    #[test]
    fn snippet_is_capped_in_chars() {
        let out = "é".repeat(2000);
        assert_eq!(log_snippet(&out, 20).chars().count(), LOG_SNIPPET_MAX_CHARS);
    }

    #[test]
    fn script_target_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("train.py"), "print(1)\n").unwrap();
        let argv = ["python", "missing.py", "train.py"];
        assert_eq!(
            script_target(&argv, dir.path()),
            Some(PathBuf::from("train.py"))
        );
        assert_eq!(script_target(&["python", "-c", "1"], dir.path()), None);
    }
}
