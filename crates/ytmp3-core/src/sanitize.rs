//! Filename sanitization with a path-traversal guarantee.
//!
//! Video titles come from remote metadata and are untrusted. [`sanitize_filename`]
//! maps them to ASCII-safe, length-bounded, separator-free names, and
//! [`secure_path_join`] guarantees the joined result stays inside the output
//! directory.

use crate::error::OutputDirError;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Substituted when sanitization leaves nothing usable.
pub const FALLBACK_FILENAME: &str = "download";

/// Longest allowed name in bytes, leaving room for an extension under common
/// filesystem path limits.
const MAX_LEN: usize = 200;

/// Device names Windows reserves regardless of extension.
const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9 \-_.]+").expect("valid pattern"))
}

fn repeated_dots() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.{2,}").expect("valid pattern"))
}

fn repeated_spaces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("valid pattern"))
}

/// Map an arbitrary title to a safe filesystem name.
///
/// Null bytes, control characters, path separators and everything outside
/// ASCII alphanumerics, space, `-`, `_` and `.` are dropped; dot and space
/// runs collapse; the result is trimmed, length-capped and never empty.
pub fn sanitize_filename(raw: &str) -> String {
    let cleaned = raw.replace('\0', "");

    // Keep only the final path segment; both separator styles count.
    let tail = cleaned.rsplit(['/', '\\']).next().unwrap_or("");

    let kept = disallowed_chars().replace_all(tail, "");
    let collapsed = repeated_dots().replace_all(&kept, ".");
    let collapsed = repeated_spaces().replace_all(&collapsed, " ");
    let trimmed = collapsed.trim_matches(|c| c == '.' || c == ' ');

    // Everything left is ASCII, so byte truncation cannot split a char.
    // Preserve a trailing extension the way the cap is meant to.
    let mut name = if trimmed.len() > MAX_LEN {
        match trimmed.rsplit_once('.') {
            Some((stem, ext)) if ext.len() + 1 < MAX_LEN => {
                format!("{}.{}", &stem[..MAX_LEN - ext.len() - 1], ext)
            }
            _ => trimmed[..MAX_LEN].to_string(),
        }
    } else {
        trimmed.to_string()
    };

    if name.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&name);
    if WINDOWS_RESERVED.contains(&stem.to_ascii_uppercase().as_str()) {
        name = format!("{FALLBACK_FILENAME}_{name}");
    }

    name
}

/// Join `name` onto `base` and guarantee the result is a strict descendant
/// of `base`.
///
/// The joined file does not exist yet, so instead of canonicalizing it the
/// check canonicalizes `base` and then normalizes the joined path without
/// touching the filesystem. Absolute fragments and `..` escapes are hard
/// errors.
pub fn secure_path_join(base: &Path, name: &str) -> Result<PathBuf, OutputDirError> {
    let base = base.canonicalize()?;
    let joined = base.join(name);

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(OutputDirError::Traversal(joined.clone()));
                }
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }

    if normalized == base || !normalized.starts_with(&base) {
        return Err(OutputDirError::Traversal(joined));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_titles_through() {
        assert_eq!(sanitize_filename("Hello World"), "Hello World");
        assert_eq!(sanitize_filename("  Spaces  "), "Spaces");
    }

    #[test]
    fn strips_dangerous_characters() {
        assert_eq!(sanitize_filename("file<>:\"|?*name"), "filename");
        assert_eq!(sanitize_filename("file\0name"), "filename");
        assert_eq!(sanitize_filename("tab\there"), "tabhere");
    }

    #[test]
    fn drops_path_components() {
        assert_eq!(sanitize_filename("../../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("/etc/shadow"), "shadow");
        assert_eq!(sanitize_filename("C:\\Windows\\system.ini"), "system.ini");
    }

    #[test]
    fn collapses_dot_and_space_runs() {
        assert_eq!(sanitize_filename("file...txt"), "file.txt");
        assert_eq!(sanitize_filename("a    b"), "a b");
    }

    #[test]
    fn empty_input_yields_fallback() {
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("..."), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("///"), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("\u{202e}\u{200b}"), FALLBACK_FILENAME);
    }

    #[test]
    fn caps_length_and_keeps_extension() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), 200);

        let with_ext = format!("{}.mp3", "b".repeat(300));
        let result = sanitize_filename(&with_ext);
        assert_eq!(result.len(), 200);
        assert!(result.ends_with(".mp3"));
    }

    #[test]
    fn prefixes_reserved_device_names() {
        assert_eq!(sanitize_filename("CON"), "download_CON");
        assert_eq!(sanitize_filename("PRN.txt"), "download_PRN.txt");
        assert_eq!(sanitize_filename("lpt1"), "download_lpt1");
        assert_eq!(sanitize_filename("CONSOLE"), "CONSOLE");
    }

    #[test]
    fn join_accepts_plain_names() {
        let dir = tempfile::tempdir().unwrap();
        let joined = secure_path_join(dir.path(), "song.mp3").unwrap();
        assert!(joined.starts_with(dir.path().canonicalize().unwrap()));
        assert!(joined.ends_with("song.mp3"));
    }

    #[test]
    fn join_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../escape.mp3", "a/../../escape.mp3", "..", "."] {
            assert!(
                matches!(
                    secure_path_join(dir.path(), name),
                    Err(OutputDirError::Traversal(_))
                ),
                "should reject {name:?}"
            );
        }
    }

    #[test]
    fn join_rejects_absolute_fragments() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            secure_path_join(dir.path(), "/etc/passwd"),
            Err(OutputDirError::Traversal(_))
        ));
    }

    /// The tested invariant from the sanitizer contract: for arbitrary
    /// hostile input, sanitize + join + canonicalize never escapes the
    /// output directory.
    #[test]
    fn sanitize_then_join_never_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();

        let hostile = [
            "../../../etc/passwd",
            "..\\..\\windows\\system32",
            "/etc/cron.d/evil",
            "a/../../../b",
            "%2e%2e%2fescape",
            "....//....//etc",
            "name\0../../etc",
            "..",
            "...",
            "",
            "\u{1f3b5} music \u{1f3b5}",
        ];

        for input in hostile {
            let safe = sanitize_filename(input);
            assert!(!safe.is_empty(), "sanitize({input:?}) was empty");
            assert!(!safe.contains(['/', '\\', '\0']), "separators in {safe:?}");

            let joined = secure_path_join(&base, &safe)
                .unwrap_or_else(|e| panic!("join failed for {input:?} -> {safe:?}: {e}"));

            // Materialize the file so canonicalize resolves the real path.
            std::fs::write(&joined, b"x").unwrap();
            let resolved = joined.canonicalize().unwrap();
            assert!(
                resolved.starts_with(&base),
                "{input:?} escaped to {resolved:?}"
            );
            std::fs::remove_file(&joined).unwrap();
        }
    }
}
