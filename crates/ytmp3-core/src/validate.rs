//! URL and output-directory validation.

use crate::error::{OutputDirError, UrlError};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Hosts accepted as YouTube frontends. Anything else is rejected, including
/// look-alikes such as `youtube.com.evil.com`.
const ALLOWED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Roots that never receive downloads, writable or not.
const DENIED_ROOTS: &[&str] = &[
    "/etc",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/root",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\ProgramData",
    "C:\\System32",
];

/// Short-link video ids are always at least this long.
const MIN_VIDEO_ID_LEN: usize = 11;

/// A URL that passed the scheme and host allow-list checks.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> &str {
        // A ValidatedUrl cannot be built without a host.
        self.0.host_str().unwrap_or_default()
    }

    /// True for `/playlist` URLs, which expand to multiple videos.
    pub fn is_playlist(&self) -> bool {
        self.0.path().starts_with("/playlist")
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a candidate YouTube URL.
///
/// Accepts only absolute `https` URLs whose host is on the allow-list and
/// whose path actually references a video or playlist. `http`, `file`,
/// `javascript` and every other scheme fail.
pub fn validate_url(raw: &str) -> Result<ValidatedUrl, UrlError> {
    let parsed = Url::parse(raw)?;

    if parsed.scheme() != "https" {
        return Err(UrlError::SchemeNotHttps(parsed.scheme().to_string()));
    }

    let host = parsed.host_str().ok_or(UrlError::MissingHost)?;
    if !ALLOWED_HOSTS.contains(&host) {
        return Err(UrlError::HostNotAllowed(host.to_string()));
    }

    if host == "youtu.be" {
        // Short links carry the video id as the only path segment.
        let id = parsed.path().trim_start_matches('/');
        if id.len() < MIN_VIDEO_ID_LEN {
            return Err(UrlError::NoVideoReference);
        }
    } else {
        let path = parsed.path();
        if path.starts_with("/watch") {
            let has_id = parsed
                .query_pairs()
                .any(|(k, v)| k == "v" && !v.is_empty());
            if !has_id {
                return Err(UrlError::NoVideoReference);
            }
        } else if path.starts_with("/playlist") {
            let has_list = parsed
                .query_pairs()
                .any(|(k, v)| k == "list" && !v.is_empty());
            if !has_list {
                return Err(UrlError::NoVideoReference);
            }
        } else if !["/embed/", "/v/", "/shorts/"]
            .iter()
            .any(|p| path.starts_with(p))
        {
            return Err(UrlError::NoVideoReference);
        }
    }

    debug!("validated URL for host {}", host);
    Ok(ValidatedUrl(parsed))
}

/// An output directory that passed existence, writability and deny-list
/// checks. Holds the canonicalized path.
#[derive(Debug, Clone)]
pub struct OutputDir(PathBuf);

impl OutputDir {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Validate a candidate output directory.
///
/// The directory must already exist (it is never auto-created, to avoid
/// surprising writes), must be writable by the current process, and its
/// canonicalized form must not be equal to or inside any deny-listed root.
pub fn validate_output_dir(path: &Path) -> Result<OutputDir, OutputDirError> {
    if !path.exists() {
        return Err(OutputDirError::Missing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(OutputDirError::NotADirectory(path.to_path_buf()));
    }

    // Symlink-free absolute form for the deny-list comparison.
    let canonical = path.canonicalize()?;
    for root in DENIED_ROOTS {
        let root = Path::new(root);
        if canonical.starts_with(root) {
            return Err(OutputDirError::DenyListed(canonical, root.to_path_buf()));
        }
    }

    // Probe writability by actually creating a file; permission bits alone
    // miss read-only mounts and ACLs.
    tempfile::Builder::new()
        .prefix(".ytmp3-write-probe")
        .tempfile_in(&canonical)
        .map_err(|e| OutputDirError::NotWritable(canonical.clone(), e))?;

    debug!("validated output directory {}", canonical.display());
    Ok(OutputDir(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wellformed_youtube_urls() {
        let valid = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/playlist?list=PLabc123",
        ];
        for url in valid {
            assert!(validate_url(url).is_ok(), "should accept {url}");
        }
    }

    #[test]
    fn rejects_non_https_schemes() {
        for url in [
            "http://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "file:///etc/passwd",
            "javascript:alert(1)",
        ] {
            let err = validate_url(url).unwrap_err();
            assert!(
                matches!(err, UrlError::SchemeNotHttps(_) | UrlError::MissingHost),
                "unexpected error for {url}: {err}"
            );
        }
    }

    #[test]
    fn rejects_unlisted_hosts() {
        for url in [
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://evil.com/youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com.evil.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlError::HostNotAllowed(_))),
                "should reject {url}"
            );
        }
    }

    #[test]
    fn rejects_urls_without_a_video() {
        for url in [
            "https://www.youtube.com/watch",
            "https://www.youtube.com/watch?v=",
            "https://youtu.be/",
            "https://youtu.be/short",
            "https://www.youtube.com/feed/subscriptions",
            "https://www.youtube.com/playlist",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlError::NoVideoReference)),
                "should reject {url}"
            );
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            validate_url("not_a_url"),
            Err(UrlError::Unparseable(_))
        ));
        assert!(matches!(validate_url(""), Err(UrlError::Unparseable(_))));
    }

    #[test]
    fn accepts_writable_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let validated = validate_output_dir(dir.path()).unwrap();
        assert!(validated.path().is_absolute());
    }

    #[test]
    fn rejects_missing_and_nondirectory_paths() {
        assert!(matches!(
            validate_output_dir(Path::new("/no/such/directory")),
            Err(OutputDirError::Missing(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            validate_output_dir(&file),
            Err(OutputDirError::NotADirectory(_))
        ));
    }

    #[test]
    fn rejects_denylisted_roots() {
        for dir in ["/etc", "/proc", "/sys"] {
            let path = Path::new(dir);
            if path.is_dir() {
                assert!(
                    matches!(
                        validate_output_dir(path),
                        Err(OutputDirError::DenyListed(_, _))
                    ),
                    "should reject {dir}"
                );
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn rejects_readonly_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut perms = std::fs::metadata(dir.path()).unwrap().permissions();
        perms.set_mode(0o555);
        std::fs::set_permissions(dir.path(), perms).unwrap();

        // Root ignores permission bits; only assert where they are enforced.
        let enforced = std::fs::File::create(dir.path().join("probe")).is_err();
        let result = validate_output_dir(dir.path());

        let mut perms = std::fs::metadata(dir.path()).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(dir.path(), perms).unwrap();

        if enforced {
            assert!(matches!(result, Err(OutputDirError::NotWritable(_, _))));
        }
    }
}
