//! Media forwarding backend.
//!
//! Downloads a remote file into a directory served by an external web
//! server and hands back the public URL. Callers treat any failure as "no
//! link available"; nothing here is ever fatal to a forwarded message.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::WebBackendConfig;

/// Placeholder link when no backend is configured.
pub const NO_LINK: &str = "<no link available>";

/// Web backend failures.
#[derive(Debug, Error)]
pub enum WebError {
    /// The stub backend is configured; there is nowhere to store files.
    #[error("web backend disabled")]
    Disabled,

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

enum Mode {
    External {
        webpath: PathBuf,
        baseurl: String,
        use_subdirs: bool,
    },
    Stub,
}

/// The file-serving backend.
pub struct WebBackend {
    mode: Mode,
    http: reqwest::Client,
}

impl WebBackend {
    /// Create a backend from configuration.
    pub fn new(config: WebBackendConfig) -> Self {
        let mode = match config {
            WebBackendConfig::External {
                webpath,
                baseurl,
                use_subdirs,
            } => Mode::External {
                webpath,
                baseurl: baseurl.trim_end_matches('/').to_string(),
                use_subdirs,
            },
            WebBackendConfig::Stub => {
                warn!("web backend not functional (stub), media links will be placeholders");
                Mode::Stub
            }
        };
        Self {
            mode,
            http: reqwest::Client::new(),
        }
    }

    /// Download `url` into the web root and return the public URL.
    pub async fn store(&self, url: &str, extension: Option<&str>) -> Result<String, WebError> {
        let Mode::External {
            webpath,
            baseurl,
            use_subdirs,
        } = &self.mode
        else {
            return Err(WebError::Disabled);
        };

        let name = file_name(url, extension);
        let relative = if *use_subdirs {
            let subdir = subdir_for(&name);
            tokio::fs::create_dir_all(webpath.join(subdir.to_string())).await?;
            format!("{subdir}/{name}")
        } else {
            name
        };

        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(webpath.join(&relative), &bytes).await?;
        debug!(file = %relative, bytes = bytes.len(), "stored media file");

        Ok(format!("{baseurl}/{relative}"))
    }
}

/// Derive the stored file name from the source URL, appending the preferred
/// extension when the name has none.
fn file_name(url: &str, extension: Option<&str>) -> String {
    let last = url
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .split('?')
        .next()
        .unwrap_or_default();
    let base = if last.is_empty() { "file" } else { last };
    match extension {
        Some(ext) if !base.contains('.') => format!("{base}.{ext}"),
        _ => base.to_string(),
    }
}

/// Single-letter subdirectory bucket, stable per file name.
fn subdir_for(name: &str) -> char {
    let mut v: u16 = 0;
    for c in name.chars() {
        v = v.wrapping_add(c as u16).rotate_left(1);
    }
    (b'a' + (v % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name("https://host/file/photos/file_42.jpg", None),
            "file_42.jpg"
        );
        assert_eq!(file_name("https://host/path/doc", Some("pdf")), "doc.pdf");
        // Existing extension wins.
        assert_eq!(file_name("https://host/a.webm", Some("mp4")), "a.webm");
        // Query strings are not part of the name.
        assert_eq!(file_name("https://host/x.png?token=1", None), "x.png");
    }

    #[test]
    fn test_subdir_is_stable_and_lowercase() {
        let a = subdir_for("file_42.jpg");
        let b = subdir_for("file_42.jpg");
        assert_eq!(a, b);
        assert!(a.is_ascii_lowercase());
        // Different names generally land in different buckets.
        assert!(subdir_for("aaaa").is_ascii_lowercase());
    }

    #[tokio::test]
    async fn test_stub_store_is_disabled() {
        let backend = WebBackend::new(WebBackendConfig::Stub);
        let result = backend.store("https://host/x.png", None).await;
        assert!(matches!(result, Err(WebError::Disabled)));
    }

    #[tokio::test]
    async fn test_external_creates_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = WebBackend::new(WebBackendConfig::External {
            webpath: dir.path().to_path_buf(),
            baseurl: "https://example.net/media/".to_string(),
            use_subdirs: true,
        });
        // The download itself fails (no server), but the bucket directory
        // must exist afterwards.
        let result = backend.store("http://127.0.0.1:9/x.png", None).await;
        assert!(result.is_err());
        let bucket = subdir_for("x.png");
        assert!(dir.path().join(bucket.to_string()).is_dir());
    }
}
