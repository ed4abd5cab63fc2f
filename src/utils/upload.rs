// src/utils/upload.rs

use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use rand::Rng;

/// Public URL prefix under which stored files are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

pub const PDF_MIME: &str = "application/pdf";

/// A file written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
}

/// Local directory holding uploaded PDFs.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Writes the bytes under a fresh unique name derived from `original_name`.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<StoredFile> {
        self.ensure_dir().await?;
        let file_name = generate_file_name(original_name);
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;
        Ok(StoredFile {
            url: format!("{}/{}", UPLOADS_URL_PREFIX, file_name),
            file_name,
        })
    }

    /// Best-effort removal of a stored file given its public URL.
    /// Failures are logged, never returned.
    pub async fn remove_by_url(&self, url: &str) {
        let Some(path) = url
            .strip_prefix(UPLOADS_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|name| self.resolve(name))
        else {
            tracing::warn!("Refusing to remove file outside uploads: {}", url);
            return;
        };

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove uploaded file {:?}: {}", path, e);
        }
    }

    /// Path of a stored file, or `None` if the name could escape the directory.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        is_safe_file_name(file_name).then(|| self.dir.join(file_name))
    }
}

/// A bare file name: no separators, no parent references.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

pub fn is_pdf(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(PDF_MIME))
}

/// `<unix-millis>-<random 0..1e9>-<sanitized base name>`
pub fn generate_file_name(original_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}-{}", millis, suffix, sanitize_file_name(original_name))
}

/// Keeps only the base name of a client-supplied path and replaces anything
/// outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_base_name_is_kept() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(r"C:\Users\eleve\cours.pdf"), "cours.pdf");
        assert_eq!(sanitize_file_name("Chapitre 1 (v2).pdf"), "Chapitre_1__v2_.pdf");
        assert_eq!(sanitize_file_name(".."), "document.pdf");
        assert_eq!(sanitize_file_name(""), "document.pdf");
    }

    #[test]
    fn generated_names_follow_the_pattern() {
        let name = generate_file_name("algèbre.pdf");
        let mut parts = name.splitn(3, '-');
        assert!(parts.next().unwrap().parse::<i64>().is_ok());
        assert!(parts.next().unwrap().parse::<u32>().unwrap() < 1_000_000_000);
        assert_eq!(parts.next().unwrap(), "alg_bre.pdf");
        assert!(is_safe_file_name(&name));
    }

    #[test]
    fn traversal_names_are_unsafe() {
        for bad in ["", "a/b.pdf", r"a\b.pdf", "..", "..pdf", "x/../y"] {
            assert!(!is_safe_file_name(bad), "{bad}");
        }
        assert!(is_safe_file_name("1700000000000-42-cours.pdf"));
    }

    #[test]
    fn pdf_mime_check() {
        assert!(is_pdf(Some("application/pdf")));
        assert!(is_pdf(Some("Application/PDF; charset=binary")));
        assert!(!is_pdf(Some("image/png")));
        assert!(!is_pdf(None));
    }

    #[tokio::test]
    async fn save_resolve_and_remove() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", uuid::Uuid::new_v4()));
        let files = FileStore::new(&dir, 1024);

        let stored = files.save("notes.pdf", b"%PDF-1.4").await.unwrap();
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.file_name.ends_with("-notes.pdf"));

        let path = files.resolve(&stored.file_name).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");

        files.remove_by_url(&stored.url).await;
        assert!(!path.exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
