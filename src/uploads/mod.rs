//! Storage of feedback images on the local filesystem.
//!
//! Files live flat in the configured upload directory and are referenced from
//! the database by filename only.

use std::path::Path;

/// Image extensions accepted on feedback submission.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Whether `filename` carries an accepted image extension.
pub fn allowed_image(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce a client-supplied name to `[A-Za-z0-9._-]`, without leading dots or path parts.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
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
    cleaned.trim_start_matches('.').to_string()
}

/// Filename under which an uploaded image is stored.
pub fn stored_name(user_id: &str, timestamp_millis: i64, index: usize, original: &str) -> String {
    format!(
        "{}_{}_{}_{}",
        sanitize_filename(user_id),
        timestamp_millis,
        index,
        sanitize_filename(original)
    )
}

/// Write one image into `dir`, creating the directory on first use.
pub async fn save_image(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(name), bytes).await
}

/// Remove stored images. Failures are logged and otherwise ignored.
pub async fn remove_images(dir: &Path, names: &[String]) {
    for name in names {
        let safe = sanitize_filename(name);
        if safe.is_empty() {
            continue;
        }
        match tokio::fs::remove_file(dir.join(&safe)).await {
            Ok(()) => tracing::debug!(file = %safe, "Removed image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %safe, "Image already gone")
            }
            Err(e) => tracing::warn!(file = %safe, error = %e, "Failed to remove image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allowed_image() {
        assert!(allowed_image("shot.PNG"));
        assert!(allowed_image("a.b.webp"));
        assert!(!allowed_image("notes.txt"));
        assert!(!allowed_image("png"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("C:\\tmp\\x.gif"), "x.gif");
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
    }

    #[test]
    fn test_stored_name() {
        assert_eq!(stored_name("u/1", 1700, 0, "a b.png"), "u_1_1700_0_a_b.png");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("uploads");

        save_image(&dir, "one.png", b"data").await.unwrap();
        assert!(dir.join("one.png").exists());

        remove_images(&dir, &["one.png".to_string(), "missing.png".to_string()]).await;
        assert!(!dir.join("one.png").exists());
    }
}
