//! Upload and reference-image persistence under the media root.
//!
//! Layout: `<media_root>/uploads` holds request files kept for audit,
//! `<media_root>/faces` holds named reference images whose filename
//! prefix (up to the first underscore) is the person's name.

use std::path::{Path, PathBuf};

use uuid::Uuid;

#[derive(Clone)]
pub struct MediaStore {
    media_root: PathBuf,
}

impl MediaStore {
    pub fn new(media_root: PathBuf) -> Self {
        Self { media_root }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.faces_dir())?;
        std::fs::create_dir_all(self.uploads_dir())
    }

    pub fn faces_dir(&self) -> PathBuf {
        self.media_root.join("faces")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.media_root.join("uploads")
    }

    /// Persist an uploaded file. A short random prefix keeps concurrent
    /// uploads with the same name from clobbering each other.
    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self
            .uploads_dir()
            .join(format!("{}_{}", short_id(), sanitize_filename(filename)));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Persist a reference face image as `<name>_<filename>`. The part
    /// before the first underscore is what the gallery loader reads
    /// back as the person's name.
    pub fn save_face(&self, name: &str, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self
            .faces_dir()
            .join(format!("{name}_{}", sanitize_filename(filename)));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Trimmed person name, or `None` if it is empty or could escape the
/// faces directory.
pub fn validate_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return None;
    }
    Some(name.to_string())
}

/// Basename of a client-supplied filename, separators stripped.
fn sanitize_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .replace(['/', '\\'], "_")
}

fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Alice "), Some("Alice".to_string()));
        assert_eq!(validate_name(""), None);
        assert_eq!(validate_name("   "), None);
        assert_eq!(validate_name("a/b"), None);
        assert_eq!(validate_name("..secret"), None);
    }

    #[test]
    fn test_save_face_uses_name_prefix() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());
        store.ensure_dirs().unwrap();

        let path = store.save_face("alice", "photo.jpg", b"bytes").unwrap();
        assert_eq!(path.file_name().unwrap(), "alice_photo.jpg");
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
    }

    #[test]
    fn test_save_upload_is_unique_per_call() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());
        store.ensure_dirs().unwrap();

        let a = store.save_upload("frame.png", b"a").unwrap();
        let b = store.save_upload("frame.png", b"b").unwrap();
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with("frame.png"));
    }
}
