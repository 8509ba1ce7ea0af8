use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AppError, AppResult};

/// Stores uploaded avatar images on the local filesystem under the data
/// directory. Files are written and removed outside any database
/// transaction; callers treat failures here as best-effort.
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub async fn new(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the upload under a timestamped name, keeping the original
    /// file's extension. Returns the generated filename.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> AppResult<String> {
        let ext = Path::new(original_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let filename = format!("avatar-{}{}", chrono::Utc::now().timestamp_millis(), ext);

        fs::write(self.dir.join(&filename), data).await?;
        tracing::info!(filename = %filename, bytes = data.len(), "stored avatar");
        Ok(filename)
    }

    pub async fn delete(&self, filename: &str) -> AppResult<()> {
        // The filename comes from the URL path; keep it inside the store.
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return Err(AppError::Validation(format!(
                "invalid avatar filename: {filename:?}"
            )));
        }

        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                format!("Avatar {filename} not found"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
