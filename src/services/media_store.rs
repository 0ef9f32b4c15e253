use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PROFILE_PICTURE_DIR: &str = "profile_pictures";
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{}", INVALID_IMAGE_MESSAGE)]
    InvalidImage,
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// An image received with the signup form, held in memory until the rest of
/// the form validates.
#[derive(Debug, Clone)]
pub struct PictureUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl PictureUpload {
    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
    }

    pub fn validate(&self) -> Result<String, MediaError> {
        if self.data.is_empty() {
            return Err(MediaError::InvalidImage);
        }
        if let Some(content_type) = &self.content_type {
            if !content_type.starts_with("image/") {
                return Err(MediaError::InvalidImage);
            }
        }
        self.extension().ok_or(MediaError::InvalidImage)
    }
}

/// Stores uploaded blobs under a root directory served at `/media`.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the picture under a fresh name and returns its path relative to
    /// the media root.
    pub async fn save_profile_picture(&self, upload: &PictureUpload) -> Result<String, MediaError> {
        let extension = upload.validate()?;
        let dir = self.root.join(PROFILE_PICTURE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&file_name), &upload.data).await?;

        tracing::debug!("Stored profile picture {}", file_name);
        Ok(format!("{}/{}", PROFILE_PICTURE_DIR, file_name))
    }

    /// Removes a file written by `save_profile_picture` whose owner was
    /// never created. Failures are logged and otherwise ignored.
    pub async fn discard(&self, relative: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            tracing::warn!("Failed to remove orphaned upload {}: {}", relative, e);
        }
    }
}
