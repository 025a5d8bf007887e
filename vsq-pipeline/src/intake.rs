//! Image intake
//!
//! An [`UploadedImage`] is the binary payload handed to the recognition
//! services. It is replaced wholesale on every upload and never mutated.
//! Images come either from a user-selected file or from the example
//! gallery; gallery images are repackaged as `car.jpg` / `image/jpeg`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Fallback content type when sniffing fails
const OCTET_STREAM: &str = "application/octet-stream";

/// Name and type given to gallery images
const GALLERY_FILE_NAME: &str = "car.jpg";
const GALLERY_CONTENT_TYPE: &str = "image/jpeg";

/// Extensions picked up when listing the gallery directory
const GALLERY_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Intake errors
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Example image {index} does not exist (gallery has {len})")]
    NoSuchExample { index: usize, len: usize },
}

/// Displayable preview of an uploaded image (a `data:` URI)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Single binary image submitted for recognition
#[derive(Debug, Clone)]
pub struct UploadedImage {
    bytes: Arc<Vec<u8>>,
    file_name: String,
    content_type: String,
}

impl UploadedImage {
    /// Wrap raw bytes, sniffing the content type from magic bytes
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string());
        Self::with_content_type(file_name, bytes, content_type)
    }

    pub fn with_content_type(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: Arc::new(bytes),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    /// Read an image chosen by the user
    pub async fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let bytes = read_file(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| GALLERY_FILE_NAME.to_string());

        let image = Self::from_bytes(file_name, bytes);
        info!(
            file_name = image.file_name(),
            content_type = image.content_type(),
            size_bytes = image.len(),
            "Image accepted"
        );
        Ok(image)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Build a `data:` URI preview for display
    pub fn preview(&self) -> PreviewHandle {
        PreviewHandle(format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(self.bytes.as_slice())
        ))
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, IntakeError> {
    tokio::fs::read(path).await.map_err(|source| IntakeError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Fixed set of bundled example images
#[derive(Debug, Clone, Default)]
pub struct ExampleGallery {
    images: Vec<PathBuf>,
}

impl ExampleGallery {
    /// List the image files in `dir`, sorted by name
    pub fn open(dir: &Path) -> Result<Self, IntakeError> {
        let io_err = |source| IntakeError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && has_image_extension(&path) {
                images.push(path);
            }
        }
        images.sort();

        debug!(dir = %dir.display(), count = images.len(), "Opened example gallery");
        Ok(Self { images })
    }

    pub fn from_paths(images: Vec<PathBuf>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.images
    }

    /// Load example `index` as a file-like upload
    pub async fn load(&self, index: usize) -> Result<UploadedImage, IntakeError> {
        let path = self.images.get(index).ok_or(IntakeError::NoSuchExample {
            index,
            len: self.images.len(),
        })?;

        let bytes = read_file(path).await?;
        info!(example = index, path = %path.display(), "Example image selected");
        Ok(UploadedImage::with_content_type(
            GALLERY_FILE_NAME,
            bytes,
            GALLERY_CONTENT_TYPE,
        ))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            GALLERY_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
