//! Error types for the solaris demo
//!
//! Every fallible load in the backend reports through [`SolarisError`]. Nothing
//! in the demo recovers from these: the binary turns them into a fatal exit.

use std::path::PathBuf;

/// Errors raised while creating the window, the GPU context, or loading assets
#[derive(Debug, thiserror::Error)]
pub enum SolarisError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("audio error: {0}")]
    Audio(String),

    #[error("unsupported model format '{extension}' ({path})")]
    UnsupportedModel { path: PathBuf, extension: String },

    #[error("failed to decode model {path}: {reason}")]
    ModelDecode { path: PathBuf, reason: String },

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("invalid render target size {width}x{height}")]
    RenderTarget { width: u32, height: u32 },

    #[error("window creation failed: {0}")]
    Window(String),

    #[error("GPU initialization failed: {0}")]
    Gpu(String),
}

impl SolarisError {
    /// Wraps an I/O error together with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SolarisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = SolarisError::io(
            "sresources/graphics/mainmenu.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let message = err.to_string();
        assert!(message.contains("sresources/graphics/mainmenu.jpg"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_unsupported_model_message() {
        let err = SolarisError::UnsupportedModel {
            path: PathBuf::from("/tmp/out.fbx"),
            extension: ".fbx".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported model format '.fbx' (/tmp/out.fbx)"
        );
    }
}
