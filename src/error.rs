//! Error type for the boundary-facing parts of the crate (file I/O, codecs,
//! session scripts, the background-removal seam).
//!
//! Pixel operations never return this: they are silent no-ops on degenerate
//! input and report through `bool` / `Option` instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid session script: {0}")]
    Session(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("background removal failed: {0}")]
    BackgroundRemoval(String),
}

impl From<toml::de::Error> for EditorError {
    fn from(e: toml::de::Error) -> Self {
        EditorError::Session(e.to_string())
    }
}
