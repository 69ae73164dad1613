use thiserror::Error;

/// Errors that can occur while converting a depth image to a mesh.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported depth image shape {0:?}, expected 2 or 3 axes")]
    UnsupportedShape(Vec<usize>),

    #[error("Unsupported channel index {channel}, image has {available} channel(s)")]
    UnsupportedChannel { channel: usize, available: usize },

    #[error("Shape expects {expected} samples but {actual} were given")]
    SampleCount { expected: usize, actual: usize },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
