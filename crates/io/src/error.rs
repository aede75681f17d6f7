use std::path::PathBuf;
use thiserror::Error;

pub type IoResult<T> = Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A text line that could not be read as a point or STL record.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid STL header: expected {expected} bytes, got {got}")]
    InvalidHeader { expected: usize, got: usize },

    #[error("invalid face count: expected {expected}, got {got}")]
    InvalidFaceCount { expected: u32, got: u32 },

    #[error("invalid file content: {message}")]
    InvalidContent { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Maps `NotFound` to [`IoError::FileNotFound`] so callers see the path.
    pub(crate) fn open(path: &std::path::Path, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IoError::Io(e)
        }
    }
}
