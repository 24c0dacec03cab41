use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WzipError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{path}: {source}")]
    Input {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Thread error: {0}")]
    Thread(String),
}

impl WzipError {
    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        WzipError::InvalidArgument(msg.to_string())
    }

    pub fn input<T: fmt::Display>(path: T, source: io::Error) -> Self {
        WzipError::Input {
            path: path.to_string(),
            source,
        }
    }

    pub fn thread<T: fmt::Display>(msg: T) -> Self {
        WzipError::Thread(msg.to_string())
    }
}

pub type WzipResult<T> = Result<T, WzipError>;
