use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not open file {path} for writing: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Exceeded max size of {limit}: {reached} reached, aborting")]
    TooMuchData { limit: u64, reached: u64 },

    #[error("Object key {key} is {length} bytes, limit is {max}")]
    KeyTooLong { key: String, length: usize, max: usize },

    #[error("Found {limit} or more existing copies, refusing to continue")]
    TooManyCopies { limit: usize },

    #[error("Invalid copy modifier: {0:?}")]
    InvalidModifier(String),
}

impl Error {
    /// True for failures caused by bad or missing configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
