use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the noticer runtime.
#[derive(Debug, Error)]
pub enum NoticerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("control client error: {0}")]
    Client(#[from] warden_client::ClientError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("noticer runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> NoticerError {
    NoticerError::Io {
        path: path.into(),
        source,
    }
}
