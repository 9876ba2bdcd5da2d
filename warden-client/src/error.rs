//! Error surface for control-socket queries.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from one control-socket round trip.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("control protocol error: {0}")]
    Protocol(String),

    #[error("warden is not running (socket missing: {socket})")]
    ServerNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ClientError {
    ClientError::Io {
        path: path.into(),
        source,
    }
}
