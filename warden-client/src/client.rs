//! One-shot request/response client over the control socket.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use warden_core::types::{Change, ChangeId, Check, Notice, NoticeId};

use crate::error::{io_err, ClientError};
use crate::protocol::{ControlRequest, ControlResponse};

/// Fixed default control endpoint.
pub const DEFAULT_SOCKET: &str = "/tmp/warden/warden.socket";

/// Environment override for the control endpoint path.
pub const SOCKET_ENV: &str = "WARDEN_SOCKET";

/// Blocking control-socket client. Opens one connection per query.
#[derive(Debug, Clone)]
pub struct Client {
    socket: PathBuf,
}

impl Client {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Resolve the socket path from `WARDEN_SOCKET`, falling back to the
    /// fixed default endpoint.
    pub fn from_env() -> Self {
        let socket = std::env::var_os(SOCKET_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET));
        Self::new(socket)
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Fetch one notice by id.
    pub fn get_notice(&self, id: &NoticeId) -> Result<Notice, ClientError> {
        let data = self.send(&ControlRequest::with_id("notice", id.0.clone()))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Fetch one change by id.
    pub fn get_change(&self, id: &ChangeId) -> Result<Change, ClientError> {
        let data = self.send(&ControlRequest::with_id("change", id.0.clone()))?;
        Ok(serde_json::from_value(data)?)
    }

    /// List every configured check.
    pub fn checks(&self) -> Result<Vec<Check>, ClientError> {
        let data = self.send(&ControlRequest::new("checks"))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Long-poll for notices repeated strictly after `after`, waiting up to
    /// `timeout` on the server side. Returns an empty batch on timeout.
    pub fn wait_notices(
        &self,
        after: Option<DateTime<Utc>>,
        timeout: Duration,
    ) -> Result<Vec<Notice>, ClientError> {
        let request = ControlRequest {
            after,
            timeout_ms: Some(timeout.as_millis() as u64),
            ..ControlRequest::new("notices")
        };
        let data = self.send(&request)?;
        Ok(serde_json::from_value(data)?)
    }

    /// Send one JSON request line and return the response payload.
    fn send(&self, request: &ControlRequest) -> Result<Value, ClientError> {
        let socket = &self.socket;
        if !socket.exists() {
            return Err(ClientError::ServerNotRunning {
                socket: socket.clone(),
            });
        }

        let mut stream = UnixStream::connect(socket).map_err(|err| {
            if matches!(
                err.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
            ) {
                ClientError::ServerNotRunning {
                    socket: socket.clone(),
                }
            } else {
                io_err(socket, err)
            }
        })?;

        let payload = serde_json::to_string(request)?;
        stream
            .write_all(payload.as_bytes())
            .map_err(|e| io_err(socket, e))?;
        stream.write_all(b"\n").map_err(|e| io_err(socket, e))?;
        stream.flush().map_err(|e| io_err(socket, e))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|e| io_err(socket, e))?;
        if read == 0 {
            return Err(ClientError::Protocol(
                "warden closed connection before responding".to_string(),
            ));
        }

        let response: ControlResponse = serde_json::from_str(line.trim_end())?;
        response_into_data(response)
    }
}

fn response_into_data(response: ControlResponse) -> Result<Value, ClientError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(ClientError::Protocol(
            response
                .error
                .unwrap_or_else(|| "unknown control error".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_response_yields_payload() {
        let data = response_into_data(ControlResponse::ok(json!({"id": "1"}))).unwrap();
        assert_eq!(data["id"], json!("1"));
    }

    #[test]
    fn error_response_becomes_protocol_error() {
        let err = response_into_data(ControlResponse::error("no such change")).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(msg) if msg == "no such change"));
    }

    #[test]
    fn missing_socket_maps_to_server_not_running() {
        let client = Client::new("/nonexistent/warden.socket");
        let err = client.checks().unwrap_err();
        assert!(matches!(err, ClientError::ServerNotRunning { .. }));
    }
}
