//! アプリとヘルパー間の IPC アダプタ。
//!
//! Unix ドメインソケット上で、4バイト長（ビッグエンディアン）＋JSON の
//! メッセージプロトコルを定義し、クライアント/サーバー実装を提供する。

mod client;
mod framing;
mod hash;
mod peer;
mod server;

pub use client::{ServiceIpcClient, ServiceIpcConnector};
pub use framing::{read_frame, write_frame};
pub use hash::executable_sha256_cached;
pub use hb_domain::error::ServiceErrorCode;
pub use peer::peer_identity;
pub use server::{BoundServer, ClientContext, ServiceIpcServer, poke_server};

use hb_domain::DomainError;
use hb_domain::error::ConnectionFailure;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// IPC 層のエラー
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("timeout waiting for {0}")]
    Timeout(&'static str),
    #[error("peer disconnected")]
    Disconnected,
    #[error("message too large ({0} bytes)")]
    MessageTooLarge(usize),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IpcError {
    /// 呼び出し側に渡す接続レベルの失敗へ変換
    pub fn into_domain(self) -> DomainError {
        let failure = match &self {
            Self::Unavailable(_) => ConnectionFailure::Unreachable,
            Self::Timeout(_) => ConnectionFailure::Timeout,
            Self::Disconnected => ConnectionFailure::Disconnected,
            Self::MessageTooLarge(_) | Self::Protocol(_) => ConnectionFailure::Protocol,
            Self::Io(_) => ConnectionFailure::Disconnected,
        };
        DomainError::connection(failure, self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub protocol_version: u32,
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub protocol_version: u32,
    pub exit_status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub protocol_version: u32,
    #[serde(with = "service_error_code_serde")]
    pub error_code: ServiceErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_code: ServiceErrorCode, detail: Option<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            error_code,
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceRequest {
    Execute(ExecuteRequest),
}

impl ServiceRequest {
    pub fn protocol_version(&self) -> u32 {
        match self {
            Self::Execute(req) => req.protocol_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceResponse {
    Execute(ExecuteResponse),
    Error(ErrorResponse),
}

impl ServiceResponse {
    pub fn error(code: ServiceErrorCode, detail: Option<String>) -> Self {
        Self::Error(ErrorResponse::new(code, detail))
    }

    /// ログ用の短い名前
    pub fn label(&self) -> &'static str {
        match self {
            Self::Execute(_) => "execute",
            Self::Error(err) => err.error_code.as_str(),
        }
    }
}

mod service_error_code_serde {
    use super::ServiceErrorCode;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &ServiceErrorCode, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ServiceErrorCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CodeVisitor;

        impl<'de> Visitor<'de> for CodeVisitor {
            type Value = ServiceErrorCode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("service error code")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                ServiceErrorCode::from_str(v)
                    .ok_or_else(|| de::Error::custom(format!("unknown ServiceErrorCode: {v}")))
            }
        }

        deserializer.deserialize_str(CodeVisitor)
    }
}

pub fn encode_request(request: &ServiceRequest) -> Result<Vec<u8>, IpcError> {
    encode(request, "request")
}

pub fn decode_request(data: &[u8]) -> Result<ServiceRequest, IpcError> {
    decode(data, "request")
}

pub fn encode_response(response: &ServiceResponse) -> Result<Vec<u8>, IpcError> {
    encode(response, "response")
}

pub fn decode_response(data: &[u8]) -> Result<ServiceResponse, IpcError> {
    decode(data, "response")
}

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, IpcError> {
    let data = serde_json::to_vec(value)
        .map_err(|e| IpcError::Protocol(format!("serialize {what} failed: {e}")))?;
    if data.len() > MAX_MESSAGE_BYTES {
        return Err(IpcError::MessageTooLarge(data.len()));
    }
    Ok(data)
}

fn decode<T: for<'de> Deserialize<'de>>(data: &[u8], what: &str) -> Result<T, IpcError> {
    if data.len() > MAX_MESSAGE_BYTES {
        return Err(IpcError::MessageTooLarge(data.len()));
    }
    serde_json::from_slice(data).map_err(|e| IpcError::Protocol(format!("parse {what} failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = ServiceRequest::Execute(ExecuteRequest {
            protocol_version: PROTOCOL_VERSION,
            command: "/bin/echo".into(),
            arguments: vec!["hello".into()],
        });
        let json: serde_json::Value =
            serde_json::from_slice(&encode_request(&request).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "execute",
                "protocol_version": 1,
                "command": "/bin/echo",
                "arguments": ["hello"],
            })
        );
    }

    #[test]
    fn response_omits_empty_streams() {
        let response = ServiceResponse::Execute(ExecuteResponse {
            protocol_version: PROTOCOL_VERSION,
            exit_status: 0,
            standard_output: Some("hello\n".into()),
            standard_error: None,
        });
        let text = String::from_utf8(encode_response(&response).unwrap()).unwrap();
        assert!(text.contains("\"kind\":\"execute\""));
        assert!(!text.contains("standard_error"));
    }

    #[test]
    fn error_response_uses_code_names() {
        let decoded = decode_response(
            br#"{"kind":"error","protocol_version":1,"error_code":"ClientNotTrusted"}"#,
        )
        .unwrap();
        assert_eq!(
            decoded,
            ServiceResponse::error(ServiceErrorCode::ClientNotTrusted, None)
        );
        assert!(decode_response(br#"{"kind":"error","protocol_version":1,"error_code":"Nope"}"#)
            .is_err());
    }

    #[test]
    fn arguments_default_to_empty() {
        let decoded =
            decode_request(br#"{"kind":"execute","protocol_version":1,"command":"/usr/bin/id"}"#)
                .unwrap();
        let ServiceRequest::Execute(req) = decoded;
        assert!(req.arguments.is_empty());
    }

    #[test]
    fn ipc_errors_map_to_connection_failures() {
        let err = IpcError::Unavailable("no socket".into()).into_domain();
        assert!(matches!(
            err,
            DomainError::Connection {
                failure: ConnectionFailure::Unreachable,
                ..
            }
        ));
        let err = IpcError::Timeout("response").into_domain();
        assert!(matches!(
            err,
            DomainError::Connection {
                failure: ConnectionFailure::Timeout,
                ..
            }
        ));
    }
}
