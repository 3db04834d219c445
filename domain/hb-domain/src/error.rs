//! ドメインエラー型

use std::fmt;
use thiserror::Error;

/// OS が失敗理由を返さなかった場合の固定文言
pub const UNKNOWN_ERROR_REASON: &str = "Unknown error";

/// ヘルパーと共有するIPCサービスのエラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorCode {
    ProtocolVersionMismatch,
    MessageTooLarge,
    ClientNotTrusted,
    InvalidCommand,
    LaunchFailed,
    Busy,
    InternalError,
}

impl ServiceErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolVersionMismatch => "ProtocolVersionMismatch",
            Self::MessageTooLarge => "MessageTooLarge",
            Self::ClientNotTrusted => "ClientNotTrusted",
            Self::InvalidCommand => "InvalidCommand",
            Self::LaunchFailed => "LaunchFailed",
            Self::Busy => "Busy",
            Self::InternalError => "InternalError",
        }
    }

    pub fn from_str(code: &str) -> Option<Self> {
        match code {
            "ProtocolVersionMismatch" => Some(Self::ProtocolVersionMismatch),
            "MessageTooLarge" => Some(Self::MessageTooLarge),
            "ClientNotTrusted" => Some(Self::ClientNotTrusted),
            "InvalidCommand" => Some(Self::InvalidCommand),
            "LaunchFailed" => Some(Self::LaunchFailed),
            "Busy" => Some(Self::Busy),
            "InternalError" => Some(Self::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 接続レベルの失敗種別（成功コールバックとは排他）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// ヘルパーが起動していない／ソケットに到達できない
    Unreachable,
    /// ヘルパー側の信頼チェックで拒否された
    NotTrusted,
    /// ヘルパーがエラー応答を返した
    Rejected(ServiceErrorCode),
    /// 応答待ちのタイムアウト
    Timeout,
    /// 応答前に切断された（ヘルパーのクラッシュ等）
    Disconnected,
    /// 応答が解釈できない
    Protocol,
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => f.write_str("unreachable"),
            Self::NotTrusted => f.write_str("not trusted"),
            Self::Rejected(code) => write!(f, "rejected: {code}"),
            Self::Timeout => f.write_str("timeout"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Protocol => f.write_str("protocol"),
        }
    }
}

/// バリデーション対象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationField {
    Label,
    Bundle,
    Command,
}

impl ValidationField {
    /// ダイアログのタイトル
    pub fn title(&self) -> &'static str {
        match self {
            Self::Label => "Invalid Label",
            Self::Bundle => "Invalid Bundle",
            Self::Command => "Invalid Command",
        }
    }
}

/// ドメイン層のエラー型
/// 各バリアントは特定の失敗シナリオを表現
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 識別子やコマンドラインの不正（OS呼び出し前に検出）
    #[error("{}: {message}", .field.title())]
    Validation {
        field: ValidationField,
        message: String,
    },

    /// 認可ハンドルを取得できない
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// ヘルパーの登録（bless）失敗
    #[error("Cannot bless job: {reason}")]
    Install { reason: String },

    /// ヘルパーの削除失敗
    #[error("Cannot remove job: {reason}")]
    Remove { reason: String },

    /// ヘルパーへの接続レベルの失敗
    #[error("Connection error ({failure}): {detail}")]
    Connection {
        failure: ConnectionFailure,
        detail: String,
    },

    /// このプラットフォームでは未対応
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// 設定値が無効
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// ファイルI/Oエラー
    #[error("IO error: {0}")]
    Io(String),
}

impl DomainError {
    pub fn validation(field: ValidationField, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn connection(failure: ConnectionFailure, detail: impl Into<String>) -> Self {
        Self::Connection {
            failure,
            detail: detail.into(),
        }
    }

    /// OS の失敗理由が無い場合は "Unknown error" を使う
    pub fn install_failed(reason: Option<String>) -> Self {
        Self::Install {
            reason: reason_or_unknown(reason),
        }
    }

    pub fn remove_failed(reason: Option<String>) -> Self {
        Self::Remove {
            reason: reason_or_unknown(reason),
        }
    }

    /// 表示用タイトル（ダイアログ相当）
    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation { field, .. } => field.title(),
            Self::Authorization(_) => "Unauthorized",
            Self::Install { .. } => "Cannot bless job",
            Self::Remove { .. } => "Cannot remove job",
            Self::Connection { .. } => "Connection error",
            Self::Unsupported(_) => "Not supported",
            Self::Config(_) => "Invalid configuration",
            Self::Io(_) => "IO error",
        }
    }

    /// 表示用メッセージ（タイトルを除いた本文）
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Authorization(msg) => msg.clone(),
            Self::Install { reason } | Self::Remove { reason } => reason.clone(),
            Self::Connection { failure, detail } => format!("{detail} ({failure})"),
            Self::Unsupported(msg) | Self::Config(msg) | Self::Io(msg) => msg.clone(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

fn reason_or_unknown(reason: Option<String>) -> String {
    match reason {
        Some(reason) if !reason.trim().is_empty() => reason,
        _ => UNKNOWN_ERROR_REASON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_failed_without_reason_uses_unknown_sentinel() {
        let err = DomainError::install_failed(None);
        assert_eq!(err.to_string(), "Cannot bless job: Unknown error");
        let err = DomainError::remove_failed(Some("  ".into()));
        assert_eq!(err.to_string(), "Cannot remove job: Unknown error");
    }

    #[test]
    fn install_failed_keeps_os_reason() {
        let err = DomainError::install_failed(Some("The operation couldn't be completed.".into()));
        assert_eq!(err.title(), "Cannot bless job");
        assert_eq!(err.message(), "The operation couldn't be completed.");
    }

    #[test]
    fn validation_display_uses_field_title() {
        let err = DomainError::validation(ValidationField::Label, "Label cannot be empty.");
        assert_eq!(err.to_string(), "Invalid Label: Label cannot be empty.");
        assert!(err.is_validation());
        assert!(!err.is_connection());
    }

    #[test]
    fn service_error_code_round_trips_names() {
        for code in [
            ServiceErrorCode::ProtocolVersionMismatch,
            ServiceErrorCode::MessageTooLarge,
            ServiceErrorCode::ClientNotTrusted,
            ServiceErrorCode::InvalidCommand,
            ServiceErrorCode::LaunchFailed,
            ServiceErrorCode::Busy,
            ServiceErrorCode::InternalError,
        ] {
            assert_eq!(ServiceErrorCode::from_str(code.as_str()), Some(code));
        }
        assert_eq!(ServiceErrorCode::from_str("Nope"), None);
    }
}
