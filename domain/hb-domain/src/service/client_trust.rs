//! クライアント信頼判定サービス（純粋関数）
//!
//! ヘルパーが接続元を受け入れるかどうかを、設定済みのルールと
//! 収集済みの証拠だけから判定する。設定されたルールはすべて満たす必要がある。

use crate::model::{ClientEvidence, ClientTrustRules, SignatureStatus};
use std::fmt;

/// 拒否理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRejection {
    NoRulesConfigured,
    UidNotAllowed(u32),
    ExecutableUnknown,
    ExecutableNotAllowed(String),
    HashUnavailable,
    HashMismatch,
    SignatureUnavailable,
    SignatureRejected(String),
}

impl fmt::Display for ClientRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRulesConfigured => f.write_str("no client trust rules configured"),
            Self::UidNotAllowed(uid) => write!(f, "uid {uid} not allowed"),
            Self::ExecutableUnknown => f.write_str("client executable could not be resolved"),
            Self::ExecutableNotAllowed(path) => write!(f, "client executable not allowed: {path}"),
            Self::HashUnavailable => f.write_str("client executable hash unavailable"),
            Self::HashMismatch => f.write_str("client executable hash mismatch"),
            Self::SignatureUnavailable => f.write_str("code requirement cannot be checked"),
            Self::SignatureRejected(reason) => write!(f, "code requirement not satisfied: {reason}"),
        }
    }
}

/// 接続元を評価する。ルール未設定は拒否（fail-closed）。
pub fn evaluate_client(
    rules: &ClientTrustRules,
    evidence: &ClientEvidence,
) -> Result<(), ClientRejection> {
    if rules.is_empty() {
        return Err(ClientRejection::NoRulesConfigured);
    }

    if !rules.allowed_uids.is_empty() && !rules.allowed_uids.contains(&evidence.peer.uid) {
        return Err(ClientRejection::UidNotAllowed(evidence.peer.uid));
    }

    if !rules.allowed_executables.is_empty() {
        let Some(exe) = evidence.peer.executable.as_deref() else {
            return Err(ClientRejection::ExecutableUnknown);
        };
        if !rules.allowed_executables.iter().any(|allowed| allowed == exe) {
            return Err(ClientRejection::ExecutableNotAllowed(exe.to_string()));
        }
    }

    if let Some(expected) = rules.executable_sha256.as_deref() {
        let Some(actual) = evidence.executable_sha256.as_deref() else {
            return Err(ClientRejection::HashUnavailable);
        };
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ClientRejection::HashMismatch);
        }
    }

    if rules.code_requirement.is_some() {
        match &evidence.signature {
            Some(SignatureStatus::Satisfied) => {}
            Some(SignatureStatus::NotSatisfied { reason }) => {
                return Err(ClientRejection::SignatureRejected(reason.clone()));
            }
            Some(SignatureStatus::Unsigned) => {
                return Err(ClientRejection::SignatureRejected("unsigned".into()));
            }
            Some(SignatureStatus::Error { message }) => {
                return Err(ClientRejection::SignatureRejected(message.clone()));
            }
            Some(SignatureStatus::Unsupported { .. }) | None => {
                return Err(ClientRejection::SignatureUnavailable);
            }
        }
    }

    Ok(())
}
