//! ヘルパー側のユースケース（接続元の信頼判定とコマンド実行）

use hb_domain::error::ServiceErrorCode;
use hb_domain::model::{ClientEvidence, ClientTrustRules, CommandRequest, CommandResult, PeerIdentity};
use hb_domain::port::driven::{CommandRunError, CommandRunner, SignatureVerifier};
use hb_domain::service::{ClientRejection, evaluate_client};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// 実行ファイルの SHA-256 を求める関数
pub type ExecutableHasher = dyn Fn(&Path) -> io::Result<String> + Send + Sync;

/// 接続ごとに証拠を集めて信頼ルールを評価する
pub struct ClientGate {
    rules: ClientTrustRules,
    verifier: Arc<dyn SignatureVerifier>,
    hasher: Arc<ExecutableHasher>,
}

impl ClientGate {
    pub fn new(
        rules: ClientTrustRules,
        verifier: Arc<dyn SignatureVerifier>,
        hasher: Arc<ExecutableHasher>,
    ) -> Self {
        if rules.is_empty() {
            tracing::warn!("no client trust rules configured; every client will be rejected");
        }
        Self {
            rules,
            verifier,
            hasher,
        }
    }

    pub fn rules(&self) -> &ClientTrustRules {
        &self.rules
    }

    /// 設定されたルールに必要な証拠だけを集める
    pub fn gather(&self, peer: &PeerIdentity) -> ClientEvidence {
        let signature = match (&self.rules.code_requirement, peer.pid) {
            (Some(requirement), Some(pid)) => Some(self.verifier.verify_process(pid, requirement)),
            _ => None,
        };
        let executable_sha256 = match (&self.rules.executable_sha256, &peer.executable) {
            (Some(_), Some(exe)) => match (self.hasher)(Path::new(exe)) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    tracing::debug!(exe, error = %err, "cannot hash client executable");
                    None
                }
            },
            _ => None,
        };
        ClientEvidence {
            peer: peer.clone(),
            signature,
            executable_sha256,
        }
    }

    pub fn check(&self, peer: &PeerIdentity) -> Result<(), ClientRejection> {
        let evidence = self.gather(peer);
        match evaluate_client(&self.rules, &evidence) {
            Ok(()) => {
                tracing::debug!(pid = ?peer.pid, uid = peer.uid, "client trusted");
                Ok(())
            }
            Err(rejection) => {
                tracing::warn!(
                    pid = ?peer.pid,
                    uid = peer.uid,
                    exe = ?peer.executable,
                    reason = %rejection,
                    "client rejected"
                );
                Err(rejection)
            }
        }
    }
}

/// エラー応答に載せる内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub code: ServiceErrorCode,
    pub detail: String,
}

impl ServiceFailure {
    fn new(code: ServiceErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// 受け取った (command, arguments) を検証して実行する
pub struct CommandService {
    runner: Arc<dyn CommandRunner>,
}

impl CommandService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn handle(
        &self,
        command: String,
        arguments: Vec<String>,
    ) -> Result<CommandResult, ServiceFailure> {
        let request = CommandRequest::new(command, arguments)
            .map_err(|e| ServiceFailure::new(ServiceErrorCode::InvalidCommand, e.message()))?;
        tracing::info!(
            command = request.command_path(),
            args = request.arguments().len(),
            "running command"
        );
        self.runner.run(&request).map_err(|err| match err {
            CommandRunError::Launch(detail) => {
                ServiceFailure::new(ServiceErrorCode::LaunchFailed, detail)
            }
            CommandRunError::Internal(detail) => {
                ServiceFailure::new(ServiceErrorCode::InternalError, detail)
            }
        })
    }
}
