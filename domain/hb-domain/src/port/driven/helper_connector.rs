//! ヘルパー接続ポート

use crate::error::DomainError;
use crate::model::{CommandRequest, CommandResult, HelperIdentity};

/// 稼働中ヘルパーへの1回分の呼び出し。
///
/// 呼び出しごとに新しい接続を開く（プールしない）。
/// 失敗は DomainError::Connection で返す。
pub trait HelperConnector: Send + Sync {
    fn execute(
        &self,
        identity: &HelperIdentity,
        request: &CommandRequest,
    ) -> Result<CommandResult, DomainError>;
}
