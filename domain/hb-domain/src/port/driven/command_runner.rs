//! コマンド実行ポート（ヘルパー側）

use crate::model::{CommandRequest, CommandResult};
use thiserror::Error;

/// サブプロセス実行の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandRunError {
    /// プロセスを起動できなかった
    #[error("launch failed: {0}")]
    Launch(String),
    /// 起動後の待機や出力読み取りに失敗
    #[error("internal error: {0}")]
    Internal(String),
}

/// stdin を閉じてコマンドを実行し、終了まで待つ
pub trait CommandRunner: Send + Sync {
    fn run(&self, request: &CommandRequest) -> Result<CommandResult, CommandRunError>;
}
