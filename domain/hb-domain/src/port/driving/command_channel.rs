//! コマンド実行用ユースケースポート

use crate::error::DomainError;
use crate::model::{CommandOutcome, CommandRequest};

/// 完了コールバック（ちょうど1回呼ばれる）
pub type CompletionCallback = Box<dyn FnOnce(CommandOutcome) + Send + 'static>;

/// ヘルパーへのコマンド実行要求
pub trait CommandChannel: Send + Sync {
    /// コマンドラインを分割して非同期実行する。
    /// 空行はコネクタを呼ばずに Validation を返す。
    fn execute(&self, command_line: &str, on_complete: CompletionCallback)
    -> Result<(), DomainError>;

    /// 構築済みの要求を非同期実行する
    fn execute_request(&self, request: CommandRequest, on_complete: CompletionCallback);
}
