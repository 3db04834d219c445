//! ドメインモデル
//!
//! 標準ライブラリのみ使用（外部依存なし）
//! 値オブジェクト、ジョブレコード、設定型を定義

mod command;   // コマンド要求／結果
mod config;    // フロントエンド設定
mod identity;  // ヘルパー識別子（ドメイン＋ラベル）
mod job;       // launchd ジョブレコード
mod peer;      // IPC接続元の情報と信頼ルール

pub use command::*;
pub use config::*;
pub use identity::*;
pub use job::*;
pub use peer::*;
