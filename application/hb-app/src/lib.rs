//! hb-app: アプリケーション層のユースケース。
//! ドメインポートを組み合わせて、ヘルパーの登録・削除・状態確認、
//! コマンド実行要求、ヘルパー側のリクエスト処理を実装する。

pub mod channel;
pub mod monitor;
pub mod registry;
pub mod server;

pub use channel::{Completion, HelperChannel};
pub use monitor::PeriodicTask;
pub use registry::HelperRegistry;
pub use server::{ClientGate, CommandService, ExecutableHasher, ServiceFailure};
