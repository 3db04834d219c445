//! HelperBless ドメイン層
//!
//! 特権ヘルパーのライフサイクル（認可・登録・IPC実行）の中核。
//! I/O を持たず、外部依存はエラー定義用の thiserror のみ。
//! ヘキサゴナルアーキテクチャの最内層。

pub mod error;   // ドメインエラー定義
pub mod model;   // ドメインモデル（値オブジェクト、設定型）
pub mod policy;  // 命名規約による信頼ポリシー
pub mod port;    // ポート（driving/driven）
pub mod service; // ドメインサービス（純粋関数）

pub use error::DomainError; // エラー型を再エクスポート
