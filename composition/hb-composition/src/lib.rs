//! hb-composition: 各実行ファイル向けのランタイムを組み立てるコンポジションルート。
//! ドメイン／アプリケーション／各種アダプタをここで配線し、apps/* はこのクレートだけに依存する。

pub mod client;
pub mod helper;

// apps/* が内側レイヤーの型に触れる必要がある場合は、ここから辿れるようにする。
pub use hb_app as app;
pub use hb_domain as domain;

pub use hb_domain::DomainError;
pub use hb_domain::model::{CommandOutcome, CommandResult, HelperDomain, InstallState};
pub use hb_log_utils::{init_tracing, write_lifecycle_line};

/// anyhow のエラー連鎖から DomainError を探す（表示用のタイトル取得に使う）
pub fn domain_error(err: &anyhow::Error) -> Option<&DomainError> {
    err.chain().find_map(|cause| cause.downcast_ref::<DomainError>())
}
