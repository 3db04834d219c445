//! 駆動ポート（出力インターフェース）。
//!
//! ドメインが外部に求める機能を定義する。
//! インフラ層のアダプタが実装する。

mod bundle_info;
mod command_runner;
mod config_repository;
mod helper_connector;
mod job_registry;
mod signature_verifier;

pub use bundle_info::*;
pub use command_runner::*;
pub use config_repository::*;
pub use helper_connector::*;
pub use job_registry::*;
pub use signature_verifier::*;
