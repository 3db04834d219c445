//! ポート定義
//!
//! - driving: アプリケーション層が提供するユースケース
//! - driven: インフラ層のアダプタが実装する外部機能

pub mod driven;
pub mod driving;
