//! 署名検証ポート

use crate::model::SignatureStatus;

/// 実行中プロセスのコード署名検証ポート
pub trait SignatureVerifier: Send + Sync {
    /// pid のプロセスが署名要件を満たすか検証
    fn verify_process(&self, pid: i32, requirement: &str) -> SignatureStatus;
}
