//! ヘルパーのライフサイクル用ユースケースポート

use crate::error::DomainError;
use crate::model::HelperIdentity;

/// 1つのヘルパー登録に対する操作
pub trait HelperLifecycle: Send + Sync {
    fn identity(&self) -> &HelperIdentity;

    /// 副作用なしの問い合わせ。失敗は false として扱う
    fn is_installed(&self) -> bool;

    fn install(&self) -> Result<(), DomainError>;

    fn remove(&self) -> Result<(), DomainError>;
}
