//! ジョブレジストリポート（launchd）

use crate::error::DomainError;
use crate::model::{HelperDomain, InstalledJobRecord};

/// 認可済みジョブレジストリを開く
pub trait JobRegistryProvider {
    /// 認可ハンドルを取得してレジストリを開く。
    /// 失敗時は DomainError::Authorization。
    fn open(&self) -> Result<Box<dyn JobRegistry>, DomainError>;
}

/// 認可ハンドルを保持したジョブレジストリ
pub trait JobRegistry: Send {
    /// ジョブレコードを取得（無ければ None）
    fn copy_job(
        &self,
        domain: HelperDomain,
        label: &str,
    ) -> Result<Option<InstalledJobRecord>, DomainError>;

    /// ヘルパーを登録（ユーザー同意待ちでブロックし得る）
    fn bless(&self, domain: HelperDomain, label: &str) -> Result<(), DomainError>;

    /// ヘルパーを削除。wait=true なら停止完了まで待つ
    fn remove(&self, domain: HelperDomain, label: &str, wait: bool) -> Result<(), DomainError>;
}
