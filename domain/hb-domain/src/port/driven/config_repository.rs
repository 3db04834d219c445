//! 設定リポジトリポート

use crate::error::DomainError;
use crate::model::AppConfig;

/// 設定の読込ポート
pub trait ConfigRepository {
    /// 設定を読込（ファイルが無ければ既定値）
    fn load(&self) -> Result<AppConfig, DomainError>;
}
