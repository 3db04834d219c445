use super::{DEFAULT_COMMAND_LINE, HelperDomain};
use crate::DomainError;

/// 既定のヘルパーラベル
pub const DEFAULT_HELPER_LABEL: &str = "com.example.HelperBless.Helper";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 120_000;

const MIN_POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;
const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// フロントエンド設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub helper_label: String,
    pub domain: HelperDomain,
    pub default_command: String,
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    /// メインバンドルが識別子を持たない場合（開発ビルド等）のみ使う
    pub bundle_identifier: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            helper_label: DEFAULT_HELPER_LABEL.to_string(),
            domain: HelperDomain::default(),
            default_command: DEFAULT_COMMAND_LINE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            bundle_identifier: None,
        }
    }
}

impl AppConfig {
    /// ラベルの命名規約は HelperRegistry 構築時に検証する（ここでは範囲のみ）。
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.helper_label.contains('\0') || self.default_command.contains('\0') {
            return Err(DomainError::Config(
                "helper_label and default_command must not contain NUL".into(),
            ));
        }
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(DomainError::Config(format!(
                "poll_interval_ms must be within {}-{} (got {})",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("response_timeout_ms", self.response_timeout_ms),
        ] {
            if value == 0 || value > MAX_TIMEOUT_MS {
                return Err(DomainError::Config(format!(
                    "{name} must be within 1-{MAX_TIMEOUT_MS} (got {value})"
                )));
            }
        }
        if let Some(bundle) = &self.bundle_identifier {
            if bundle.trim().is_empty() {
                return Err(DomainError::Config(
                    "bundle_identifier must not be blank when present".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.domain, HelperDomain::System);
        assert_eq!(cfg.poll_interval_ms, 1_000);
        assert_eq!(cfg.default_command, "/bin/ls -al /var/root");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cfg = AppConfig {
            poll_interval_ms: 5,
            ..AppConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DomainError::Config(_))));

        let cfg = AppConfig {
            connect_timeout_ms: 0,
            ..AppConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DomainError::Config(_))));

        let cfg = AppConfig {
            bundle_identifier: Some("  ".into()),
            ..AppConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DomainError::Config(_))));
    }
}
