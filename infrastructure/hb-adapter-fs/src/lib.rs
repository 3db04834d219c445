//! ファイルシステムアダプター（設定の読込）
//! JSONファイルで実装。欠けたキーは既定値で補う。設定は手で編集し、このクレートからは書かない。
use hb_domain::error::DomainError;
use hb_domain::model::{AppConfig, HelperDomain};
use hb_domain::port::driven::ConfigRepository;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FsConfigRepository {
    config_path: PathBuf,
}

impl FsConfigRepository {
    /// 指定パスの設定ファイルを扱う。
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl ConfigRepository for FsConfigRepository {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let buf = match fs::read_to_string(&self.config_path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.config_path.display(), "config not found, using defaults");
                return Ok(AppConfig::default());
            }
            Err(e) => return Err(DomainError::Config(format!("read config: {e}"))),
        };
        let dto: ConfigDto =
            serde_json::from_str(&buf).map_err(|e| DomainError::Config(e.to_string()))?;
        AppConfig::try_from(dto)
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct ConfigDto {
    helper_label: String,
    domain: String,
    default_command: String,
    poll_interval_ms: u64,
    connect_timeout_ms: u64,
    response_timeout_ms: u64,
    bundle_identifier: Option<String>,
}

impl Default for ConfigDto {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ConfigDto {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            helper_label: cfg.helper_label.clone(),
            domain: cfg.domain.as_str().to_string(),
            default_command: cfg.default_command.clone(),
            poll_interval_ms: cfg.poll_interval_ms,
            connect_timeout_ms: cfg.connect_timeout_ms,
            response_timeout_ms: cfg.response_timeout_ms,
            bundle_identifier: cfg.bundle_identifier.clone(),
        }
    }
}

impl TryFrom<ConfigDto> for AppConfig {
    type Error = DomainError;

    fn try_from(dto: ConfigDto) -> Result<Self, Self::Error> {
        let domain = HelperDomain::from_str(&dto.domain)
            .ok_or_else(|| DomainError::Config(format!("unknown domain: {}", dto.domain)))?;
        let cfg = AppConfig {
            helper_label: dto.helper_label,
            domain,
            default_command: dto.default_command,
            poll_interval_ms: dto.poll_interval_ms,
            connect_timeout_ms: dto.connect_timeout_ms,
            response_timeout_ms: dto.response_timeout_ms,
            bundle_identifier: dto.bundle_identifier,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsConfigRepository::new(dir.path().join("config.json"));
        assert_eq!(repo.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn full_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "helper_label": "org.example.Tool.Helper",
                "domain": "User",
                "default_command": "/usr/bin/id",
                "poll_interval_ms": 500,
                "connect_timeout_ms": 1000,
                "response_timeout_ms": 60000,
                "bundle_identifier": "org.example.Tool"
            }"#,
        )
        .unwrap();
        let repo = FsConfigRepository::new(&path);
        assert_eq!(repo.config_path(), path.as_path());
        let cfg = repo.load().unwrap();
        assert_eq!(
            cfg,
            AppConfig {
                helper_label: "org.example.Tool.Helper".into(),
                domain: HelperDomain::User,
                default_command: "/usr/bin/id".into(),
                poll_interval_ms: 500,
                connect_timeout_ms: 1000,
                response_timeout_ms: 60000,
                bundle_identifier: Some("org.example.Tool".into()),
            }
        );
    }

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "poll_interval_ms": 2500 }"#).unwrap();
        let cfg = FsConfigRepository::new(&path).load().unwrap();
        assert_eq!(cfg.poll_interval_ms, 2500);
        assert_eq!(cfg.helper_label, AppConfig::default().helper_label);
    }

    #[test]
    fn out_of_range_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "poll_interval_ms": 5 }"#).unwrap();
        let err = FsConfigRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn unknown_domain_and_broken_json_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "domain": "galaxy" }"#).unwrap();
        assert!(FsConfigRepository::new(&path).load().is_err());
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FsConfigRepository::new(&path).load(),
            Err(DomainError::Config(_))
        ));
    }
}
