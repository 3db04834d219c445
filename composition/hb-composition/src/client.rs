//! フロントエンド（hb-cli）用ランタイム配線。

use anyhow::{Context, Result};
use hb_adapter_fs::FsConfigRepository;
use hb_adapter_launchd::{BundleAdapter, LaunchdJobRegistryProvider};
use hb_adapter_service_ipc::ServiceIpcConnector;
use hb_app::{HelperChannel, HelperRegistry, PeriodicTask};
use hb_domain::DomainError;
use hb_domain::model::{AppConfig, CommandResult, HelperIdentity, InstallState};
use hb_domain::policy::NamingConventionPolicy;
use hb_domain::port::driven::{BundleInfo, ConfigRepository, HelperConnector, JobRegistryProvider};
use hb_domain::port::driving::{CommandChannel, CompletionCallback, HelperLifecycle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// 起動時に1度だけ組み立て、プロセス終了まで保持する
pub struct ClientRuntime {
    config: AppConfig,
    registry: Arc<HelperRegistry>,
    channel: HelperChannel,
}

impl ClientRuntime {
    /// 設定ファイル（省略時は既定パス）を読み、実アダプタで組み立てる
    pub fn bootstrap(config_path: Option<&Path>) -> Result<Self> {
        let path: PathBuf = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(hb_adapter_paths::default_config_path);
        let repository = FsConfigRepository::new(path);
        let config = repository
            .load()
            .with_context(|| format!("load config {}", repository.config_path().display()))?;

        let bundle = BundleAdapter::with_fallback(config.bundle_identifier.clone());
        let connector = ServiceIpcConnector::new(
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.response_timeout_ms),
        );
        let runtime = Self::from_parts(
            config,
            &bundle,
            &LaunchdJobRegistryProvider::new(),
            Arc::new(connector),
        )
        .context("initialize helper registry")?;
        tracing::info!(
            label = runtime.identity().label(),
            domain = runtime.identity().domain().as_str(),
            "client runtime ready"
        );
        Ok(runtime)
    }

    /// ポート実装を差し替えて組み立てる
    pub fn from_parts(
        config: AppConfig,
        bundle: &dyn BundleInfo,
        provider: &dyn JobRegistryProvider,
        connector: Arc<dyn HelperConnector>,
    ) -> std::result::Result<Self, DomainError> {
        config.validate()?;
        let bundle_identifier = bundle.bundle_identifier();
        let registry = HelperRegistry::new(
            config.domain,
            &config.helper_label,
            bundle_identifier.as_deref(),
            Arc::new(NamingConventionPolicy),
            provider,
        )?;
        let channel = HelperChannel::new(&registry, connector);
        Ok(Self {
            config,
            registry: Arc::new(registry),
            channel,
        })
    }

    pub fn identity(&self) -> &HelperIdentity {
        self.registry.identity()
    }

    pub fn default_command(&self) -> &str {
        &self.config.default_command
    }

    pub fn status(&self) -> InstallState {
        InstallState::from_installed(self.registry.is_installed())
    }

    pub fn install(&self) -> std::result::Result<(), DomainError> {
        self.registry.install()
    }

    pub fn remove(&self) -> std::result::Result<(), DomainError> {
        self.registry.remove()
    }

    /// 非同期実行。空行は即座に Validation
    pub fn execute(
        &self,
        command_line: &str,
        on_complete: CompletionCallback,
    ) -> std::result::Result<(), DomainError> {
        self.channel.execute(command_line, on_complete)
    }

    pub fn execute_blocking(&self, command_line: &str) -> std::result::Result<CommandResult, DomainError> {
        self.channel.execute_blocking(command_line)
    }

    /// poll_interval_ms ごとにインストール状態を送る。
    /// 返されたタスクを破棄すると停止する。受信側が居なくなった後の送信は捨てる。
    pub fn watch(&self, updates: Sender<InstallState>) -> Result<PeriodicTask> {
        let registry = Arc::clone(&self.registry);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        PeriodicTask::start(interval, move || {
            let state = InstallState::from_installed(registry.is_installed());
            let _ = updates.send(state);
        })
        .context("start status watcher")
    }
}
