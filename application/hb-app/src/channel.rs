//! ヘルパーへのコマンド実行要求（非同期・結果はちょうど1回）

use crate::registry::HelperRegistry;
use hb_domain::DomainError;
use hb_domain::error::ConnectionFailure;
use hb_domain::model::{CommandOutcome, CommandRequest, CommandResult, HelperIdentity};
use hb_domain::port::driven::HelperConnector;
use hb_domain::port::driving::{CommandChannel, CompletionCallback, HelperLifecycle};
use std::sync::Arc;
use std::sync::mpsc;

/// 1回限りの完了通知。
///
/// deliver で消費される。未配送のまま破棄されると ConnectionFailed を配送する。
pub struct Completion {
    callback: Option<CompletionCallback>,
}

impl Completion {
    pub fn new(callback: CompletionCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn deliver(mut self, outcome: CommandOutcome) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            tracing::warn!("completion dropped without a reply");
            callback(CommandOutcome::ConnectionFailed(DomainError::connection(
                ConnectionFailure::Disconnected,
                "request abandoned before a reply was received",
            )));
        }
    }
}

/// 稼働中ヘルパーへの実行チャネル。呼び出しごとにワーカースレッドを起こす。
///
/// 宛先は検証済みの登録（HelperRegistry）からのみ受け取る。
#[derive(Clone)]
pub struct HelperChannel {
    identity: HelperIdentity,
    connector: Arc<dyn HelperConnector>,
}

impl HelperChannel {
    pub fn new(registry: &HelperRegistry, connector: Arc<dyn HelperConnector>) -> Self {
        Self {
            identity: registry.identity().clone(),
            connector,
        }
    }

    pub fn identity(&self) -> &HelperIdentity {
        &self.identity
    }

    /// 完了まで待つ版（CLI とテスト用）
    pub fn execute_blocking(&self, command_line: &str) -> Result<CommandResult, DomainError> {
        let (tx, rx) = mpsc::channel();
        self.execute(
            command_line,
            Box::new(move |outcome: CommandOutcome| {
                let _ = tx.send(outcome);
            }),
        )?;
        match rx.recv() {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(DomainError::connection(
                ConnectionFailure::Disconnected,
                "worker finished without a reply",
            )),
        }
    }
}

impl CommandChannel for HelperChannel {
    fn execute(
        &self,
        command_line: &str,
        on_complete: CompletionCallback,
    ) -> Result<(), DomainError> {
        // 空行はここで拒否し、コネクタは呼ばない
        let request = CommandRequest::parse(command_line)?;
        self.execute_request(request, on_complete);
        Ok(())
    }

    fn execute_request(&self, request: CommandRequest, on_complete: CompletionCallback) {
        let completion = Completion::new(on_complete);
        let identity = self.identity.clone();
        let connector = self.connector.clone();
        let spawned = std::thread::Builder::new()
            .name("hb-execute".into())
            .spawn(move || {
                let outcome = match connector.execute(&identity, &request) {
                    Ok(result) => {
                        tracing::debug!(exit_status = result.exit_status, "execute completed");
                        CommandOutcome::Completed(result)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "execute failed");
                        CommandOutcome::ConnectionFailed(err)
                    }
                };
                completion.deliver(outcome);
            });
        // 起動に失敗した場合はクロージャごと Completion が破棄され、失敗が配送される
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "cannot spawn execute worker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_domain::model::{HelperDomain, InstalledJobRecord};
    use hb_domain::policy::NamingConventionPolicy;
    use hb_domain::port::driven::{JobRegistry, JobRegistryProvider};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct EchoConnector {
        calls: AtomicUsize,
        seen: Mutex<Vec<CommandRequest>>,
    }

    impl HelperConnector for EchoConnector {
        fn execute(
            &self,
            _identity: &HelperIdentity,
            request: &CommandRequest,
        ) -> Result<CommandResult, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            Ok(CommandResult {
                exit_status: 0,
                standard_output: format!("{}\n", request.arguments().join(" ")),
                standard_error: String::new(),
            })
        }
    }

    struct DownConnector;

    impl HelperConnector for DownConnector {
        fn execute(
            &self,
            _identity: &HelperIdentity,
            _request: &CommandRequest,
        ) -> Result<CommandResult, DomainError> {
            Err(DomainError::connection(
                ConnectionFailure::Unreachable,
                "helper not running",
            ))
        }
    }

    struct NoJobs;

    impl JobRegistry for NoJobs {
        fn copy_job(
            &self,
            _domain: HelperDomain,
            _label: &str,
        ) -> Result<Option<InstalledJobRecord>, DomainError> {
            Ok(None)
        }

        fn bless(&self, _domain: HelperDomain, _label: &str) -> Result<(), DomainError> {
            Ok(())
        }

        fn remove(&self, _domain: HelperDomain, _label: &str, _wait: bool) -> Result<(), DomainError> {
            Ok(())
        }
    }

    impl JobRegistryProvider for NoJobs {
        fn open(&self) -> Result<Box<dyn JobRegistry>, DomainError> {
            Ok(Box::new(NoJobs))
        }
    }

    fn registry() -> HelperRegistry {
        HelperRegistry::new(
            HelperDomain::System,
            "com.example.HelperBless.Helper",
            Some("com.example.HelperBless"),
            Arc::new(NamingConventionPolicy),
            &NoJobs,
        )
        .unwrap()
    }

    #[test]
    fn channel_targets_the_registered_helper() {
        let channel = HelperChannel::new(&registry(), Arc::new(DownConnector));
        assert_eq!(channel.identity().label(), "com.example.HelperBless.Helper");
        assert_eq!(channel.identity().domain(), HelperDomain::System);
    }

    #[test]
    fn empty_line_is_rejected_locally() {
        let connector = Arc::new(EchoConnector::default());
        let channel = HelperChannel::new(&registry(), connector.clone());
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        let err = channel
            .execute(
                "   ",
                Box::new(move |_: CommandOutcome| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.title(), "Invalid Command");
        assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
        // 拒否時は Completion を作らないため配送も起きない
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn echo_is_delivered_once() {
        let connector = Arc::new(EchoConnector::default());
        let channel = HelperChannel::new(&registry(), connector.clone());
        let result = channel.execute_blocking("/bin/echo hello").unwrap();
        assert_eq!(result.exit_status, 0);
        assert_eq!(result.standard_output, "hello\n");
        assert_eq!(result.standard_error, "");
        let seen = connector.seen.lock().unwrap();
        assert_eq!(seen[0].command_path(), "/bin/echo");
    }

    #[test]
    fn unreachable_helper_delivers_connection_failure() {
        let channel = HelperChannel::new(&registry(), Arc::new(DownConnector));
        let (tx, rx) = mpsc::channel();
        channel
            .execute(
                "/bin/echo hello",
                Box::new(move |outcome: CommandOutcome| tx.send(outcome).unwrap()),
            )
            .unwrap();
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            outcome,
            CommandOutcome::ConnectionFailed(DomainError::Connection {
                failure: ConnectionFailure::Unreachable,
                ..
            })
        ));
        // 送信側はクロージャと共に破棄されるので2回目は来ない
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn concurrent_calls_each_get_one_outcome() {
        let connector = Arc::new(EchoConnector::default());
        let channel = HelperChannel::new(&registry(), connector.clone());
        let (tx, rx) = mpsc::channel();
        for i in 0..16 {
            let tx = tx.clone();
            channel
                .execute(
                    &format!("/bin/echo {i}"),
                    Box::new(move |outcome: CommandOutcome| tx.send((i, outcome)).unwrap()),
                )
                .unwrap();
        }
        drop(tx);
        let mut seen: Vec<usize> = rx
            .iter()
            .map(|(i, outcome)| {
                assert_eq!(
                    outcome.into_result().unwrap().standard_output,
                    format!("{i}\n")
                );
                i
            })
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn dropped_completion_reports_failure() {
        let (tx, rx) = mpsc::channel();
        let completion = Completion::new(Box::new(move |outcome: CommandOutcome| tx.send(outcome).unwrap()));
        drop(completion);
        let outcome = rx.recv().unwrap();
        assert!(matches!(
            outcome,
            CommandOutcome::ConnectionFailed(DomainError::Connection {
                failure: ConnectionFailure::Disconnected,
                ..
            })
        ));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn delivered_completion_does_not_fire_again() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let completion = Completion::new(Box::new(move |_: CommandOutcome| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        completion.deliver(CommandOutcome::Completed(CommandResult::default()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
