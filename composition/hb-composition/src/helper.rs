//! 特権ヘルパー（hb-helper）用ランタイム配線。
//!
//! Info.plist と起動引数から信頼ルールを作り、IPC サーバーを
//! ClientGate / CommandService につないで停止要求まで待ち受ける。

use anyhow::{Context, Result, bail};
use hb_adapter_launchd::BundleAdapter;
use hb_adapter_process::ProcessRunner;
use hb_adapter_service_ipc::{
    BoundServer, ClientContext, ExecuteResponse, PROTOCOL_VERSION, ServiceIpcServer,
    ServiceRequest, ServiceResponse, poke_server,
};
use hb_adapter_signature::SignatureAdapter;
use hb_app::{ClientGate, CommandService, ExecutableHasher};
use hb_domain::model::{ClientTrustRules, HelperDomain, ServiceLabel};
use hb_domain::port::driven::{BundleInfo, CommandRunner, SignatureVerifier};
use hb_log_utils::write_lifecycle_line;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const COMPONENT: &str = "HELPER";
/// 信頼するクライアントのコード署名要件を並べる Info.plist キー
pub const AUTHORIZED_CLIENTS_KEY: &str = "SMAuthorizedClients";
const SIGNAL_POLL_MS: u64 = 100;

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// 起動引数による上書き（開発用）
#[derive(Debug, Clone, Default)]
pub struct HelperOptions {
    pub label: Option<String>,
    pub domain: HelperDomain,
    pub socket: Option<PathBuf>,
    pub allow_uids: Vec<u32>,
    pub allow_exes: Vec<String>,
    pub client_sha256: Option<String>,
}

/// SMAuthorizedClients の要件を1つの要件式にまとめる
pub fn combined_requirement(requirements: &[String]) -> Option<String> {
    let requirements: Vec<&str> = requirements
        .iter()
        .map(|req| req.trim())
        .filter(|req| !req.is_empty())
        .collect();
    match requirements.as_slice() {
        [] => None,
        [single] => Some(single.to_string()),
        many => Some(
            many.iter()
                .map(|req| format!("({req})"))
                .collect::<Vec<_>>()
                .join(" or "),
        ),
    }
}

pub struct HelperRuntime {
    label: ServiceLabel,
    socket_path: PathBuf,
    gate: Arc<ClientGate>,
    commands: Arc<CommandService>,
}

impl HelperRuntime {
    /// 埋め込み Info.plist と起動引数から組み立てる
    pub fn from_options(options: HelperOptions) -> Result<Self> {
        let bundle = BundleAdapter::new();
        let Some(label) = options.label.clone().or_else(|| bundle.bundle_identifier()) else {
            bail!("helper label unavailable: no CFBundleIdentifier in the embedded Info.plist; pass --label");
        };
        let label = ServiceLabel::new(options.domain, &label).context("helper label")?;
        let rules = ClientTrustRules {
            code_requirement: combined_requirement(&bundle.info_strings(AUTHORIZED_CLIENTS_KEY)),
            allowed_executables: options.allow_exes.clone(),
            allowed_uids: options.allow_uids.clone(),
            executable_sha256: options.client_sha256.clone(),
        };
        let socket_path = options.socket.clone().unwrap_or_else(|| {
            hb_adapter_paths::helper_socket_path(label.domain(), label.label())
        });
        let hasher: Arc<ExecutableHasher> =
            Arc::new(|path: &Path| hb_adapter_service_ipc::executable_sha256_cached(path));
        Ok(Self::from_parts(
            label,
            socket_path,
            rules,
            Arc::new(SignatureAdapter::new()),
            hasher,
            Arc::new(ProcessRunner::new()),
        ))
    }

    pub fn from_parts(
        label: ServiceLabel,
        socket_path: PathBuf,
        rules: ClientTrustRules,
        verifier: Arc<dyn SignatureVerifier>,
        hasher: Arc<ExecutableHasher>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            label,
            socket_path,
            gate: Arc::new(ClientGate::new(rules, verifier, hasher)),
            commands: Arc::new(CommandService::new(runner)),
        }
    }

    pub fn label(&self) -> &ServiceLabel {
        &self.label
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn bind(&self) -> Result<BoundServer> {
        ServiceIpcServer::new(&self.socket_path)
            .bind()
            .with_context(|| format!("bind {}", self.socket_path.display()))
    }

    /// stop が立って poke されるまで待ち受ける。戻るとソケットは削除済み
    pub fn serve(&self, bound: BoundServer, stop: Arc<AtomicBool>) -> Result<()> {
        let gate = Arc::clone(&self.gate);
        let commands = Arc::clone(&self.commands);
        bound
            .run_until(
                stop,
                move |peer| gate.check(peer).map_err(|rejection| rejection.to_string()),
                move |request, ctx| handle_request(&commands, request, ctx),
            )
            .context("serve IPC")
    }

    /// シグナルで停止するまで動かす（hb-helper のメイン）
    pub fn run(&self) -> Result<()> {
        install_signal_handlers()?;
        let bound = self.bind()?;
        let rules = self.gate.rules();
        write_lifecycle_line(
            COMPONENT,
            &format!(
                "listening label={} socket={} code_requirement={} allowed_uids={} allowed_exes={} sha256_pin={}",
                self.label.label(),
                self.socket_path.display(),
                rules.code_requirement.is_some(),
                rules.allowed_uids.len(),
                rules.allowed_executables.len(),
                rules.executable_sha256.is_some(),
            ),
        );

        let stop = Arc::new(AtomicBool::new(false));
        let watcher = spawn_signal_watcher(Arc::clone(&stop), self.socket_path.clone())?;
        let result = self.serve(bound, Arc::clone(&stop));

        // serve がエラーで戻った場合もウォッチャーを止める
        stop.store(true, Ordering::SeqCst);
        STOP_REQUESTED.store(true, Ordering::SeqCst);
        let _ = watcher.join();
        match &result {
            Ok(()) => write_lifecycle_line(COMPONENT, "stopped"),
            Err(err) => write_lifecycle_line(COMPONENT, &format!("stopped with error: {err:#}")),
        }
        result
    }
}

fn handle_request(
    commands: &CommandService,
    request: ServiceRequest,
    ctx: &ClientContext,
) -> ServiceResponse {
    match request {
        ServiceRequest::Execute(req) => match commands.handle(req.command, req.arguments) {
            Ok(result) => {
                tracing::info!(
                    pid = ?ctx.peer.pid,
                    exit_status = result.exit_status,
                    "command finished"
                );
                ServiceResponse::Execute(ExecuteResponse {
                    protocol_version: PROTOCOL_VERSION,
                    exit_status: result.exit_status,
                    standard_output: non_empty(result.standard_output),
                    standard_error: non_empty(result.standard_error),
                })
            }
            Err(failure) => {
                tracing::warn!(pid = ?ctx.peer.pid, code = %failure.code, detail = %failure.detail, "command failed");
                ServiceResponse::error(failure.code, Some(failure.detail))
            }
        },
    }
}

/// 空のストリームは省略して送る
fn non_empty(stream: String) -> Option<String> {
    if stream.is_empty() {
        None
    } else {
        Some(stream)
    }
}

extern "C" fn on_stop_signal(_signal: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() -> Result<()> {
    for signal in [libc::SIGTERM, libc::SIGINT] {
        // SAFETY: ハンドラはアトミック変数への書き込みのみ（async-signal-safe）。
        let previous = unsafe {
            libc::signal(
                signal,
                on_stop_signal as extern "C" fn(libc::c_int) as libc::sighandler_t,
            )
        };
        if previous == libc::SIG_ERR {
            bail!("cannot install handler for signal {signal}: {}", std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// シグナルを検知したら stop を立てて accept を起こす
fn spawn_signal_watcher(
    stop: Arc<AtomicBool>,
    socket_path: PathBuf,
) -> Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("hb-signal-watcher".into())
        .spawn(move || {
            while !STOP_REQUESTED.load(Ordering::SeqCst) && !stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(SIGNAL_POLL_MS));
            }
            if !stop.swap(true, Ordering::SeqCst) {
                tracing::info!("stop requested");
                write_lifecycle_line(COMPONENT, "stop requested");
                let _ = poke_server(&socket_path);
            }
        })
        .context("spawn signal watcher")
}
