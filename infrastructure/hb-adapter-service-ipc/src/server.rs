use crate::framing::{read_frame, write_frame};
use crate::peer::peer_identity;
use crate::{
    IpcError, MAX_MESSAGE_BYTES, PROTOCOL_VERSION, ServiceErrorCode, ServiceRequest,
    ServiceResponse, decode_request, encode_response,
};
use hb_domain::model::PeerIdentity;
use std::io::Read;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const READ_TIMEOUT_MS: u64 = 3_000;
const WRITE_TIMEOUT_MS: u64 = 10_000;
/// 拒否後に未読の要求を読み捨てる上限時間
const REJECT_DRAIN_MS: u64 = 250;
const MAX_ACTIVE_CLIENTS: usize = 32;
/// 信頼はソケットのモードではなく接続ごとに判定する
const SOCKET_MODE: u32 = 0o666;

/// 受け入れ済みクライアントの情報
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub peer: PeerIdentity,
}

type TrustFn = dyn Fn(&PeerIdentity) -> Result<(), String> + Send + Sync + 'static;
type HandlerFn = dyn Fn(ServiceRequest, &ClientContext) -> ServiceResponse + Send + Sync + 'static;

#[derive(Debug, Clone)]
pub struct ServiceIpcServer {
    socket_path: PathBuf,
}

impl ServiceIpcServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// 古いソケットを除去して bind し、モードを設定する
    pub fn bind(&self) -> Result<BoundServer, IpcError> {
        if let Some(dir) = self.socket_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        remove_stale_socket(&self.socket_path)?;
        let listener = UnixListener::bind(&self.socket_path)?;
        let bound = BoundServer {
            listener,
            socket_path: self.socket_path.clone(),
        };
        set_socket_permissions(&self.socket_path)?;
        tracing::info!(socket = %self.socket_path.display(), "IPC server listening");
        Ok(bound)
    }
}

/// bind 済みサーバー。drop でソケットファイルを削除する
#[derive(Debug)]
pub struct BoundServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl BoundServer {
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// stop が立つまで接続を受け付ける（1接続1スレッド）。
    /// 停止させるには stop を立ててから poke_server で accept を起こす。
    pub fn run_until<T, F>(self, stop: Arc<AtomicBool>, trust: T, handler: F) -> Result<(), IpcError>
    where
        T: Fn(&PeerIdentity) -> Result<(), String> + Send + Sync + 'static,
        F: Fn(ServiceRequest, &ClientContext) -> ServiceResponse + Send + Sync + 'static,
    {
        let trust: Arc<TrustFn> = Arc::new(trust);
        let handler: Arc<HandlerFn> = Arc::new(handler);
        let active = Arc::new(AtomicUsize::new(0));

        for incoming in self.listener.incoming() {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            let stream = match incoming {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(%err, "IPC accept failed");
                    std::thread::sleep(Duration::from_millis(50));
                    continue;
                }
            };
            if active.load(Ordering::SeqCst) >= MAX_ACTIVE_CLIENTS {
                tracing::warn!("IPC reject: too many active clients");
                reject_and_close(stream, &ServiceResponse::error(ServiceErrorCode::Busy, None));
                continue;
            }
            let guard = ActiveGuard::new(Arc::clone(&active));
            let trust = Arc::clone(&trust);
            let handler = Arc::clone(&handler);
            let spawned = std::thread::Builder::new()
                .name("hb-ipc-client".into())
                .spawn(move || {
                    let _guard = guard;
                    handle_client(stream, trust.as_ref(), handler.as_ref());
                });
            if let Err(err) = spawned {
                tracing::warn!(%err, "IPC client thread spawn failed");
            }
        }
        tracing::info!(socket = %self.socket_path.display(), "IPC server stopped");
        Ok(())
    }
}

impl Drop for BoundServer {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.socket_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(%err, socket = %self.socket_path.display(), "socket cleanup failed");
            }
        }
    }
}

/// accept を起こすための使い捨て接続
pub fn poke_server(socket_path: &Path) -> Result<(), IpcError> {
    match UnixStream::connect(socket_path) {
        Ok(stream) => {
            drop(stream);
            Ok(())
        }
        Err(err) => {
            tracing::debug!(%err, "poke: server not reachable");
            Ok(())
        }
    }
}

struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn handle_client(mut stream: UnixStream, trust: &TrustFn, handler: &HandlerFn) {
    let peer = match peer_identity(&stream) {
        Ok(peer) => peer,
        Err(err) => {
            tracing::warn!(%err, "IPC reject: peer credentials unavailable");
            reject_and_close(
                stream,
                &ServiceResponse::error(ServiceErrorCode::ClientNotTrusted, None),
            );
            return;
        }
    };
    if let Err(reason) = trust(&peer) {
        tracing::warn!(
            pid = ?peer.pid,
            uid = peer.uid,
            exe = ?peer.executable,
            %reason,
            "IPC reject: client not trusted"
        );
        reject_and_close(
            stream,
            &ServiceResponse::error(ServiceErrorCode::ClientNotTrusted, None),
        );
        return;
    }
    tracing::debug!(pid = ?peer.pid, uid = peer.uid, "IPC client accepted");
    let ctx = ClientContext { peer };

    let _ = stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)));
    let request_data = match read_frame(&mut stream, MAX_MESSAGE_BYTES) {
        Ok(data) => data,
        Err(IpcError::Disconnected) => {
            // poke や途中切断
            tracing::debug!("IPC client closed before sending a request");
            return;
        }
        Err(err) => {
            tracing::warn!(%err, "IPC read failed");
            let code = match err {
                IpcError::MessageTooLarge(_) => ServiceErrorCode::MessageTooLarge,
                _ => ServiceErrorCode::InternalError,
            };
            reject_and_close(stream, &ServiceResponse::error(code, Some(err.to_string())));
            return;
        }
    };

    let response = match decode_request(&request_data) {
        Ok(request) if request.protocol_version() != PROTOCOL_VERSION => {
            ServiceResponse::error(
                ServiceErrorCode::ProtocolVersionMismatch,
                Some(format!(
                    "expected protocol version {PROTOCOL_VERSION}, got {}",
                    request.protocol_version()
                )),
            )
        }
        Ok(request) => {
            let ServiceRequest::Execute(req) = &request;
            tracing::info!(command = %req.command, args = req.arguments.len(), "IPC request: execute");
            handler(request, &ctx)
        }
        Err(err) => ServiceResponse::error(
            ServiceErrorCode::InternalError,
            Some(format!("failed to parse request: {err}")),
        ),
    };

    // 呼び出し元が既に居なくてもコマンドは完了している。書き込み失敗は記録のみ
    reply_and_close(stream, &response);
}

/// 要求を読み終えた接続に応答して閉じる
fn reply_and_close(mut stream: UnixStream, response: &ServiceResponse) {
    send_response(&mut stream, response);
    let _ = stream.shutdown(std::net::Shutdown::Both);
}

/// 要求を読まずに拒否する。
/// 未読データを残して閉じるとクライアントは応答より先に切断を見るため、
/// 書き込み側だけ閉じて送信済みの要求を読み捨ててから閉じる。
fn reject_and_close(mut stream: UnixStream, response: &ServiceResponse) {
    send_response(&mut stream, response);
    let _ = stream.shutdown(std::net::Shutdown::Write);
    drain_until_closed(&mut stream, Duration::from_millis(REJECT_DRAIN_MS));
}

fn send_response(stream: &mut UnixStream, response: &ServiceResponse) {
    let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));
    let data = match encode_response(response) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(%err, "IPC encode response failed");
            let fallback = ServiceResponse::error(ServiceErrorCode::InternalError, Some(err.to_string()));
            match encode_response(&fallback) {
                Ok(data) => data,
                Err(_) => return,
            }
        }
    };
    match write_frame(stream, &data) {
        Ok(()) => tracing::debug!(response = response.label(), "IPC response sent"),
        Err(err) => tracing::warn!(%err, "IPC write failed"),
    }
}

/// 相手が閉じるか、期限か、読み捨て量の上限に達するまで読む
fn drain_until_closed(stream: &mut UnixStream, limit: Duration) {
    let deadline = Instant::now() + limit;
    let mut buf = [0u8; 8192];
    let mut drained = 0usize;
    while drained <= MAX_MESSAGE_BYTES {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || stream.set_read_timeout(Some(remaining)).is_err() {
            break;
        }
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => drained += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    tracing::debug!(drained, "rejected connection drained");
}

fn remove_stale_socket(path: &Path) -> Result<(), IpcError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    use std::os::unix::fs::FileTypeExt;
    if !meta.file_type().is_socket() {
        return Err(IpcError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("path {} exists but is not a socket", path.display()),
        )));
    }
    std::fs::remove_file(path)?;
    tracing::debug!(path = %path.display(), "removed stale socket file");
    Ok(())
}

fn set_socket_permissions(path: &Path) -> Result<(), IpcError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
    Ok(())
}
