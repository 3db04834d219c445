use crate::framing::{read_frame, write_frame};
use crate::{
    ExecuteRequest, IpcError, MAX_MESSAGE_BYTES, PROTOCOL_VERSION, ServiceErrorCode,
    ServiceRequest, ServiceResponse, decode_response, encode_request,
};
use hb_domain::DomainError;
use hb_domain::error::ConnectionFailure;
use hb_domain::model::{CommandRequest, CommandResult, HelperIdentity};
use hb_domain::port::driven::HelperConnector;
use std::io;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 120_000;
const CONNECT_RETRY_INTERVAL_MS: u64 = 100;

/// 1つのソケットに対する IPC クライアント
#[derive(Debug, Clone)]
pub struct ServiceIpcClient {
    socket_path: PathBuf,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl ServiceIpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// execute を1回呼び出し、結果を返す
    pub fn execute(&self, request: &CommandRequest) -> Result<CommandResult, DomainError> {
        let wire = ServiceRequest::Execute(ExecuteRequest {
            protocol_version: PROTOCOL_VERSION,
            command: request.command_path().to_string(),
            arguments: request.arguments().to_vec(),
        });
        let response = self.send_request(&wire).map_err(IpcError::into_domain)?;
        match response {
            ServiceResponse::Execute(resp) => {
                if resp.protocol_version != PROTOCOL_VERSION {
                    return Err(DomainError::connection(
                        ConnectionFailure::Protocol,
                        format!("unexpected protocol version {}", resp.protocol_version),
                    ));
                }
                Ok(CommandResult::from_wire(
                    resp.exit_status,
                    resp.standard_output,
                    resp.standard_error,
                ))
            }
            ServiceResponse::Error(err) => {
                let failure = match err.error_code {
                    ServiceErrorCode::ClientNotTrusted => ConnectionFailure::NotTrusted,
                    code => ConnectionFailure::Rejected(code),
                };
                let detail = err
                    .detail
                    .unwrap_or_else(|| format!("helper replied {}", err.error_code));
                Err(DomainError::connection(failure, detail))
            }
        }
    }

    /// 新しい接続で1リクエストを送り、1レスポンスを受け取る。
    ///
    /// サーバーは要求を読む前に拒否応答を返して閉じることがあるため、
    /// 書き込みに失敗しても届いている応答を先に読む。
    pub fn send_request(&self, request: &ServiceRequest) -> Result<ServiceResponse, IpcError> {
        let data = encode_request(request)?;
        let mut stream = self.connect()?;
        stream.set_write_timeout(Some(self.response_timeout))?;
        stream.set_read_timeout(Some(self.response_timeout))?;
        let written = write_frame(&mut stream, &data);
        let response = match (read_frame(&mut stream, MAX_MESSAGE_BYTES), written) {
            (Ok(data), Ok(())) => data,
            (Ok(data), Err(err)) => {
                tracing::debug!(%err, "request write failed; using the reply already sent");
                data
            }
            (Err(_), Err(err)) => return Err(err),
            (Err(IpcError::Timeout(_)), Ok(())) => return Err(IpcError::Timeout("response")),
            (Err(err), Ok(())) => return Err(err),
        };
        decode_response(&response)
    }

    /// ヘルパー起動直後はソケットが未作成のことがあるため、期限まで再試行する
    fn connect(&self) -> Result<UnixStream, IpcError> {
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => return Ok(stream),
                Err(err) if is_retryable(&err) && Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(CONNECT_RETRY_INTERVAL_MS));
                }
                Err(err) => {
                    return Err(IpcError::Unavailable(format!(
                        "connect {}: {err}",
                        self.socket_path.display()
                    )));
                }
            }
        }
    }
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    )
}

/// ヘルパー識別子からソケットを解決する HelperConnector 実装
#[derive(Debug, Clone)]
pub struct ServiceIpcConnector {
    connect_timeout: Duration,
    response_timeout: Duration,
    socket_override: Option<PathBuf>,
}

impl Default for ServiceIpcConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            socket_override: None,
        }
    }
}

impl ServiceIpcConnector {
    pub fn new(connect_timeout: Duration, response_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            response_timeout,
            socket_override: None,
        }
    }

    /// 識別子から導出せず固定のソケットを使う（開発・テスト用）
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_override = Some(path.into());
        self
    }

    fn client_for(&self, identity: &HelperIdentity) -> ServiceIpcClient {
        let path = self.socket_override.clone().unwrap_or_else(|| {
            hb_adapter_paths::helper_socket_path(identity.domain(), identity.label())
        });
        ServiceIpcClient::new(path).with_timeouts(self.connect_timeout, self.response_timeout)
    }
}

impl HelperConnector for ServiceIpcConnector {
    fn execute(
        &self,
        identity: &HelperIdentity,
        request: &CommandRequest,
    ) -> Result<CommandResult, DomainError> {
        let client = self.client_for(identity);
        tracing::debug!(
            socket = %client.socket_path().display(),
            command = request.command_path(),
            "sending execute request"
        );
        client.execute(request)
    }
}
