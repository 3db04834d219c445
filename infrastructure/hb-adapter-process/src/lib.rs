//! サブプロセス実行アダプター（ヘルパー側）
//!
//! stdin を閉じて起動し、stdout / stderr を並行に読み切ってから終了を待つ。
//! 各ストリームは上限までを保持し、超過分は読み捨てる（子プロセスを詰まらせない）。

use hb_domain::model::{CommandRequest, CommandResult};
use hb_domain::port::driven::{CommandRunError, CommandRunner};
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};

/// 1ストリームあたりの既定上限
pub const DEFAULT_STREAM_LIMIT: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    stream_limit: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            stream_limit: DEFAULT_STREAM_LIMIT,
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream_limit(stream_limit: usize) -> Self {
        Self { stream_limit }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandResult, CommandRunError> {
        let mut child = Command::new(request.command_path())
            .args(request.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CommandRunError::Launch(format!("{}: {e}", request.command_path())))?;
        tracing::debug!(pid = child.id(), command = request.command_path(), "child spawned");

        let limit = self.stream_limit;
        let stderr = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || match stderr {
            Some(mut pipe) => read_capped(&mut pipe, limit),
            None => Ok(Vec::new()),
        });
        let stdout = match child.stdout.take() {
            Some(mut pipe) => read_capped(&mut pipe, limit),
            None => Ok(Vec::new()),
        };
        let stderr = stderr_reader
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));

        let status = child
            .wait()
            .map_err(|e| CommandRunError::Internal(format!("wait failed: {e}")))?;
        let stdout = stdout.map_err(|e| CommandRunError::Internal(format!("read stdout: {e}")))?;
        let stderr = stderr.map_err(|e| CommandRunError::Internal(format!("read stderr: {e}")))?;

        let exit_status = exit_status_code(status);
        tracing::info!(command = request.command_path(), exit_status, "child finished");
        Ok(CommandResult {
            exit_status,
            standard_output: String::from_utf8_lossy(&stdout).into_owned(),
            standard_error: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// 上限までを保持し、残りは EOF まで読み捨てる
fn read_capped<R: Read>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    let mut truncated = false;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let room = limit.saturating_sub(kept.len());
        if room > 0 {
            kept.extend_from_slice(&buf[..n.min(room)]);
        }
        if n > room {
            truncated = true;
        }
    }
    if truncated {
        tracing::warn!(limit, "child output truncated");
    }
    Ok(kept)
}

/// 終了コード。シグナル終了は 128 + シグナル番号
fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
