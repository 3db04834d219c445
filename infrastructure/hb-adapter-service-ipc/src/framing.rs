//! 4バイト長（ビッグエンディアン）＋本文のフレーミング

use crate::IpcError;
use std::io::{self, Read, Write};

/// 1フレームを書き込んで flush する
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), IpcError> {
    let len = u32::try_from(payload.len()).map_err(|_| IpcError::MessageTooLarge(payload.len()))?;
    writer.write_all(&len.to_be_bytes()).map_err(map_io)?;
    writer.write_all(payload).map_err(map_io)?;
    writer.flush().map_err(map_io)?;
    Ok(())
}

/// 1フレームを読む。長さが `max_len` を超えたら本文を読まずに拒否する
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, IpcError> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).map_err(map_io)?;
    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(IpcError::MessageTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(map_io)?;
    Ok(payload)
}

fn map_io(err: io::Error) -> IpcError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => IpcError::Disconnected,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => IpcError::Timeout("peer"),
        _ => IpcError::Io(err),
    }
}
