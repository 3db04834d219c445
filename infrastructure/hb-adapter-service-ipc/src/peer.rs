//! 接続元の資格情報取得
//! macOS: getpeereid + LOCAL_PEERPID + proc_pidpath
//! Linux: SO_PEERCRED + /proc/<pid>/exe

use hb_domain::model::PeerIdentity;
use std::io;
use std::os::unix::net::UnixStream;

/// カーネルから接続元の pid / uid / gid と実行ファイルを取得する
pub fn peer_identity(stream: &UnixStream) -> io::Result<PeerIdentity> {
    imp::peer_identity(stream)
}

#[cfg(target_os = "macos")]
mod imp {
    use super::*;
    use std::ffi::c_void;
    use std::os::unix::io::AsRawFd;

    pub fn peer_identity(stream: &UnixStream) -> io::Result<PeerIdentity> {
        let fd = stream.as_raw_fd();
        let mut uid: libc::uid_t = 0;
        let mut gid: libc::gid_t = 0;
        // SAFETY: fd は有効なソケット。uid/gid は書き込み先として有効。
        if unsafe { libc::getpeereid(fd, &mut uid, &mut gid) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut pid: libc::pid_t = 0;
        let mut len = std::mem::size_of::<libc::pid_t>() as libc::socklen_t;
        // SAFETY: pid と len は getsockopt の出力先として有効。
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_LOCAL,
                libc::LOCAL_PEERPID,
                &mut pid as *mut libc::pid_t as *mut c_void,
                &mut len,
            )
        };
        let pid = if rc == 0 && pid > 0 { Some(pid) } else { None };
        let executable = pid.and_then(executable_path);

        Ok(PeerIdentity {
            pid,
            uid,
            gid,
            executable,
        })
    }

    fn executable_path(pid: libc::pid_t) -> Option<String> {
        let mut buf = vec![0u8; libc::PROC_PIDPATHINFO_MAXSIZE as usize];
        // SAFETY: buf は指定サイズで確保済み。
        let len =
            unsafe { libc::proc_pidpath(pid, buf.as_mut_ptr() as *mut c_void, buf.len() as u32) };
        if len <= 0 {
            tracing::debug!(pid, "proc_pidpath failed");
            return None;
        }
        buf.truncate(len as usize);
        String::from_utf8(buf).ok()
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use super::*;
    use std::os::unix::io::AsRawFd;

    pub fn peer_identity(stream: &UnixStream) -> io::Result<PeerIdentity> {
        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
        // SAFETY: cred と len は getsockopt の出力先として有効。
        let rc = unsafe {
            libc::getsockopt(
                stream.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                &mut cred as *mut libc::ucred as *mut libc::c_void,
                &mut len,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        let pid = if cred.pid > 0 { Some(cred.pid) } else { None };
        let executable = pid.and_then(|pid| {
            std::fs::read_link(format!("/proc/{pid}/exe"))
                .ok()
                .map(|path| path.to_string_lossy().into_owned())
        });
        Ok(PeerIdentity {
            pid,
            uid: cred.uid,
            gid: cred.gid,
            executable,
        })
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
mod imp {
    use super::*;

    pub fn peer_identity(_stream: &UnixStream) -> io::Result<PeerIdentity> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "peer credentials not supported on this platform",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(target_os = "macos", target_os = "linux"))]
    #[test]
    fn peer_is_this_process() {
        let (a, _b) = UnixStream::pair().unwrap();
        let peer = peer_identity(&a).unwrap();
        // SAFETY: getuid は常に成功する。
        assert_eq!(peer.uid, unsafe { libc::getuid() });
        assert_eq!(peer.pid, Some(std::process::id() as i32));
        assert!(peer.executable.is_some());
    }
}
