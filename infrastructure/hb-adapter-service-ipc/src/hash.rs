use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;

struct ExecutableHashCache {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
    hash: String,
}

static EXECUTABLE_HASH_CACHE: OnceLock<Mutex<Option<ExecutableHashCache>>> = OnceLock::new();

/// クライアント実行ファイルの SHA-256（16進小文字）。
/// パス・サイズ・更新時刻が前回と同じならキャッシュを返す。
pub fn executable_sha256_cached(path: &Path) -> io::Result<String> {
    let meta = std::fs::metadata(path)?;
    let len = meta.len();
    let modified = meta.modified().ok();

    let cache = EXECUTABLE_HASH_CACHE.get_or_init(|| Mutex::new(None));
    let mut guard = match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(cached) = guard.as_ref() {
        if cached.path == path && cached.len == len && cached.modified == modified {
            return Ok(cached.hash.clone());
        }
    }

    let hash = sha256_hex(path)?;
    *guard = Some(ExecutableHashCache {
        path: path.to_path_buf(),
        len,
        modified,
        hash: hash.clone(),
    });
    Ok(hash)
}

fn sha256_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            executable_sha256_cached(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        // 2回目はキャッシュから
        assert_eq!(
            executable_sha256_cached(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(executable_sha256_cached(&dir.path().join("missing")).is_err());
    }
}
