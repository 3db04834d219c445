//! ログユーティリティ
//!
//! - tracing サブスクライバの初期化（HB_LOG で絞り込み）
//! - ライフサイクル行（`[時刻] [コンポーネント] メッセージ`）の追記

use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// フィルタ指定用の環境変数
pub const LOG_ENV: &str = "HB_LOG";

const PRODUCT_DIR: &str = "HelperBless";
const LIFECYCLE_FILE: &str = "hb-lifecycle.log";

/// stderr への fmt サブスクライバを登録する。
/// 二重初期化は無視する（テストから何度呼ばれてもよい）。
pub fn init_tracing(component: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
    if result.is_ok() {
        tracing::debug!(component, "tracing initialized");
    }
}

/// UTCのRFC3339（ミリ秒付き）。例: 2025-01-15T10:30:00.123Z
pub fn utc_rfc3339_millis() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// UTCタイムスタンプ付きのライフサイクル行を作成する。
pub fn lifecycle_line(component: &str, message: &str) -> String {
    format!("[{}] [{}] {}\n", utc_rfc3339_millis(), component, message)
}

/// ライフサイクルログの既定出力先（優先順）
pub fn default_lifecycle_log_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/Library/Logs")
            .join(PRODUCT_DIR)
            .join(LIFECYCLE_FILE),
    ];
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        paths.push(
            PathBuf::from(home)
                .join("Library")
                .join("Logs")
                .join(PRODUCT_DIR)
                .join(LIFECYCLE_FILE),
        );
    }
    paths.push(std::env::temp_dir().join(LIFECYCLE_FILE));
    paths
}

/// 書き込み可能な最初の場所に1行追記し、書けたパスを返す
pub fn write_line_to_paths(line: &str, paths: &[PathBuf]) -> Option<PathBuf> {
    for path in paths {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            if file.write_all(line.as_bytes()).is_ok() {
                let _ = file.flush();
                return Some(path.clone());
            }
        }
    }
    None
}

/// 既定の出力先にライフサイクル行を書き込む
pub fn write_lifecycle_line(component: &str, message: &str) {
    let line = lifecycle_line(component, message);
    if write_line_to_paths(&line, &default_lifecycle_log_paths()).is_none() {
        tracing::warn!(component, "lifecycle log not writable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_line_has_timestamp_and_component() {
        let line = lifecycle_line("CLI", "install ok");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] [CLI] install ok\n"));
        let ts = &line[1..line.find(']').unwrap()];
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2025-01-15T10:30:00.123Z".len());
    }

    #[test]
    fn writes_to_first_writable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        // blocker はファイルなので、その下にはディレクトリを作れない
        let unwritable = blocker.join("sub").join("x.log");
        let fallback = dir.path().join("logs").join("x.log");

        let used = write_line_to_paths("a\n", &[unwritable, fallback.clone()]);
        assert_eq!(used.as_deref(), Some(fallback.as_path()));
        write_line_to_paths("b\n", &[fallback.clone()]);
        assert_eq!(std::fs::read_to_string(&fallback).unwrap(), "a\nb\n");
    }

    #[test]
    fn default_paths_end_with_temp_dir() {
        let paths = default_lifecycle_log_paths();
        assert_eq!(
            paths.last().unwrap(),
            &std::env::temp_dir().join(LIFECYCLE_FILE)
        );
        assert!(paths[0].starts_with("/Library/Logs/HelperBless"));
    }
}
