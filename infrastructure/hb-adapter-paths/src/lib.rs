//! HelperBlessの既定パス解決

use hb_domain::model::HelperDomain;
use std::path::PathBuf;

const PRODUCT_DIR: &str = "HelperBless";
const SOCKET_SUFFIX: &str = ".socket";

/// 既定の製品ルートディレクトリ
///
/// - macOS: `~/Library/Application Support/HelperBless`
/// - その他: `./var`（開発/テスト用）
pub fn default_product_root_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        match home_dir() {
            Some(home) => home
                .join("Library")
                .join("Application Support")
                .join(PRODUCT_DIR),
            None => PathBuf::from("./var"),
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        PathBuf::from("./var")
    }
}

/// 設定ファイルの既定パス
pub fn default_config_path() -> PathBuf {
    default_product_root_dir().join("config.json")
}

/// ヘルパーの待受ソケットパス
///
/// - system: `/var/run/<label>.socket`
/// - user: `$TMPDIR/<label>.socket`
pub fn helper_socket_path(domain: HelperDomain, label: &str) -> PathBuf {
    let name = format!("{}{}", file_component(label), SOCKET_SUFFIX);
    match domain {
        HelperDomain::System => PathBuf::from("/var/run").join(name),
        HelperDomain::User => std::env::temp_dir().join(name),
    }
}

/// ラベルを1つのパス要素に収める（区切り文字は置換）
fn file_component(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c == '/' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

#[cfg(target_os = "macos")]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_socket_lives_in_var_run() {
        let path = helper_socket_path(HelperDomain::System, "com.example.HelperBless.Helper");
        assert_eq!(
            path,
            PathBuf::from("/var/run/com.example.HelperBless.Helper.socket")
        );
    }

    #[test]
    fn user_socket_lives_in_temp_dir() {
        let path = helper_socket_path(HelperDomain::User, "com.example.HelperBless.Helper");
        assert_eq!(
            path,
            std::env::temp_dir().join("com.example.HelperBless.Helper.socket")
        );
    }

    #[test]
    fn label_cannot_escape_directory() {
        let path = helper_socket_path(HelperDomain::System, "../../etc/passwd");
        assert_eq!(path, PathBuf::from("/var/run/.._.._etc_passwd.socket"));
        assert_eq!(
            helper_socket_path(HelperDomain::System, ""),
            PathBuf::from("/var/run/_.socket")
        );
    }

    #[test]
    fn config_path_is_json_under_root() {
        let path = default_config_path();
        assert!(path.ends_with("config.json"));
        assert!(path.starts_with(default_product_root_dir()));
    }
}
