//! バンドル情報ポート

/// 実行中プロセスのバンドル（Info.plist）情報
pub trait BundleInfo {
    /// CFBundleIdentifier（取得できなければ None）
    fn bundle_identifier(&self) -> Option<String>;

    /// 文字列または文字列配列のキーを読む（無ければ空）
    fn info_strings(&self, key: &str) -> Vec<String>;
}
