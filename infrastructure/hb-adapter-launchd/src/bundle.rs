use hb_domain::port::driven::BundleInfo;

/// メインバンドル情報アダプター。
/// バンドル識別子が取れない場合のみ設定値を使う。
#[derive(Debug, Default, Clone)]
pub struct BundleAdapter {
    fallback_identifier: Option<String>,
}

impl BundleAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback_identifier: Option<String>) -> Self {
        Self {
            fallback_identifier: fallback_identifier.filter(|id| !id.trim().is_empty()),
        }
    }
}

impl BundleInfo for BundleAdapter {
    fn bundle_identifier(&self) -> Option<String> {
        main_bundle_identifier().or_else(|| {
            if let Some(id) = &self.fallback_identifier {
                tracing::debug!(bundle = %id, "using configured bundle identifier");
            }
            self.fallback_identifier.clone()
        })
    }

    fn info_strings(&self, key: &str) -> Vec<String> {
        main_bundle_info_strings(key)
    }
}

#[cfg(target_os = "macos")]
fn main_bundle_identifier() -> Option<String> {
    use objc2_core_foundation::CFBundle;

    // SAFETY: メインバンドルはプロセス中有効。戻り値は保持済み。
    let bundle = unsafe { CFBundle::main_bundle() }?;
    // SAFETY: bundle は有効な CFBundle。
    let identifier = unsafe { bundle.identifier() }?;
    Some(identifier.to_string()).filter(|id| !id.is_empty())
}

#[cfg(not(target_os = "macos"))]
fn main_bundle_identifier() -> Option<String> {
    None
}

/// Info.plist の値を読む。文字列なら1件、文字列配列なら文字列要素のみ
#[cfg(target_os = "macos")]
fn main_bundle_info_strings(key: &str) -> Vec<String> {
    use objc2_core_foundation::{CFArray, CFBundle, CFString, CFType};

    // SAFETY: メインバンドルはプロセス中有効。
    let Some(bundle) = (unsafe { CFBundle::main_bundle() }) else {
        return Vec::new();
    };
    let key = CFString::from_str(key);
    // SAFETY: key は有効な CFString。値は保持済みで返る。
    let Some(value) = (unsafe { bundle.value_for_info_dictionary_key(Some(&key)) }) else {
        return Vec::new();
    };
    if let Some(text) = value.downcast_ref::<CFString>() {
        return vec![text.to_string()];
    }
    let Some(array) = value.downcast_ref::<CFArray>() else {
        tracing::debug!("Info.plist value is neither a string nor an array");
        return Vec::new();
    };
    // SAFETY: 要素はいずれも CF オブジェクト。型は要素ごとに確認する。
    let array = unsafe { array.cast_unchecked::<CFType>() };
    array
        .iter()
        .filter_map(|item| item.downcast_ref::<CFString>().map(|text| text.to_string()))
        .collect()
}

#[cfg(not(target_os = "macos"))]
fn main_bundle_info_strings(_key: &str) -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "macos")]
    #[test]
    fn test_binary_has_no_authorized_clients() {
        // テストバイナリには Info.plist が埋め込まれていない
        assert!(BundleAdapter::new().info_strings("SMAuthorizedClients").is_empty());
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn falls_back_to_configured_identifier() {
        let adapter = BundleAdapter::with_fallback(Some("com.example.HelperBless".into()));
        assert_eq!(
            adapter.bundle_identifier().as_deref(),
            Some("com.example.HelperBless")
        );
        assert_eq!(BundleAdapter::with_fallback(Some(" ".into())).bundle_identifier(), None);
        assert!(adapter.info_strings("SMPrivilegedExecutables").is_empty());
    }
}
