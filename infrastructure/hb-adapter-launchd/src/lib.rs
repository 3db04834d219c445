//! launchd ジョブレジストリアダプター
//! macOS: ServiceManagement の SMJobBless / SMJobRemove / SMJobCopyDictionary
//! 非macOS: 問い合わせは「未登録」、変更操作は Unsupported

mod bundle;

pub use bundle::BundleAdapter;

use hb_adapter_authorization::AuthorizationContext;
use hb_domain::DomainError;
use hb_domain::model::{HelperDomain, InstalledJobRecord};
use hb_domain::port::driven::{JobRegistry, JobRegistryProvider};

/// open() のたびに認可ハンドルを取得してレジストリを返す
#[derive(Debug, Default)]
pub struct LaunchdJobRegistryProvider;

impl LaunchdJobRegistryProvider {
    pub fn new() -> Self {
        Self
    }
}

impl JobRegistryProvider for LaunchdJobRegistryProvider {
    fn open(&self) -> Result<Box<dyn JobRegistry>, DomainError> {
        let auth = AuthorizationContext::new()?;
        Ok(Box::new(LaunchdJobRegistry::new(auth)))
    }
}

/// 認可ハンドルを所有する launchd レジストリ
#[derive(Debug)]
pub struct LaunchdJobRegistry {
    auth: AuthorizationContext,
}

impl LaunchdJobRegistry {
    pub fn new(auth: AuthorizationContext) -> Self {
        Self { auth }
    }
}

#[cfg(target_os = "macos")]
mod mac {
    use hb_adapter_authorization::AuthorizationRef;
    use hb_domain::model::{HelperDomain, InstalledJobRecord};
    use objc2_core_foundation::{CFDictionary, CFError, CFRetained, CFString, CFType};
    use objc2_service_management::{
        SMJobBless, SMJobCopyDictionary, SMJobRemove, kSMDomainSystemLaunchd, kSMDomainUserLaunchd,
    };
    use std::ptr::NonNull;

    fn domain_ref(domain: HelperDomain) -> Option<&'static CFString> {
        // SAFETY: フレームワークが提供する不変の定数文字列。
        let domain = unsafe {
            match domain {
                HelperDomain::System => kSMDomainSystemLaunchd,
                HelperDomain::User => kSMDomainUserLaunchd,
            }
        };
        domain.into()
    }

    /// 失敗時に out_error へ格納された CFError（Create 規則）から失敗理由を取り出す
    fn take_error_reason(err: *mut CFError) -> Option<String> {
        // SAFETY: ServiceManagement が所有権付きで格納したもの。ここで1度だけ解放する。
        let err: CFRetained<CFError> = unsafe { CFRetained::from_raw(NonNull::new(err)?) };
        // SAFETY: err は有効な CFError。
        let reason = unsafe { err.failure_reason() }?;
        Some(reason.to_string())
    }

    /// 辞書から文字列値を読む。キーが無いか文字列でなければ None
    fn dictionary_string(dict: &CFDictionary, key: &str) -> Option<String> {
        let key = CFString::from_str(key);
        // SAFETY: キーは有効な CFString。値は辞書が所有する（Get 規則）。
        let value = unsafe { dict.value((&*key as *const CFString).cast()) };
        // SAFETY: 非 NULL なら辞書の生存中は有効な CF オブジェクト。
        let value = unsafe { value.cast::<CFType>().as_ref() }?;
        value.downcast_ref::<CFString>().map(|text| text.to_string())
    }

    pub fn copy_job(domain: HelperDomain, label: &str) -> Option<InstalledJobRecord> {
        let cf_label = CFString::from_str(label);
        // SAFETY: 引数は有効な CFString。戻り値は Copy 規則で所有する。
        let dict = unsafe { SMJobCopyDictionary(domain_ref(domain), Some(&cf_label)) }?;
        // Program が無いレコードは空のパスとして扱い、インストール済みとはみなさない
        Some(InstalledJobRecord::new(
            dictionary_string(&dict, "Label").unwrap_or_default(),
            dictionary_string(&dict, "Program").unwrap_or_default(),
        ))
    }

    pub fn bless(
        domain: HelperDomain,
        label: &str,
        auth: AuthorizationRef,
    ) -> Result<(), Option<String>> {
        let cf_label = CFString::from_str(label);
        let mut err: *mut CFError = std::ptr::null_mut();
        // SAFETY: 引数はすべて有効。err は書き込み先。
        let ok = unsafe { SMJobBless(domain_ref(domain), Some(&cf_label), auth, &mut err) };
        if ok {
            return Ok(());
        }
        Err(take_error_reason(err))
    }

    pub fn remove(
        domain: HelperDomain,
        label: &str,
        auth: AuthorizationRef,
        wait: bool,
    ) -> Result<(), Option<String>> {
        let cf_label = CFString::from_str(label);
        let mut err: *mut CFError = std::ptr::null_mut();
        // SAFETY: 引数はすべて有効。err は書き込み先。
        let ok = unsafe { SMJobRemove(domain_ref(domain), Some(&cf_label), auth, wait, &mut err) };
        if ok {
            return Ok(());
        }
        Err(take_error_reason(err))
    }
}

#[cfg(target_os = "macos")]
impl JobRegistry for LaunchdJobRegistry {
    fn copy_job(
        &self,
        domain: HelperDomain,
        label: &str,
    ) -> Result<Option<InstalledJobRecord>, DomainError> {
        Ok(mac::copy_job(domain, label))
    }

    fn bless(&self, domain: HelperDomain, label: &str) -> Result<(), DomainError> {
        tracing::info!(label, domain = domain.as_str(), "SMJobBless");
        mac::bless(domain, label, self.auth.as_raw()).map_err(DomainError::install_failed)
    }

    fn remove(&self, domain: HelperDomain, label: &str, wait: bool) -> Result<(), DomainError> {
        tracing::info!(label, domain = domain.as_str(), wait, "SMJobRemove");
        mac::remove(domain, label, self.auth.as_raw(), wait).map_err(DomainError::remove_failed)
    }
}

#[cfg(not(target_os = "macos"))]
impl JobRegistry for LaunchdJobRegistry {
    fn copy_job(
        &self,
        _domain: HelperDomain,
        _label: &str,
    ) -> Result<Option<InstalledJobRecord>, DomainError> {
        let _ = &self.auth;
        Ok(None)
    }

    fn bless(&self, _domain: HelperDomain, _label: &str) -> Result<(), DomainError> {
        Err(DomainError::Unsupported(
            "launchd job registration is only available on macOS".into(),
        ))
    }

    fn remove(&self, _domain: HelperDomain, _label: &str, _wait: bool) -> Result<(), DomainError> {
        Err(DomainError::Unsupported(
            "launchd job removal is only available on macOS".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn provider_open_fails_with_authorization_error() {
        let err = LaunchdJobRegistryProvider::new().open().err().unwrap();
        assert!(matches!(err, DomainError::Authorization(_)));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn unknown_job_has_no_record() {
        let registry = LaunchdJobRegistryProvider::new().open().unwrap();
        let record = registry
            .copy_job(HelperDomain::User, "com.example.HelperBless.DoesNotExist")
            .unwrap();
        assert_eq!(record, None);
    }
}
