//! 認可アダプター
//! macOS: Security.framework の AuthorizationCreate / AuthorizationFree
//! 非macOS: 構築時に Authorization エラー

use hb_domain::DomainError;

#[cfg(target_os = "macos")]
pub use objc2_security::AuthorizationRef;

const CREATE_FAILED: &str = "Cannot create an authorization for the current process";

/// プロセス単位の認可コンテキスト。
///
/// ハンドルは構築時に取得し、drop でちょうど1回解放する。
/// Clone/Copy は実装しない。
#[derive(Debug)]
pub struct AuthorizationContext {
    #[cfg(target_os = "macos")]
    handle: AuthorizationRef,
    #[cfg(not(target_os = "macos"))]
    _unavailable: (),
}

// ハンドルは不透明で、Security.framework はスレッド間の利用を許す
#[cfg(target_os = "macos")]
unsafe impl Send for AuthorizationContext {}
#[cfg(target_os = "macos")]
unsafe impl Sync for AuthorizationContext {}

#[cfg(target_os = "macos")]
impl AuthorizationContext {
    /// 権利を事前要求せずに認可ハンドルを作る
    pub fn new() -> Result<Self, DomainError> {
        use objc2_security::{AuthorizationCreate, AuthorizationFlags, errAuthorizationSuccess};

        let mut handle: AuthorizationRef = std::ptr::null_mut();
        // SAFETY: rights/environment は NULL 可。handle は書き込み先として有効。
        let status = unsafe {
            AuthorizationCreate(
                std::ptr::null(),
                std::ptr::null(),
                AuthorizationFlags::Defaults,
                &mut handle,
            )
        };
        if status != errAuthorizationSuccess || handle.is_null() {
            tracing::warn!(status, "AuthorizationCreate failed");
            return Err(DomainError::Authorization(CREATE_FAILED.into()));
        }
        tracing::debug!("authorization created");
        Ok(Self { handle })
    }

    /// ServiceManagement 呼び出し用の生ハンドル（所有権は移らない）
    pub fn as_raw(&self) -> AuthorizationRef {
        self.handle
    }
}

#[cfg(not(target_os = "macos"))]
impl AuthorizationContext {
    pub fn new() -> Result<Self, DomainError> {
        Err(DomainError::Authorization(format!(
            "{CREATE_FAILED} (authorization services are not available on {})",
            std::env::consts::OS
        )))
    }
}

#[cfg(target_os = "macos")]
impl Drop for AuthorizationContext {
    fn drop(&mut self) {
        use objc2_security::{AuthorizationFlags, AuthorizationFree, errAuthorizationSuccess};

        // SAFETY: handle は new で取得した有効なハンドルで、ここでのみ解放する。
        let status = unsafe { AuthorizationFree(self.handle, AuthorizationFlags::Defaults) };
        if status != errAuthorizationSuccess {
            tracing::warn!(status, "AuthorizationFree failed");
        }
    }
}
