//! 署名検証アダプター
//! macOS: SecCodeCopyGuestWithAttributes + SecCodeCheckValidity で
//!        実行中プロセスが署名要件を満たすか検証
//! 非macOS: 未対応として扱う

use hb_domain::model::SignatureStatus;
use hb_domain::port::driven::SignatureVerifier;

#[derive(Debug, Default)]
pub struct SignatureAdapter;

impl SignatureAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "macos")]
mod mac {
    use hb_domain::model::SignatureStatus;
    use objc2_core_foundation::{CFDictionary, CFNumber, CFRetained, CFString};
    use objc2_security::{
        SecCSFlags, SecCode, SecRequirement, errSecCSReqFailed, errSecCSUnsigned, errSecSuccess,
        kSecGuestAttributePid,
    };
    use std::ptr::NonNull;

    /// pid で実行中プロセスのコードオブジェクトを得る
    fn copy_guest(pid: i32) -> Result<CFRetained<SecCode>, String> {
        // SAFETY: フレームワークが提供する不変の定数文字列。
        let key = unsafe { kSecGuestAttributePid };
        let key: Option<&CFString> = key.into();
        let key = key.ok_or("kSecGuestAttributePid unavailable")?;
        let number = CFNumber::new_i32(pid);
        let attributes = CFDictionary::from_slices(&[key], &[&*number]);
        let mut code: *mut SecCode = std::ptr::null_mut();
        // SAFETY: attributes は有効な辞書。code は Copy 規則で所有する。
        let status = unsafe {
            SecCode::copy_guest_with_attributes(
                None,
                Some(attributes.as_opaque()),
                SecCSFlags::DefaultFlags,
                NonNull::from(&mut code),
            )
        };
        if status != errSecSuccess {
            return Err(format!("SecCodeCopyGuestWithAttributes failed (OSStatus {status})"));
        }
        let code = NonNull::new(code).ok_or("SecCodeCopyGuestWithAttributes returned no code")?;
        // SAFETY: 成功時 code は所有済み。
        Ok(unsafe { CFRetained::from_raw(code) })
    }

    fn create_requirement(text: &str) -> Result<CFRetained<SecRequirement>, String> {
        let text = CFString::from_str(text);
        let mut requirement: *mut SecRequirement = std::ptr::null_mut();
        // SAFETY: text は有効な CFString。requirement は Create 規則で所有する。
        let status = unsafe {
            SecRequirement::create_with_string(
                &text,
                SecCSFlags::DefaultFlags,
                NonNull::from(&mut requirement),
            )
        };
        if status != errSecSuccess {
            return Err(format!("invalid code requirement (OSStatus {status})"));
        }
        let requirement = NonNull::new(requirement).ok_or("invalid code requirement")?;
        // SAFETY: 成功時 requirement は所有済み。
        Ok(unsafe { CFRetained::from_raw(requirement) })
    }

    pub fn verify_process(pid: i32, requirement: &str) -> SignatureStatus {
        let requirement = match create_requirement(requirement) {
            Ok(req) => req,
            Err(message) => return SignatureStatus::Error { message },
        };
        let code = match copy_guest(pid) {
            Ok(code) => code,
            Err(message) => return SignatureStatus::Error { message },
        };
        // SAFETY: code と requirement は有効。
        let status =
            unsafe { code.check_validity(SecCSFlags::DefaultFlags, Some(&requirement)) };
        if status == errSecSuccess {
            SignatureStatus::Satisfied
        } else if status == errSecCSUnsigned {
            SignatureStatus::Unsigned
        } else if status == errSecCSReqFailed {
            SignatureStatus::NotSatisfied {
                reason: "code requirement not satisfied".into(),
            }
        } else {
            SignatureStatus::Error {
                message: format!("SecCodeCheckValidity failed (OSStatus {status})"),
            }
        }
    }
}

#[cfg(target_os = "macos")]
impl SignatureVerifier for SignatureAdapter {
    fn verify_process(&self, pid: i32, requirement: &str) -> SignatureStatus {
        let status = mac::verify_process(pid, requirement);
        tracing::debug!(pid, ?status, "code signature checked");
        status
    }
}

#[cfg(not(target_os = "macos"))]
impl SignatureVerifier for SignatureAdapter {
    fn verify_process(&self, _pid: i32, _requirement: &str) -> SignatureStatus {
        SignatureStatus::Unsupported {
            reason: "code signature verification not supported on this platform".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn non_macos_is_unsupported() {
        let status = SignatureAdapter::new().verify_process(1, "anchor apple");
        assert!(matches!(status, SignatureStatus::Unsupported { .. }));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn malformed_requirement_is_an_error() {
        let status =
            SignatureAdapter::new().verify_process(std::process::id() as i32, "this is not (");
        assert!(matches!(status, SignatureStatus::Error { .. }));
    }
}
