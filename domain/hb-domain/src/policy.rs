//! ヘルパー命名規約ポリシー
//!
//! ラベルの妥当性と「インストール済み」判定をまとめたポリシー。
//! 既定の `NamingConventionPolicy` は命名規約のみを見ており、
//! 登録済みプログラムのコード署名は検証しない。
//! より強い判定が必要になった場合はこのトレイトを差し替える。

use crate::error::{DomainError, ValidationField};
use crate::model::InstalledJobRecord;

/// ラベル検証とインストール判定のポリシー
pub trait HelperNamingPolicy: Send + Sync {
    /// OS 呼び出し前にラベルを検証する。
    fn check_label(&self, label: &str, bundle_identifier: Option<&str>) -> Result<(), DomainError>;

    /// 取得したジョブレコードを「このヘルパーのもの」とみなすか。
    fn is_installed_record(&self, label: &str, record: &InstalledJobRecord) -> bool;
}

/// 既定の命名規約ポリシー
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingConventionPolicy;

impl HelperNamingPolicy for NamingConventionPolicy {
    fn check_label(&self, label: &str, bundle_identifier: Option<&str>) -> Result<(), DomainError> {
        if label.is_empty() {
            return Err(DomainError::validation(
                ValidationField::Label,
                "Label cannot be empty.",
            ));
        }
        let bundle = match bundle_identifier {
            Some(bundle) if !bundle.is_empty() => bundle,
            _ => {
                return Err(DomainError::validation(
                    ValidationField::Bundle,
                    "Cannot retrieve CFBundleIdentifier from the main bundle.",
                ));
            }
        };
        if !label.starts_with(bundle) {
            return Err(DomainError::validation(
                ValidationField::Label,
                format!("Label does not begin with {bundle}"),
            ));
        }
        Ok(())
    }

    fn is_installed_record(&self, label: &str, record: &InstalledJobRecord) -> bool {
        record.label == label && record.program.ends_with(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = "com.example.HelperBless";

    #[test]
    fn empty_label_is_checked_first() {
        let err = NamingConventionPolicy.check_label("", None).unwrap_err();
        assert_eq!(err.title(), "Invalid Label");
        assert_eq!(err.message(), "Label cannot be empty.");
    }

    #[test]
    fn missing_or_empty_bundle_is_rejected() {
        for bundle in [None, Some("")] {
            let err = NamingConventionPolicy
                .check_label("com.example.HelperBless.Helper", bundle)
                .unwrap_err();
            assert_eq!(err.title(), "Invalid Bundle");
            assert_eq!(
                err.message(),
                "Cannot retrieve CFBundleIdentifier from the main bundle."
            );
        }
    }

    #[test]
    fn label_must_begin_with_bundle() {
        let err = NamingConventionPolicy
            .check_label("org.other.Helper", Some(BUNDLE))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Label does not begin with com.example.HelperBless"
        );
        assert!(NamingConventionPolicy
            .check_label("com.example.HelperBless.Helper", Some(BUNDLE))
            .is_ok());
    }

    #[test]
    fn installed_requires_label_and_program_suffix() {
        let label = "com.example.HelperBless.Helper";
        let installed = InstalledJobRecord::new(
            label,
            "/Library/PrivilegedHelperTools/com.example.HelperBless.Helper",
        );
        assert!(NamingConventionPolicy.is_installed_record(label, &installed));

        let wrong_program = InstalledJobRecord::new(label, "/usr/local/bin/other");
        assert!(!NamingConventionPolicy.is_installed_record(label, &wrong_program));

        let wrong_label = InstalledJobRecord::new(
            "com.example.HelperBless.Other",
            "/Library/PrivilegedHelperTools/com.example.HelperBless.Helper",
        );
        assert!(!NamingConventionPolicy.is_installed_record(label, &wrong_label));
    }

    #[test]
    fn record_without_program_is_not_installed() {
        let label = "com.example.HelperBless.Helper";
        let no_program = InstalledJobRecord::new(label, "");
        assert!(!NamingConventionPolicy.is_installed_record(label, &no_program));
    }
}
