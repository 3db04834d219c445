use crate::error::{DomainError, ValidationField};
use crate::policy::HelperNamingPolicy;

/// launchd のジョブ登録先。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelperDomain {
    /// ユーザーごとの launchd
    User,
    /// システム全体の launchd（特権ヘルパーの既定）
    #[default]
    System,
}

impl HelperDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// 1つの特権ヘルパー登録を指す不変の識別子。
///
/// 構築時に命名ポリシーで検証済み（ラベルは非空で、
/// 呼び出し元アプリのバンドル識別子で始まる）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperIdentity {
    domain: HelperDomain,
    label: String,
}

impl HelperIdentity {
    /// ポリシーで検証してから識別子を作る。
    pub fn new(
        domain: HelperDomain,
        label: &str,
        bundle_identifier: Option<&str>,
        policy: &dyn HelperNamingPolicy,
    ) -> Result<Self, DomainError> {
        policy.check_label(label, bundle_identifier)?;
        Ok(Self {
            domain,
            label: label.to_string(),
        })
    }

    pub fn domain(&self) -> HelperDomain {
        self.domain
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// ヘルパー自身が待ち受けるジョブ名。
///
/// 呼び出し元バンドルを持たないため命名規約は見ず、空でないことだけを保証する。
/// クライアント側の `HelperIdentity` には変換できない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLabel {
    domain: HelperDomain,
    label: String,
}

impl ServiceLabel {
    pub fn new(domain: HelperDomain, label: &str) -> Result<Self, DomainError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DomainError::validation(
                ValidationField::Label,
                "Label cannot be empty.",
            ));
        }
        Ok(Self {
            domain,
            label: label.to_string(),
        })
    }

    pub fn domain(&self) -> HelperDomain {
        self.domain
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NamingConventionPolicy;

    #[test]
    fn domain_parses_case_insensitively() {
        assert_eq!(HelperDomain::from_str(" System "), Some(HelperDomain::System));
        assert_eq!(HelperDomain::from_str("user"), Some(HelperDomain::User));
        assert_eq!(HelperDomain::from_str("global"), None);
        assert_eq!(HelperDomain::default(), HelperDomain::System);
    }

    #[test]
    fn identity_requires_bundle_prefix() {
        let policy = NamingConventionPolicy;
        let ok = HelperIdentity::new(
            HelperDomain::System,
            "com.example.HelperBless.Helper",
            Some("com.example.HelperBless"),
            &policy,
        )
        .unwrap();
        assert_eq!(ok.label(), "com.example.HelperBless.Helper");
        assert_eq!(ok.domain(), HelperDomain::System);

        let err = HelperIdentity::new(
            HelperDomain::System,
            "org.other.Helper",
            Some("com.example.HelperBless"),
            &policy,
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn identity_cannot_skip_naming_policy() {
        let policy = NamingConventionPolicy;
        let empty = HelperIdentity::new(
            HelperDomain::System,
            "",
            Some("com.example.HelperBless"),
            &policy,
        )
        .unwrap_err();
        assert_eq!(empty.message(), "Label cannot be empty.");
        let without_bundle =
            HelperIdentity::new(HelperDomain::System, "org.evil.Helper", None, &policy).unwrap_err();
        assert_eq!(without_bundle.title(), "Invalid Bundle");
    }

    #[test]
    fn service_label_must_not_be_blank() {
        let label = ServiceLabel::new(HelperDomain::User, " com.example.HelperBless.Helper ").unwrap();
        assert_eq!(label.label(), "com.example.HelperBless.Helper");
        assert_eq!(label.domain(), HelperDomain::User);
        for blank in ["", "   "] {
            let err = ServiceLabel::new(HelperDomain::System, blank).unwrap_err();
            assert_eq!(err.title(), "Invalid Label");
        }
    }
}
