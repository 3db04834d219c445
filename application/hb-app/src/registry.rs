//! ヘルパー登録のユースケース（install / remove / is_installed）

use hb_domain::DomainError;
use hb_domain::model::{HelperDomain, HelperIdentity};
use hb_domain::policy::HelperNamingPolicy;
use hb_domain::port::driven::{JobRegistry, JobRegistryProvider};
use hb_domain::port::driving::HelperLifecycle;
use std::sync::{Arc, Mutex, MutexGuard};

/// 1つの特権ヘルパー登録。
///
/// 識別子の検証に成功した後でのみ認可済みレジストリを開く。
pub struct HelperRegistry {
    identity: HelperIdentity,
    policy: Arc<dyn HelperNamingPolicy>,
    registry: Mutex<Box<dyn JobRegistry>>,
}

impl HelperRegistry {
    pub fn new(
        domain: HelperDomain,
        label: &str,
        bundle_identifier: Option<&str>,
        policy: Arc<dyn HelperNamingPolicy>,
        provider: &dyn JobRegistryProvider,
    ) -> Result<Self, DomainError> {
        let identity = HelperIdentity::new(domain, label, bundle_identifier, policy.as_ref())?;
        let registry = provider.open()?;
        tracing::debug!(label, domain = domain.as_str(), "helper registry opened");
        Ok(Self {
            identity,
            policy,
            registry: Mutex::new(registry),
        })
    }

    fn registry(&self) -> MutexGuard<'_, Box<dyn JobRegistry>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HelperLifecycle for HelperRegistry {
    fn identity(&self) -> &HelperIdentity {
        &self.identity
    }

    fn is_installed(&self) -> bool {
        let label = self.identity.label();
        match self.registry().copy_job(self.identity.domain(), label) {
            Ok(Some(record)) => self.policy.is_installed_record(label, &record),
            Ok(None) => false,
            Err(err) => {
                tracing::debug!(label, error = %err, "job lookup failed");
                false
            }
        }
    }

    fn install(&self) -> Result<(), DomainError> {
        let label = self.identity.label();
        self.registry().bless(self.identity.domain(), label)?;
        tracing::info!(label, "helper blessed");
        Ok(())
    }

    fn remove(&self) -> Result<(), DomainError> {
        let label = self.identity.label();
        self.registry().remove(self.identity.domain(), label, true)?;
        tracing::info!(label, "helper removed");
        Ok(())
    }
}
