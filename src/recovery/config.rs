//! Per-tenant recovery settings read from the governance service.

use super::error::{ErrorCode, RecoveryError, Result};
use super::external::GovernanceConfig;
use std::sync::Arc;
use tracing::instrument;

pub const QUESTION_RECOVERY_ENABLE: &str = "Recovery.Question.Password.Enable";
pub const QUESTION_MIN_ANSWERS: &str = "Recovery.Question.Password.MinAnswers";

#[derive(Clone)]
pub struct RecoveryConfig {
    governance: Arc<dyn GovernanceConfig>,
}

impl RecoveryConfig {
    pub fn new(governance: Arc<dyn GovernanceConfig>) -> Self {
        Self { governance }
    }

    /// Value of `key` for `tenant_domain`; a missing key is an error.
    ///
    /// # Errors
    /// `issue_in_loading_recovery_configs` when the key is absent or the
    /// governance service fails.
    #[instrument(skip(self))]
    pub async fn recovery_config(&self, key: &str, tenant_domain: &str) -> Result<String> {
        let properties = self
            .governance
            .get_config(tenant_domain, &[key])
            .await
            .map_err(|e| loading_error(key).with_source(e))?;

        properties
            .into_iter()
            .find(|property| property.name == key)
            .map(|property| property.value)
            .ok_or_else(|| loading_error(key))
    }

    /// First value returned for `key`, `None` when nothing is configured.
    ///
    /// # Errors
    /// `issue_in_loading_recovery_configs` when the governance service fails.
    #[instrument(skip(self))]
    pub async fn connector_config(&self, key: &str, tenant_domain: &str) -> Result<Option<String>> {
        let properties = self
            .governance
            .get_config(tenant_domain, &[key])
            .await
            .map_err(|e| loading_error(key).with_source(e))?;

        Ok(properties.into_iter().next().map(|property| property.value))
    }

    /// Boolean setting, absent or unparseable → `default`.
    ///
    /// # Errors
    /// `issue_in_loading_recovery_configs` when the governance service fails.
    pub async fn flag(&self, key: &str, tenant_domain: &str, default: bool) -> Result<bool> {
        Ok(self
            .connector_config(key, tenant_domain)
            .await?
            .and_then(|value| value.trim().parse::<bool>().ok())
            .unwrap_or(default))
    }
}

fn loading_error(key: &str) -> RecoveryError {
    RecoveryError::new(
        ErrorCode::IssueInLoadingRecoveryConfigs,
        format!("Error loading recovery configs: {key}"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::recovery::memory::InMemoryDirectory;

    fn setup() -> (Arc<InMemoryDirectory>, RecoveryConfig) {
        let directory = Arc::new(InMemoryDirectory::default());
        directory.insert_config("carbon.super", QUESTION_RECOVERY_ENABLE, "true");
        let config = RecoveryConfig::new(directory.clone());
        (directory, config)
    }

    #[tokio::test]
    async fn present_key_is_returned() {
        let (_, config) = setup();
        let value = config
            .recovery_config(QUESTION_RECOVERY_ENABLE, "carbon.super")
            .await
            .unwrap();
        assert_eq!(value, "true");
    }

    #[tokio::test]
    async fn missing_key_is_server_error() {
        let (_, config) = setup();
        let err = config
            .recovery_config(QUESTION_MIN_ANSWERS, "carbon.super")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IssueInLoadingRecoveryConfigs);
        assert!(!err.is_client());
    }

    #[tokio::test]
    async fn connector_config_absent_is_none() {
        let (_, config) = setup();
        assert_eq!(
            config
                .connector_config(QUESTION_MIN_ANSWERS, "carbon.super")
                .await
                .unwrap(),
            None
        );
        assert!(config
            .flag(QUESTION_RECOVERY_ENABLE, "carbon.super", false)
            .await
            .unwrap());
        assert!(!config
            .flag(QUESTION_RECOVERY_ENABLE, "acme.com", false)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let (directory, config) = setup();
        directory.set_config_offline(true);
        let err = config
            .connector_config(QUESTION_RECOVERY_ENABLE, "carbon.super")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IssueInLoadingRecoveryConfigs);
    }
}
