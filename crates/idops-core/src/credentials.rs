//! Credential provider contract
//!
//! The libraries never read secrets themselves. A host program supplies an
//! implementation of [`CredentialProvider`]; the directory client asks it for
//! the bind password (realm `"ads"`) when the configuration omits one.

use async_trait::async_trait;

use crate::error::{DirectoryError, DirectoryResult};

/// Source of secrets keyed by principal and realm.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch the secret for `user` within `realm`.
    async fn get(&self, user: &str, realm: &str) -> DirectoryResult<String>;
}

/// Provider that reads secrets from environment variables.
///
/// The variable name is `<PREFIX>_<REALM>_<USER>` uppercased, with any
/// non-alphanumeric characters replaced by underscores. Intended for
/// development and tests; production hosts wire in their own vault-backed
/// provider.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    prefix: String,
}

impl EnvCredentialProvider {
    /// Create a provider with the given variable-name prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, user: &str, realm: &str) -> String {
        let sanitize = |s: &str| {
            s.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        };
        format!("{}_{}_{}", self.prefix, sanitize(realm), sanitize(user))
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new("IDOPS")
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn get(&self, user: &str, realm: &str) -> DirectoryResult<String> {
        let name = self.var_name(user, realm);
        std::env::var(&name).map_err(|_| DirectoryError::Credential {
            message: format!("no secret for {user}@{realm} ({name} unset)"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_name_sanitization() {
        let provider = EnvCredentialProvider::new("IDOPS");
        assert_eq!(provider.var_name("svc-adm", "ads"), "IDOPS_ADS_SVC_ADM");
        assert_eq!(
            provider.var_name("jdoe@mst.edu", "ads"),
            "IDOPS_ADS_JDOE_MST_EDU"
        );
    }

    #[tokio::test]
    async fn test_env_provider_missing() {
        let provider = EnvCredentialProvider::new("IDOPS_TEST_NONE");
        let err = provider.get("nobody", "ads").await.unwrap_err();
        assert_eq!(err.error_code(), "CREDENTIAL");
    }

    #[tokio::test]
    async fn test_env_provider_present() {
        std::env::set_var("IDOPS_TEST_ADS_SVC", "hunter2");
        let provider = EnvCredentialProvider::new("IDOPS_TEST");
        let secret = provider.get("svc", "ads").await.unwrap();
        assert_eq!(secret, "hunter2");
        std::env::remove_var("IDOPS_TEST_ADS_SVC");
    }
}
