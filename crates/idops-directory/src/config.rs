//! Directory client configuration
//!
//! An explicit configuration record replaces the legacy free-form option bag:
//! every recognized field is a struct member, unknown fields are rejected at
//! deserialization time.

use serde::{Deserialize, Serialize};

use idops_core::error::{DirectoryError, DirectoryResult};
use idops_core::settings::ConnectionSettings;

/// Well-known directory ports, by (global catalog, TLS).
const PORT_GC_TLS: u16 = 3269;
const PORT_GC_PLAIN: u16 = 3268;
const PORT_DS_TLS: u16 = 636;
const PORT_DS_PLAIN: u16 = 389;

/// Configuration for a [`crate::DirectoryClient`] session.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Account the session binds as (sAMAccountName, without realm).
    pub user: String,

    /// Bind password. When absent it is pulled from the credential provider
    /// under realm `"ads"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Directory DNS domain (e.g. `mst.edu`). Also the bind realm.
    pub domain: String,

    /// Server host. Defaults to the domain name (DNS round-robin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Explicit port. Defaults from the TLS/global-catalog combination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Use LDAPS. Required for password operations.
    #[serde(default = "default_true")]
    pub use_tls: bool,

    /// Query the Global Catalog instead of the domain partition.
    #[serde(default)]
    pub use_global_catalog: bool,

    /// Page size for paged searches.
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Bind timeout and retry policy.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Verbose progress output (re-reads after UAC writes, etc.).
    #[serde(default)]
    pub debug: bool,

    /// Search base. Defaults from the domain labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> i32 {
    25
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("user", &self.user)
            .field(
                "password",
                &self.password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("domain", &self.domain)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("use_global_catalog", &self.use_global_catalog)
            .field("page_size", &self.page_size)
            .field("connection", &self.connection)
            .field("debug", &self.debug)
            .field("base_dn", &self.base_dn)
            .finish()
    }
}

impl DirectoryConfig {
    /// Create a configuration for `user` against `domain` with defaults.
    pub fn new(user: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: None,
            domain: domain.into(),
            server: None,
            port: None,
            use_tls: true,
            use_global_catalog: false,
            page_size: default_page_size(),
            connection: ConnectionSettings::default(),
            debug: false,
            base_dn: None,
        }
    }

    /// Set the bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set an explicit server host.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Disable TLS (plain LDAP).
    #[must_use]
    pub fn without_tls(mut self) -> Self {
        self.use_tls = false;
        self
    }

    /// Target the Global Catalog.
    #[must_use]
    pub fn with_global_catalog(mut self) -> Self {
        self.use_global_catalog = true;
        self
    }

    /// Set the paged-search page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set an explicit search base.
    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = Some(base_dn.into());
        self
    }

    /// The port the session will connect to.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        match (self.use_global_catalog, self.use_tls) {
            (true, true) => PORT_GC_TLS,
            (true, false) => PORT_GC_PLAIN,
            (false, true) => PORT_DS_TLS,
            (false, false) => PORT_DS_PLAIN,
        }
    }

    /// The host the session will connect to.
    #[must_use]
    pub fn effective_server(&self) -> &str {
        self.server.as_deref().unwrap_or(&self.domain)
    }

    /// The search base for all operations.
    ///
    /// Derived from the domain's DNS labels (`a.b` → `DC=a,DC=b`) when not
    /// set explicitly. Global Catalog sessions search the whole forest, so
    /// they default to the forest-root suffix (the last label).
    #[must_use]
    pub fn effective_base_dn(&self) -> String {
        if let Some(ref base) = self.base_dn {
            return base.clone();
        }
        if self.use_global_catalog {
            match self.domain.rsplit('.').next() {
                Some(root) if !root.is_empty() => return format!("DC={root}"),
                _ => {}
            }
        }
        self.domain
            .split('.')
            .map(|label| format!("DC={label}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The principal the session binds as (`user@domain`).
    #[must_use]
    pub fn bind_principal(&self) -> String {
        format!("{}@{}", self.user, self.domain)
    }

    /// The LDAP URL for the session.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "ldaps" } else { "ldap" };
        format!(
            "{}://{}:{}",
            scheme,
            self.effective_server(),
            self.effective_port()
        )
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.user.is_empty() {
            return Err(DirectoryError::invalid_argument("user is required"));
        }
        if self.domain.is_empty() {
            return Err(DirectoryError::invalid_argument("domain is required"));
        }
        if self.page_size < 1 {
            return Err(DirectoryError::invalid_argument(format!(
                "page_size must be positive, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = DirectoryConfig::new("svc", "mst.edu");
        assert_eq!(config.effective_port(), 636);

        let config = DirectoryConfig::new("svc", "mst.edu").without_tls();
        assert_eq!(config.effective_port(), 389);

        let config = DirectoryConfig::new("svc", "mst.edu").with_global_catalog();
        assert_eq!(config.effective_port(), 3269);

        let config = DirectoryConfig::new("svc", "mst.edu")
            .with_global_catalog()
            .without_tls();
        assert_eq!(config.effective_port(), 3268);
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = DirectoryConfig::new("svc", "mst.edu").with_port(10636);
        assert_eq!(config.effective_port(), 10636);
    }

    #[test]
    fn test_base_dn_from_domain() {
        let config = DirectoryConfig::new("svc", "mst.edu");
        assert_eq!(config.effective_base_dn(), "DC=mst,DC=edu");

        let config = DirectoryConfig::new("svc", "umr.edu");
        assert_eq!(config.effective_base_dn(), "DC=umr,DC=edu");
    }

    #[test]
    fn test_base_dn_global_catalog() {
        let config = DirectoryConfig::new("svc", "mst.edu").with_global_catalog();
        assert_eq!(config.effective_base_dn(), "DC=edu");
    }

    #[test]
    fn test_base_dn_explicit() {
        let config = DirectoryConfig::new("svc", "mst.edu").with_base_dn("OU=People,DC=mst,DC=edu");
        assert_eq!(config.effective_base_dn(), "OU=People,DC=mst,DC=edu");
    }

    #[test]
    fn test_bind_principal_and_url() {
        let config = DirectoryConfig::new("svc-adm", "mst.edu");
        assert_eq!(config.bind_principal(), "svc-adm@mst.edu");
        assert_eq!(config.url(), "ldaps://mst.edu:636");

        let config = config.with_server("dc1.mst.edu");
        assert_eq!(config.url(), "ldaps://dc1.mst.edu:636");
    }

    #[test]
    fn test_validation() {
        assert!(DirectoryConfig::new("svc", "mst.edu").validate().is_ok());
        assert!(DirectoryConfig::new("", "mst.edu").validate().is_err());
        assert!(DirectoryConfig::new("svc", "").validate().is_err());
        assert!(DirectoryConfig::new("svc", "mst.edu")
            .with_page_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"user":"svc","domain":"mst.edu","pagesize":50}"#;
        assert!(serde_json::from_str::<DirectoryConfig>(json).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DirectoryConfig::new("svc", "mst.edu").with_password("secret");
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("***REDACTED***"));
    }
}
