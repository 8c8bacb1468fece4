//! Bound directory session and its operations.
//!
//! A [`DirectoryClient`] is constructed bound: the constructor connects,
//! binds as `user@domain` (retrying up to the configured attempt count) and
//! returns a session that stays bound until dropped. All operations reuse
//! that session. Listing operations drive the server's paged-results
//! control; oversized multi-valued attributes are completed through range
//! retrieval.

use std::collections::HashSet;
use std::sync::Arc;

use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchOptions, SearchStream,
};
use tracing::{debug, info, instrument, warn};

use idops_core::audit::{AuditEvent, AuditSink, TracingAuditSink};
use idops_core::credentials::CredentialProvider;
use idops_core::error::{DirectoryError, DirectoryResult};

use crate::config::DirectoryConfig;
use crate::dn::{escape_rdn_value, looks_like_dn};
use crate::entry::{AttrValues, DirectoryEntry};
use crate::filters;
use crate::password::{encode_unicode_pwd, random_password, require_tls};
use crate::range::RangeMarker;
use crate::uac::{self, UserAccountControl};

/// Result code: size limit exceeded (expected when a cap is in force).
const RC_SIZELIMIT_EXCEEDED: u32 = 4;
/// Result code: no such object.
const RC_NO_SUCH_OBJECT: u32 = 32;
/// Result code: invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// Result code: entry already exists.
const RC_ALREADY_EXISTS: u32 = 68;

/// Options for search operations.
#[derive(Debug, Clone, Default)]
pub struct SearchOpts {
    /// Attributes to return. `None` requests all user attributes.
    pub attributes: Option<Vec<String>>,
    /// Search base override. Defaults to the configured base DN.
    pub base: Option<String>,
    /// Cap on delivered entries. `0`/`None` means unbounded.
    pub max_records: Option<u32>,
}

impl SearchOpts {
    /// Request specific attributes.
    pub fn with_attributes<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    /// Override the search base.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Cap the number of delivered entries.
    #[must_use]
    pub fn with_max_records(mut self, max: u32) -> Self {
        self.max_records = Some(max);
        self
    }

    fn cap(&self) -> Option<u32> {
        self.max_records.filter(|m| *m > 0)
    }
}

/// Attribute changes for a modify operation, applied in replace → add →
/// delete order, each list in its given order.
#[derive(Debug, Clone, Default)]
pub struct AttributeChanges {
    /// Attributes to replace wholesale.
    pub replace: Vec<(String, Vec<String>)>,
    /// Values to add.
    pub add: Vec<(String, Vec<String>)>,
    /// Values to delete. An empty value list removes the attribute.
    pub delete: Vec<(String, Vec<String>)>,
}

impl AttributeChanges {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a replace.
    pub fn replace<S: Into<String>>(mut self, attr: S, values: Vec<String>) -> Self {
        self.replace.push((attr.into(), values));
        self
    }

    /// Queue an add.
    pub fn add<S: Into<String>>(mut self, attr: S, values: Vec<String>) -> Self {
        self.add.push((attr.into(), values));
        self
    }

    /// Queue a delete.
    pub fn delete<S: Into<String>>(mut self, attr: S, values: Vec<String>) -> Self {
        self.delete.push((attr.into(), values));
        self
    }

    /// True when no operation is queued.
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty() && self.add.is_empty() && self.delete.is_empty()
    }
}

/// Description of a user account to create.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Distinguished name of the new entry.
    pub dn: String,
    /// sAMAccountName.
    pub sam_account_name: String,
    /// displayName.
    pub display_name: String,
    /// userPrincipalName.
    pub user_principal_name: String,
    /// servicePrincipalName values, if any.
    pub service_principal_names: Vec<String>,
}

/// Kind of machine principal a host account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    /// Domain-member workstation or server.
    Workstation,
    /// Unix host keytab principal.
    UnixHost,
}

impl HostKind {
    /// The userAccountControl bits this kind ends up with.
    pub fn uac_bits(self) -> u32 {
        match self {
            HostKind::Workstation => uac::COMPUTER,
            HostKind::UnixHost => uac::UNIXHOST,
        }
    }
}

/// Description of a host account to create.
#[derive(Debug, Clone)]
pub struct NewHost {
    /// Distinguished name of the new entry.
    pub dn: String,
    /// sAMAccountName.
    pub sam_account_name: String,
    /// Host FQDN, registered as the `host/<fqdn>` servicePrincipalName.
    pub host_name: String,
    /// Which trust bits the account carries.
    pub kind: HostKind,
}

/// A pull-based stream of search results.
///
/// Entries are fetched one page at a time from the server; at most one page
/// is buffered. The consumer pulls entries with [`EntryStream::next_entry`]
/// and must not issue mutating operations on the same session until the
/// stream is finished.
pub struct EntryStream {
    inner: SearchStream<'static, String, Vec<String>>,
    delivered: u64,
    cap: Option<u64>,
}

impl EntryStream {
    /// Pull the next entry, or `None` when the stream is exhausted or the
    /// configured cap has been reached.
    pub async fn next_entry(&mut self) -> DirectoryResult<Option<DirectoryEntry>> {
        if let Some(cap) = self.cap {
            if self.delivered >= cap {
                return Ok(None);
            }
        }
        match self.inner.next().await {
            Ok(Some(raw)) => {
                self.delivered += 1;
                Ok(Some(DirectoryEntry::from_result_entry(raw)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DirectoryError::search_failed_with_source(
                "search stream failed",
                e,
            )),
        }
    }

    /// Number of entries delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Drain the server side and check the final result.
    pub async fn finish(mut self) -> DirectoryResult<()> {
        let res = self.inner.finish().await;
        match res.rc {
            0 => Ok(()),
            RC_SIZELIMIT_EXCEEDED => Ok(()),
            rc => Err(DirectoryError::search_failed(format!(
                "search ended with code {}: {}",
                rc, res.text
            ))),
        }
    }
}

/// A bound session against the directory.
///
/// Not safe to share across threads; callers wanting parallelism run
/// independent clients.
pub struct DirectoryClient {
    ldap: Ldap,
    config: DirectoryConfig,
    bound_principal: String,
    audit: Arc<dyn AuditSink>,
}

impl DirectoryClient {
    /// Connect and bind using the password carried in the configuration.
    #[instrument(skip(config), fields(user = %config.user, domain = %config.domain))]
    pub async fn connect(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;
        let password = config
            .password
            .clone()
            .ok_or_else(|| DirectoryError::invalid_argument(
                "password missing; set it or use connect_with_provider",
            ))?;
        Self::bind_session(config, password).await
    }

    /// Connect and bind, pulling the password from `provider` (realm `ads`)
    /// when the configuration omits one.
    #[instrument(skip(config, provider), fields(user = %config.user, domain = %config.domain))]
    pub async fn connect_with_provider(
        config: DirectoryConfig,
        provider: &dyn CredentialProvider,
    ) -> DirectoryResult<Self> {
        config.validate()?;
        let password = match config.password.clone() {
            Some(password) => password,
            None => provider.get(&config.user, "ads").await?,
        };
        Self::bind_session(config, password).await
    }

    /// Verify a candidate credential pair by attempting a single bind.
    ///
    /// Returns `Ok(false)` on a refused bind; other failures propagate.
    pub async fn check_password(
        base_config: &DirectoryConfig,
        user: &str,
        password: &str,
    ) -> DirectoryResult<bool> {
        let mut config = base_config.clone();
        config.user = user.to_string();
        config.password = Some(password.to_string());
        config.connection = config.connection.with_bind_retries(1);
        match Self::connect(config).await {
            Ok(client) => {
                let _ = client.unbind().await;
                Ok(true)
            }
            Err(DirectoryError::BindFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn bind_session(config: DirectoryConfig, password: String) -> DirectoryResult<Self> {
        let principal = config.bind_principal();
        let retries = config.connection.bind_retries.max(1);
        let mut last_message = String::new();

        for attempt in 1..=retries {
            match Self::try_bind(&config, &principal, &password).await {
                Ok(ldap) => {
                    info!(
                        url = %config.url(),
                        principal = %principal,
                        attempt,
                        "directory session bound"
                    );
                    return Ok(Self {
                        ldap,
                        config,
                        bound_principal: principal,
                        audit: Arc::new(TracingAuditSink),
                    });
                }
                Err(message) => {
                    warn!(attempt, retries, error = %message, "bind attempt failed");
                    last_message = message;
                }
            }
        }

        Err(DirectoryError::BindFailed {
            message: last_message,
        })
    }

    async fn try_bind(
        config: &DirectoryConfig,
        principal: &str,
        password: &str,
    ) -> Result<Ldap, String> {
        let settings = LdapConnSettings::new().set_conn_timeout(config.connection.timeout());
        let url = config.url();

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| format!("connect to {url} failed: {e}"))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "connection driver error");
            }
        });

        let result = ldap
            .with_timeout(config.connection.timeout())
            .simple_bind(principal, password)
            .await
            .map_err(|e| format!("bind transport error: {e}"))?;

        match result.rc {
            0 => Ok(ldap),
            RC_INVALID_CREDENTIALS => Err(format!("invalid credentials: {}", result.text)),
            rc => Err(format!("bind failed with code {}: {}", rc, result.text)),
        }
    }

    /// Replace the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// The configuration the session was built from.
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// The principal the session is bound as.
    pub fn bound_principal(&self) -> &str {
        &self.bound_principal
    }

    /// Unbind and drop the session.
    pub async fn unbind(mut self) -> DirectoryResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| DirectoryError::protocol_with_source("unbind failed", e))
    }

    fn audit_mutation(&self, action: &str, target: &str, result: &DirectoryResult<()>) {
        let actor = self.bound_principal.as_str();
        let event = match result {
            Ok(()) => AuditEvent::success(action, target, actor),
            Err(e) => AuditEvent::failure(action, target, actor).with_detail(e.to_string()),
        };
        self.audit.record(event);
    }

    // ---- search primitives ----

    /// Open a paged search and return a pull-based entry stream.
    ///
    /// The page size is the configured one, reduced to `max_records` when
    /// that cap is smaller; the cap also bounds total delivery across pages
    /// and is offered to the server as a size limit.
    pub async fn stream_matches(
        &mut self,
        filter: &str,
        opts: &SearchOpts,
    ) -> DirectoryResult<EntryStream> {
        let base = opts
            .base
            .clone()
            .unwrap_or_else(|| self.config.effective_base_dn());
        self.open_stream(
            &base,
            Scope::Subtree,
            filter,
            opts.attributes.clone(),
            opts.cap(),
        )
        .await
    }

    async fn open_stream(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: Option<Vec<String>>,
        cap: Option<u32>,
    ) -> DirectoryResult<EntryStream> {
        let mut page_size = self.config.page_size;
        if let Some(cap) = cap {
            if (cap as i64) < i64::from(page_size) {
                page_size = cap as i32;
            }
            self.ldap
                .with_search_options(SearchOptions::new().sizelimit(cap as i32));
        }

        let adapters: Vec<Box<dyn Adapter<String, Vec<String>>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(page_size)),
        ];

        let attrs = attributes.unwrap_or_else(|| vec!["*".to_string()]);
        debug!(base, filter, page_size, "opening paged search");

        let stream = self
            .ldap
            .streaming_search_with(adapters, base, scope, filter, attrs)
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("search failed", e))?;

        Ok(EntryStream {
            inner: stream,
            delivered: 0,
            cap: cap.map(u64::from),
        })
    }

    async fn collect_matches(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: Option<Vec<String>>,
        cap: Option<u32>,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut stream = self
            .open_stream(base, scope, filter, attributes, cap)
            .await?;
        let mut entries = Vec::new();
        while let Some(entry) = stream.next_entry().await? {
            entries.push(entry);
        }
        stream.finish().await?;
        Ok(entries)
    }

    async fn first_match(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<DirectoryEntry>> {
        let attrs = attributes.iter().map(|s| s.to_string()).collect();
        let mut found = self
            .collect_matches(base, Scope::Subtree, filter, Some(attrs), Some(1))
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Find the DN of an account by sAMAccountName, falling back to
    /// userPrincipalName.
    #[instrument(skip(self))]
    pub async fn find_dn(&mut self, sam: &str) -> DirectoryResult<Option<String>> {
        let base = self.config.effective_base_dn();

        let filter = filters::by_sam_account_name(sam);
        if let Some(entry) = self
            .first_match(&base, &filter, &["distinguishedName"])
            .await?
        {
            return Ok(Some(Self::entry_dn(&entry)));
        }

        let filter = filters::by_user_principal_name(sam, &self.config.domain);
        if let Some(entry) = self
            .first_match(&base, &filter, &["distinguishedName"])
            .await?
        {
            return Ok(Some(Self::entry_dn(&entry)));
        }

        Ok(None)
    }

    /// Find the DN of a host by its `host/` service principal name.
    #[instrument(skip(self))]
    pub async fn find_host_dn(&mut self, host: &str) -> DirectoryResult<Option<String>> {
        let base = self.config.effective_base_dn();
        let filter = filters::by_host_spn(host);
        Ok(self
            .first_match(&base, &filter, &["distinguishedName"])
            .await?
            .map(|entry| Self::entry_dn(&entry)))
    }

    fn entry_dn(entry: &DirectoryEntry) -> String {
        entry
            .first("distinguishedName")
            .map(str::to_string)
            .unwrap_or_else(|| entry.dn().to_string())
    }

    /// Look up an account's userPrincipalName, lowercased.
    #[instrument(skip(self))]
    pub async fn find_upn(&mut self, sam: &str) -> DirectoryResult<Option<String>> {
        let base = self.config.effective_base_dn();
        let filter = filters::by_sam_account_name(sam);
        Ok(self
            .first_match(&base, &filter, &["userPrincipalName"])
            .await?
            .and_then(|entry| entry.first("userPrincipalName").map(|s| s.to_lowercase())))
    }

    /// Fetch a single account's attributes by sAMAccountName.
    ///
    /// Range-marked attributes are transparently completed. Returns `None`
    /// when the account does not exist.
    #[instrument(skip(self, opts))]
    pub async fn get_attributes(
        &mut self,
        sam: &str,
        opts: &SearchOpts,
    ) -> DirectoryResult<Option<DirectoryEntry>> {
        let base = opts
            .base
            .clone()
            .unwrap_or_else(|| self.config.effective_base_dn());
        let filter = filters::by_sam_account_name(sam);
        let mut found = self
            .collect_matches(
                &base,
                Scope::Subtree,
                &filter,
                opts.attributes.clone(),
                Some(1),
            )
            .await?;
        if found.is_empty() {
            return Ok(None);
        }
        let mut entry = found.swap_remove(0);
        self.expand_ranges(&mut entry).await?;
        Ok(Some(entry))
    }

    /// Fetch an entry's attributes by DN (base scope).
    #[instrument(skip(self))]
    pub async fn get_dn_attributes(
        &mut self,
        dn: &str,
        attributes: Option<Vec<String>>,
    ) -> DirectoryResult<Option<DirectoryEntry>> {
        let mut found = self
            .collect_matches(dn, Scope::Base, filters::ANY_ENTRY, attributes, Some(1))
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Collect all entries matching a caller-supplied filter.
    #[instrument(skip(self, opts))]
    pub async fn get_attributes_match(
        &mut self,
        filter: &str,
        opts: &SearchOpts,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let base = opts
            .base
            .clone()
            .unwrap_or_else(|| self.config.effective_base_dn());
        self.collect_matches(
            &base,
            Scope::Subtree,
            filter,
            opts.attributes.clone(),
            opts.cap(),
        )
        .await
    }

    /// List one attribute (default `sAMAccountName`) of every entry where
    /// `attr` equals `value`.
    #[instrument(skip(self))]
    pub async fn list_by(
        &mut self,
        attr: &str,
        value: &str,
        wanted: Option<&str>,
    ) -> DirectoryResult<Vec<String>> {
        let wanted = wanted.unwrap_or("sAMAccountName");
        let base = self.config.effective_base_dn();
        let filter = filters::equals(attr, value);
        let mut stream = self
            .open_stream(
                &base,
                Scope::Subtree,
                &filter,
                Some(vec![wanted.to_string()]),
                None,
            )
            .await?;

        let mut out = Vec::new();
        while let Some(entry) = stream.next_entry().await? {
            if let Some(v) = entry.first(wanted) {
                out.push(v.to_string());
            }
        }
        stream.finish().await?;
        Ok(out)
    }

    // ---- range retrieval ----

    /// Fetch the complete value list of a many-valued attribute, following
    /// range continuations until the terminal chunk.
    #[instrument(skip(self))]
    pub async fn get_large_attribute(
        &mut self,
        dn: &str,
        attr: &str,
    ) -> DirectoryResult<Vec<String>> {
        let mut values = Vec::new();
        let mut selector = attr.to_string();

        loop {
            let (chunk, next) = self.fetch_range_chunk(dn, &selector, attr).await?;
            values.extend(chunk);
            match next {
                Some(marker) => match marker.next_selector() {
                    Some(next_selector) => selector = next_selector,
                    None => break,
                },
                None => break,
            }
        }
        Ok(values)
    }

    /// One range round trip: returns the chunk's values and the marker when
    /// the server signalled a non-terminal range.
    async fn fetch_range_chunk(
        &mut self,
        dn: &str,
        selector: &str,
        attr: &str,
    ) -> DirectoryResult<(Vec<String>, Option<RangeMarker>)> {
        let entry = match self
            .get_dn_attributes(dn, Some(vec![selector.to_string()]))
            .await?
        {
            Some(entry) => entry,
            None => return Err(DirectoryError::NotFound {
                identifier: dn.to_string(),
            }),
        };

        // Exact (unranged) delivery means the attribute fit in one response.
        for attribute in entry.attributes() {
            if attribute.name.eq_ignore_ascii_case(attr) {
                if let AttrValues::Text(values) = &attribute.values {
                    return Ok((values.clone(), None));
                }
            }
        }

        for attribute in entry.attributes() {
            let Some(marker) = RangeMarker::parse(&attribute.name) else {
                continue;
            };
            if !marker.is_for(attr) {
                continue;
            }
            if let AttrValues::Text(values) = &attribute.values {
                let next = if marker.is_terminal() { None } else { Some(marker) };
                return Ok((values.clone(), next));
            }
        }

        Ok((Vec::new(), None))
    }

    /// Complete every range-marked attribute of an entry in place. Markers
    /// for attributes the entry does not otherwise carry are merged under
    /// the bare attribute name; unrelated option-bearing names are left
    /// alone.
    async fn expand_ranges(&mut self, entry: &mut DirectoryEntry) -> DirectoryResult<()> {
        let ranged: Vec<(String, RangeMarker)> = entry
            .attributes()
            .iter()
            .filter_map(|a| RangeMarker::parse(&a.name).map(|m| (a.name.clone(), m)))
            .collect();

        let dn = entry.dn().to_string();
        for (name, marker) in ranged {
            let Some(attr) = entry.remove(&name) else {
                continue;
            };
            if let AttrValues::Text(values) = attr.values {
                entry.append_text(&marker.attr, values);
            }

            let mut cursor = marker;
            while let Some(selector) = cursor.next_selector() {
                let (chunk, next) = self.fetch_range_chunk(&dn, &selector, &cursor.attr).await?;
                entry.append_text(&cursor.attr, chunk);
                match next {
                    Some(m) => cursor = m,
                    None => break,
                }
            }
        }
        Ok(())
    }

    // ---- mutations ----

    /// Create a user account.
    ///
    /// The entry is added disabled with a generated password, then enabled
    /// with a non-expiring password that is actually required.
    #[instrument(skip(self, user), fields(dn = %user.dn, sam = %user.sam_account_name))]
    pub async fn create_user(&mut self, user: &NewUser) -> DirectoryResult<String> {
        require_tls(self.config.use_tls)?;
        let result = self.create_user_inner(user).await;
        self.audit_mutation("create_user", &user.dn, &result);
        result.map(|()| user.dn.clone())
    }

    async fn create_user_inner(&mut self, user: &NewUser) -> DirectoryResult<()> {
        let password = random_password();
        let encoded = encode_unicode_pwd(&password)?;

        let mut attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = vec![
            (
                b"objectClass".to_vec(),
                ["top", "person", "organizationalPerson", "user"]
                    .iter()
                    .map(|s| s.as_bytes().to_vec())
                    .collect(),
            ),
            (
                b"sAMAccountName".to_vec(),
                HashSet::from([user.sam_account_name.as_bytes().to_vec()]),
            ),
            (
                b"displayName".to_vec(),
                HashSet::from([user.display_name.as_bytes().to_vec()]),
            ),
            (
                b"userPrincipalName".to_vec(),
                HashSet::from([user.user_principal_name.as_bytes().to_vec()]),
            ),
            (
                b"userAccountControl".to_vec(),
                HashSet::from([b"0".to_vec()]),
            ),
            (b"unicodePwd".to_vec(), HashSet::from([encoded])),
        ];
        if !user.service_principal_names.is_empty() {
            attrs.push((
                b"servicePrincipalName".to_vec(),
                user.service_principal_names
                    .iter()
                    .map(|s| s.as_bytes().to_vec())
                    .collect(),
            ));
        }

        let result = self.ldap.add(&user.dn, attrs).await.map_err(|e| {
            DirectoryError::CreateFailed {
                message: format!("add {} failed", user.dn),
                source: Some(Box::new(e)),
            }
        })?;
        Self::check_add_result(&user.dn, &result)?;

        self.enable(&user.sam_account_name).await?;
        self.modify_uac_bits(
            &user.sam_account_name,
            uac::DONT_EXPIRE_PASSWORD,
            uac::PASSWD_NOTREQD,
        )
        .await?;

        info!(dn = %user.dn, "user created");
        Ok(())
    }

    /// Create a machine account for a host, discoverable afterwards via
    /// [`Self::find_host_dn`].
    ///
    /// The entry is added disabled with a generated password, then switched
    /// to the trust bits its kind requires.
    #[instrument(skip(self, host), fields(dn = %host.dn, sam = %host.sam_account_name))]
    pub async fn create_host_account(&mut self, host: &NewHost) -> DirectoryResult<String> {
        require_tls(self.config.use_tls)?;
        let result = self.create_host_inner(host).await;
        self.audit_mutation("create_host_account", &host.dn, &result);
        result.map(|()| host.dn.clone())
    }

    async fn create_host_inner(&mut self, host: &NewHost) -> DirectoryResult<()> {
        let password = random_password();
        let encoded = encode_unicode_pwd(&password)?;
        let spn = format!("host/{}", host.host_name);

        let attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = vec![
            (
                b"objectClass".to_vec(),
                ["top", "person", "organizationalPerson", "user"]
                    .iter()
                    .map(|s| s.as_bytes().to_vec())
                    .collect(),
            ),
            (
                b"sAMAccountName".to_vec(),
                HashSet::from([host.sam_account_name.as_bytes().to_vec()]),
            ),
            (
                b"servicePrincipalName".to_vec(),
                HashSet::from([spn.into_bytes()]),
            ),
            (
                b"userAccountControl".to_vec(),
                HashSet::from([b"0".to_vec()]),
            ),
            (b"unicodePwd".to_vec(), HashSet::from([encoded])),
        ];

        let result = self.ldap.add(&host.dn, attrs).await.map_err(|e| {
            DirectoryError::CreateFailed {
                message: format!("add {} failed", host.dn),
                source: Some(Box::new(e)),
            }
        })?;
        Self::check_add_result(&host.dn, &result)?;

        self.modify_uac_bits(
            &host.sam_account_name,
            host.kind.uac_bits(),
            uac::ACCOUNTDISABLE | uac::PASSWD_NOTREQD,
        )
        .await?;

        info!(dn = %host.dn, kind = ?host.kind, "host account created");
        Ok(())
    }

    fn check_add_result(dn: &str, result: &LdapResult) -> DirectoryResult<()> {
        match result.rc {
            0 => Ok(()),
            RC_ALREADY_EXISTS => Err(DirectoryError::CreateFailed {
                message: format!("entry already exists: {dn}"),
                source: None,
            }),
            rc => Err(DirectoryError::CreateFailed {
                message: format!("add failed with code {}: {}", rc, result.text),
                source: None,
            }),
        }
    }

    /// Create a security-enabled domain-local group.
    ///
    /// When `ou` is absent, groups named `ng-*` default to the NetGroups
    /// container; anything else requires an explicit target.
    #[instrument(skip(self))]
    pub async fn create_security_group(
        &mut self,
        group: &str,
        ou: Option<&str>,
    ) -> DirectoryResult<String> {
        let base = self.config.effective_base_dn();
        let container = match ou {
            Some(ou) => ou.to_string(),
            None if group.starts_with("ng-") => format!("OU=NetGroups,{base}"),
            None => {
                return Err(DirectoryError::invalid_argument(format!(
                    "no target OU for group {group}"
                )))
            }
        };
        let dn = format!("cn={},{}", escape_rdn_value(group), container);

        let result = self.create_group_inner(&dn, group).await;
        self.audit_mutation("create_security_group", &dn, &result);
        result.map(|()| dn)
    }

    async fn create_group_inner(&mut self, dn: &str, group: &str) -> DirectoryResult<()> {
        let group_type = crate::decode::security_domain_local_wire();
        let attrs: Vec<(&str, HashSet<&str>)> = vec![
            ("objectClass", HashSet::from(["top", "group"])),
            ("sAMAccountName", HashSet::from([group])),
            ("groupType", HashSet::from([group_type.as_str()])),
        ];

        let result =
            self.ldap
                .add(dn, attrs)
                .await
                .map_err(|e| DirectoryError::CreateFailed {
                    message: format!("add {dn} failed"),
                    source: Some(Box::new(e)),
                })?;
        Self::check_add_result(dn, &result)?;

        info!(dn, "security group created");
        Ok(())
    }

    /// Delete a user account by sAMAccountName.
    #[instrument(skip(self))]
    pub async fn delete_user(&mut self, sam: &str) -> DirectoryResult<()> {
        let dn = self
            .find_dn(sam)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                identifier: sam.to_string(),
            })?;

        let result = self.delete_dn_inner(&dn).await;
        self.audit_mutation("delete_user", &dn, &result);
        result
    }

    async fn delete_dn_inner(&mut self, dn: &str) -> DirectoryResult<()> {
        let result = self
            .ldap
            .delete(dn)
            .await
            .map_err(|e| DirectoryError::DeleteFailed {
                message: format!("delete {dn} failed"),
                source: Some(Box::new(e)),
            })?;

        match result.rc {
            0 => {
                info!(dn, "entry deleted");
                Ok(())
            }
            RC_NO_SUCH_OBJECT => Err(DirectoryError::NotFound {
                identifier: dn.to_string(),
            }),
            rc => Err(DirectoryError::DeleteFailed {
                message: format!("delete failed with code {}: {}", rc, result.text),
                source: None,
            }),
        }
    }

    /// Apply an ordered set of attribute changes to an account.
    ///
    /// `user` is a sAMAccountName or a DN. All queued operations go out in
    /// one modify.
    #[instrument(skip(self, changes))]
    pub async fn set_attributes(
        &mut self,
        user: &str,
        changes: &AttributeChanges,
    ) -> DirectoryResult<()> {
        if changes.is_empty() {
            return Err(DirectoryError::invalid_argument(
                "no replace/add/delete operations given",
            ));
        }

        let dn = self.resolve_dn(user).await?;
        let result = self.modify_inner(&dn, changes).await;
        self.audit_mutation("set_attributes", &dn, &result);
        result
    }

    async fn modify_inner(&mut self, dn: &str, changes: &AttributeChanges) -> DirectoryResult<()> {
        let mut mods: Vec<Mod<String>> = Vec::new();
        for (attr, values) in &changes.replace {
            mods.push(Mod::Replace(
                attr.clone(),
                values.iter().cloned().collect(),
            ));
        }
        for (attr, values) in &changes.add {
            mods.push(Mod::Add(attr.clone(), values.iter().cloned().collect()));
        }
        for (attr, values) in &changes.delete {
            mods.push(Mod::Delete(attr.clone(), values.iter().cloned().collect()));
        }

        let result =
            self.ldap
                .modify(dn, mods)
                .await
                .map_err(|e| DirectoryError::ModifyFailed {
                    message: format!("modify {dn} failed"),
                    source: Some(Box::new(e)),
                })?;

        match result.rc {
            0 => Ok(()),
            RC_NO_SUCH_OBJECT => Err(DirectoryError::NotFound {
                identifier: dn.to_string(),
            }),
            rc => Err(DirectoryError::modify_failed(format!(
                "modify failed with code {}: {}",
                rc, result.text
            ))),
        }
    }

    /// Set an account's password.
    ///
    /// Clears PASSWD_NOTREQD afterwards so the stored password is enforced.
    #[instrument(skip(self, password))]
    pub async fn set_password(&mut self, user: &str, password: &str) -> DirectoryResult<()> {
        require_tls(self.config.use_tls)?;
        let encoded = encode_unicode_pwd(password)?;
        let dn = self.resolve_dn(user).await?;

        let result = self.set_password_inner(&dn, encoded).await;
        self.audit_mutation("set_password", &dn, &result);
        if result.is_ok() {
            self.modify_uac_bits(user, 0, uac::PASSWD_NOTREQD).await?;
        }
        result
    }

    async fn set_password_inner(&mut self, dn: &str, encoded: Vec<u8>) -> DirectoryResult<()> {
        let mods = vec![Mod::Replace(
            b"unicodePwd".to_vec(),
            HashSet::from([encoded]),
        )];
        let result =
            self.ldap
                .modify(dn, mods)
                .await
                .map_err(|e| DirectoryError::ModifyFailed {
                    message: format!("password modify {dn} failed"),
                    source: Some(Box::new(e)),
                })?;

        match result.rc {
            0 => Ok(()),
            RC_NO_SUCH_OBJECT => Err(DirectoryError::NotFound {
                identifier: dn.to_string(),
            }),
            rc => Err(DirectoryError::modify_failed(format!(
                "password modify failed with code {}: {}",
                rc, result.text
            ))),
        }
    }

    /// Move an account under a new superior, keeping its CN.
    #[instrument(skip(self))]
    pub async fn move_user(&mut self, user: &str, target: &str) -> DirectoryResult<()> {
        let dn = self.resolve_dn(user).await?;
        let entry = self
            .get_dn_attributes(&dn, Some(vec!["cn".to_string()]))
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                identifier: dn.clone(),
            })?;
        let cn = entry
            .first("cn")
            .ok_or_else(|| DirectoryError::modify_failed(format!("{dn} has no cn")))?;
        let new_rdn = format!("cn={}", escape_rdn_value(cn));

        let result = self.modifydn_inner(&dn, &new_rdn, Some(target)).await;
        self.audit_mutation("move_user", &dn, &result);
        result
    }

    /// Rename an account in place (new CN, same superior).
    #[instrument(skip(self))]
    pub async fn rename_user(&mut self, user: &str, new_cn: &str) -> DirectoryResult<()> {
        let dn = self.resolve_dn(user).await?;
        let new_rdn = format!("cn={}", escape_rdn_value(new_cn));

        let result = self.modifydn_inner(&dn, &new_rdn, None).await;
        self.audit_mutation("rename_user", &dn, &result);
        result
    }

    async fn modifydn_inner(
        &mut self,
        dn: &str,
        new_rdn: &str,
        new_superior: Option<&str>,
    ) -> DirectoryResult<()> {
        let result = self
            .ldap
            .modifydn(dn, new_rdn, true, new_superior)
            .await
            .map_err(|e| DirectoryError::MoveFailed {
                message: format!("modrdn {dn} failed"),
                source: Some(Box::new(e)),
            })?;

        match result.rc {
            0 => {
                info!(dn, new_rdn, "entry relocated");
                Ok(())
            }
            RC_NO_SUCH_OBJECT => Err(DirectoryError::NotFound {
                identifier: dn.to_string(),
            }),
            rc => Err(DirectoryError::MoveFailed {
                message: format!("modrdn failed with code {}: {}", rc, result.text),
                source: None,
            }),
        }
    }

    async fn resolve_dn(&mut self, user: &str) -> DirectoryResult<String> {
        if looks_like_dn(user) {
            return Ok(user.to_string());
        }
        self.find_dn(user)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                identifier: user.to_string(),
            })
    }

    // ---- userAccountControl read-modify-write ----

    /// Read an account's current userAccountControl value.
    pub async fn get_uac(&mut self, user: &str) -> DirectoryResult<u32> {
        let opts = SearchOpts::default().with_attributes(["userAccountControl"]);
        let entry = self
            .get_attributes(user, &opts)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                identifier: user.to_string(),
            })?;
        entry
            .first("userAccountControl")
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| DirectoryError::Decode {
                message: format!("{user} has no readable userAccountControl"),
            })
    }

    /// Read-modify-write the userAccountControl bitmask. Bits in `reset`
    /// win over bits in `set`. Returns the written value.
    #[instrument(skip(self))]
    pub async fn modify_uac_bits(
        &mut self,
        user: &str,
        set: u32,
        reset: u32,
    ) -> DirectoryResult<u32> {
        let current = UserAccountControl::from_value(self.get_uac(user).await?);
        let updated = current.apply(set, reset);

        let changes = AttributeChanges::new().replace(
            "userAccountControl",
            vec![u32::from(updated).to_string()],
        );
        self.set_attributes(user, &changes).await?;

        if self.config.debug {
            let written = UserAccountControl::from_value(self.get_uac(user).await?);
            debug!(
                user,
                previous = %current,
                written = %written,
                disabled = written.is_disabled(),
                "userAccountControl updated"
            );
        }

        Ok(updated.value)
    }

    /// Enable an account: mark it initialized and clear the disable bit.
    pub async fn enable(&mut self, user: &str) -> DirectoryResult<()> {
        self.modify_uac_bits(user, uac::NORMAL_ACCOUNT, uac::ACCOUNTDISABLE)
            .await
            .map(|_| ())
    }

    /// Disable an account.
    pub async fn disable(&mut self, user: &str) -> DirectoryResult<()> {
        self.modify_uac_bits(user, uac::ACCOUNTDISABLE, 0)
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("bound_principal", &self.bound_principal)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_opts_builders() {
        let opts = SearchOpts::default()
            .with_attributes(["cn", "mail"])
            .with_base("OU=People,DC=mst,DC=edu")
            .with_max_records(10);
        assert_eq!(opts.attributes.as_ref().unwrap().len(), 2);
        assert_eq!(opts.cap(), Some(10));

        let opts = SearchOpts::default().with_max_records(0);
        assert_eq!(opts.cap(), None);
    }

    #[test]
    fn test_attribute_changes_ordering() {
        let changes = AttributeChanges::new()
            .replace("mail", vec!["a@mst.edu".to_string()])
            .add("proxyAddresses", vec!["smtp:a@mst.edu".to_string()])
            .delete("extensionAttribute1", vec![]);
        assert!(!changes.is_empty());
        assert_eq!(changes.replace.len(), 1);
        assert_eq!(changes.add.len(), 1);
        assert_eq!(changes.delete.len(), 1);
    }

    #[test]
    fn test_attribute_changes_empty() {
        assert!(AttributeChanges::new().is_empty());
    }

    #[test]
    fn test_host_kind_uac_bits() {
        assert_eq!(HostKind::Workstation.uac_bits(), uac::COMPUTER);
        assert_eq!(HostKind::UnixHost.uac_bits(), uac::UNIXHOST);

        // Both machine shapes carry the delegation and DES key bits; only
        // the workstation shape is a trust account, only the unix-host
        // shape is an initialized normal account.
        for kind in [HostKind::Workstation, HostKind::UnixHost] {
            assert_ne!(kind.uac_bits() & uac::TRUSTED_FOR_DELEGATION, 0);
            assert_ne!(kind.uac_bits() & uac::USE_DES_KEY_ONLY, 0);
        }
        assert_ne!(
            HostKind::Workstation.uac_bits() & uac::WORKSTATION_TRUST_ACCOUNT,
            0
        );
        assert_eq!(HostKind::Workstation.uac_bits() & uac::NORMAL_ACCOUNT, 0);
        assert_ne!(HostKind::UnixHost.uac_bits() & uac::NORMAL_ACCOUNT, 0);
    }
}
