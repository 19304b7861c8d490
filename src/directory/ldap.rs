//! # LDAP Directory Client
//!
//! [`DirectoryClient`] over a blocking `ldap3` connection. Works against
//! Active Directory and other LDAPv3 servers.
//!
//! - Root resolution reads the RootDSE (`defaultNamingContext`,
//!   `namingContexts`)
//! - Existence checks are base-scope searches on the candidate DN
//! - Containers are added with `objectClass: top, organizationalUnit`

use crate::config::DirectoryConfig;
use crate::constants::{
    CONTAINER_NAMING_ATTRIBUTE, CONTAINER_OBJECT_CLASSES, DEFAULT_NAMING_CONTEXT_ATTRIBUTE,
    LDAP_NO_SUCH_OBJECT, LDAP_SUCCESS, NAMING_CONTEXTS_ATTRIBUTE,
};
use crate::directory::{DirectoryClient, DirectoryError};
use crate::dn::{ContainerAddress, DomainRoot, Segment};
use crate::observability::metrics;
use ldap3::{LdapConn, LdapConnSettings, Scope, SearchEntry, SearchResult};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, info, info_span, warn};

/// Matches every entry; used for base-scope reads
const ANY_OBJECT_FILTER: &str = "(objectClass=*)";

/// Requests no attributes (RFC 4511 §4.5.1.8)
const NO_ATTRIBUTES: &str = "1.1";

/// LDAP directory client
pub struct LdapDirectory {
    conn: LdapConn,
    url: String,
    timeout: Duration,
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LdapDirectory {
    /// Connect to the server in `config` and bind
    ///
    /// Binds with `bind_dn` / `bind_password` when a bind DN is configured,
    /// anonymously otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Connection`] if the server is unreachable or
    /// the bind is refused.
    pub fn connect(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let timeout = config.operation_timeout();
        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(config.starttls);

        info!("Connecting to directory at {}", config.url);
        let mut conn = LdapConn::with_settings(settings, &config.url).map_err(|e| {
            DirectoryError::Connection(format!("failed to connect to {}: {e}", config.url))
        })?;

        if let Some(bind_dn) = &config.bind_dn {
            let password = config.bind_password.as_ref().map_or("", |p| p.as_str());
            conn.with_timeout(timeout)
                .simple_bind(bind_dn, password)
                .and_then(ldap3::LdapResult::success)
                .map_err(|e| DirectoryError::Connection(format!("bind as {bind_dn} failed: {e}")))?;
            debug!("Bound as {}", bind_dn);
        } else {
            debug!("No bind DN configured, using anonymous bind");
        }

        Ok(Self {
            conn,
            url: config.url.clone(),
            timeout,
        })
    }

    /// Unbind and drop the connection
    pub fn close(mut self) {
        if let Err(e) = self.conn.unbind() {
            debug!("Unbind from {} failed: {}", self.url, e);
        }
    }

    /// Read naming contexts from the RootDSE
    fn read_root_dse(&mut self) -> Result<SearchEntry, DirectoryError> {
        let SearchResult(entries, result) = self
            .conn
            .with_timeout(self.timeout)
            .search(
                "",
                Scope::Base,
                ANY_OBJECT_FILTER,
                vec![DEFAULT_NAMING_CONTEXT_ATTRIBUTE, NAMING_CONTEXTS_ATTRIBUTE],
            )
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        if result.rc != LDAP_SUCCESS {
            return Err(DirectoryError::from_result_code(result.rc, &result.text, ""));
        }

        entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .ok_or_else(|| DirectoryError::InvalidResponse("RootDSE returned no entry".to_string()))
    }
}

impl DirectoryClient for LdapDirectory {
    fn resolve_root(&mut self, domain: &str) -> Result<DomainRoot, DirectoryError> {
        let span = info_span!("ldap.resolve_root", domain = domain, server = %self.url);
        let _guard = span.enter();
        let start = Instant::now();

        let entry = self.read_root_dse();
        metrics::record_directory_outcome(
            "resolve_root",
            start.elapsed().as_secs_f64(),
            entry.is_err(),
        );
        let entry = entry?;

        let default_context = entry
            .attrs
            .get(DEFAULT_NAMING_CONTEXT_ATTRIBUTE)
            .and_then(|values| values.first())
            .and_then(|dn| DomainRoot::parse(dn));
        let contexts: Vec<DomainRoot> = entry
            .attrs
            .get(NAMING_CONTEXTS_ATTRIBUTE)
            .map(|values| values.iter().filter_map(|dn| DomainRoot::parse(dn)).collect())
            .unwrap_or_default();

        select_naming_context(domain, default_context, &contexts).ok_or_else(|| {
            DirectoryError::InvalidResponse(format!(
                "RootDSE of {} has no naming context for domain '{domain}'",
                self.url
            ))
        })
    }

    fn container_exists(&mut self, address: &ContainerAddress) -> bool {
        let dn = address.dn();
        let span = debug_span!("ldap.exists", dn = %dn);
        let _guard = span.enter();
        let start = Instant::now();

        let outcome = self.conn.with_timeout(self.timeout).search(
            &dn,
            Scope::Base,
            ANY_OBJECT_FILTER,
            vec![NO_ATTRIBUTES],
        );
        let answered = matches!(
            &outcome,
            Ok(SearchResult(_, r)) if r.rc == LDAP_SUCCESS || r.rc == LDAP_NO_SUCH_OBJECT
        );
        metrics::record_directory_outcome("exists", start.elapsed().as_secs_f64(), !answered);

        match outcome {
            Ok(SearchResult(entries, result)) if result.rc == LDAP_SUCCESS => !entries.is_empty(),
            Ok(SearchResult(_, result)) if result.rc == LDAP_NO_SUCH_OBJECT => {
                debug!("{} does not exist", dn);
                false
            }
            Ok(SearchResult(_, result)) => {
                warn!(
                    "Existence check for {} failed ({}), treating as missing",
                    dn,
                    DirectoryError::from_result_code(result.rc, &result.text, &dn)
                );
                false
            }
            Err(e) => {
                warn!("Existence check for {} failed ({}), treating as missing", dn, e);
                false
            }
        }
    }

    fn create_container(
        &mut self,
        parent: &ContainerAddress,
        name: &Segment,
    ) -> Result<ContainerAddress, DirectoryError> {
        let address = parent.child(name);
        let dn = address.dn();
        let span = info_span!("ldap.create", dn = %dn);
        let _guard = span.enter();
        let start = Instant::now();

        let object_classes: HashSet<&str> = CONTAINER_OBJECT_CLASSES.into_iter().collect();
        let attrs = vec![
            ("objectClass", object_classes),
            (CONTAINER_NAMING_ATTRIBUTE, HashSet::from([name.as_str()])),
        ];

        let result = self.conn.with_timeout(self.timeout).add(&dn, attrs);
        metrics::record_directory_outcome(
            "create",
            start.elapsed().as_secs_f64(),
            !matches!(&result, Ok(r) if r.rc == LDAP_SUCCESS),
        );
        let result = result.map_err(|e| DirectoryError::Connection(e.to_string()))?;

        if result.rc == LDAP_SUCCESS {
            debug!("Added {}", dn);
            Ok(address)
        } else {
            Err(DirectoryError::from_result_code(result.rc, &result.text, &dn))
        }
    }
}

/// Pick the naming context for `domain`
///
/// A context equal to the DN derived from `domain` wins; otherwise the
/// server's default context, otherwise the first advertised one.
fn select_naming_context(
    domain: &str,
    default_context: Option<DomainRoot>,
    contexts: &[DomainRoot],
) -> Option<DomainRoot> {
    if let Some(wanted) = DomainRoot::from_dns_name(domain) {
        let mut candidates = default_context.iter().chain(contexts);
        if let Some(found) = candidates.find(|ctx| ctx.matches(&wanted)) {
            return Some(found.clone());
        }
        warn!(
            "No naming context matches domain '{}', falling back to the server default",
            domain
        );
    }
    default_context.or_else(|| contexts.first().cloned())
}
