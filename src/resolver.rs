//! # Root Resolution
//!
//! Determines the [`DomainRoot`] every container address hangs from.
//!
//! Three sources, in the order the CLI tries them:
//!
//! 1. An explicit root DN from configuration ([`explicit_root`])
//! 2. A DN derived from the DNS domain name without asking the server
//!    ([`offline_root`])
//! 3. The directory's RootDSE ([`resolve_root`])
//!
//! Failure is always an explicit [`RootResolutionError`]; no caller can
//! mistake a failed lookup for an empty root.

use crate::directory::{DirectoryClient, DirectoryError};
use crate::dn::DomainRoot;
use thiserror::Error;
use tracing::{debug, info};

/// The root container could not be determined; nothing can be provisioned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RootResolutionError {
    #[error("could not resolve the root container for domain '{domain}': {source}")]
    Directory {
        domain: String,
        #[source]
        source: DirectoryError,
    },
    #[error("'{0}' is not a usable root distinguished name")]
    InvalidRoot(String),
    #[error("cannot derive a root from domain name '{0}'")]
    InvalidDomainName(String),
}

/// Ask the directory for the root of `domain`
///
/// # Errors
///
/// Returns [`RootResolutionError::Directory`] if the client fails.
pub fn resolve_root(
    client: &mut dyn DirectoryClient,
    domain: &str,
) -> Result<DomainRoot, RootResolutionError> {
    let root = client
        .resolve_root(domain)
        .map_err(|source| RootResolutionError::Directory {
            domain: domain.to_string(),
            source,
        })?;
    info!("Resolved root container {} for domain '{}'", root, domain);
    Ok(root)
}

/// Use a root DN given verbatim
///
/// # Errors
///
/// Returns [`RootResolutionError::InvalidRoot`] for a blank DN.
pub fn explicit_root(dn: &str) -> Result<DomainRoot, RootResolutionError> {
    let root = DomainRoot::parse(dn).ok_or_else(|| RootResolutionError::InvalidRoot(dn.to_string()))?;
    debug!("Using configured root container {}", root);
    Ok(root)
}

/// Derive the root from a DNS domain name (`domain.com` → `DC=domain,DC=com`)
///
/// # Errors
///
/// Returns [`RootResolutionError::InvalidDomainName`] if the name has no labels.
pub fn offline_root(domain: &str) -> Result<DomainRoot, RootResolutionError> {
    let root = DomainRoot::from_dns_name(domain)
        .ok_or_else(|| RootResolutionError::InvalidDomainName(domain.to_string()))?;
    debug!("Derived root container {} from domain name '{}'", root, domain);
    Ok(root)
}
