//! # Directory Clients
//!
//! The provisioner talks to a directory service only through the
//! [`DirectoryClient`] trait.
//!
//! - [`ldap::LdapDirectory`]: LDAP / Active Directory over `ldap3`
//!
//! Calls are blocking round trips; the provisioner never issues the next one
//! before the previous one has returned.

use crate::constants::{LDAP_ENTRY_ALREADY_EXISTS, LDAP_NO_SUCH_OBJECT};
use crate::dn::{ContainerAddress, DomainRoot, Segment};
use thiserror::Error;

pub mod ldap;

pub use ldap::LdapDirectory;

/// Directory service operations needed to provision a container chain
pub trait DirectoryClient {
    /// Find the root DN of the naming context for `domain`
    ///
    /// An empty `domain` asks for the server's default naming context.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the root cannot be determined.
    fn resolve_root(&mut self, domain: &str) -> Result<DomainRoot, DirectoryError>;

    /// Whether an entry exists at `address`
    ///
    /// Never fails: anything that prevents a positive answer (missing entry,
    /// unreachable server, access denied) is reported as `false`.
    fn container_exists(&mut self, address: &ContainerAddress) -> bool;

    /// Create container `name` directly under `parent`
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Connection`] if the server could not be
    /// reached, and another variant if it refused the entry.
    fn create_container(
        &mut self,
        parent: &ContainerAddress,
        name: &Segment,
    ) -> Result<ContainerAddress, DirectoryError>;
}

/// Errors reported by a [`DirectoryClient`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The server answered and refused the operation
    #[error("{reason} (result code {code})")]
    Rejected { code: u32, reason: String },
    /// The entry was created by someone else between the check and the add
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    /// The server could not be reached or the session broke
    #[error("directory connection failed: {0}")]
    Connection(String),
    /// The server answered with something unusable
    #[error("unexpected directory response: {0}")]
    InvalidResponse(String),
}

impl DirectoryError {
    /// Build an error from an LDAP result code and diagnostic text
    pub fn from_result_code(code: u32, diagnostic: &str, dn: &str) -> Self {
        if code == LDAP_ENTRY_ALREADY_EXISTS {
            return Self::AlreadyExists(dn.to_string());
        }
        let name = result_code_name(code);
        let diagnostic = diagnostic.trim();
        let reason = if diagnostic.is_empty() {
            name.to_string()
        } else {
            format!("{name}: {diagnostic}")
        };
        Self::Rejected { code, reason }
    }

    /// Errors that make every further directory call pointless
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// The parent entry does not exist (usually because creating it failed)
    pub fn is_missing_parent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code == LDAP_NO_SUCH_OBJECT)
    }
}

/// Symbolic name of an LDAP result code (RFC 4511 §4.1.9)
pub fn result_code_name(code: u32) -> &'static str {
    match code {
        0 => "success",
        1 => "operationsError",
        2 => "protocolError",
        3 => "timeLimitExceeded",
        8 => "strongerAuthRequired",
        10 => "referral",
        32 => "noSuchObject",
        34 => "invalidDNSyntax",
        49 => "invalidCredentials",
        50 => "insufficientAccessRights",
        51 => "busy",
        52 => "unavailable",
        53 => "unwillingToPerform",
        64 => "namingViolation",
        65 => "objectClassViolation",
        67 => "notAllowedOnRDN",
        68 => "entryAlreadyExists",
        80 => "other",
        _ => "unknown",
    }
}
