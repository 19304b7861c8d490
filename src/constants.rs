//! # Constants
//!
//! Shared constants used throughout the provisioner.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Attribute type that marks a path component as a container
pub const CONTAINER_TAG: &str = "OU";

/// Attribute type of domain components in a domain root
pub const DOMAIN_COMPONENT_TAG: &str = "DC";

/// Scheme prefix of ADSI-style locators
pub const LDAP_URL_SCHEME: &str = "LDAP://";

/// Object classes written on every new container
pub const CONTAINER_OBJECT_CLASSES: [&str; 2] = ["top", "organizationalUnit"];

/// Naming attribute of a container entry
pub const CONTAINER_NAMING_ATTRIBUTE: &str = "ou";

/// RootDSE attribute holding the default naming context
pub const DEFAULT_NAMING_CONTEXT_ATTRIBUTE: &str = "defaultNamingContext";

/// RootDSE attribute listing every naming context served
pub const NAMING_CONTEXTS_ATTRIBUTE: &str = "namingContexts";

/// Default directory server URL
pub const DEFAULT_LDAP_URL: &str = "ldap://localhost:389";

/// Default connect and per-operation timeout (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "ou_provisioner=info";

/// LDAP result code: success
pub const LDAP_SUCCESS: u32 = 0;

/// LDAP result code: noSuchObject
pub const LDAP_NO_SUCH_OBJECT: u32 = 32;

/// LDAP result code: entryAlreadyExists
pub const LDAP_ENTRY_ALREADY_EXISTS: u32 = 68;
