//! # OU Provisioner
//!
//! Ensures a chain of organizational units exists in a directory service,
//! creating whatever is missing from the root downward.
//!
//! ## Overview
//!
//! 1. **Parse** - [`parser::parse`] extracts the `OU=` segments of a DN-style
//!    path (`OU=Men,OU=Staff,OU=NewOU`), leaf-first as written
//! 2. **Resolve** - [`resolver`] determines the domain root (`DC=domain,DC=com`)
//! 3. **Provision** - [`provisioner::provision`] walks the chain root-first,
//!    creating each missing container under its parent
//!
//! The directory is reached through the [`directory::DirectoryClient`] trait;
//! [`directory::LdapDirectory`] is the LDAP implementation.
//!
//! ```
//! use ou_provisioner::dn::{ContainerAddress, DomainRoot};
//! use ou_provisioner::parser::parse;
//! use ou_provisioner::provisioner::destination_address;
//!
//! let path = parse("OU=Men,OU=Staff,OU=NewOU");
//! let root = ContainerAddress::root(DomainRoot::parse("DC=domain,DC=com").unwrap());
//! let destination = destination_address(&root, &path.root_first());
//! assert_eq!(destination.dn(), "OU=Men,OU=Staff,OU=NewOU,DC=domain,DC=com");
//! ```

pub mod config;
pub mod constants;
pub mod directory;
pub mod dn;
pub mod observability;
pub mod parser;
pub mod provisioner;
pub mod resolver;

pub use directory::{DirectoryClient, DirectoryError, LdapDirectory};
pub use dn::{ContainerAddress, DomainRoot, Segment};
pub use parser::{parse, parse_with_mode, HierarchicalPath, ParseMode};
pub use provisioner::{
    check_chain, destination_address, provision, Outcome, ProvisionError, ProvisioningReport,
    ProvisioningResult,
};
pub use resolver::RootResolutionError;
