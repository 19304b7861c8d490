//! # Distinguished Names
//!
//! Value types for locating containers in the directory tree.
//!
//! - [`Segment`]: the relative name of one container (`Staff` in `OU=Staff`)
//! - [`DomainRoot`]: the fixed naming-context suffix (`DC=domain,DC=com`)
//! - [`ContainerAddress`]: a root plus an ordered chain of segments
//!
//! Addresses are immutable. Deeper addresses are derived with
//! [`ContainerAddress::child`], never by editing an existing one.

pub mod escape;

use crate::constants::{CONTAINER_TAG, DOMAIN_COMPONENT_TAG, LDAP_URL_SCHEME};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub use escape::{escape_value, unescape_value, EscapeError};

/// Returned when a container name would be empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("container name must not be empty")]
pub struct EmptySegmentError;

/// Relative name of a single container, case preserved
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    /// Create a segment from an unescaped name
    ///
    /// # Errors
    ///
    /// Returns [`EmptySegmentError`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, EmptySegmentError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EmptySegmentError);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative distinguished name, e.g. `OU=Staff`
    pub fn rdn(&self) -> String {
        format!("{CONTAINER_TAG}={}", escape_value(&self.0))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Segment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Distinguished name of the naming context all containers live under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainRoot(String);

impl DomainRoot {
    /// Wrap an already-formed root DN. Blank input yields `None`.
    pub fn parse(dn: &str) -> Option<Self> {
        let dn = dn.trim();
        if dn.is_empty() {
            None
        } else {
            Some(Self(dn.to_string()))
        }
    }

    /// Derive a root DN from a DNS domain name: `domain.com` becomes
    /// `DC=domain,DC=com`.
    pub fn from_dns_name(domain: &str) -> Option<Self> {
        let components: Vec<String> = domain
            .trim()
            .trim_end_matches('.')
            .split('.')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(|label| format!("{DOMAIN_COMPONENT_TAG}={}", escape_value(label)))
            .collect();

        if components.is_empty() {
            None
        } else {
            Some(Self(components.join(",")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, as directory servers compare DNs
    pub fn matches(&self, other: &DomainRoot) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for DomainRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified location of a container
///
/// Segments are stored root-first. The rendered DN is leaf-first:
///
/// ```
/// use ou_provisioner::dn::{ContainerAddress, DomainRoot, Segment};
///
/// let root = DomainRoot::parse("DC=Domain,DC=Com").unwrap();
/// let address = ContainerAddress::root(root)
///     .child(&Segment::new("NewOU").unwrap())
///     .child(&Segment::new("Staff").unwrap());
/// assert_eq!(address.dn(), "OU=Staff,OU=NewOU,DC=Domain,DC=Com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerAddress {
    root: DomainRoot,
    segments: Vec<Segment>,
}

impl ContainerAddress {
    /// Address of the naming context itself
    pub fn root(root: DomainRoot) -> Self {
        Self {
            root,
            segments: Vec::new(),
        }
    }

    /// Address of `segment` directly under this one
    #[must_use]
    pub fn child(&self, segment: &Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment.clone());
        Self {
            root: self.root.clone(),
            segments,
        }
    }

    pub fn domain_root(&self) -> &DomainRoot {
        &self.root
    }

    /// Segments from the root downward
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of containers between the root and this address
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Leaf-most segment, `None` for the root
    pub fn leaf(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Distinguished name, leaf-first
    pub fn dn(&self) -> String {
        let mut parts: Vec<String> = self.segments.iter().rev().map(Segment::rdn).collect();
        parts.push(self.root.as_str().to_string());
        parts.join(",")
    }

    /// ADSI-style locator, optionally pinned to a domain controller:
    /// `LDAP://DC1.domain.com/OU=Staff,DC=domain,DC=com`
    pub fn ldap_url(&self, domain_controller: Option<&str>) -> String {
        match domain_controller.map(str::trim).filter(|dc| !dc.is_empty()) {
            Some(dc) => format!("{LDAP_URL_SCHEME}{dc}/{}", self.dn()),
            None => format!("{LDAP_URL_SCHEME}{}", self.dn()),
        }
    }
}

impl fmt::Display for ContainerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dn())
    }
}

impl Serialize for ContainerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(name: &str) -> Segment {
        Segment::new(name).unwrap()
    }

    fn root() -> DomainRoot {
        DomainRoot::parse("DC=Domain,DC=Com").unwrap()
    }

    #[test]
    fn test_segment_rejects_empty() {
        assert_eq!(Segment::new(""), Err(EmptySegmentError));
    }

    #[test]
    fn test_segment_preserves_case() {
        assert_eq!(seg("NewOU").as_str(), "NewOU");
        assert_eq!(seg("NewOU").rdn(), "OU=NewOU");
    }

    #[test]
    fn test_segment_rdn_is_escaped() {
        assert_eq!(seg("R&D, Europe").rdn(), "OU=R&D\\, Europe");
    }

    #[test]
    fn test_domain_root_parse_trims_and_rejects_blank() {
        assert_eq!(
            DomainRoot::parse("  DC=a,DC=b ").unwrap().as_str(),
            "DC=a,DC=b"
        );
        assert!(DomainRoot::parse("   ").is_none());
    }

    #[test]
    fn test_domain_root_from_dns_name() {
        assert_eq!(
            DomainRoot::from_dns_name("domain.com").unwrap().as_str(),
            "DC=domain,DC=com"
        );
        assert_eq!(
            DomainRoot::from_dns_name("corp.example.org.").unwrap().as_str(),
            "DC=corp,DC=example,DC=org"
        );
        assert!(DomainRoot::from_dns_name("..").is_none());
    }

    #[test]
    fn test_domain_root_matches_ignores_case() {
        let a = DomainRoot::parse("DC=Domain,DC=Com").unwrap();
        let b = DomainRoot::parse("dc=domain,dc=com").unwrap();
        assert!(a.matches(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_root_address_renders_root_only() {
        let address = ContainerAddress::root(root());
        assert!(address.is_root());
        assert_eq!(address.depth(), 0);
        assert_eq!(address.dn(), "DC=Domain,DC=Com");
        assert!(address.leaf().is_none());
    }

    #[test]
    fn test_child_does_not_modify_parent() {
        let parent = ContainerAddress::root(root()).child(&seg("NewOU"));
        let child = parent.child(&seg("Staff"));

        assert_eq!(parent.dn(), "OU=NewOU,DC=Domain,DC=Com");
        assert_eq!(child.dn(), "OU=Staff,OU=NewOU,DC=Domain,DC=Com");
        assert_eq!(child.depth(), 2);
        assert_eq!(child.leaf(), Some(&seg("Staff")));
        assert_eq!(child.segments(), &[seg("NewOU"), seg("Staff")]);
    }

    #[test]
    fn test_address_equality_is_structural() {
        let a = ContainerAddress::root(root()).child(&seg("A"));
        let b = ContainerAddress::root(root()).child(&seg("A"));
        let other_root =
            ContainerAddress::root(DomainRoot::parse("DC=other").unwrap()).child(&seg("A"));
        assert_eq!(a, b);
        assert_ne!(a, other_root);
    }

    #[test]
    fn test_ldap_url_with_and_without_domain_controller() {
        let address = ContainerAddress::root(root()).child(&seg("NewOU"));
        assert_eq!(
            address.ldap_url(Some("DC1.domain.com")),
            "LDAP://DC1.domain.com/OU=NewOU,DC=Domain,DC=Com"
        );
        assert_eq!(address.ldap_url(None), "LDAP://OU=NewOU,DC=Domain,DC=Com");
        assert_eq!(address.ldap_url(Some("  ")), "LDAP://OU=NewOU,DC=Domain,DC=Com");
    }

    #[test]
    fn test_address_serializes_as_dn_string() {
        let address = ContainerAddress::root(root()).child(&seg("NewOU"));
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"OU=NewOU,DC=Domain,DC=Com\"");
    }
}
