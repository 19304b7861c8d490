//! Common test utilities
//!
//! Provides an in-memory [`DirectoryClient`] that records every call, so
//! tests can assert on both the resulting tree and the order of operations.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use ou_provisioner::constants::LDAP_NO_SUCH_OBJECT;
use ou_provisioner::directory::{DirectoryClient, DirectoryError};
use ou_provisioner::dn::{ContainerAddress, DomainRoot, Segment};
use std::collections::{HashMap, HashSet};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Route library logs through the test harness output
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("ou_provisioner=debug")
            .with_test_writer()
            .try_init();
    });
}

/// A directory call as seen by [`InMemoryDirectory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveRoot(String),
    Exists(String),
    Create(String),
}

/// Directory tree held in memory
///
/// Entries are keyed by lowercased DN, matching the case-insensitive naming
/// of real directories. Creating under a missing parent fails with
/// `noSuchObject`, as an LDAP server would.
#[derive(Debug)]
pub struct InMemoryDirectory {
    root: DomainRoot,
    entries: HashSet<String>,
    denied: HashMap<String, (u32, String)>,
    hidden: HashSet<String>,
    disconnect_after: Option<usize>,
    creates: usize,
    calls: Vec<Call>,
}

impl InMemoryDirectory {
    pub fn new(root_dn: &str) -> Self {
        Self {
            root: DomainRoot::parse(root_dn).expect("test root DN is not blank"),
            entries: HashSet::new(),
            denied: HashMap::new(),
            hidden: HashSet::new(),
            disconnect_after: None,
            creates: 0,
            calls: Vec::new(),
        }
    }

    /// Seed entries that already exist
    pub fn with_existing(mut self, dns: &[&str]) -> Self {
        self.entries.extend(dns.iter().map(|dn| dn.to_lowercase()));
        self
    }

    /// Refuse to create any container named `segment`
    pub fn deny(mut self, segment: &str, code: u32, reason: &str) -> Self {
        self.denied
            .insert(segment.to_lowercase(), (code, reason.to_string()));
        self
    }

    /// Make existence checks miss an entry that is actually there,
    /// like a concurrent creation or an unreadable entry
    pub fn hide(mut self, dn: &str) -> Self {
        self.hidden.insert(dn.to_lowercase());
        self
    }

    /// Drop the connection once `creates` containers have been added
    pub fn disconnect_after(mut self, creates: usize) -> Self {
        self.disconnect_after = Some(creates);
        self
    }

    pub fn base(&self) -> ContainerAddress {
        ContainerAddress::root(self.root.clone())
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.entries.contains(&dn.to_lowercase())
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// DNs passed to `create_container`, in order
    pub fn create_calls(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Create(dn) => Some(dn.clone()),
                _ => None,
            })
            .collect()
    }

    fn has_entry(&self, address: &ContainerAddress) -> bool {
        address.is_root() || self.entries.contains(&address.dn().to_lowercase())
    }
}

impl DirectoryClient for InMemoryDirectory {
    fn resolve_root(&mut self, domain: &str) -> Result<DomainRoot, DirectoryError> {
        self.calls.push(Call::ResolveRoot(domain.to_string()));
        Ok(self.root.clone())
    }

    fn container_exists(&mut self, address: &ContainerAddress) -> bool {
        self.calls.push(Call::Exists(address.dn()));
        !self.hidden.contains(&address.dn().to_lowercase()) && self.has_entry(address)
    }

    fn create_container(
        &mut self,
        parent: &ContainerAddress,
        name: &Segment,
    ) -> Result<ContainerAddress, DirectoryError> {
        let address = parent.child(name);
        self.calls.push(Call::Create(address.dn()));

        if self.disconnect_after == Some(self.creates) {
            return Err(DirectoryError::Connection(
                "connection reset by peer".to_string(),
            ));
        }
        if let Some((code, reason)) = self.denied.get(&name.as_str().to_lowercase()) {
            return Err(DirectoryError::from_result_code(*code, reason, &address.dn()));
        }
        if !self.has_entry(parent) {
            return Err(DirectoryError::from_result_code(
                LDAP_NO_SUCH_OBJECT,
                "parent entry does not exist",
                &address.dn(),
            ));
        }
        if !self.entries.insert(address.dn().to_lowercase()) {
            return Err(DirectoryError::AlreadyExists(address.dn()));
        }

        self.creates += 1;
        Ok(address)
    }
}
