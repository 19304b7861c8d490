//! # Provisioner
//!
//! Creates a chain of containers from the root downward, like `mkdir -p`.
//!
//! Each depth is checked before it is created, so re-running over a
//! partially existing chain only creates the missing suffix. A depth that
//! fails to create is recorded and the walk continues: the deeper depths are
//! still attempted and their (usually cascading) failures are reported too.
//! Only a lost connection stops the walk.

use crate::directory::{DirectoryClient, DirectoryError};
use crate::dn::{ContainerAddress, Segment};
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// What happened to one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyExists,
    Failed {
        reason: String,
        /// A shallower depth had already failed in this run
        cascaded: bool,
    },
}

impl Outcome {
    /// Label used in metrics and reports
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::AlreadyExists => "already_exists",
            Outcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Outcome for one depth of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningResult {
    /// Zero for the container directly under the root
    pub depth: usize,
    pub segment: Segment,
    /// Container the segment was (or would have been) created in
    pub parent: ContainerAddress,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ProvisioningResult {
    /// Full address of this depth's container
    pub fn address(&self) -> ContainerAddress {
        self.parent.child(&self.segment)
    }
}

/// Per-depth outcomes of one run, root-to-leaf
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningReport {
    /// Leaf-most container of the chain
    pub destination: ContainerAddress,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ProvisioningResult>,
    /// The run stopped before every depth was attempted
    pub aborted: bool,
    /// Why the run stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProvisioningReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Created))
    }

    pub fn already_existing(&self) -> usize {
        self.count(|o| matches!(o, Outcome::AlreadyExists))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Run-aborting provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The directory became unreachable; later depths were not attempted
    #[error("lost connection to the directory while creating '{segment}' in '{parent}': {source}")]
    Connection {
        segment: Segment,
        parent: ContainerAddress,
        #[source]
        source: DirectoryError,
        /// Aborted report holding the depths that finished before the
        /// connection broke
        report: ProvisioningReport,
    },
}

impl ProvisionError {
    /// The partial report of the aborted run
    pub fn report(&self) -> &ProvisioningReport {
        match self {
            Self::Connection { report, .. } => report,
        }
    }
}

/// Address of the leaf-most container of `segments` under `base`
///
/// Pure: never contacts the directory. With no segments this is `base`.
pub fn destination_address(base: &ContainerAddress, segments: &[Segment]) -> ContainerAddress {
    segments
        .iter()
        .fold(base.clone(), |address, segment| address.child(segment))
}

/// Ensure every container in `segments` (root-first) exists under `base`
///
/// # Errors
///
/// Returns [`ProvisionError::Connection`] only if the directory connection is
/// lost. Individual containers that cannot be created are reported as
/// [`Outcome::Failed`] in the returned report.
pub fn provision(
    client: &mut dyn DirectoryClient,
    base: &ContainerAddress,
    segments: &[Segment],
) -> Result<ProvisioningReport, ProvisionError> {
    let destination = destination_address(base, segments);
    let span = info_span!("provision", destination = %destination, depths = segments.len());
    let _guard = span.enter();

    let started_at = Utc::now();
    let start = Instant::now();
    metrics::increment_runs();

    let mut results = Vec::with_capacity(segments.len());
    let mut parent = base.clone();
    let mut failed_above = false;

    for (depth, segment) in segments.iter().enumerate() {
        let depth_span = info_span!("depth", depth, segment = %segment);
        let _depth_guard = depth_span.enter();
        let candidate = parent.child(segment);

        let outcome = if client.container_exists(&candidate) {
            debug!("OU '{}' already exists in '{}'", segment, parent);
            Outcome::AlreadyExists
        } else {
            info!("Creating OU '{}' in container '{}'", segment, parent);
            match client.create_container(&parent, segment) {
                Ok(_) => {
                    info!("OU '{}' created", segment);
                    Outcome::Created
                }
                Err(source) if source.is_fatal() => {
                    metrics::increment_run_aborts();
                    metrics::observe_run_duration(start.elapsed().as_secs_f64());
                    let report = ProvisioningReport {
                        destination,
                        started_at,
                        results,
                        aborted: true,
                        error: Some(source.to_string()),
                    };
                    return Err(ProvisionError::Connection {
                        segment: segment.clone(),
                        parent,
                        source,
                        report,
                    });
                }
                Err(e) => {
                    if failed_above && e.is_missing_parent() {
                        debug!("Skipping OU '{}': parent '{}' was not created", segment, parent);
                    } else {
                        warn!("Failed to create OU '{}' in '{}': {}", segment, parent, e);
                    }
                    Outcome::Failed {
                        reason: e.to_string(),
                        cascaded: failed_above,
                    }
                }
            }
        };

        metrics::record_container_outcome(outcome.label());
        failed_above |= outcome.is_failed();
        results.push(ProvisioningResult {
            depth,
            segment: segment.clone(),
            parent: parent.clone(),
            outcome,
        });
        parent = candidate;
    }

    metrics::observe_run_duration(start.elapsed().as_secs_f64());
    let report = ProvisioningReport {
        destination,
        started_at,
        results,
        aborted: false,
        error: None,
    };
    info!(
        created = report.created(),
        already_existing = report.already_existing(),
        failed = report.failed(),
        "Provisioning finished"
    );
    Ok(report)
}

/// Existence of one container in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    pub depth: usize,
    pub segment: Segment,
    pub address: ContainerAddress,
    pub exists: bool,
}

/// Report which containers of the chain exist, creating nothing
pub fn check_chain(
    client: &mut dyn DirectoryClient,
    base: &ContainerAddress,
    segments: &[Segment],
) -> Vec<ChainEntry> {
    let mut address = base.clone();
    segments
        .iter()
        .enumerate()
        .map(|(depth, segment)| {
            address = address.child(segment);
            ChainEntry {
                depth,
                segment: segment.clone(),
                address: address.clone(),
                exists: client.container_exists(&address),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::DomainRoot;

    fn base() -> ContainerAddress {
        ContainerAddress::root(DomainRoot::parse("DC=Domain,DC=Com").unwrap())
    }

    fn segments(names: &[&str]) -> Vec<Segment> {
        names.iter().map(|n| Segment::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_destination_address_of_chain() {
        let dest = destination_address(&base(), &segments(&["NewOU", "Staff", "Men"]));
        assert_eq!(dest.dn(), "OU=Men,OU=Staff,OU=NewOU,DC=Domain,DC=Com");
    }

    #[test]
    fn test_destination_address_of_empty_chain_is_base() {
        assert_eq!(destination_address(&base(), &[]), base());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let failed = Outcome::Failed {
            reason: "denied".to_string(),
            cascaded: false,
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"status": "failed", "reason": "denied", "cascaded": false})
        );
        assert_eq!(
            serde_json::to_value(Outcome::AlreadyExists).unwrap(),
            serde_json::json!({"status": "already_exists"})
        );
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = ProvisioningResult {
            depth: 0,
            segment: Segment::new("NewOU").unwrap(),
            parent: base(),
            outcome: Outcome::Created,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "depth": 0,
                "segment": "NewOU",
                "parent": "DC=Domain,DC=Com",
                "status": "created"
            })
        );
        assert_eq!(result.address().dn(), "OU=NewOU,DC=Domain,DC=Com");
    }
}
