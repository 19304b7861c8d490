//! # ou-provisioner
//!
//! Command-line front end for the OU provisioner.
//!
//! ## Usage
//!
//! ```bash
//! # Show where a path would land, without touching the directory
//! ou-provisioner --domain domain.com plan "OU=Men,OU=Staff,OU=NewOU"
//!
//! # Create every missing OU in the chain
//! ou-provisioner --url ldaps://dc1.domain.com --bind-dn admin@domain.com \
//!     provision "OU=Men,OU=Staff,OU=NewOU"
//!
//! # Report which OUs in the chain already exist
//! ou-provisioner --root-dn "DC=domain,DC=com" check "OU=Men,OU=Staff,OU=NewOU"
//! ```
//!
//! The bind password is only read from `OU_PROVISIONER_BIND_PASSWORD`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ou_provisioner::config::{DirectoryConfig, ProvisionerConfig};
use ou_provisioner::directory::LdapDirectory;
use ou_provisioner::dn::{ContainerAddress, DomainRoot, Segment};
use ou_provisioner::observability::{self, metrics};
use ou_provisioner::parser::{parse_with_mode, ParseMode};
use ou_provisioner::provisioner::{
    check_chain, destination_address, provision, Outcome, ProvisioningResult,
};
use ou_provisioner::resolver;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Create a chain of organizational units in a directory, top-down
#[derive(Parser)]
#[command(name = "ou-provisioner", version, long_version = LONG_VERSION)]
#[command(
    about = "Create a chain of organizational units in a directory, top-down",
    long_about = None,
    after_help = "\
Paths are written leaf-first, like a distinguished name without its DC part:
  OU=Men,OU=Staff,OU=NewOU   creates NewOU, then Staff inside it, then Men

Examples:
  ou-provisioner --domain domain.com plan \"OU=Men,OU=Staff,OU=NewOU\"
  ou-provisioner --url ldap://dc1.domain.com provision \"OU=Staff,OU=NewOU\"
  ou-provisioner --root-dn DC=domain,DC=com check \"OU=Staff,OU=NewOU\"
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory server URL (ldap:// or ldaps://)
    #[arg(long, global = true)]
    url: Option<String>,

    /// DNS domain name used to pick the root container (e.g. domain.com)
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Domain controller host shown in LDAP:// locators
    #[arg(long, global = true)]
    domain_controller: Option<String>,

    /// Explicit root DN; skips root resolution
    #[arg(long, global = true, value_name = "DN")]
    root_dn: Option<String>,

    /// DN or UPN to bind as (anonymous when unset)
    #[arg(long, global = true, value_name = "DN")]
    bind_dn: Option<String>,

    /// Upgrade ldap:// connections with StartTLS
    #[arg(long, global = true)]
    starttls: bool,

    /// Derive the root from --domain instead of asking the directory
    #[arg(long, global = true)]
    offline: bool,

    /// Reject malformed path components instead of skipping them
    #[arg(long, global = true)]
    strict: bool,

    /// Write Prometheus metrics to this file when the run ends
    #[arg(long, global = true, value_name = "FILE")]
    metrics_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the segments and destination of a path without creating anything
    Plan {
        /// Leaf-first OU path, e.g. "OU=Men,OU=Staff,OU=NewOU"
        #[arg(value_name = "PATH")]
        path: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Create every missing OU in the path, root-most first
    Provision {
        /// Leaf-first OU path, e.g. "OU=Men,OU=Staff,OU=NewOU"
        #[arg(value_name = "PATH")]
        path: String,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Report which OUs in the path already exist
    Check {
        /// Leaf-first OU path, e.g. "OU=Men,OU=Staff,OU=NewOU"
        #[arg(value_name = "PATH")]
        path: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let (directory_config, provisioner_config) = load_config(&cli);

    observability::init_tracing(&provisioner_config.log_filter);
    debug!("Directory configuration: {:?}", directory_config);

    metrics::register_metrics()?;

    let result = run(&cli, &directory_config, &provisioner_config);

    if let Some(path) = &provisioner_config.metrics_file {
        if let Err(e) = metrics::write_metrics_file(path) {
            warn!("Failed to write metrics file: {:#}", e);
        }
    }

    result
}

/// Environment first, CLI flags on top
fn load_config(cli: &Cli) -> (DirectoryConfig, ProvisionerConfig) {
    let mut directory = DirectoryConfig::from_env();
    if let Some(dc) = &cli.domain_controller {
        directory.domain_controller = Some(dc.clone());
        if cli.url.is_none() {
            directory.url = format!("ldap://{dc}");
        }
    }
    if let Some(url) = &cli.url {
        directory.url.clone_from(url);
    }
    if let Some(domain) = &cli.domain {
        directory.domain.clone_from(domain);
    }
    if let Some(root_dn) = &cli.root_dn {
        directory.root_dn = Some(root_dn.clone());
    }
    if let Some(bind_dn) = &cli.bind_dn {
        directory.bind_dn = Some(bind_dn.clone());
    }
    directory.starttls |= cli.starttls;

    let mut provisioner = ProvisionerConfig::from_env();
    if cli.strict {
        provisioner.parse_mode = ParseMode::Strict;
    }
    if let Some(path) = &cli.metrics_file {
        provisioner.metrics_file = Some(path.clone());
    }

    (directory, provisioner)
}

fn run(cli: &Cli, directory: &DirectoryConfig, config: &ProvisionerConfig) -> Result<ExitCode> {
    match &cli.command {
        Commands::Plan { path, json } => {
            let segments = parse_segments(path, config.parse_mode)?;
            plan_command(directory, cli.offline, &segments, *json)
        }
        Commands::Provision { path, json } => {
            let segments = parse_segments(path, config.parse_mode)?;
            provision_command(directory, cli.offline, &segments, *json)
        }
        Commands::Check { path, json } => {
            let segments = parse_segments(path, config.parse_mode)?;
            check_command(directory, cli.offline, &segments, *json)
        }
    }
}

/// Root-first segments of `path`
fn parse_segments(path: &str, mode: ParseMode) -> Result<Vec<Segment>> {
    let parsed = parse_with_mode(path, mode).with_context(|| format!("Invalid path '{path}'"))?;
    if parsed.is_empty() {
        warn!("Path '{}' contains no OU components", path);
    }
    Ok(parsed.root_first())
}

/// Root from configuration alone, if it can be had without a connection
fn configured_root(directory: &DirectoryConfig, offline: bool) -> Result<Option<DomainRoot>> {
    if let Some(root_dn) = &directory.root_dn {
        return Ok(Some(resolver::explicit_root(root_dn)?));
    }
    if offline {
        return Ok(Some(resolver::offline_root(&directory.domain)?));
    }
    Ok(None)
}

fn connect(directory: &DirectoryConfig) -> Result<LdapDirectory> {
    LdapDirectory::connect(directory)
        .with_context(|| format!("Failed to connect to directory at {}", directory.url))
}

/// Connect and determine the root, asking the directory only if needed
fn connect_with_root(
    directory: &DirectoryConfig,
    offline: bool,
) -> Result<(LdapDirectory, DomainRoot)> {
    let configured = configured_root(directory, offline)?;
    let mut client = connect(directory)?;
    let root = match configured {
        Some(root) => root,
        None => resolver::resolve_root(&mut client, &directory.domain)?,
    };
    Ok((client, root))
}

fn plan_command(
    directory: &DirectoryConfig,
    offline: bool,
    segments: &[Segment],
    json: bool,
) -> Result<ExitCode> {
    // A plan never needs the server when the domain name is known
    let offline = offline || !directory.domain.trim().is_empty();
    let root = match configured_root(directory, offline)? {
        Some(root) => root,
        None => {
            let mut client = connect(directory)?;
            let root = resolver::resolve_root(&mut client, &directory.domain)?;
            client.close();
            root
        }
    };

    let base = ContainerAddress::root(root);
    let destination = destination_address(&base, segments);
    let dc = directory.domain_controller.as_deref();

    if json {
        let chain: Vec<String> = chain_addresses(&base, segments)
            .iter()
            .map(ContainerAddress::dn)
            .collect();
        let plan = serde_json::json!({
            "root": base.dn(),
            "segments": segments,
            "chain": chain,
            "destination": destination.dn(),
            "locator": destination.ldap_url(dc),
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Root:        {}", base);
        println!("Destination: {}", destination.ldap_url(dc));
        for (depth, address) in chain_addresses(&base, segments).iter().enumerate() {
            println!("  [{depth}] {address}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn provision_command(
    directory: &DirectoryConfig,
    offline: bool,
    segments: &[Segment],
    json: bool,
) -> Result<ExitCode> {
    let (mut client, root) = connect_with_root(directory, offline)?;
    let base = ContainerAddress::root(root);
    let dc = directory.domain_controller.as_deref();

    // Stdout carries only the JSON report, so the up-front line goes to stderr
    let locator = destination_address(&base, segments).ldap_url(dc);
    if json {
        eprintln!("Provisioning {locator}");
    } else {
        println!("Provisioning {locator}");
    }

    let report = match provision(&mut client, &base, segments) {
        Ok(report) => report,
        Err(e) => {
            let partial = e.report();
            if json {
                println!("{}", serde_json::to_string_pretty(partial)?);
            } else {
                print_results(&partial.results, dc);
            }
            let done = partial.results.len();
            return Err(e).with_context(|| {
                format!("Provisioning aborted after {done} of {} OUs", segments.len())
            });
        }
    };
    client.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_results(&report.results, dc);
        println!();
        println!(
            "{} created, {} already existed, {} failed",
            report.created(),
            report.already_existing(),
            report.failed()
        );
    }

    if report.has_failures() {
        info!("Provisioning finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn check_command(
    directory: &DirectoryConfig,
    offline: bool,
    segments: &[Segment],
    json: bool,
) -> Result<ExitCode> {
    let (mut client, root) = connect_with_root(directory, offline)?;
    let base = ContainerAddress::root(root);
    let entries = check_chain(&mut client, &base, segments);
    client.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let dc = directory.domain_controller.as_deref();
        for entry in &entries {
            let marker = if entry.exists { "✅" } else { "❌" };
            println!("{marker} [{}] {}", entry.depth, entry.address.ldap_url(dc));
        }
    }

    if entries.iter().all(|entry| entry.exists) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Every address from the shallowest segment to the destination
fn chain_addresses(base: &ContainerAddress, segments: &[Segment]) -> Vec<ContainerAddress> {
    (1..=segments.len())
        .map(|depth| destination_address(base, &segments[..depth]))
        .collect()
}

fn print_results(results: &[ProvisioningResult], dc: Option<&str>) {
    for result in results {
        let locator = result.address().ldap_url(dc);
        match &result.outcome {
            Outcome::Created => println!("✅ [{}] created {}", result.depth, locator),
            Outcome::AlreadyExists => {
                println!("   [{}] exists  {}", result.depth, locator);
            }
            Outcome::Failed { reason, cascaded } => {
                let note = if *cascaded { " (parent failed)" } else { "" };
                println!("❌ [{}] failed  {}{}: {}", result.depth, locator, note, reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_long_version_is_stamped() {
        assert!(LONG_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(LONG_VERSION.contains(env!("BUILD_GIT_HASH")));
    }

    #[test]
    fn test_cli_flags_override_environment() {
        let cli = Cli::parse_from([
            "ou-provisioner",
            "--domain-controller",
            "dc1.domain.com",
            "--strict",
            "plan",
            "OU=Staff",
        ]);
        let (directory, provisioner) = load_config(&cli);

        assert_eq!(directory.url, "ldap://dc1.domain.com");
        assert_eq!(directory.domain_controller.as_deref(), Some("dc1.domain.com"));
        assert_eq!(provisioner.parse_mode, ParseMode::Strict);
    }
}
