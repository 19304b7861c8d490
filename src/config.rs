//! # Configuration
//!
//! Settings loaded from environment variables, then overridden by CLI flags.
//!
//! | Variable | Field |
//! |---|---|
//! | `OU_PROVISIONER_LDAP_URL` | [`DirectoryConfig::url`] |
//! | `OU_PROVISIONER_DOMAIN_CONTROLLER` | [`DirectoryConfig::domain_controller`] |
//! | `OU_PROVISIONER_DOMAIN` | [`DirectoryConfig::domain`] |
//! | `OU_PROVISIONER_ROOT_DN` | [`DirectoryConfig::root_dn`] |
//! | `OU_PROVISIONER_BIND_DN` | [`DirectoryConfig::bind_dn`] |
//! | `OU_PROVISIONER_BIND_PASSWORD` | [`DirectoryConfig::bind_password`] |
//! | `OU_PROVISIONER_TIMEOUT_SECS` | [`DirectoryConfig::operation_timeout_secs`] |
//! | `OU_PROVISIONER_STARTTLS` | [`DirectoryConfig::starttls`] |
//! | `OU_PROVISIONER_LOG_LEVEL` | [`ProvisionerConfig::log_filter`] |
//! | `OU_PROVISIONER_STRICT` | [`ProvisionerConfig::parse_mode`] |
//! | `OU_PROVISIONER_METRICS_FILE` | [`ProvisionerConfig::metrics_file`] |

use crate::constants::{DEFAULT_LDAP_URL, DEFAULT_LOG_FILTER, DEFAULT_OPERATION_TIMEOUT_SECS};
use crate::parser::ParseMode;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

/// Connection settings for the directory service
///
/// Passed explicitly to [`crate::directory::LdapDirectory::connect`]; nothing
/// in the crate reads credentials from global state.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Server URL (`ldap://` or `ldaps://`)
    pub url: String,
    /// Domain controller host, shown in `LDAP://dc/...` locators
    pub domain_controller: Option<String>,
    /// DNS domain name used to pick the naming context (`domain.com`)
    /// Empty means "the server's default naming context"
    pub domain: String,
    /// Explicit root DN; skips root resolution entirely
    pub root_dn: Option<String>,
    /// Bind DN or UPN; anonymous bind when unset
    pub bind_dn: Option<String>,
    /// Bind password, wiped on drop
    pub bind_password: Option<Zeroizing<String>>,
    /// Connect and per-operation timeout (seconds)
    pub operation_timeout_secs: u64,
    /// Upgrade plain `ldap://` connections with StartTLS
    pub starttls: bool,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("domain_controller", &self.domain_controller)
            .field("domain", &self.domain)
            .field("root_dn", &self.root_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "<redacted>"),
            )
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .field("starttls", &self.starttls)
            .finish()
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LDAP_URL.to_string(),
            domain_controller: None,
            domain: String::new(),
            root_dn: None,
            bind_dn: None,
            bind_password: None,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            starttls: false,
        }
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// When no URL is given but a domain controller is, the URL points at
    /// that controller.
    pub fn from_env() -> Self {
        let domain_controller = env_var_opt("OU_PROVISIONER_DOMAIN_CONTROLLER");
        let url = env_var_opt("OU_PROVISIONER_LDAP_URL").unwrap_or_else(|| {
            domain_controller
                .as_deref()
                .map_or_else(|| DEFAULT_LDAP_URL.to_string(), |dc| format!("ldap://{dc}"))
        });

        Self {
            url,
            domain_controller,
            domain: env_var_or_default_str("OU_PROVISIONER_DOMAIN", ""),
            root_dn: env_var_opt("OU_PROVISIONER_ROOT_DN"),
            bind_dn: env_var_opt("OU_PROVISIONER_BIND_DN"),
            bind_password: std::env::var("OU_PROVISIONER_BIND_PASSWORD")
                .ok()
                .filter(|v| !v.is_empty())
                .map(Zeroizing::new),
            operation_timeout_secs: env_var_or_default(
                "OU_PROVISIONER_TIMEOUT_SECS",
                DEFAULT_OPERATION_TIMEOUT_SECS,
            ),
            starttls: env_var_or_default_bool("OU_PROVISIONER_STARTTLS", false),
        }
    }

    /// Get connect and per-operation timeout duration
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Settings for a provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Malformed path component policy
    pub parse_mode: ParseMode,
    /// Write Prometheus text-format metrics here after the run
    pub metrics_file: Option<PathBuf>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            parse_mode: ParseMode::Lenient,
            metrics_file: None,
        }
    }
}

impl ProvisionerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let parse_mode = if env_var_or_default_bool("OU_PROVISIONER_STRICT", false) {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        };

        Self {
            log_filter: env_var_or_default_str("OU_PROVISIONER_LOG_LEVEL", DEFAULT_LOG_FILTER),
            parse_mode,
            metrics_file: env_var_opt("OU_PROVISIONER_METRICS_FILE").map(PathBuf::from),
        }
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a non-blank environment variable
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
