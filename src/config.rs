// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration.
//!
//! Every setting can be given as a flag or through its environment variable.
//! Injection settings are validated once at startup into an immutable
//! [`DnsInjectionSpec`]; any invalid value is fatal.
//!
//! # Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `NODE_LOCAL_DNS_ADDRESS` | Node-local cache IPv4 address | required |
//! | `SEARCH_DOMAINS` | Extra search domains, comma-separated | none |
//! | `DNS_OPTIONS` | Resolver options, `name:value,...` | `ndots:3,attempts:2,timeout:1` |
//! | `CLUSTER_DOMAIN` | Cluster domain | `cluster.local` |
//! | `CLUSTER_DNS_ADDRESS` | Cluster DNS address, skips discovery | discovered |

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_CERT_FILE, DEFAULT_CLUSTER_DOMAIN, DEFAULT_DNS_OPTIONS,
    DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_HEADER_READ_TIMEOUT_SECS, DEFAULT_KEY_FILE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STARTUP_GRACE_SECS, DEFAULT_WEBHOOK_PORT,
};
use crate::dns_injection::{DnsInjectionSpec, DnsOption};
use crate::errors::{ConfigError, ServerError};
use crate::server::ServerConfig;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line interface of the webhook binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nodelocaldns-webhook",
    version,
    about = "Mutating admission webhook that injects node-local DNS configuration into Pods"
)]
pub struct Cli {
    /// Path to TLS certificate file
    #[arg(long, env = "TLS_CERT_FILE", default_value = DEFAULT_CERT_FILE)]
    pub cert_file: PathBuf,

    /// Path to TLS private key file
    #[arg(long, env = "TLS_KEY_FILE", default_value = DEFAULT_KEY_FILE)]
    pub key_file: PathBuf,

    /// Port to listen on
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    pub port: u16,

    /// Address to bind the listener to
    #[arg(long, env = "WEBHOOK_BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind_address: String,

    /// Log level used when RUST_LOG is not set (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// IPv4 address of the node-local DNS cache
    #[arg(long, env = "NODE_LOCAL_DNS_ADDRESS")]
    pub node_local_dns_address: Option<String>,

    /// Extra search domains, comma-separated
    #[arg(long, env = "SEARCH_DOMAINS")]
    pub search_domains: Option<String>,

    /// Resolver options as name:value pairs, comma-separated
    #[arg(long, env = "DNS_OPTIONS")]
    pub dns_options: Option<String>,

    /// Cluster domain used to derive search domains
    #[arg(long, env = "CLUSTER_DOMAIN", default_value = DEFAULT_CLUSTER_DOMAIN)]
    pub cluster_domain: String,

    /// Cluster DNS address; discovered from the kube-dns service when absent
    #[arg(long, env = "CLUSTER_DNS_ADDRESS")]
    pub cluster_dns_address: Option<String>,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long, default_value_t = DEFAULT_DRAIN_TIMEOUT_SECS)]
    pub drain_timeout_secs: u64,

    /// Seconds after bind during which a serve failure aborts startup
    #[arg(long, default_value_t = DEFAULT_STARTUP_GRACE_SECS)]
    pub startup_grace_secs: u64,

    /// Seconds allowed to read a request body and produce the response
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Seconds allowed to receive request headers; also closes idle connections
    #[arg(long, default_value_t = DEFAULT_HEADER_READ_TIMEOUT_SECS)]
    pub header_read_timeout_secs: u64,
}

impl Cli {
    /// Injection-related settings, still unvalidated.
    #[must_use]
    pub fn injection_settings(&self) -> InjectionSettings {
        InjectionSettings {
            node_local_dns_address: self.node_local_dns_address.clone(),
            search_domains: self.search_domains.clone(),
            dns_options: self.dns_options.clone(),
            cluster_domain: self.cluster_domain.clone(),
        }
    }

    /// Server settings.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidAddress`] if the bind address is not an IP address.
    pub fn server_config(&self) -> Result<ServerConfig, ServerError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.bind_address.clone()))?;
        let listen_addr = SocketAddr::new(ip, self.port);

        Ok(ServerConfig {
            listen_addr,
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            startup_grace: Duration::from_secs(self.startup_grace_secs),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            header_read_timeout: Duration::from_secs(self.header_read_timeout_secs),
        })
    }
}

/// Raw injection settings as supplied by the operator.
#[derive(Debug, Clone, Default)]
pub struct InjectionSettings {
    pub node_local_dns_address: Option<String>,
    pub search_domains: Option<String>,
    pub dns_options: Option<String>,
    pub cluster_domain: String,
}

/// Validate settings and build the injection spec.
///
/// # Arguments
///
/// * `settings` - Raw settings from flags or environment
/// * `cluster_dns_address` - Discovered or configured cluster DNS address
///
/// # Errors
///
/// Returns a [`ConfigError`] if the node-local address is missing or not IPv4,
/// the cluster DNS address is not IPv4, the cluster domain or any search domain
/// is empty, or any DNS option is malformed.
pub fn load_injection_spec(
    settings: &InjectionSettings,
    cluster_dns_address: &str,
) -> Result<DnsInjectionSpec, ConfigError> {
    let node_local = non_blank(settings.node_local_dns_address.as_deref())
        .ok_or(ConfigError::MissingNodeLocalAddress)?;
    validate_ipv4("node local DNS address", node_local)?;
    validate_ipv4("cluster DNS address", cluster_dns_address.trim())?;

    let cluster_domain = settings.cluster_domain.trim();
    if cluster_domain.is_empty() {
        return Err(ConfigError::EmptyClusterDomain);
    }

    let search_domains = match non_blank(settings.search_domains.as_deref()) {
        Some(raw) => parse_search_domains(raw)?,
        None => Vec::new(),
    };

    let options = parse_dns_options(
        non_blank(settings.dns_options.as_deref()).unwrap_or(DEFAULT_DNS_OPTIONS),
    )?;

    Ok(DnsInjectionSpec::new(
        node_local,
        cluster_dns_address.trim(),
        cluster_domain,
        search_domains,
        options,
    ))
}

/// Check that `value` is a dotted-quad IPv4 address.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidAddress`] naming `field` otherwise.
pub fn validate_ipv4(field: &'static str, value: &str) -> Result<(), ConfigError> {
    value
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        })
}

/// Parse a comma-separated list of search domains.
///
/// # Errors
///
/// Returns [`ConfigError::EmptySearchDomain`] if any entry is blank.
pub fn parse_search_domains(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .map(|domain| {
            if domain.is_empty() {
                Err(ConfigError::EmptySearchDomain)
            } else {
                Ok(domain.to_string())
            }
        })
        .collect()
}

/// Parse resolver options of the form `name1:value1,name2:value2`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDnsOption`] for entries without exactly one
/// `:`, and [`ConfigError::EmptyDnsOption`] for blank names or values.
pub fn parse_dns_options(raw: &str) -> Result<Vec<DnsOption>, ConfigError> {
    raw.split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.trim().split(':').collect();
            let [name, value] = parts.as_slice() else {
                return Err(ConfigError::InvalidDnsOption(pair.to_string()));
            };

            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                return Err(ConfigError::EmptyDnsOption(pair.to_string()));
            }

            Ok(DnsOption::new(name, value))
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
