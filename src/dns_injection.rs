// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node-local DNS injection policy.
//!
//! Decides whether a pod receives the node-local resolver configuration and, if
//! so, rewrites its DNS policy and DNS config in place. The policy is pure: it
//! only reads the process-wide [`DnsInjectionSpec`] and mutates the working copy
//! handed to it.
//!
//! # Skip Rules
//!
//! Evaluated in order, the first match leaves the pod untouched:
//!
//! 1. The pod already carries a `dnsConfig`
//! 2. The pod's `dnsPolicy` is `None`
//! 3. The pod uses the host network and its `dnsPolicy` is not
//!    `ClusterFirstWithHostNet`
//!
//! # Example
//!
//! ```rust
//! use k8s_openapi::api::core::v1::PodSpec;
//! use nodelocaldns_webhook::dns_injection::{inject, DnsInjectionSpec, DnsOption, InjectionOutcome};
//!
//! let dns = DnsInjectionSpec::new(
//!     "169.254.20.10",
//!     "10.96.0.10",
//!     "cluster.local",
//!     Vec::new(),
//!     vec![DnsOption::new("ndots", "3")],
//! );
//!
//! let mut spec = PodSpec::default();
//! assert_eq!(inject(&mut spec, &dns, "team-a"), InjectionOutcome::Injected);
//! assert_eq!(spec.dns_policy.as_deref(), Some("None"));
//! ```

use crate::constants::{DNS_POLICY_CLUSTER_FIRST_WITH_HOST_NET, DNS_POLICY_NONE};
use k8s_openapi::api::core::v1::{PodDNSConfig, PodDNSConfigOption, PodSpec};
use tracing::debug;

/// One resolver option (`options` line entry in resolv.conf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsOption {
    /// Option name, e.g. `ndots`
    pub name: String,
    /// Option value, e.g. `3`
    pub value: String,
}

impl DnsOption {
    /// Create a new option.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Resolver configuration injected into every eligible pod.
///
/// Built once at startup and shared read-only for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsInjectionSpec {
    nameservers: Vec<String>,
    cluster_domain: String,
    extra_search_domains: Vec<String>,
    options: Vec<DnsOption>,
}

impl DnsInjectionSpec {
    /// Build the spec.
    ///
    /// The node-local address is always the first nameserver; the cluster DNS
    /// address follows when it is non-empty.
    ///
    /// # Arguments
    ///
    /// * `node_local_address` - node-local cache address
    /// * `cluster_dns_address` - cluster DNS service address
    /// * `cluster_domain` - cluster domain used to derive search domains
    /// * `extra_search_domains` - configured search domains appended after the derived ones
    /// * `options` - resolver options, in order
    pub fn new(
        node_local_address: impl Into<String>,
        cluster_dns_address: impl Into<String>,
        cluster_domain: impl Into<String>,
        extra_search_domains: Vec<String>,
        options: Vec<DnsOption>,
    ) -> Self {
        let mut nameservers = vec![node_local_address.into()];
        let cluster_dns_address = cluster_dns_address.into();
        if !cluster_dns_address.is_empty() {
            nameservers.push(cluster_dns_address);
        }

        Self {
            nameservers,
            cluster_domain: cluster_domain.into(),
            extra_search_domains,
            options,
        }
    }

    /// Nameservers, node-local first.
    #[must_use]
    pub fn nameservers(&self) -> &[String] {
        &self.nameservers
    }

    /// Cluster domain, e.g. `cluster.local`.
    #[must_use]
    pub fn cluster_domain(&self) -> &str {
        &self.cluster_domain
    }

    /// Resolver options, in order.
    #[must_use]
    pub fn options(&self) -> &[DnsOption] {
        &self.options
    }

    /// Search domains for a pod in `namespace`.
    ///
    /// Always starts with `{namespace}.svc.{domain}`, `svc.{domain}`, `{domain}`,
    /// followed by configured extras that are not already listed.
    #[must_use]
    pub fn search_domains_for(&self, namespace: &str) -> Vec<String> {
        let domain = &self.cluster_domain;
        let mut searches = vec![
            format!("{namespace}.svc.{domain}"),
            format!("svc.{domain}"),
            domain.clone(),
        ];

        for extra in &self.extra_search_domains {
            if !searches.contains(extra) {
                searches.push(extra.clone());
            }
        }

        searches
    }

    /// Pod DNS config for a pod in `namespace`.
    ///
    /// Every list is a fresh copy; the returned value shares nothing with `self`.
    #[must_use]
    pub fn dns_config_for(&self, namespace: &str) -> PodDNSConfig {
        PodDNSConfig {
            nameservers: Some(self.nameservers.clone()),
            searches: Some(self.search_domains_for(namespace)),
            options: Some(
                self.options
                    .iter()
                    .map(|opt| PodDNSConfigOption {
                        name: Some(opt.name.clone()),
                        value: Some(opt.value.clone()),
                    })
                    .collect(),
            ),
        }
    }
}

/// Result of running the injection policy on one pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// DNS policy and config were rewritten
    Injected,
    /// Pod already carries a DNS config
    SkippedExistingConfig,
    /// Pod explicitly opted out with `dnsPolicy: None`
    SkippedPolicyNone,
    /// Host-network pod without `ClusterFirstWithHostNet`
    SkippedHostNetwork,
}

impl InjectionOutcome {
    /// Label used for logging and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::SkippedExistingConfig => "existing_dns_config",
            Self::SkippedPolicyNone => "dns_policy_none",
            Self::SkippedHostNetwork => "host_network",
        }
    }
}

/// Apply the injection policy to a pod spec in place.
///
/// Idempotent: a second run sees the injected `dnsConfig` and skips.
pub fn inject(spec: &mut PodSpec, dns: &DnsInjectionSpec, namespace: &str) -> InjectionOutcome {
    let outcome = skip_reason(spec).unwrap_or(InjectionOutcome::Injected);
    if outcome != InjectionOutcome::Injected {
        debug!(namespace = %namespace, reason = outcome.as_str(), "Skipping DNS injection");
        return outcome;
    }

    spec.dns_policy = Some(DNS_POLICY_NONE.to_string());
    spec.dns_config = Some(dns.dns_config_for(namespace));

    debug!(
        namespace = %namespace,
        nameservers = ?dns.nameservers(),
        options = dns.options().len(),
        "Injected node-local DNS configuration"
    );

    outcome
}

fn skip_reason(spec: &PodSpec) -> Option<InjectionOutcome> {
    if spec.dns_config.is_some() {
        return Some(InjectionOutcome::SkippedExistingConfig);
    }

    let policy = spec.dns_policy.as_deref();
    if policy == Some(DNS_POLICY_NONE) {
        return Some(InjectionOutcome::SkippedPolicyNone);
    }

    if spec.host_network.unwrap_or(false) && policy != Some(DNS_POLICY_CLUSTER_FIRST_WITH_HOST_NET)
    {
        return Some(InjectionOutcome::SkippedHostNetwork);
    }

    None
}

#[cfg(test)]
#[path = "dns_injection_tests.rs"]
mod dns_injection_tests;
