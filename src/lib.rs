// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # nodelocaldns-webhook - Node-local DNS injection for Kubernetes Pods
//!
//! A mutating admission webhook that points newly created Pods at a node-local
//! DNS cache. On every Pod `CREATE` the webhook switches the Pod to
//! `dnsPolicy: None` and attaches an explicit `dnsConfig` whose first nameserver
//! is the node-local cache and whose second is the cluster DNS service.
//!
//! ## Overview
//!
//! - Pods that already carry a `dnsConfig` or use `dnsPolicy: None` are left alone
//! - `hostNetwork` Pods are only mutated with `dnsPolicy: ClusterFirstWithHostNet`
//! - On `UPDATE` the DNS fields are pinned to their prior values
//! - Failures to parse a Pod are reported as in-band denials, never as HTTP errors
//!
//! ## Modules
//!
//! - [`admission`] - `admission.k8s.io/v1` wire types
//! - [`dns_injection`] - The injection policy
//! - [`patch`] - JSON patch generation
//! - [`engine`] - Per-request admission decisions
//! - [`server`] - HTTPS transport, probes and lifecycle
//! - [`config`] - CLI and environment configuration
//! - [`discovery`] - Cluster DNS service discovery
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use nodelocaldns_webhook::dns_injection::{inject, DnsInjectionSpec, DnsOption};
//! use k8s_openapi::api::core::v1::PodSpec;
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
//! inject(&mut spec, &dns, "default");
//! assert_eq!(spec.dns_policy.as_deref(), Some("None"));
//! ```

pub mod admission;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod dns_injection;
pub mod engine;
pub mod errors;
pub mod http_errors;
pub mod lifecycle;
pub mod metrics;
pub mod patch;
pub mod server;
