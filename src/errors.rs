// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the admission webhook.
//!
//! This module provides specialized error types for:
//! - Admission decisions (pod parsing, patch serialization)
//! - Configuration loading and cluster DNS discovery
//! - Server lifecycle (TLS bring-up, bind, drain)
//!
//! Admission errors never escape the decision engine as protocol errors: every
//! [`AdmissionError`] is turned into an in-band denial. Configuration and server
//! errors are fatal at startup.

use crate::lifecycle::ServerState;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while deciding on a single admission request.
///
/// All variants are reported to the API server as `allowed: false` with code 400.
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// The request carried no object for a `CREATE` or `UPDATE`
    #[error("admission request object is missing")]
    MissingObject,

    /// The request carried no prior object for an `UPDATE`
    #[error("admission request oldObject is missing")]
    MissingOldObject,

    /// The object could not be deserialized as a Pod
    #[error("failed to parse pod: {0}")]
    InvalidPod(#[source] serde_json::Error),

    /// The prior object could not be deserialized as a Pod
    #[error("failed to parse old pod: {0}")]
    InvalidOldPod(#[source] serde_json::Error),

    /// The pod has no `spec`
    #[error("failed to parse pod: pod has no spec")]
    MissingSpec,

    /// The patch could not be serialized
    #[error("failed to generate patch: {0}")]
    PatchSerialization(#[source] serde_json::Error),
}

impl AdmissionError {
    /// Short machine-readable label used for logging and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingObject | Self::MissingOldObject => "missing_object",
            Self::InvalidPod(_) | Self::InvalidOldPod(_) | Self::MissingSpec => "invalid_pod",
            Self::PatchSerialization(_) => "patch_serialization",
        }
    }
}

/// Errors raised while loading configuration or discovering cluster state.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The node-local DNS address was not supplied
    #[error("node local DNS address is required but not provided via NODE_LOCAL_DNS_ADDRESS")]
    MissingNodeLocalAddress,

    /// An address is not a dotted-quad IPv4 address
    #[error("invalid {field} {value}: not a valid IPv4 address")]
    InvalidAddress {
        /// Which setting carried the address
        field: &'static str,
        /// The rejected value
        value: String,
    },

    /// A search domain is empty after trimming
    #[error("search domain cannot be empty")]
    EmptySearchDomain,

    /// The cluster domain is empty after trimming
    #[error("cluster domain cannot be empty")]
    EmptyClusterDomain,

    /// A DNS option entry is not of the form `name:value`
    #[error("invalid DNS option format: {0} (expected name:value)")]
    InvalidDnsOption(String),

    /// A DNS option has an empty name or value
    #[error("DNS option name and value cannot be empty: {0}")]
    EmptyDnsOption(String),

    /// The cluster DNS service could not be read or has no cluster IP
    #[error("failed to discover cluster DNS: {0}")]
    ClusterDnsDiscovery(String),
}

/// Errors raised by the webhook server lifecycle.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A certificate or key file could not be read
    #[error("failed to read {path}: {source}")]
    CertificateRead {
        /// File that failed to read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A certificate or key file is not valid PEM
    #[error("failed to parse PEM in {path}: {source}")]
    InvalidPem {
        /// File that failed to parse
        path: String,
        /// Underlying PEM error
        #[source]
        source: rustls::pki_types::pem::Error,
    },

    /// The certificate file holds no certificates
    #[error("certificate is empty: {0}")]
    EmptyCertificate(String),

    /// The key file holds no usable private key
    #[error("private key is missing or empty: {0}")]
    MissingPrivateKey(String),

    /// rustls rejected the certificate/key pair
    #[error("failed to build TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    /// The listen address is not a valid socket address
    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    /// The listener failed before or shortly after binding
    #[error("failed to start HTTPS server: {0}")]
    Startup(String),

    /// The server never reported a bound listener within the grace window
    #[error("HTTPS server did not bind within {0:?}")]
    BindTimeout(Duration),

    /// A lifecycle transition was attempted from the wrong state
    #[error("invalid server state transition: expected {expected}, found {found}")]
    InvalidTransition {
        /// State the caller expected
        expected: ServerState,
        /// State actually observed
        found: ServerState,
    },

    /// In-flight requests did not finish within the drain bound
    #[error("in-flight requests did not drain within {0:?}")]
    DrainTimeout(Duration),

    /// The serve task failed after startup
    #[error("HTTPS server failed: {0}")]
    Serve(String),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
