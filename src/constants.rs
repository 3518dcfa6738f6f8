// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the node-local DNS admission webhook.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Admission Protocol Constants
// ============================================================================

/// API version of the `AdmissionReview` envelope
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";

/// Kind of the `AdmissionReview` envelope
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// Patch type tag for RFC 6902 JSON patches
pub const PATCH_TYPE_JSON_PATCH: &str = "JSONPatch";

/// Kind name of the only resource this webhook mutates
pub const KIND_POD: &str = "Pod";

/// Resource name of the only resource this webhook mutates
pub const RESOURCE_PODS: &str = "pods";

/// Status code carried in-band on every admission denial
pub const DENIAL_CODE: u16 = 400;

// ============================================================================
// Pod DNS Constants
// ============================================================================

/// `dnsPolicy` value that disables Kubernetes-generated resolver config
pub const DNS_POLICY_NONE: &str = "None";

/// `dnsPolicy` value that opts host-network pods into cluster DNS
pub const DNS_POLICY_CLUSTER_FIRST_WITH_HOST_NET: &str = "ClusterFirstWithHostNet";

/// `dnsPolicy` the API server assumes when a pod leaves the field unset
pub const DNS_POLICY_DEFAULT: &str = "ClusterFirst";

/// JSON pointer to the pod DNS policy
pub const DNS_POLICY_PATH: &str = "/spec/dnsPolicy";

/// JSON pointer to the pod DNS config
pub const DNS_CONFIG_PATH: &str = "/spec/dnsConfig";

/// Namespace used when neither the pod nor the request names one
pub const DEFAULT_NAMESPACE: &str = "default";

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Default Kubernetes cluster domain
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// Default resolver options (`name:value` pairs)
pub const DEFAULT_DNS_OPTIONS: &str = "ndots:3,attempts:2,timeout:1";

/// Namespace holding the cluster DNS service
pub const CLUSTER_DNS_SERVICE_NAMESPACE: &str = "kube-system";

/// Name of the cluster DNS service
pub const CLUSTER_DNS_SERVICE_NAME: &str = "kube-dns";

// ============================================================================
// Webhook Server Constants
// ============================================================================

/// Default HTTPS port for the webhook server
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// Default bind address for the webhook server
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default path to the TLS certificate
pub const DEFAULT_CERT_FILE: &str = "/etc/certs/tls.crt";

/// Default path to the TLS private key
pub const DEFAULT_KEY_FILE: &str = "/etc/certs/tls.key";

/// Path of the mutation endpoint
pub const INJECT_PATH: &str = "/inject";

/// Path of the liveness probe
pub const HEALTH_PATH: &str = "/health";

/// Path of the readiness probe
pub const READY_PATH: &str = "/ready";

/// Path of the Prometheus metrics endpoint
pub const METRICS_PATH: &str = "/metrics";

/// Media type accepted and produced by the webhook
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Maximum accepted request body size (8 MiB)
///
/// An `UPDATE` review carries both `object` and `oldObject`, each up to the
/// 1.5 MiB etcd object limit, plus the envelope.
pub const MAX_REQUEST_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Default bound on reading a request body and writing the response
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Default bound on receiving request headers (also closes idle HTTP/1.1 connections)
pub const DEFAULT_HEADER_READ_TIMEOUT_SECS: u64 = 5;

/// Interval between HTTP/2 keep-alive pings on otherwise idle connections
pub const HTTP2_KEEP_ALIVE_INTERVAL_SECS: u64 = 60;

/// Grace window after bind during which an asynchronous serve failure aborts startup
pub const DEFAULT_STARTUP_GRACE_SECS: u64 = 2;

/// Upper bound on waiting for in-flight requests during shutdown
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
