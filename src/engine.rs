// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission decision engine.
//!
//! Turns one [`AdmissionRequest`] into exactly one [`AdmissionResponse`]. The
//! engine is total: every failure on the decision path becomes an in-band denial
//! with code 400, never a transport error.
//!
//! # Decision Flow
//!
//! 1. Anything other than a Pod (`kind: Pod`, `resource: pods`) is allowed untouched
//! 2. Anything other than `CREATE` or `UPDATE` is allowed untouched
//! 3. The pod is parsed from the raw object (failure → deny)
//! 4. `CREATE`: the injection policy runs on a working copy of the spec
//! 5. `UPDATE`: the working copy takes the prior object's DNS policy and config
//! 6. The patch is diffed from original and working copy and attached

use crate::admission::{AdmissionRequest, AdmissionResponse, Operation};
use crate::constants::{DEFAULT_NAMESPACE, KIND_POD, RESOURCE_PODS};
use crate::dns_injection::{inject, DnsInjectionSpec};
use crate::errors::AdmissionError;
use crate::metrics::{record_admission, record_injection};
use crate::patch;
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stateless decision engine holding the process-wide injection spec.
///
/// Cheap to clone; clones share the same spec.
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    dns: Arc<DnsInjectionSpec>,
}

impl AdmissionEngine {
    /// Create an engine for the given injection spec.
    #[must_use]
    pub fn new(dns: DnsInjectionSpec) -> Self {
        Self { dns: Arc::new(dns) }
    }

    /// The injection spec this engine applies.
    #[must_use]
    pub fn dns_spec(&self) -> &DnsInjectionSpec {
        &self.dns
    }

    /// Decide on one admission request.
    pub fn decide(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let start = Instant::now();
        let operation = request.operation.to_string();

        if request.kind.kind != KIND_POD || request.resource.resource != RESOURCE_PODS {
            debug!(
                uid = %request.uid,
                kind = %request.kind.kind,
                resource = %request.resource.resource,
                "Skipping non-pod resource"
            );
            record_admission(&operation, "skipped", start.elapsed());
            return AdmissionResponse::allow(request.uid.clone());
        }

        if !matches!(request.operation, Operation::Create | Operation::Update) {
            debug!(
                uid = %request.uid,
                operation = %operation,
                "Skipping non-create/update operation"
            );
            record_admission(&operation, "skipped", start.elapsed());
            return AdmissionResponse::allow(request.uid.clone());
        }

        match self.mutate(request) {
            Ok(patch) => {
                info!(
                    uid = %request.uid,
                    operation = %operation,
                    patch_size = patch.len(),
                    duration_us = start.elapsed().as_micros(),
                    "Admission request allowed with patch"
                );
                record_admission(&operation, "allowed", start.elapsed());
                AdmissionResponse::with_patch(request.uid.clone(), &patch)
            }
            Err(e) => {
                warn!(
                    uid = %request.uid,
                    operation = %operation,
                    reason = e.reason(),
                    error = %e,
                    "Admission request denied"
                );
                record_admission(&operation, "denied", start.elapsed());
                AdmissionResponse::deny(request.uid.clone(), e.to_string())
            }
        }
    }

    fn mutate(&self, request: &AdmissionRequest) -> Result<Vec<u8>, AdmissionError> {
        let pod = parse_pod(request.object.as_ref())
            .map_err(|e| e.unwrap_or(AdmissionError::MissingObject))?;
        let original = pod.spec.as_ref().ok_or(AdmissionError::MissingSpec)?;
        let mut working = original.clone();

        if request.operation == Operation::Update {
            let old_pod = parse_pod(request.old_object.as_ref()).map_err(|e| match e {
                Some(AdmissionError::InvalidPod(source)) => AdmissionError::InvalidOldPod(source),
                Some(other) => other,
                None => AdmissionError::MissingOldObject,
            })?;
            let old = old_pod.spec.as_ref().ok_or(AdmissionError::MissingSpec)?;
            pin_dns_settings(&mut working, old);
        } else {
            let namespace = pod_namespace(&pod, request);
            let outcome = inject(&mut working, &self.dns, namespace);
            record_injection(outcome.as_str());
            info!(
                uid = %request.uid,
                name = pod.metadata.name.as_deref().unwrap_or_default(),
                namespace = %namespace,
                outcome = outcome.as_str(),
                "DNS injection evaluated"
            );
        }

        let patch = patch::diff(original, &working)?;
        patch::encode(&patch)
    }
}

/// Parse a raw object as a Pod. `Err(None)` means the object was absent.
fn parse_pod(raw: Option<&Value>) -> Result<Pod, Option<AdmissionError>> {
    match raw {
        None | Some(Value::Null) => Err(None),
        Some(value) => Pod::deserialize(value).map_err(|e| Some(AdmissionError::InvalidPod(e))),
    }
}

/// DNS settings are fixed at creation; an update always carries the prior values.
fn pin_dns_settings(working: &mut PodSpec, old: &PodSpec) {
    working.dns_policy = old.dns_policy.clone();
    working.dns_config = old.dns_config.clone();
}

fn pod_namespace<'a>(pod: &'a Pod, request: &'a AdmissionRequest) -> &'a str {
    pod.metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .or_else(|| request.namespace.as_deref().filter(|ns| !ns.is_empty()))
        .unwrap_or(DEFAULT_NAMESPACE)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
