// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! JSON patch generation for pod DNS settings.
//!
//! Only `/spec/dnsPolicy` and `/spec/dnsConfig` are ever touched. The policy
//! `replace` is always emitted first, even when the value is unchanged.

use crate::constants::{DNS_CONFIG_PATH, DNS_POLICY_DEFAULT, DNS_POLICY_PATH};
use crate::errors::AdmissionError;
use json_patch::{AddOperation, Patch, PatchOperation, ReplaceOperation};
use k8s_openapi::api::core::v1::PodSpec;
use serde_json::Value;
use tracing::debug;

/// Build the patch taking `original` to `modified`.
///
/// Emits, in order:
/// 1. `replace /spec/dnsPolicy` with the modified policy (`ClusterFirst` if unset)
/// 2. `add /spec/dnsConfig` with the full modified config, only when present
///
/// # Errors
///
/// Returns [`AdmissionError::PatchSerialization`] if the DNS config cannot be
/// converted to JSON.
pub fn diff(original: &PodSpec, modified: &PodSpec) -> Result<Patch, AdmissionError> {
    let policy = modified
        .dns_policy
        .clone()
        .unwrap_or_else(|| DNS_POLICY_DEFAULT.to_string());

    let mut operations = vec![PatchOperation::Replace(ReplaceOperation {
        path: DNS_POLICY_PATH.to_string(),
        value: Value::String(policy),
    })];

    if let Some(dns_config) = &modified.dns_config {
        let value = serde_json::to_value(dns_config).map_err(AdmissionError::PatchSerialization)?;
        operations.push(PatchOperation::Add(AddOperation {
            path: DNS_CONFIG_PATH.to_string(),
            value,
        }));
    }

    debug!(
        operations = operations.len(),
        policy_changed = original.dns_policy != modified.dns_policy,
        config_changed = original.dns_config != modified.dns_config,
        "Generated JSON patch"
    );

    Ok(Patch(operations))
}

/// Serialize a patch to its wire form.
///
/// # Errors
///
/// Returns [`AdmissionError::PatchSerialization`] if serialization fails.
pub fn encode(patch: &Patch) -> Result<Vec<u8>, AdmissionError> {
    serde_json::to_vec(patch).map_err(AdmissionError::PatchSerialization)
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod patch_tests;
