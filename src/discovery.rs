// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster DNS service discovery.
//!
//! The second nameserver handed to pods is the cluster IP of the `kube-dns`
//! service in `kube-system`. It is read once at startup.

use crate::constants::{CLUSTER_DNS_SERVICE_NAME, CLUSTER_DNS_SERVICE_NAMESPACE};
use crate::errors::ConfigError;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::{debug, info};

/// Read the cluster DNS address from the `kube-dns` service.
///
/// # Errors
///
/// Returns [`ConfigError::ClusterDnsDiscovery`] if the service cannot be read
/// or carries no usable cluster IP.
pub async fn discover_cluster_dns(client: Client) -> Result<String, ConfigError> {
    debug!(
        namespace = CLUSTER_DNS_SERVICE_NAMESPACE,
        service = CLUSTER_DNS_SERVICE_NAME,
        "Discovering cluster DNS service"
    );

    let services: Api<Service> = Api::namespaced(client, CLUSTER_DNS_SERVICE_NAMESPACE);
    let service = services
        .get(CLUSTER_DNS_SERVICE_NAME)
        .await
        .map_err(|e| {
            ConfigError::ClusterDnsDiscovery(format!(
                "failed to get service {CLUSTER_DNS_SERVICE_NAMESPACE}/{CLUSTER_DNS_SERVICE_NAME}: {e}"
            ))
        })?;

    let address = cluster_ip(&service)?;
    info!(address = %address, "Discovered cluster DNS address");
    Ok(address)
}

/// Extract the cluster IP of a service.
///
/// Headless services (`clusterIP: None`) have no address to hand out.
///
/// # Errors
///
/// Returns [`ConfigError::ClusterDnsDiscovery`] when the spec or cluster IP is
/// missing, empty, or `None`.
pub fn cluster_ip(service: &Service) -> Result<String, ConfigError> {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.cluster_ip.as_deref())
        .map(str::trim)
        .filter(|ip| !ip.is_empty() && *ip != "None")
        .map(str::to_string)
        .ok_or_else(|| {
            ConfigError::ClusterDnsDiscovery(format!(
                "service {CLUSTER_DNS_SERVICE_NAMESPACE}/{CLUSTER_DNS_SERVICE_NAME} has no cluster IP"
            ))
        })
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod discovery_tests;
