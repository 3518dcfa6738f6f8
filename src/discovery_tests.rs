// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for cluster DNS discovery.

#[cfg(test)]
mod tests {
    use crate::discovery::*;
    use crate::errors::ConfigError;
    use k8s_openapi::api::core::v1::{Service, ServiceSpec};

    fn service(cluster_ip: Option<&str>) -> Service {
        Service {
            spec: Some(ServiceSpec {
                cluster_ip: cluster_ip.map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_cluster_ip_extracted() {
        assert_eq!(cluster_ip(&service(Some("10.96.0.10"))).unwrap(), "10.96.0.10");
    }

    #[test]
    fn test_headless_service_rejected() {
        assert!(matches!(
            cluster_ip(&service(Some("None"))),
            Err(ConfigError::ClusterDnsDiscovery(_))
        ));
    }

    #[test]
    fn test_empty_cluster_ip_rejected() {
        assert!(cluster_ip(&service(Some(""))).is_err());
        assert!(cluster_ip(&service(None)).is_err());
    }

    #[test]
    fn test_service_without_spec_rejected() {
        let err = cluster_ip(&Service::default()).unwrap_err();
        assert!(err.to_string().contains("kube-system/kube-dns"));
    }
}
