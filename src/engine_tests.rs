// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the admission decision engine.

#[cfg(test)]
mod tests {
    use crate::admission::*;
    use crate::dns_injection::{DnsInjectionSpec, DnsOption};
    use crate::engine::*;
    use serde_json::{json, Value};

    const UID: &str = "705ab4f5-6393-11e8-b7cc-42010a800002";

    fn engine() -> AdmissionEngine {
        AdmissionEngine::new(DnsInjectionSpec::new(
            "169.254.20.10",
            "10.96.0.10",
            "cluster.local",
            vec![],
            vec![DnsOption::new("ndots", "3")],
        ))
    }

    fn pod(namespace: Option<&str>, spec: Value) -> Value {
        let mut metadata = json!({"name": "web"});
        if let Some(ns) = namespace {
            metadata["namespace"] = json!(ns);
        }
        let mut spec = spec;
        spec["containers"] = json!([{"name": "app", "image": "nginx"}]);
        json!({"apiVersion": "v1", "kind": "Pod", "metadata": metadata, "spec": spec})
    }

    fn pod_request(operation: Operation, object: Option<Value>) -> AdmissionRequest {
        AdmissionRequest {
            uid: UID.to_string(),
            kind: GroupVersionKind {
                group: String::new(),
                version: "v1".to_string(),
                kind: "Pod".to_string(),
            },
            resource: GroupVersionResource {
                group: String::new(),
                version: "v1".to_string(),
                resource: "pods".to_string(),
            },
            namespace: Some("team-a".to_string()),
            operation,
            object,
            ..Default::default()
        }
    }

    fn decoded(response: &AdmissionResponse) -> Value {
        let raw = response.decoded_patch().unwrap().expect("patch present");
        serde_json::from_slice(&raw).unwrap()
    }

    // ========================================================================
    // Scope
    // ========================================================================

    #[test]
    fn test_non_pod_kind_allowed_without_patch() {
        let mut request = pod_request(Operation::Create, Some(json!({"kind": "Deployment"})));
        request.kind.kind = "Deployment".to_string();
        request.resource.resource = "deployments".to_string();

        let response = engine().decide(&request);

        assert_eq!(response, AdmissionResponse::allow(UID));
    }

    #[test]
    fn test_pod_kind_on_other_resource_allowed_without_patch() {
        let mut request = pod_request(Operation::Create, Some(pod(None, json!({}))));
        request.resource.resource = "pods/ephemeralcontainers".to_string();

        assert_eq!(engine().decide(&request), AdmissionResponse::allow(UID));
    }

    #[test]
    fn test_delete_and_connect_allowed_without_patch() {
        for operation in [Operation::Delete, Operation::Connect, Operation::Unknown] {
            let request = pod_request(operation, Some(json!("not a pod")));
            assert_eq!(engine().decide(&request), AdmissionResponse::allow(UID));
        }
    }

    // ========================================================================
    // Create
    // ========================================================================

    #[test]
    fn test_create_default_pod_gets_exact_patch() {
        let request = pod_request(
            Operation::Create,
            Some(pod(Some("team-a"), json!({"dnsPolicy": "ClusterFirst"}))),
        );

        let response = engine().decide(&request);

        assert!(response.allowed);
        assert_eq!(response.uid, UID);
        assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));
        assert_eq!(
            decoded(&response),
            json!([
                {"op": "replace", "path": "/spec/dnsPolicy", "value": "None"},
                {
                    "op": "add",
                    "path": "/spec/dnsConfig",
                    "value": {
                        "nameservers": ["169.254.20.10", "10.96.0.10"],
                        "searches": ["team-a.svc.cluster.local", "svc.cluster.local", "cluster.local"],
                        "options": [{"name": "ndots", "value": "3"}]
                    }
                }
            ])
        );
    }

    #[test]
    fn test_create_uses_request_namespace_when_pod_has_none() {
        let mut request = pod_request(Operation::Create, Some(pod(None, json!({}))));
        request.namespace = Some("batch".to_string());

        let patch = decoded(&engine().decide(&request));

        assert_eq!(patch[1]["value"]["searches"][0], "batch.svc.cluster.local");
    }

    #[test]
    fn test_create_falls_back_to_default_namespace() {
        let mut request = pod_request(Operation::Create, Some(pod(None, json!({}))));
        request.namespace = None;

        let patch = decoded(&engine().decide(&request));

        assert_eq!(patch[1]["value"]["searches"][0], "default.svc.cluster.local");
    }

    #[test]
    fn test_create_opt_out_policy_none_honored() {
        let request = pod_request(
            Operation::Create,
            Some(pod(Some("team-a"), json!({"dnsPolicy": "None"}))),
        );

        let response = engine().decide(&request);

        assert!(response.allowed);
        assert_eq!(
            decoded(&response),
            json!([{"op": "replace", "path": "/spec/dnsPolicy", "value": "None"}])
        );
    }

    #[test]
    fn test_create_existing_dns_config_preserved() {
        let existing = json!({"nameservers": ["1.1.1.1"]});
        let request = pod_request(
            Operation::Create,
            Some(pod(
                Some("team-a"),
                json!({"dnsPolicy": "ClusterFirst", "dnsConfig": existing}),
            )),
        );

        let patch = decoded(&engine().decide(&request));

        assert_eq!(patch[0]["value"], "ClusterFirst");
        assert_eq!(patch[1]["value"], existing);
    }

    #[test]
    fn test_create_host_network_without_opt_in_untouched() {
        let request = pod_request(
            Operation::Create,
            Some(pod(
                Some("team-a"),
                json!({"hostNetwork": true, "dnsPolicy": "ClusterFirst"}),
            )),
        );

        assert_eq!(
            decoded(&engine().decide(&request)),
            json!([{"op": "replace", "path": "/spec/dnsPolicy", "value": "ClusterFirst"}])
        );
    }

    #[test]
    fn test_create_is_idempotent_on_already_injected_pod() {
        let engine = engine();
        let original = pod(Some("team-a"), json!({"dnsPolicy": "ClusterFirst"}));
        let first = engine.decide(&pod_request(Operation::Create, Some(original.clone())));

        let mut injected = original;
        json_patch::patch(
            &mut injected,
            &serde_json::from_value::<Vec<json_patch::PatchOperation>>(decoded(&first)).unwrap(),
        )
        .unwrap();
        let second = engine.decide(&pod_request(Operation::Create, Some(injected.clone())));

        let mut reapplied = injected.clone();
        json_patch::patch(
            &mut reapplied,
            &serde_json::from_value::<Vec<json_patch::PatchOperation>>(decoded(&second)).unwrap(),
        )
        .unwrap();
        assert_eq!(reapplied, injected);
    }

    // ========================================================================
    // Update
    // ========================================================================

    #[test]
    fn test_update_pins_prior_dns_settings() {
        let old = pod(
            Some("team-a"),
            json!({"dnsPolicy": "None", "dnsConfig": {"nameservers": ["169.254.20.10"]}}),
        );
        let new = pod(
            Some("team-a"),
            json!({"dnsPolicy": "Default", "dnsConfig": {"nameservers": ["8.8.8.8"]}}),
        );
        let mut request = pod_request(Operation::Update, Some(new));
        request.old_object = Some(old);

        let response = engine().decide(&request);

        assert!(response.allowed);
        assert_eq!(
            decoded(&response),
            json!([
                {"op": "replace", "path": "/spec/dnsPolicy", "value": "None"},
                {"op": "add", "path": "/spec/dnsConfig", "value": {"nameservers": ["169.254.20.10"]}}
            ])
        );
    }

    #[test]
    fn test_update_never_injects() {
        let old = pod(Some("team-a"), json!({"dnsPolicy": "ClusterFirst"}));
        let mut request = pod_request(Operation::Update, Some(old.clone()));
        request.old_object = Some(old);

        assert_eq!(
            decoded(&engine().decide(&request)),
            json!([{"op": "replace", "path": "/spec/dnsPolicy", "value": "ClusterFirst"}])
        );
    }

    #[test]
    fn test_update_without_old_object_denied() {
        let request = pod_request(Operation::Update, Some(pod(Some("team-a"), json!({}))));

        let response = engine().decide(&request);

        assert!(!response.allowed);
        assert_eq!(response.result.unwrap().code, 400);
    }

    #[test]
    fn test_update_with_malformed_old_object_denied() {
        let mut request = pod_request(Operation::Update, Some(pod(Some("team-a"), json!({}))));
        request.old_object = Some(pod(Some("team-a"), json!({"dnsPolicy": 42})));

        let response = engine().decide(&request);

        assert!(!response.allowed);
        assert!(response
            .result
            .unwrap()
            .message
            .starts_with("failed to parse old pod"));
    }

    // ========================================================================
    // Denials
    // ========================================================================

    #[test]
    fn test_malformed_pod_denied_with_400() {
        let request = pod_request(
            Operation::Create,
            Some(pod(Some("team-a"), json!({"dnsPolicy": 42}))),
        );

        let response = engine().decide(&request);

        assert!(!response.allowed);
        assert!(response.patch.is_none());
        assert!(response.patch_type.is_none());
        let status = response.result.unwrap();
        assert_eq!(status.code, 400);
        assert!(status.message.starts_with("failed to parse pod"));
    }

    #[test]
    fn test_missing_object_denied() {
        let response = engine().decide(&pod_request(Operation::Create, None));
        assert!(!response.allowed);
        assert_eq!(response.result.unwrap().code, 400);
    }

    #[test]
    fn test_null_object_denied() {
        let response = engine().decide(&pod_request(Operation::Create, Some(Value::Null)));
        assert!(!response.allowed);
    }

    #[test]
    fn test_pod_without_spec_denied() {
        let object = json!({"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web"}});
        let response = engine().decide(&pod_request(Operation::Create, Some(object)));

        assert!(!response.allowed);
        assert_eq!(
            response.result.unwrap().message,
            "failed to parse pod: pod has no spec"
        );
    }

    #[test]
    fn test_engine_exposes_dns_spec() {
        assert_eq!(engine().dns_spec().nameservers()[0], "169.254.20.10");
    }
}
