// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for admission wire types.

#[cfg(test)]
mod tests {
    use crate::admission::*;
    use serde_json::json;

    #[test]
    fn test_request_deserializes_from_api_server_envelope() {
        let body = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "namespace": "team-a",
                "operation": "CREATE",
                "userInfo": {"username": "admin"},
                "object": {"metadata": {"name": "web"}},
                "dryRun": false
            }
        });

        let review: AdmissionReview = serde_json::from_value(body).unwrap();
        let request = review.request.unwrap();

        assert_eq!(request.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(request.kind.kind, "Pod");
        assert_eq!(request.resource.resource, "pods");
        assert_eq!(request.namespace.as_deref(), Some("team-a"));
        assert_eq!(request.operation, Operation::Create);
        assert_eq!(request.dry_run, Some(false));
        assert!(request.object.is_some());
        assert!(request.old_object.is_none());
    }

    #[test]
    fn test_unrecognized_operation_is_unknown() {
        let request: AdmissionRequest =
            serde_json::from_value(json!({"uid": "1", "operation": "PATCH"})).unwrap();
        assert_eq!(request.operation, Operation::Unknown);
    }

    #[test]
    fn test_malformed_object_does_not_fail_envelope() {
        let request: AdmissionRequest = serde_json::from_value(json!({
            "uid": "1",
            "operation": "CREATE",
            "object": {"spec": {"dnsPolicy": 42}}
        }))
        .unwrap();
        assert!(request.object.is_some());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "CREATE");
        assert_eq!(Operation::Update.to_string(), "UPDATE");
        assert_eq!(Operation::Delete.to_string(), "DELETE");
        assert_eq!(Operation::Connect.to_string(), "CONNECT");
    }

    #[test]
    fn test_allow_carries_no_status_or_patch() {
        let value = serde_json::to_value(AdmissionResponse::allow("abc")).unwrap();
        assert_eq!(value, json!({"uid": "abc", "allowed": true}));
    }

    #[test]
    fn test_deny_serializes_status_with_code_400() {
        let response = AdmissionResponse::deny("abc", "failed to parse pod: boom");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["allowed"], false);
        assert_eq!(value["status"]["code"], 400);
        assert_eq!(value["status"]["message"], "failed to parse pod: boom");
        assert!(value.get("patch").is_none());
        assert!(value.get("patchType").is_none());
    }

    #[test]
    fn test_with_patch_encodes_base64_and_tags_type() {
        let raw = br#"[{"op":"replace","path":"/spec/dnsPolicy","value":"None"}]"#;
        let response = AdmissionResponse::with_patch("abc", raw);

        assert!(response.allowed);
        assert!(response.result.is_none());
        assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));
        assert_eq!(response.decoded_patch().unwrap().unwrap(), raw.to_vec());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["patchType"], "JSONPatch");
    }

    #[test]
    fn test_decoded_patch_absent_without_patch() {
        assert_eq!(AdmissionResponse::allow("abc").decoded_patch().unwrap(), None);
    }

    #[test]
    fn test_from_response_wraps_in_v1_envelope() {
        let review = AdmissionReview::from_response(AdmissionResponse::allow("abc"));
        let value = serde_json::to_value(&review).unwrap();

        assert_eq!(value["apiVersion"], "admission.k8s.io/v1");
        assert_eq!(value["kind"], "AdmissionReview");
        assert_eq!(value["response"]["uid"], "abc");
        assert!(value.get("request").is_none());
    }
}
