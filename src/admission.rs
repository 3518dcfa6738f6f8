// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `admission.k8s.io/v1` wire types.
//!
//! The request keeps `object` and `oldObject` as raw JSON so that a malformed pod
//! never fails envelope parsing: the envelope is validated by the transport, the
//! pod is parsed later by the decision engine and a bad pod becomes an in-band
//! denial rather than an HTTP error.
//!
//! # Example
//!
//! ```rust
//! use nodelocaldns_webhook::admission::{AdmissionResponse, AdmissionReview};
//!
//! let response = AdmissionResponse::allow("705ab4f5-6393-11e8-b7cc-42010a800002");
//! let review = AdmissionReview::from_response(response);
//! let body = serde_json::to_value(&review).unwrap();
//! assert_eq!(body["kind"], "AdmissionReview");
//! assert_eq!(body["response"]["allowed"], true);
//! ```

use crate::constants::{
    ADMISSION_API_VERSION, ADMISSION_REVIEW_KIND, DENIAL_CODE, PATCH_TYPE_JSON_PATCH,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Operation that triggered the admission call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Object creation
    Create,
    /// Object update
    Update,
    /// Object deletion
    Delete,
    /// Connect to a sub-resource (exec, proxy, ...)
    Connect,
    /// Any operation this webhook does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Group/version/kind of the admitted object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

/// Group/version/resource of the admitted object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// A single admission call as sent by the API server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Opaque correlation token, echoed back in the response
    #[serde(default)]
    pub uid: String,

    /// Kind of the object being admitted
    #[serde(default)]
    pub kind: GroupVersionKind,

    /// Resource being requested
    #[serde(default)]
    pub resource: GroupVersionResource,

    /// Sub-resource being requested, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,

    /// Name of the object, may be empty on create with `generateName`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Namespace of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Operation being performed
    #[serde(default)]
    pub operation: Operation,

    /// Raw object being admitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,

    /// Raw prior object, set on `UPDATE`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,

    /// Whether the call is a dry run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

/// Structured denial reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: u16,
    pub message: String,
}

/// The webhook's answer to one [`AdmissionRequest`].
///
/// Constructed once through [`AdmissionResponse::allow`],
/// [`AdmissionResponse::deny`] or [`AdmissionResponse::with_patch`]; a denial
/// never carries a patch and a patched response is always allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Echoed request uid
    pub uid: String,

    /// Whether the request is admitted
    pub allowed: bool,

    /// Denial reason
    #[serde(default, rename = "status", skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,

    /// Base64-encoded JSON patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,

    /// Patch format tag, always `JSONPatch` when a patch is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

impl AdmissionResponse {
    /// Admit the request unchanged.
    #[must_use]
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            result: None,
            patch: None,
            patch_type: None,
        }
    }

    /// Deny the request with code 400 and the given message.
    #[must_use]
    pub fn deny(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            result: Some(Status {
                code: DENIAL_CODE,
                message: message.into(),
            }),
            patch: None,
            patch_type: None,
        }
    }

    /// Admit the request and attach a serialized JSON patch.
    #[must_use]
    pub fn with_patch(uid: impl Into<String>, patch: &[u8]) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            result: None,
            patch: Some(STANDARD.encode(patch)),
            patch_type: Some(PATCH_TYPE_JSON_PATCH.to_string()),
        }
    }

    /// Decode the attached patch, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch field is not valid base64.
    pub fn decoded_patch(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        self.patch.as_deref().map(|p| STANDARD.decode(p)).transpose()
    }
}

/// The `AdmissionReview` envelope wrapping a request or a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// Wrap a response in an `admission.k8s.io/v1` envelope.
    #[must_use]
    pub fn from_response(response: AdmissionResponse) -> Self {
        Self {
            api_version: Some(ADMISSION_API_VERSION.to_string()),
            kind: Some(ADMISSION_REVIEW_KIND.to_string()),
            request: None,
            response: Some(response),
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod admission_tests;
