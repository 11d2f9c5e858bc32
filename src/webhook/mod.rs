//! Admission webhooks of the registry-mirror extension
//!
//! Two endpoints are served:
//! - `POST /webhooks/registry-config` validates shoots that enable the extension
//! - `POST /webhooks/registry-mirror` adds registry mirrors to OperatingSystemConfigs
//!
//! `GET /healthz` answers liveness probes.

pub mod admission;
pub mod mutation;
pub mod registration;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::admission::ShootValidator;
use crate::ensurer::Ensurer;
use crate::gardener::ClusterReader;

/// Path of the shoot validation webhook
pub const VALIDATION_PATH: &str = "/webhooks/registry-config";
/// Path of the OperatingSystemConfig mutation webhook
pub const MUTATION_PATH: &str = "/webhooks/registry-mirror";
/// Path of the liveness endpoint
pub const HEALTH_PATH: &str = "/healthz";

/// Shared state for webhook handlers
pub struct WebhookState {
    /// Validates shoots
    pub validator: ShootValidator,
    /// Mutates CRI configs
    pub ensurer: Ensurer,
    /// Resolves the Cluster of a technical namespace
    pub clusters: Arc<dyn ClusterReader>,
}

impl WebhookState {
    /// Create webhook state from its parts
    pub fn new(validator: ShootValidator, ensurer: Ensurer, clusters: Arc<dyn ClusterReader>) -> Self {
        Self {
            validator,
            ensurer,
            clusters,
        }
    }
}

/// Error type for webhook requests that cannot be answered with a review
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The admission review request was invalid or malformed
    #[error("invalid admission review: {0}")]
    InvalidReview(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidReview(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Create the webhook router with every endpoint
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(VALIDATION_PATH, post(admission::validate_handler))
        .route(MUTATION_PATH, post(mutation::mutate_handler))
        .route(HEALTH_PATH, get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
pub(crate) mod test_support {
    use kube::api::DynamicObject;
    use kube::core::admission::{AdmissionRequest, AdmissionReview};
    use serde_json::{json, Value};

    /// Build an admission request the way the API server sends it
    pub fn admission_request(kind: &str, resource: &str, object: Value) -> AdmissionRequest<DynamicObject> {
        let (group, version) = match object["apiVersion"].as_str().unwrap_or("v1").split_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), "v1".to_string()),
        };
        let review: AdmissionReview<DynamicObject> = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "0df28fbd-5f5f-11e8-bc74-36e6bb280816",
                "kind": {"group": group, "version": version, "kind": kind},
                "resource": {"group": group, "version": version, "resource": resource},
                "name": object["metadata"]["name"],
                "namespace": object["metadata"]["namespace"],
                "operation": "CREATE",
                "userInfo": {"username": "system:serviceaccount:garden:gardenlet"},
                "object": object,
                "dryRun": false
            }
        }))
        .expect("valid review");
        review.try_into().expect("review with request")
    }
}
