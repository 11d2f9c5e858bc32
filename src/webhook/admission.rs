//! Shoot validation handler

use std::sync::Arc;

use axum::{extract::State, Json};
use kube::{
    api::DynamicObject,
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
};
use tracing::{debug, error, info};

use crate::admission::ShootValidator;

use super::{WebhookError, WebhookState};

/// Handle validating admission reviews for Shoots
pub async fn validate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let req: AdmissionRequest<DynamicObject> = body.try_into().map_err(|e| {
        error!(error = %e, "Failed to parse admission request");
        WebhookError::InvalidReview(format!("{e}"))
    })?;

    let response = validate_shoot(&state.validator, &req).await;
    Ok(Json(response.into_review()))
}

/// Answer a single shoot admission request
///
/// Denials carry the validator's message verbatim.
pub async fn validate_shoot(
    validator: &ShootValidator,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let uid = request.uid.clone();
    let response = AdmissionResponse::from(request);

    let Some(obj) = &request.object else {
        debug!(uid = %uid, "No object in request, allowing");
        return response;
    };

    match validator.validate(obj, request.old_object.as_ref()).await {
        Ok(()) => {
            debug!(uid = %uid, shoot = ?obj.metadata.name, "Shoot admitted");
            response
        }
        Err(e) => {
            info!(
                uid = %uid,
                shoot = ?obj.metadata.name,
                namespace = ?obj.metadata.namespace,
                error = %e,
                retryable = e.is_retryable(),
                "Denying shoot"
            );
            response.deny(e.to_string())
        }
    }
}
