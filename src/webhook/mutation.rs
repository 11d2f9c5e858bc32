//! OperatingSystemConfig mutation handler
//!
//! The CRI section of the object is decoded, passed through the ensurer and
//! written back. The response patch is the diff between the two documents.

use std::sync::Arc;

use axum::{extract::State, Json};
use kube::{
    api::DynamicObject,
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
};
use serde_json::Value;
use tracing::{debug, error, info};

use mirror_common::Error;

use crate::ensurer::Ensurer;
use crate::gardener::{ClusterContext, CriConfig, GardenContext};

use super::{WebhookError, WebhookState};

/// Kind of the objects this webhook mutates
pub const OSC_KIND: &str = "OperatingSystemConfig";

const CRI_CONFIG_POINTER: &str = "/spec/criConfig";

/// Handle mutating admission reviews for OperatingSystemConfigs
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let req: AdmissionRequest<DynamicObject> = body.try_into().map_err(|e| {
        error!(error = %e, "Failed to parse admission request");
        WebhookError::InvalidReview(format!("{e}"))
    })?;

    let response = mutate_osc(&state, &req).await;
    Ok(Json(response.into_review()))
}

/// Answer a single OperatingSystemConfig mutation request
pub async fn mutate_osc(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let uid = request.uid.clone();
    let response = AdmissionResponse::from(request);

    let Some(obj) = &request.object else {
        debug!(uid = %uid, "No object in request, allowing unchanged");
        return response;
    };

    let namespace = obj
        .metadata
        .namespace
        .clone()
        .or_else(|| request.namespace.clone())
        .unwrap_or_default();
    let garden = ClusterContext::new(state.clusters.clone(), namespace.as_str());

    let patch = match mutate_object(&state.ensurer, &garden, obj, request.old_object.as_ref()).await {
        Ok(patch) => patch,
        Err(e) => {
            error!(
                uid = %uid,
                namespace = %namespace,
                osc = ?obj.metadata.name,
                error = %e,
                retryable = e.is_retryable(),
                "Failed to mutate OperatingSystemConfig"
            );
            return response.deny(e.to_string());
        }
    };

    if patch.0.is_empty() {
        debug!(uid = %uid, osc = ?obj.metadata.name, "OperatingSystemConfig already up to date");
        return response;
    }

    info!(
        uid = %uid,
        namespace = %namespace,
        osc = ?obj.metadata.name,
        patch_ops = patch.0.len(),
        "Applying patch to OperatingSystemConfig"
    );

    match response.with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

/// Run the ensurer over an OperatingSystemConfig and diff the result
///
/// Objects without a CRI section yield an empty patch.
pub async fn mutate_object(
    ensurer: &Ensurer,
    garden: &dyn GardenContext,
    obj: &DynamicObject,
    old: Option<&DynamicObject>,
) -> Result<json_patch::Patch, Error> {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default();
    if kind != OSC_KIND {
        let kind = if kind.is_empty() { "<unknown>" } else { kind };
        return Err(Error::wrong_object_type(kind));
    }

    let original = to_value(obj)?;
    let Some(mut cri) = cri_config(&original)? else {
        return Ok(json_patch::Patch(Vec::new()));
    };
    let old_cri = match old {
        Some(old) => cri_config(&to_value(old)?)?,
        None => None,
    };

    ensurer
        .ensure_cri_config(garden, &mut cri, old_cri.as_ref())
        .await?;

    let mut mutated = original.clone();
    if let Some(slot) = mutated.pointer_mut(CRI_CONFIG_POINTER) {
        *slot = serde_json::to_value(&cri).map_err(|e| {
            Error::internal_with_context("mutation", format!("failed to encode criConfig: {e}"))
        })?;
    }

    Ok(json_patch::diff(&original, &mutated))
}

fn to_value(obj: &DynamicObject) -> Result<Value, Error> {
    serde_json::to_value(obj).map_err(|e| {
        Error::internal_with_context("mutation", format!("failed to encode object: {e}"))
    })
}

fn cri_config(obj: &Value) -> Result<Option<CriConfig>, Error> {
    match obj.pointer(CRI_CONFIG_POINTER) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw.clone()).map(Some).map_err(|e| {
            Error::internal_with_context("mutation", format!("failed to decode criConfig: {e}"))
        }),
    }
}
