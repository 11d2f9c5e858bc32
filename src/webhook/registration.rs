//! Webhook configurations registered with the seed API server

use std::collections::BTreeMap;

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    ValidatingWebhook, ValidatingWebhookConfiguration, WebhookClientConfig,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::Client;
use tracing::info;

use mirror_common::Error;

use super::{MUTATION_PATH, VALIDATION_PATH};

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "registry-mirror-webhook";
/// Name of both webhook configuration objects
pub const WEBHOOK_CONFIGURATION_NAME: &str = "gardener-extension-registry-mirror";
/// Label selecting shoots that enable the extension
pub const SHOOT_SELECTOR_LABEL: &str = "extensions.extensions.gardener.cloud/registry-mirror";
/// Label selecting technical namespaces of shoots that enable the extension
pub const NAMESPACE_SELECTOR_LABEL: &str = "extensions.gardener.cloud/registry-mirror";

/// Where the API server reaches the webhook server
#[derive(Clone, Debug)]
pub struct WebhookEndpoint {
    /// Name of the Service in front of the webhook server
    pub service_name: String,
    /// Namespace of that Service
    pub namespace: String,
    /// Service port
    pub port: i32,
    /// PEM encoded CA bundle the API server trusts for the webhook
    pub ca_bundle: Vec<u8>,
}

impl WebhookEndpoint {
    fn client_config(&self, path: &str) -> WebhookClientConfig {
        WebhookClientConfig {
            service: Some(ServiceReference {
                name: self.service_name.clone(),
                namespace: self.namespace.clone(),
                path: Some(path.to_string()),
                port: Some(self.port),
            }),
            ca_bundle: Some(ByteString(self.ca_bundle.clone())),
            ..Default::default()
        }
    }
}

fn label_selector(label: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some(BTreeMap::from([(label.to_string(), "true".to_string())])),
        ..Default::default()
    }
}

fn create_update_rule(group: &str, version: &str, resource: &str) -> RuleWithOperations {
    RuleWithOperations {
        operations: Some(vec!["CREATE".to_string(), "UPDATE".to_string()]),
        api_groups: Some(vec![group.to_string()]),
        api_versions: Some(vec![version.to_string()]),
        resources: Some(vec![resource.to_string()]),
        scope: Some("Namespaced".to_string()),
    }
}

/// Validating webhook for shoots labelled with the extension
pub fn validating_webhook_configuration(
    endpoint: &WebhookEndpoint,
) -> ValidatingWebhookConfiguration {
    ValidatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(WEBHOOK_CONFIGURATION_NAME.to_string()),
            ..Default::default()
        },
        webhooks: Some(vec![ValidatingWebhook {
            name: "registry-config.mirror.extensions.gardener.cloud".to_string(),
            admission_review_versions: vec!["v1".to_string()],
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            match_policy: Some("Equivalent".to_string()),
            rules: Some(vec![create_update_rule(
                "core.gardener.cloud",
                "v1beta1",
                "shoots",
            )]),
            client_config: endpoint.client_config(VALIDATION_PATH),
            object_selector: Some(label_selector(SHOOT_SELECTOR_LABEL)),
            ..Default::default()
        }]),
    }
}

/// Mutating webhook for OperatingSystemConfigs in labelled namespaces
pub fn mutating_webhook_configuration(endpoint: &WebhookEndpoint) -> MutatingWebhookConfiguration {
    MutatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(WEBHOOK_CONFIGURATION_NAME.to_string()),
            ..Default::default()
        },
        webhooks: Some(vec![MutatingWebhook {
            name: "registry-mirror.mirror.extensions.gardener.cloud".to_string(),
            admission_review_versions: vec!["v1".to_string()],
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            match_policy: Some("Equivalent".to_string()),
            reinvocation_policy: Some("IfNeeded".to_string()),
            rules: Some(vec![create_update_rule(
                "extensions.gardener.cloud",
                "v1alpha1",
                "operatingsystemconfigs",
            )]),
            client_config: endpoint.client_config(MUTATION_PATH),
            namespace_selector: Some(label_selector(NAMESPACE_SELECTOR_LABEL)),
            ..Default::default()
        }]),
    }
}

/// Apply both webhook configurations with server-side apply
pub async fn apply_webhook_configurations(
    client: &Client,
    endpoint: &WebhookEndpoint,
) -> Result<(), Error> {
    let params = PatchParams::apply(FIELD_MANAGER).force();

    let validating: Api<ValidatingWebhookConfiguration> = Api::all(client.clone());
    validating
        .patch(
            WEBHOOK_CONFIGURATION_NAME,
            &params,
            &Patch::Apply(&validating_webhook_configuration(endpoint)),
        )
        .await?;

    let mutating: Api<MutatingWebhookConfiguration> = Api::all(client.clone());
    mutating
        .patch(
            WEBHOOK_CONFIGURATION_NAME,
            &params,
            &Patch::Apply(&mutating_webhook_configuration(endpoint)),
        )
        .await?;

    info!(
        name = WEBHOOK_CONFIGURATION_NAME,
        service = %endpoint.service_name,
        namespace = %endpoint.namespace,
        "Webhook configurations installed"
    );
    Ok(())
}
