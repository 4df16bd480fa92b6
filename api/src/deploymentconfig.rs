use k8s_openapi::api::core::v1::Toleration;
use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct CustomizedVariable {
    pub name: String,

    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacement {

    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default)]
    pub tolerations: Vec<Toleration>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub http_proxy: Option<String>,

    pub https_proxy: Option<String>,

    pub no_proxy: Option<String>,
}

/*
 * AddOnDeploymentConfig lets cluster admins override the way an addon agent
 * is deployed on a given managed cluster.
 */
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "addon.open-cluster-management.io", version = "v1alpha1", kind = "AddOnDeploymentConfig", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct AddOnDeploymentConfigSpec {

    // free form name/value pairs handed to the manifest templates
    #[serde(default)]
    pub customized_variables: Vec<CustomizedVariable>,

    pub node_placement: Option<NodePlacement>,

    pub proxy_config: Option<ProxyConfig>,
}
