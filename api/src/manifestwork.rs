use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/*
 * ManifestWork carries a list of resources to be applied on the managed
 * cluster whose namespace it lives in.
 */
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "work.open-cluster-management.io", version = "v1", kind = "ManifestWork", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ManifestWorkSpec {

    #[serde(default)]
    pub workload: ManifestsTemplate,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ManifestsTemplate {

    // raw kubernetes objects, kept untyped
    #[serde(default)]
    pub manifests: Vec<serde_json::Value>,
}

impl ManifestWork {

    pub fn manifests(&self) -> &[serde_json::Value] {
	&self.spec.workload.manifests
    }
}
