use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/*
 * ManagedCluster represents a worker cluster registered with the hub. The
 * hub controller only reads it: labels drive the install strategy and the
 * cluster name doubles as the namespace holding its addons and works.
 */
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "cluster.open-cluster-management.io", version = "v1", kind = "ManagedCluster")]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {

    // whether the hub accepted the registration request of the cluster
    #[serde(default)]
    pub hub_accepts_client: bool,

    pub lease_duration_seconds: Option<i32>,
}
