use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use k8s_openapi::chrono::Utc;
use kube::api::ObjectMeta;
use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gvr::Gvr;

/*
 * Annotation set on ManagedClusterAddOns created by an install strategy, so
 * they can be told apart from the ones created by users.
 */
pub const CREATED_BY_INSTALL_STRATEGY_ANNOTATION: &str = "addon.open-cluster-management.io/created-by-install-strategy";

/* Condition written once the manifests of the addon were rendered and applied */
pub const CONDITION_MANIFEST_APPLIED: &str = "ManifestApplied";

/*
 * A reference to a configuration object of the addon.
 */
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct AddOnConfig {
    #[serde(default)]
    pub group: String,

    pub resource: String,

    #[serde(default)]
    pub namespace: String,

    pub name: String,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "addon.open-cluster-management.io", version = "v1alpha1", kind = "ManagedClusterAddOn", namespaced)]
#[serde(rename_all = "camelCase")]
#[kube(status = "ManagedClusterAddOnStatus")]
pub struct ManagedClusterAddOnSpec {

    // namespace on the managed cluster to install the addon agent in; empty
    // leaves the placement to the addon framework
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_namespace: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<AddOnConfig>,
}

/*
 * Builds a condition stamped with the current time. The timestamp only
 * survives set_condition when the status of the condition changes.
 */
pub fn new_condition(type_: &str, ok: bool, reason: &str, message: &str, observed_generation: Option<i64>) -> Condition {
    Condition{
	type_: type_.to_string(),
	status: String::from(if ok { "True" } else { "False" }),
	reason: reason.to_string(),
	message: message.to_string(),
	observed_generation: observed_generation,
	last_transition_time: Time(Utc::now()),
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnStatus {

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    // the namespace the agent was installed into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ManagedClusterAddOnStatus {

    /*
     * Insert or replace the condition with the same type. Returns false when
     * an identical condition is already present. lastTransitionTime is kept
     * from the existing condition unless its status flips.
     */
    pub fn set_condition(&mut self, condition: Condition) -> bool {
	let existing = match self.conditions.iter_mut().find(|c| c.type_ == condition.type_) {
	    Some(existing) => existing,
	    None => {
		self.conditions.push(condition);
		return true;
	    },
	};

	if existing.status == condition.status
	    && existing.reason == condition.reason
	    && existing.message == condition.message
	    && existing.observed_generation == condition.observed_generation {
	    return false;
	}

	let last_transition_time = if existing.status == condition.status {
	    existing.last_transition_time.clone()
	} else {
	    condition.last_transition_time.clone()
	};
	*existing = Condition{
	    last_transition_time: last_transition_time,
	    ..condition
	};
	true
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
	self.conditions.iter().find(|c| c.type_ == type_)
    }
}

impl ManagedClusterAddOn {

    /*
     * Returns the first configuration reference pointing to the given
     * resource kind, if any.
     */
    pub fn config_reference(&self, gvr: &Gvr) -> Option<&AddOnConfig> {
	self.spec.configs.iter().find(|cfg| gvr.matches(&cfg.group, &cfg.resource))
    }
}

/*
 * Builds the ManagedClusterAddOn an install strategy creates for a cluster.
 */
pub fn new(name: &str, cluster_name: &str, install_namespace: &str) -> ManagedClusterAddOn {
    let mut annotations = BTreeMap::new();
    annotations.insert(String::from(CREATED_BY_INSTALL_STRATEGY_ANNOTATION), String::from("true"));

    let mut metadata = ObjectMeta::default();
    metadata.name = Some(name.to_string());
    metadata.namespace = Some(cluster_name.to_string());
    metadata.annotations = Some(annotations);

    ManagedClusterAddOn{
	metadata: metadata,
	spec: ManagedClusterAddOnSpec{
	    install_namespace: install_namespace.to_string(),
	    configs: Vec::new(),
	},
	status: None,
    }
}
