use olm_addon_api as api;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
use kube::ResourceExt;
use std::collections::BTreeMap;

/*
 * Decides which managed clusters get a ManagedClusterAddOn created
 * automatically by the hub.
 */
#[derive(Clone, Debug)]
pub enum InstallStrategy {

    /*
     * Addons are only ever created by users.
     */
    Manual,

    /*
     * Every managed cluster gets the addon, installed in `namespace`.
     */
    All { namespace: String },

    /*
     * Clusters matching `selector` get the addon, installed in `namespace`.
     * An empty namespace leaves the placement to the framework default.
     */
    ByLabel { namespace: String, selector: LabelSelector },
}

/*
 * Mirrors the upstream InstallByLabelStrategy helper.
 */
pub fn install_by_label_strategy(namespace: &str, selector: LabelSelector) -> InstallStrategy {
    InstallStrategy::ByLabel{
	namespace: namespace.to_string(),
	selector: selector,
    }
}

/*
 * Builds a selector out of exact label matches.
 */
pub fn match_labels(labels: &[(&str, &str)]) -> LabelSelector {
    let labels: BTreeMap<String, String> = labels.iter()
	.map(|(k, v)| (k.to_string(), v.to_string()))
	.collect();

    LabelSelector{
	match_labels: Some(labels),
	match_expressions: None,
    }
}

fn requirement_matches(requirement: &LabelSelectorRequirement, labels: &BTreeMap<String, String>) -> bool {
    let values = requirement.values.as_deref().unwrap_or_default();
    let current = labels.get(&requirement.key);

    match requirement.operator.as_str() {
	"In" => current.map_or(false, |v| values.contains(v)),
	"NotIn" => current.map_or(true, |v| !values.contains(v)),
	"Exists" => current.is_some(),
	"DoesNotExist" => current.is_none(),
	other => {
	    log::warn!("Unsupported label selector operator '{}' on key '{}'", other, requirement.key);
	    false
	}
    }
}

/*
 * Evaluates a LabelSelector against a label set: every matchLabels entry
 * and every matchExpressions requirement must hold. An empty selector
 * matches everything.
 */
pub fn selector_matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    let by_labels = selector.match_labels.iter()
	.flatten()
	.all(|(key, value)| labels.get(key) == Some(value));

    let by_expressions = selector.match_expressions.iter()
	.flatten()
	.all(|requirement| requirement_matches(requirement, labels));

    by_labels && by_expressions
}

impl InstallStrategy {

    /*
     * Whether the addon should be installed on the cluster. Clusters being
     * deleted are never selected.
     */
    pub fn selects(&self, cluster: &api::ManagedCluster) -> bool {
	if cluster.metadata.deletion_timestamp.is_some() {
	    return false;
	}

	match self {
	    InstallStrategy::Manual => false,
	    InstallStrategy::All{ .. } => true,
	    InstallStrategy::ByLabel{ selector, .. } => selector_matches(selector, cluster.labels()),
	}
    }

    /*
     * The install namespace set on the ManagedClusterAddOns this strategy
     * creates.
     */
    pub fn install_namespace(&self) -> &str {
	match self {
	    InstallStrategy::Manual => "",
	    InstallStrategy::All{ namespace } => namespace,
	    InstallStrategy::ByLabel{ namespace, .. } => namespace,
	}
    }

    pub fn is_manual(&self) -> bool {
	matches!(self, InstallStrategy::Manual)
    }
}
