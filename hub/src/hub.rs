use addonfw::deploymentconfig::get_addon_deployment_config_values;
use addonfw::deploymentconfig::new_addon_deployment_config_getter;
use addonfw::deploymentconfig::to_addon_deployment_config_values;
use addonfw::strategy::install_by_label_strategy;
use addonfw::strategy::match_labels;
use addonfw::values::get_values_from_addon_annotation;
use addonfw::values::values_fn;
use addonfw::AgentAddonFactory;
use addonfw::TemplateAgentAddon;
use addonfw::TemplateStore;
use addonfw::Values;
use olm_addon_api as api;
use api::gvr::ADDON_DEPLOYMENT_CONFIG_GVR;

use kube::Client as KubeClient;

/*
 * Label on ManagedCluster - if this label is set to value "true" on a
 * ManagedCluster resource on the hub then the addon manager creates a
 * ManagedClusterAddOn for the managed cluster and thus triggers the
 * deployment of OLM on that managed cluster.
 */
pub const MANAGED_CLUSTER_INSTALL_LABEL: &str = "addons.open-cluster-management.io/non-openshift";
pub const MANAGED_CLUSTER_INSTALL_LABEL_VALUE: &str = "true";

pub const ADDON_NAME: &str = "olm-addon";
pub const TEMPLATE_PATH: &str = "manifests";
pub const ADDON_NAME_KEY: &str = "AddonName";

/*
 * Builds the olm-addon agent. Only an in-memory client is created here, no
 * request reaches the API server.
 */
pub fn new_agent(kubeconfig: &kube::Config, templates: TemplateStore) -> Result<TemplateAgentAddon, addonfw::Error> {
    let addon_client = KubeClient::try_from(kubeconfig.clone()).map_err(addonfw::Error::ClientSetup)?;

    AgentAddonFactory::new(ADDON_NAME, templates, TEMPLATE_PATH)
	.with_config_gvrs(vec![ADDON_DEPLOYMENT_CONFIG_GVR])
	.with_get_values_funcs(vec![
	    values_fn(get_values_from_manager),
	    values_fn(get_values_from_addon_annotation),
	    get_addon_deployment_config_values(
		new_addon_deployment_config_getter(addon_client),
		to_addon_deployment_config_values,
	    ),
	])
	// the namespace of the addon spec is not used by our manifests
	.with_install_strategy(install_by_label_strategy(
	    "",
	    match_labels(&[(MANAGED_CLUSTER_INSTALL_LABEL, MANAGED_CLUSTER_INSTALL_LABEL_VALUE)]),
	))
	.build_template_agent_addon()
}

pub fn agent_values(addon_name: &str) -> Values {
    let mut values = Values::new();
    values.insert(ADDON_NAME_KEY.to_string(), format!("{}-agent", addon_name));
    values
}

fn get_values_from_manager(_cluster: &api::ManagedCluster, _addon: &api::ManagedClusterAddOn) -> addonfw::Result<Values> {
    Ok(agent_values(ADDON_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifests;
    use addonfw::values::ANNOTATION_VALUES;
    use addonfw::AgentAddon;
    use api::addon;
    use api::managedcluster::ManagedClusterSpec;
    use kube::ResourceExt;

    fn kubeconfig() -> kube::Config {
	kube::Config::new("http://127.0.0.1:1".parse().unwrap())
    }

    fn cluster_with(labels: &[(&str, &str)]) -> api::ManagedCluster {
	let mut cluster = api::ManagedCluster::new("cluster1", ManagedClusterSpec::default());
	for (k, v) in labels {
	    cluster.labels_mut().insert(k.to_string(), v.to_string());
	}
	cluster
    }

    fn kinds_and_names(objects: &[serde_json::Value]) -> Vec<(String, String)> {
	objects.iter()
	    .map(|o| (o["kind"].as_str().unwrap().to_string(), o["metadata"]["name"].as_str().unwrap().to_string()))
	    .collect()
    }

    #[test]
    fn agent_values_derive_from_addon_name() {
	for name in ["olm-addon", "x", "", "with spaces"] {
	    let values = agent_values(name);
	    assert_eq!(values.len(), 1);
	    assert_eq!(values[ADDON_NAME_KEY], format!("{}-agent", name));
	}
    }

    #[test]
    fn static_provider_uses_addon_name() {
	let values = get_values_from_manager(&cluster_with(&[]), &addon::new(ADDON_NAME, "cluster1", "")).unwrap();
	assert_eq!(values[ADDON_NAME_KEY], "olm-addon-agent");
    }

    #[tokio::test]
    async fn agent_descriptor() {
	let agent = new_agent(&kubeconfig(), manifests::store()).unwrap();

	assert_eq!(agent.name(), ADDON_NAME);
	assert_eq!(agent.config_gvrs(), &[ADDON_DEPLOYMENT_CONFIG_GVR]);
	assert_eq!(agent.get_values_funcs().len(), 3);
	assert_eq!(agent.install_strategy().install_namespace(), "");
    }

    #[tokio::test]
    async fn install_strategy_follows_label() {
	let agent = new_agent(&kubeconfig(), manifests::store()).unwrap();
	let strategy = agent.install_strategy();

	assert!(strategy.selects(&cluster_with(&[(MANAGED_CLUSTER_INSTALL_LABEL, "true")])));
	assert!(!strategy.selects(&cluster_with(&[])));
	assert!(!strategy.selects(&cluster_with(&[(MANAGED_CLUSTER_INSTALL_LABEL, "false")])));
	assert!(!strategy.selects(&cluster_with(&[(MANAGED_CLUSTER_INSTALL_LABEL, "True")])));
	assert!(!strategy.selects(&cluster_with(&[("addons.open-cluster-management.io/openshift", "true")])));
    }

    #[tokio::test]
    async fn annotation_values_override_static_ones() {
	let agent = new_agent(&kubeconfig(), manifests::store()).unwrap();
	let mut addon = addon::new(ADDON_NAME, "cluster1", "");
	addon.annotations_mut().insert(ANNOTATION_VALUES.to_string(), String::from(r#"{"AddonName": "custom", "B": "3"}"#));

	let values = agent.values(&cluster_with(&[]), &addon).await.unwrap();
	assert_eq!(values[ADDON_NAME_KEY], "custom");
	assert_eq!(values["B"], "3");
	assert_eq!(values["ClusterName"], "cluster1");
    }

    #[tokio::test]
    async fn renders_bundled_manifests() {
	let agent = new_agent(&kubeconfig(), manifests::store()).unwrap();
	let addon = addon::new(ADDON_NAME, "cluster1", "");

	let objects = agent.manifests(&cluster_with(&[(MANAGED_CLUSTER_INSTALL_LABEL, "true")]), &addon).await.unwrap();
	let names = kinds_and_names(&objects);
	assert_eq!(names, vec![
	    (String::from("Namespace"), String::from("olm")),
	    (String::from("Namespace"), String::from("operators")),
	    (String::from("ServiceAccount"), String::from("olm-operator-serviceaccount")),
	    (String::from("ClusterRole"), String::from("system:controller:operator-lifecycle-manager")),
	    (String::from("ClusterRoleBinding"), String::from("olm-operator-binding-olm")),
	    (String::from("Deployment"), String::from("olm-operator")),
	    (String::from("Deployment"), String::from("catalog-operator")),
	]);

	let olm = &objects[5];
	assert_eq!(olm["metadata"]["labels"]["app.kubernetes.io/managed-by"], "olm-addon-agent");
	assert_eq!(olm["spec"]["template"]["spec"]["nodeSelector"]["kubernetes.io/os"], "linux");
	assert!(olm["spec"]["template"]["spec"].get("tolerations").is_none());
	assert_eq!(olm["spec"]["template"]["spec"]["containers"][0]["image"], "quay.io/operator-framework/olm:v0.28.0");
    }

    #[tokio::test]
    async fn renders_overrides() {
	let agent = new_agent(&kubeconfig(), manifests::store()).unwrap();
	let mut addon = addon::new(ADDON_NAME, "cluster1", "");
	addon.annotations_mut().insert(ANNOTATION_VALUES.to_string(), String::from(
	    r#"{"OLMImage": "registry.local/olm:dev", "NodeSelector": {"role": "infra"}, "Tolerations": [{"key": "infra", "operator": "Exists"}], "HTTPProxy": "http://proxy:3128"}"#,
	));

	let objects = agent.manifests(&cluster_with(&[]), &addon).await.unwrap();
	let catalog = &objects[6]["spec"]["template"]["spec"];
	assert_eq!(catalog["containers"][0]["image"], "registry.local/olm:dev");
	assert_eq!(catalog["nodeSelector"]["role"], "infra");
	assert!(catalog["nodeSelector"].get("kubernetes.io/os").is_none());
	assert_eq!(catalog["tolerations"][0]["key"], "infra");

	let env = catalog["containers"][0]["env"].as_array().unwrap();
	assert!(env.iter().any(|e| e["name"] == "HTTP_PROXY" && e["value"] == "http://proxy:3128"));
	assert!(!env.iter().any(|e| e["name"] == "NO_PROXY"));
    }
}
