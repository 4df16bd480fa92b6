use crate::errors::{Error, Result};
use crate::values::{GetValues, Values};
use olm_addon_api as api;
use api::gvr::ADDON_DEPLOYMENT_CONFIG_GVR;

use async_trait::async_trait;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::ResourceExt;

pub const NODE_SELECTOR_KEY: &str = "NodeSelector";
pub const TOLERATIONS_KEY: &str = "Tolerations";
pub const HTTP_PROXY_KEY: &str = "HTTPProxy";
pub const HTTPS_PROXY_KEY: &str = "HTTPSProxy";
pub const NO_PROXY_KEY: &str = "NoProxy";

/*
 * Fetches AddOnDeploymentConfig objects by namespace and name.
 */
#[async_trait]
pub trait AddOnDeploymentConfigGetter: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<api::AddOnDeploymentConfig>;
}

#[derive(Clone)]
pub struct KubeDeploymentConfigGetter {
    kube_client: KubeClient,
}

#[async_trait]
impl AddOnDeploymentConfigGetter for KubeDeploymentConfigGetter {
    async fn get(&self, namespace: &str, name: &str) -> Result<api::AddOnDeploymentConfig> {
	let configs: KubeApi<api::AddOnDeploymentConfig> = KubeApi::namespaced(self.kube_client.clone(), namespace);

	match configs.get_opt(name).await? {
	    Some(config) => Ok(config),
	    None => Err(Error::ConfigNotFound{
		namespace: namespace.to_string(),
		name: name.to_string(),
	    }),
	}
    }
}

pub fn new_addon_deployment_config_getter(kube_client: KubeClient) -> KubeDeploymentConfigGetter {
    KubeDeploymentConfigGetter{
	kube_client: kube_client,
    }
}

/*
 * Default conversion of an AddOnDeploymentConfig into template values:
 *
 *  - every customized variable becomes a value of the same name
 *  - NodeSelector and Tolerations hold the node placement as JSON
 *  - HTTPProxy, HTTPSProxy and NoProxy hold the proxy settings
 */
pub fn to_addon_deployment_config_values(config: &api::AddOnDeploymentConfig) -> Result<Values> {
    let mut values = Values::new();

    for variable in &config.spec.customized_variables {
	values.insert(variable.name.clone(), variable.value.clone());
    }

    if let Some(placement) = &config.spec.node_placement {
	if !placement.node_selector.is_empty() {
	    values.insert(NODE_SELECTOR_KEY.to_string(), serde_json::to_string(&placement.node_selector)?);
	}
	if !placement.tolerations.is_empty() {
	    values.insert(TOLERATIONS_KEY.to_string(), serde_json::to_string(&placement.tolerations)?);
	}
    }

    if let Some(proxy) = &config.spec.proxy_config {
	let settings = [
	    (HTTP_PROXY_KEY, &proxy.http_proxy),
	    (HTTPS_PROXY_KEY, &proxy.https_proxy),
	    (NO_PROXY_KEY, &proxy.no_proxy),
	];
	for (key, setting) in settings {
	    if let Some(setting) = setting.as_ref().filter(|s| !s.is_empty()) {
		values.insert(key.to_string(), setting.clone());
	    }
	}
    }

    Ok(values)
}

struct DeploymentConfigValues<G, F> {
    getter: G,
    to_values: F,
}

#[async_trait]
impl<G, F> GetValues for DeploymentConfigValues<G, F>
where
    G: AddOnDeploymentConfigGetter,
    F: Fn(&api::AddOnDeploymentConfig) -> Result<Values> + Send + Sync,
{
    async fn get_values(&self, _cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Values> {
	let reference = match addon.config_reference(&ADDON_DEPLOYMENT_CONFIG_GVR) {
	    Some(reference) => reference,
	    None => return Ok(Values::new()),
	};

	// a reference without namespace points next to the addon
	let namespace = match reference.namespace.as_str() {
	    "" => addon.namespace().unwrap_or_default(),
	    ns => ns.to_string(),
	};

	log::debug!("Reading AddOnDeploymentConfig {}/{} for addon {}", namespace, reference.name, addon.name_any());
	let config = self.getter.get(&namespace, &reference.name).await?;

	(self.to_values)(&config)
    }
}

/*
 * Builds the provider resolving the addon's AddOnDeploymentConfig reference
 * through `getter` and converting it with `to_values`.
 */
pub fn get_addon_deployment_config_values<G, F>(getter: G, to_values: F) -> Box<dyn GetValues>
where
    G: AddOnDeploymentConfigGetter + 'static,
    F: Fn(&api::AddOnDeploymentConfig) -> Result<Values> + Send + Sync + 'static,
{
    Box::new(DeploymentConfigValues{
	getter: getter,
	to_values: to_values,
    })
}
