use crate::errors::{Error, Result};
use crate::strategy::InstallStrategy;
use crate::template::{ManifestRenderer, TemplateStore};
use crate::values::{merge_values, GetValues, Values};
use olm_addon_api as api;

use async_trait::async_trait;
use kube::ResourceExt;

/* Where agents land on the managed cluster when the addon doesn't say */
pub const DEFAULT_INSTALL_NAMESPACE: &str = "open-cluster-management-agent-addon";

pub const CLUSTER_NAME_KEY: &str = "ClusterName";
pub const INSTALL_NAMESPACE_KEY: &str = "AddonInstallNamespace";

/*
 * AgentAddon describes an addon to the AddonManager: which clusters get it
 * and what gets deployed on each of them.
 */
#[async_trait]
pub trait AgentAddon: Send + Sync {

    fn name(&self) -> &str;

    fn install_strategy(&self) -> &InstallStrategy;

    /*
     * Kinds of configuration objects the addon accepts overrides from.
     */
    fn config_gvrs(&self) -> &[api::Gvr];

    /*
     * The objects to deploy on `cluster` for this addon instance.
     */
    async fn manifests(&self, cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Vec<serde_json::Value>>;
}

/*
 * Builder for template based agents, e.g.
 *
 *   AgentAddonFactory::new("my-addon", store, "manifests")
 *       .with_config_gvrs(vec![ADDON_DEPLOYMENT_CONFIG_GVR])
 *       .with_get_values_funcs(vec![values_fn(my_values)])
 *       .with_install_strategy(InstallStrategy::All{ namespace: String::new() })
 *       .build_template_agent_addon()?
 */
pub struct AgentAddonFactory {
    name: String,
    store: TemplateStore,
    template_path: String,
    config_gvrs: Vec<api::Gvr>,
    get_values: Vec<Box<dyn GetValues>>,
    install_strategy: InstallStrategy,
}

impl AgentAddonFactory {

    pub fn new(name: &str, store: TemplateStore, template_path: &str) -> Self {
	Self{
	    name: name.to_string(),
	    store: store,
	    template_path: template_path.to_string(),
	    config_gvrs: vec![],
	    get_values: vec![],
	    install_strategy: InstallStrategy::Manual,
	}
    }

    pub fn with_config_gvrs(mut self, gvrs: Vec<api::Gvr>) -> Self {
	self.config_gvrs.extend(gvrs);
	self
    }

    /*
     * Value providers, in precedence order: a provider overrides the keys
     * of the ones before it.
     */
    pub fn with_get_values_funcs(mut self, funcs: Vec<Box<dyn GetValues>>) -> Self {
	self.get_values.extend(funcs);
	self
    }

    pub fn with_install_strategy(mut self, strategy: InstallStrategy) -> Self {
	self.install_strategy = strategy;
	self
    }

    pub fn build_template_agent_addon(self) -> Result<TemplateAgentAddon> {
	if self.name.is_empty() {
	    return Err(Error::InvalidAgent(String::from("addon name is empty")));
	}

	let templates = self.store.under(&self.template_path);
	if templates.is_empty() {
	    let errmsg = format!("no templates found under '{}' for addon {}", self.template_path, self.name);
	    return Err(Error::InvalidAgent(errmsg));
	}

	let renderer = ManifestRenderer::new(templates)?;
	log::debug!("Built agent addon {} with templates {:?}", self.name, renderer.templates());

	Ok(TemplateAgentAddon{
	    name: self.name,
	    renderer: renderer,
	    config_gvrs: self.config_gvrs,
	    get_values: self.get_values,
	    install_strategy: self.install_strategy,
	})
    }
}

pub struct TemplateAgentAddon {
    name: String,
    renderer: ManifestRenderer,
    config_gvrs: Vec<api::Gvr>,
    get_values: Vec<Box<dyn GetValues>>,
    install_strategy: InstallStrategy,
}

fn default_values() -> Values {
    let mut values = Values::new();
    values.insert(INSTALL_NAMESPACE_KEY.to_string(), DEFAULT_INSTALL_NAMESPACE.to_string());
    values
}

fn builtin_values(cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Values {
    let mut values = Values::new();
    values.insert(CLUSTER_NAME_KEY.to_string(), cluster.name_any());
    if !addon.spec.install_namespace.is_empty() {
	values.insert(INSTALL_NAMESPACE_KEY.to_string(), addon.spec.install_namespace.clone());
    }
    values
}

impl TemplateAgentAddon {

    pub fn get_values_funcs(&self) -> &[Box<dyn GetValues>] {
	&self.get_values
    }

    /*
     * Computes the values for one render: framework defaults, then each
     * provider in order, then builtin values which cannot be overridden.
     */
    pub async fn values(&self, cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Values> {
	let mut layers = Vec::with_capacity(self.get_values.len() + 2);
	layers.push(default_values());

	for provider in &self.get_values {
	    layers.push(provider.get_values(cluster, addon).await?);
	}
	layers.push(builtin_values(cluster, addon));

	Ok(merge_values(layers))
    }
}

#[async_trait]
impl AgentAddon for TemplateAgentAddon {

    fn name(&self) -> &str {
	&self.name
    }

    fn install_strategy(&self) -> &InstallStrategy {
	&self.install_strategy
    }

    fn config_gvrs(&self) -> &[api::Gvr] {
	&self.config_gvrs
    }

    async fn manifests(&self, cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Vec<serde_json::Value>> {
	let values = self.values(cluster, addon).await?;
	log::debug!("Rendering {} for cluster {} with values {:?}", self.name, cluster.name_any(), values);

	self.renderer.render(&values)
    }
}
