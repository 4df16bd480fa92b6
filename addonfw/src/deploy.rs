use crate::agent::AgentAddon;
use crate::client::HubClient;
use crate::errors::Error;
use crate::manifestwork::build_manifest_work;
use olm_addon_api as api;
use api::addon::CONDITION_MANIFEST_APPLIED;
use api::gvr::ADDON_DEPLOYMENT_CONFIG_GVR;

use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::ResourceExt;
use kube::runtime::controller::Action as KubeAction;
use kube::runtime::controller::Controller as KubeController;
use kube::runtime::reflector::ObjectRef as KubeObjectRef;
use kube::runtime::watcher as kube_watcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const FIELD_MANAGER: &str = "addon-manager";

/*
 * The deploy controller renders the manifests of every ManagedClusterAddOn
 * with a registered agent and applies them as a ManifestWork in the
 * cluster namespace.
 */
pub(crate) struct DeployCtx {
    pub hub: Arc<dyn HubClient>,
    pub agents: Arc<Vec<Arc<dyn AgentAddon>>>,
    pub resync_interval: Duration,
}

impl DeployCtx {

    fn agent(&self, name: &str) -> Option<Arc<dyn AgentAddon>> {
	self.agents.iter().find(|agent| agent.name() == name).cloned()
    }
}

/*
 * The status merge patch recording `condition`, or None when the addon
 * already carries it. Only the conditions list is sent; other status
 * members belong to other writers.
 */
fn condition_patch(addon: &api::ManagedClusterAddOn, condition: Condition) -> Option<serde_json::Value> {
    let mut status = addon.status.clone().unwrap_or_default();
    if !status.set_condition(condition) {
	return None;
    }

    Some(serde_json::json!({
	"status": {
	    "conditions": status.conditions,
	}
    }))
}

async fn patch_condition(ctx: &DeployCtx, addon: &api::ManagedClusterAddOn, condition: Condition) -> Result<(), Error> {
    let patch = match condition_patch(addon, condition) {
	Some(patch) => patch,
	None => return Ok(()),
    };

    let namespace = addon.namespace().unwrap_or_default();
    ctx.hub.patch_addon_status(&namespace, &addon.name_any(), &patch).await
}

async fn reconcile(addon: Arc<api::ManagedClusterAddOn>, ctx: Arc<DeployCtx>) -> Result<KubeAction, Error> {
    let addon_name = addon.name_any();

    let agent = match ctx.agent(&addon_name) {
	Some(agent) => agent,
	None => return Ok(KubeAction::await_change()),
    };

    /* owned ManifestWorks are garbage collected with the addon */
    if addon.metadata.deletion_timestamp.is_some() {
	log::debug!("Addon {} is being deleted, nothing to deploy", addon_name);
	return Ok(KubeAction::await_change());
    }

    let cluster_name = match addon.namespace() {
	Some(ns) => ns,
	None => return Ok(KubeAction::await_change()),
    };

    let cluster = match ctx.hub.get_cluster(&cluster_name).await? {
	Some(cluster) => cluster,
	None => {
	    log::debug!("ManagedCluster {} not found for addon {}, retrying later", cluster_name, addon_name);
	    return Ok(KubeAction::requeue(ctx.resync_interval));
	}
    };

    let generation = addon.metadata.generation;
    let rendered = match agent.manifests(&cluster, &addon).await {
	Ok(manifests) => build_manifest_work(&addon, manifests),
	Err(err) => Err(err),
    };
    let work = match rendered {
	Ok(work) => work,
	Err(err) => {
	    log::error!("Unable to render addon {} for cluster {}: {}", addon_name, cluster_name, err);

	    let condition = api::new_condition(CONDITION_MANIFEST_APPLIED, false, "RenderFailed", &err.to_string(), generation);
	    if let Err(status_err) = patch_condition(&ctx, &addon, condition).await {
		log::error!("Unable to update status of addon {}/{}: {}", cluster_name, addon_name, status_err);
	    }
	    return Err(err);
	}
    };

    ctx.hub.apply_manifest_work(&work, FIELD_MANAGER).await?;
    log::debug!("Applied ManifestWork {}/{} with {} manifests", cluster_name, work.name_any(), work.manifests().len());

    let condition = api::new_condition(CONDITION_MANIFEST_APPLIED, true, "Applied", "addon manifests are applied", generation);
    patch_condition(&ctx, &addon, condition).await?;

    Ok(KubeAction::requeue(ctx.resync_interval))
}

fn error_policy(addon: Arc<api::ManagedClusterAddOn>, error: &Error, ctx: Arc<DeployCtx>) -> KubeAction {
    log::warn!("Deploy reconcile of addon {} failed: {}", addon.name_any(), error);
    KubeAction::requeue(ctx.resync_interval)
}

/*
 * Addons to reconcile again after the AddOnDeploymentConfig
 * `config_namespace`/`config_name` changed: those referencing it whose agent
 * accepts that kind of configuration.
 */
fn addons_using_config(addons: &[Arc<api::ManagedClusterAddOn>], agents: &[Arc<dyn AgentAddon>], config_namespace: &str, config_name: &str) -> Vec<KubeObjectRef<api::ManagedClusterAddOn>> {
    addons.iter()
	.filter(|addon| {
	    agents.iter().any(|agent| agent.name() == addon.name_any() && agent.config_gvrs().contains(&ADDON_DEPLOYMENT_CONFIG_GVR))
	})
	.filter(|addon| match addon.config_reference(&ADDON_DEPLOYMENT_CONFIG_GVR) {
	    Some(reference) => {
		let namespace = if reference.namespace.is_empty() {
		    addon.namespace().unwrap_or_default()
		} else {
		    reference.namespace.clone()
		};
		namespace == config_namespace && reference.name == config_name
	    },
	    None => false,
	})
	.map(|addon| KubeObjectRef::from_obj(addon.as_ref()))
	.collect()
}

pub(crate) fn controller(kube_client: KubeClient, ctx: Arc<DeployCtx>) -> impl Future<Output = ()> + Send {
    let addons: KubeApi<api::ManagedClusterAddOn> = KubeApi::all(kube_client.clone());
    let works: KubeApi<api::ManifestWork> = KubeApi::all(kube_client.clone());

    let mut controller = KubeController::new(addons, kube_watcher::Config::default())
	.owns(works, kube_watcher::Config::default());

    /* configuration changes are picked up right away, not at the next resync */
    if ctx.agents.iter().any(|agent| agent.config_gvrs().contains(&ADDON_DEPLOYMENT_CONFIG_GVR)) {
	log::info!("Watching {} for addon configuration changes", ADDON_DEPLOYMENT_CONFIG_GVR);

	let configs: KubeApi<api::AddOnDeploymentConfig> = KubeApi::all(kube_client);
	let store = controller.store();
	let agents = ctx.agents.clone();
	controller = controller.watches(configs, kube_watcher::Config::default(), move |config: api::AddOnDeploymentConfig| {
	    let namespace = config.namespace().unwrap_or_default();
	    addons_using_config(&store.state(), &agents, &namespace, &config.name_any())
	});
    }

    controller
	.run(reconcile, error_policy, ctx)
	.for_each(|reconcile| async move {
	    match reconcile {
		Ok((addon, _)) => log::debug!("Reconciled deployment of addon {:?}/{}", addon.namespace, addon.name),
		Err(err) => log::error!("Failed to reconcile addon deployment with error: {:?}", err),
	    }
	})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentAddonFactory;
    use crate::client::MockHubClient;
    use crate::template::TemplateStore;
    use crate::values::values_fn;
    use api::AddOnConfig;
    use api::managedcluster::ManagedClusterSpec;
    use std::sync::Mutex;

    const CONFIGMAP: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {{ AddonName }}\n  namespace: {{ AddonInstallNamespace }}\n";
    const RESYNC: Duration = Duration::from_secs(30);

    fn agent(name: &str, fail: bool) -> Arc<dyn AgentAddon> {
	let agent = AgentAddonFactory::new(name, TemplateStore::new(&[("manifests/cm.yaml", CONFIGMAP)]), "manifests")
	    .with_config_gvrs(vec![ADDON_DEPLOYMENT_CONFIG_GVR])
	    .with_get_values_funcs(vec![values_fn(move |_, _| {
		if fail {
		    return Err(Error::ConfigNotFound{ namespace: String::from("cluster1"), name: String::from("cfg") });
		}
		let mut values = crate::values::Values::new();
		values.insert(String::from("AddonName"), String::from("test-agent"));
		Ok(values)
	    })])
	    .build_template_agent_addon()
	    .unwrap();
	Arc::new(agent)
    }

    fn ctx(hub: MockHubClient, agents: Vec<Arc<dyn AgentAddon>>) -> Arc<DeployCtx> {
	Arc::new(DeployCtx{
	    hub: Arc::new(hub),
	    agents: Arc::new(agents),
	    resync_interval: RESYNC,
	})
    }

    fn addon(name: &str) -> Arc<api::ManagedClusterAddOn> {
	let mut addon = api::addon::new(name, "cluster1", "");
	addon.metadata.uid = Some(String::from("6f2a4c1e-0000-4000-8000-000000000001"));
	addon.metadata.generation = Some(2);
	Arc::new(addon)
    }

    fn existing_cluster(hub: &mut MockHubClient) {
	hub.expect_get_cluster().returning(|name| Ok(Some(api::ManagedCluster::new(name, ManagedClusterSpec::default()))));
    }

    #[test]
    fn condition_patch_only_sends_conditions() {
	let mut addon = api::addon::new("olm-addon", "cluster1", "");
	addon.status = Some(serde_json::from_value(serde_json::json!({
	    "namespace": "olm",
	    "conditions": [{
		"type": "Available",
		"status": "True",
		"reason": "AgentAvailable",
		"message": "",
		"observedGeneration": 1,
		"lastTransitionTime": "2024-01-02T03:04:05Z"
	    }]
	})).unwrap());

	let condition = api::new_condition(CONDITION_MANIFEST_APPLIED, true, "Applied", "ok", Some(1));
	let patch = condition_patch(&addon, condition).unwrap();

	let status = patch["status"].as_object().unwrap();
	assert_eq!(status.keys().collect::<Vec<_>>(), vec!["conditions"]);

	let conditions = status["conditions"].as_array().unwrap();
	assert_eq!(conditions.len(), 2);
	assert_eq!(conditions[0]["type"], "Available");
	assert_eq!(conditions[0]["lastTransitionTime"], "2024-01-02T03:04:05Z");
	assert_eq!(conditions[0]["observedGeneration"], 1);
	assert!(conditions.iter().all(|c| c["lastTransitionTime"].is_string()));
    }

    #[test]
    fn condition_patch_skips_unchanged_condition() {
	let mut addon = api::addon::new("olm-addon", "cluster1", "");
	let mut status = api::ManagedClusterAddOnStatus::default();
	status.set_condition(api::new_condition(CONDITION_MANIFEST_APPLIED, true, "Applied", "ok", Some(1)));
	addon.status = Some(status);

	let condition = api::new_condition(CONDITION_MANIFEST_APPLIED, true, "Applied", "ok", Some(1));
	assert!(condition_patch(&addon, condition).is_none());

	let condition = api::new_condition(CONDITION_MANIFEST_APPLIED, true, "Applied", "ok", Some(2));
	assert!(condition_patch(&addon, condition).is_some());
    }

    #[test]
    fn condition_patch_on_empty_status_has_no_null() {
	let addon = api::addon::new("olm-addon", "cluster1", "");
	let condition = api::new_condition(CONDITION_MANIFEST_APPLIED, false, "RenderFailed", "boom", None);

	let patch = condition_patch(&addon, condition).unwrap();
	assert!(patch["status"].get("namespace").is_none());
	assert_eq!(patch["status"]["conditions"][0]["reason"], "RenderFailed");
    }

    #[tokio::test]
    async fn unknown_addons_are_ignored() {
	let mut hub = MockHubClient::new();
	hub.expect_get_cluster().times(0);
	hub.expect_apply_manifest_work().times(0);

	let action = reconcile(addon("other"), ctx(hub, vec![agent("olm-addon", false)])).await.unwrap();
	assert_eq!(action, KubeAction::await_change());
    }

    #[tokio::test]
    async fn missing_cluster_requeues() {
	let mut hub = MockHubClient::new();
	hub.expect_get_cluster().times(1).returning(|_| Ok(None));
	hub.expect_apply_manifest_work().times(0);
	hub.expect_patch_addon_status().times(0);

	let action = reconcile(addon("olm-addon"), ctx(hub, vec![agent("olm-addon", false)])).await.unwrap();
	assert_eq!(action, KubeAction::requeue(RESYNC));
    }

    #[tokio::test]
    async fn applies_work_and_records_condition() {
	let applied = Arc::new(Mutex::new(Vec::new()));
	let applied_clone = applied.clone();
	let patches = Arc::new(Mutex::new(Vec::new()));
	let patches_clone = patches.clone();

	let mut hub = MockHubClient::new();
	existing_cluster(&mut hub);
	hub.expect_apply_manifest_work().times(1).returning(move |work, field_manager| {
	    applied_clone.lock().unwrap().push((work.clone(), field_manager.to_string()));
	    Ok(())
	});
	hub.expect_patch_addon_status().times(1).returning(move |ns, name, patch| {
	    patches_clone.lock().unwrap().push((format!("{}/{}", ns, name), patch.clone()));
	    Ok(())
	});

	let action = reconcile(addon("olm-addon"), ctx(hub, vec![agent("olm-addon", false)])).await.unwrap();
	assert_eq!(action, KubeAction::requeue(RESYNC));

	let applied = applied.lock().unwrap();
	let (work, field_manager) = &applied[0];
	assert_eq!(field_manager, "addon-manager");
	assert_eq!(work.name_any(), "addon-olm-addon-deploy-0");
	assert_eq!(work.namespace().as_deref(), Some("cluster1"));
	assert_eq!(work.manifests()[0]["metadata"]["name"], "test-agent");

	let patches = patches.lock().unwrap();
	let (target, patch) = &patches[0];
	assert_eq!(target, "cluster1/olm-addon");
	let condition = &patch["status"]["conditions"][0];
	assert_eq!(condition["type"], CONDITION_MANIFEST_APPLIED);
	assert_eq!(condition["status"], "True");
	assert_eq!(condition["reason"], "Applied");
	assert_eq!(condition["observedGeneration"], 2);
	assert!(condition["lastTransitionTime"].is_string());
    }

    #[tokio::test]
    async fn render_failure_is_recorded_and_returned() {
	let patches = Arc::new(Mutex::new(Vec::new()));
	let patches_clone = patches.clone();

	let mut hub = MockHubClient::new();
	existing_cluster(&mut hub);
	hub.expect_apply_manifest_work().times(0);
	hub.expect_patch_addon_status().times(1).returning(move |_, _, patch| {
	    patches_clone.lock().unwrap().push(patch.clone());
	    Ok(())
	});

	let err = reconcile(addon("olm-addon"), ctx(hub, vec![agent("olm-addon", true)])).await.unwrap_err();
	assert!(matches!(err, Error::ConfigNotFound { .. }));

	let patches = patches.lock().unwrap();
	let condition = &patches[0]["status"]["conditions"][0];
	assert_eq!(condition["status"], "False");
	assert_eq!(condition["reason"], "RenderFailed");
	assert!(condition["message"].as_str().unwrap().contains("cfg"));
    }

    #[tokio::test]
    async fn render_failure_survives_status_errors() {
	let mut hub = MockHubClient::new();
	existing_cluster(&mut hub);
	hub.expect_patch_addon_status().returning(|_, _, _| Err(Error::Manager(String::from("status unavailable"))));

	let err = reconcile(addon("olm-addon"), ctx(hub, vec![agent("olm-addon", true)])).await.unwrap_err();
	assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn config_changes_map_to_referencing_addons() {
	let reference = |namespace: &str, name: &str| AddOnConfig{
	    group: String::from("addon.open-cluster-management.io"),
	    resource: String::from("addondeploymentconfigs"),
	    namespace: namespace.to_string(),
	    name: name.to_string(),
	};

	let mut same_namespace = api::addon::new("olm-addon", "cluster1", "");
	same_namespace.spec.configs = vec![reference("", "cfg")];
	let mut explicit = api::addon::new("olm-addon", "cluster2", "");
	explicit.spec.configs = vec![reference("cluster1", "cfg")];
	let mut other_config = api::addon::new("olm-addon", "cluster3", "");
	other_config.spec.configs = vec![reference("cluster1", "other")];
	let mut unknown_agent = api::addon::new("other-addon", "cluster1", "");
	unknown_agent.spec.configs = vec![reference("", "cfg")];
	let unconfigured = api::addon::new("olm-addon", "cluster4", "");

	let addons: Vec<Arc<api::ManagedClusterAddOn>> = vec![same_namespace, explicit, other_config, unknown_agent, unconfigured]
	    .into_iter()
	    .map(Arc::new)
	    .collect();

	let refs = addons_using_config(&addons, &[agent("olm-addon", false)], "cluster1", "cfg");
	let targets: Vec<(Option<String>, String)> = refs.into_iter().map(|r| (r.namespace, r.name)).collect();
	assert_eq!(targets, vec![
	    (Some(String::from("cluster1")), String::from("olm-addon")),
	    (Some(String::from("cluster2")), String::from("olm-addon")),
	]);
    }
}
