use crate::agent::AgentAddon;
use crate::client::HubClient;
use crate::errors::Error;
use olm_addon_api as api;
use api::addon::CREATED_BY_INSTALL_STRATEGY_ANNOTATION;

use futures::StreamExt;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::Error as KubeError;
use kube::ResourceExt;
use kube::runtime::controller::Action as KubeAction;
use kube::runtime::controller::Controller as KubeController;
use kube::runtime::watcher as kube_watcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/*
 * The install controller watches ManagedClusters and keeps, for every agent
 * with a non manual install strategy, a ManagedClusterAddOn in the namespace
 * of each selected cluster.
 */
pub(crate) struct InstallCtx {
    pub hub: Arc<dyn HubClient>,
    pub agents: Arc<Vec<Arc<dyn AgentAddon>>>,
    pub resync_interval: Duration,
}

fn created_by_strategy(addon: &api::ManagedClusterAddOn) -> bool {
    addon.annotations().get(CREATED_BY_INSTALL_STRATEGY_ANNOTATION).map_or(false, |v| v == "true")
}

async fn reconcile(cluster: Arc<api::ManagedCluster>, ctx: Arc<InstallCtx>) -> Result<KubeAction, Error> {
    let cluster_name = cluster.name_any();

    for agent in ctx.agents.iter() {
	let strategy = agent.install_strategy();
	if strategy.is_manual() {
	    continue;
	}

	let existing = ctx.hub.get_addon(&cluster_name, agent.name()).await?;
	match (strategy.selects(&cluster), existing) {
	    (true, None) => {
		log::info!("Installing addon {} on cluster {}", agent.name(), cluster_name);

		let addon = api::addon::new(agent.name(), &cluster_name, strategy.install_namespace());
		match ctx.hub.create_addon(&addon).await {
		    Ok(()) => {},
		    Err(Error::Kube(KubeError::Api(resp))) if resp.code == 409 => {
			log::debug!("Addon {}/{} was created concurrently", cluster_name, agent.name());
		    },
		    Err(err) => return Err(err),
		}
	    },
	    (false, Some(addon)) if created_by_strategy(&addon) && addon.metadata.deletion_timestamp.is_none() => {
		log::info!("Cluster {} no longer selected, removing addon {}", cluster_name, agent.name());
		ctx.hub.delete_addon(&cluster_name, agent.name()).await?;
	    },
	    _ => {},
	}
    }

    Ok(KubeAction::requeue(ctx.resync_interval))
}

fn error_policy(cluster: Arc<api::ManagedCluster>, error: &Error, ctx: Arc<InstallCtx>) -> KubeAction {
    log::warn!("Install reconcile of cluster {} failed: {}", cluster.name_any(), error);
    KubeAction::requeue(ctx.resync_interval)
}

pub(crate) fn controller(kube_client: KubeClient, ctx: Arc<InstallCtx>) -> impl Future<Output = ()> + Send {
    let clusters: KubeApi<api::ManagedCluster> = KubeApi::all(kube_client);

    KubeController::new(clusters, kube_watcher::Config::default())
	.run(reconcile, error_policy, ctx)
	.for_each(|reconcile| async move {
	    match reconcile {
		Ok((cluster, _)) => log::debug!("Reconciled install state of cluster {}", cluster.name),
		Err(err) => log::error!("Failed to reconcile install state with error: {:?}", err),
	    }
	})
}
