use crate::errors::Result;
use olm_addon_api as api;

use async_trait::async_trait;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::ResourceExt;
use kube::api::DeleteParams as KubeDeleteParams;
use kube::api::Patch as KubePatch;
use kube::api::PatchParams as KubePatchParams;
use kube::api::PostParams as KubePostParams;

#[cfg(test)]
use mockall::automock;

/*
 * The hub API calls made by the install and deploy controllers. Watching
 * stays with kube-runtime; only the per-object reads and writes of a
 * reconcile go through here.
 */
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HubClient: Send + Sync {

    async fn get_cluster(&self, name: &str) -> Result<Option<api::ManagedCluster>>;

    async fn get_addon(&self, namespace: &str, name: &str) -> Result<Option<api::ManagedClusterAddOn>>;

    /*
     * API errors come back as Error::Kube untouched, so callers can
     * recognize conflicts.
     */
    async fn create_addon(&self, addon: &api::ManagedClusterAddOn) -> Result<()>;

    async fn delete_addon(&self, namespace: &str, name: &str) -> Result<()>;

    /*
     * Server side apply of `work`, forcing ownership of conflicting fields.
     */
    async fn apply_manifest_work(&self, work: &api::ManifestWork, field_manager: &str) -> Result<()>;

    /*
     * Merge patch of the status subresource of an addon.
     */
    async fn patch_addon_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) -> Result<()>;
}

pub struct KubeHubClient {
    kube_client: KubeClient,
}

impl KubeHubClient {

    pub fn new(kube_client: KubeClient) -> Self {
	Self{
	    kube_client: kube_client,
	}
    }

    fn addons(&self, namespace: &str) -> KubeApi<api::ManagedClusterAddOn> {
	KubeApi::namespaced(self.kube_client.clone(), namespace)
    }
}

#[async_trait]
impl HubClient for KubeHubClient {

    async fn get_cluster(&self, name: &str) -> Result<Option<api::ManagedCluster>> {
	let clusters: KubeApi<api::ManagedCluster> = KubeApi::all(self.kube_client.clone());
	Ok(clusters.get_opt(name).await?)
    }

    async fn get_addon(&self, namespace: &str, name: &str) -> Result<Option<api::ManagedClusterAddOn>> {
	Ok(self.addons(namespace).get_opt(name).await?)
    }

    async fn create_addon(&self, addon: &api::ManagedClusterAddOn) -> Result<()> {
	let namespace = addon.namespace().unwrap_or_default();
	self.addons(&namespace).create(&KubePostParams::default(), addon).await?;
	Ok(())
    }

    async fn delete_addon(&self, namespace: &str, name: &str) -> Result<()> {
	self.addons(namespace).delete(name, &KubeDeleteParams::default()).await?;
	Ok(())
    }

    async fn apply_manifest_work(&self, work: &api::ManifestWork, field_manager: &str) -> Result<()> {
	let namespace = work.namespace().unwrap_or_default();
	let works: KubeApi<api::ManifestWork> = KubeApi::namespaced(self.kube_client.clone(), &namespace);
	let params = KubePatchParams::apply(field_manager).force();
	works.patch(&work.name_any(), &params, &KubePatch::Apply(work)).await?;
	Ok(())
    }

    async fn patch_addon_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) -> Result<()> {
	self.addons(namespace).patch_status(name, &KubePatchParams::default(), &KubePatch::Merge(patch)).await?;
	Ok(())
    }
}
