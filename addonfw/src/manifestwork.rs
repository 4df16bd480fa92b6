use crate::errors::{Error, Result};
use olm_addon_api as api;
use api::manifestwork::{ManifestWorkSpec, ManifestsTemplate};

use kube::Resource;
use kube::ResourceExt;

/* Label linking a ManifestWork back to the addon it deploys */
pub const ADDON_NAME_LABEL: &str = "open-cluster-management.io/addon-name";

pub fn work_name(addon_name: &str) -> String {
    format!("addon-{}-deploy-0", addon_name)
}

/*
 * Wraps the rendered manifests of an addon into the ManifestWork applied in
 * the cluster namespace. The work is owned by the addon so it goes away
 * together with it.
 */
pub fn build_manifest_work(addon: &api::ManagedClusterAddOn, manifests: Vec<serde_json::Value>) -> Result<api::ManifestWork> {
    let addon_name = addon.name_any();
    let namespace = match addon.namespace() {
	Some(namespace) => namespace,
	None => {
	    let errmsg = format!("ManagedClusterAddOn {} has no namespace", addon_name);
	    return Err(Error::Manager(errmsg));
	}
    };

    let mut work = api::ManifestWork::new(&work_name(&addon_name), ManifestWorkSpec{
	workload: ManifestsTemplate{
	    manifests: manifests,
	},
    });
    work.metadata.namespace = Some(namespace);
    work.labels_mut().insert(ADDON_NAME_LABEL.to_string(), addon_name);

    if let Some(owner) = addon.controller_owner_ref(&()) {
	work.metadata.owner_references = Some(vec![owner]);
    }

    Ok(work)
}
