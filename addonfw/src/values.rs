use crate::errors::{Error, Result};
use olm_addon_api as api;

use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;

/*
 * Values handed to the manifest templates. Structured values (maps, lists)
 * are carried as their JSON text which templates can inline as YAML.
 */
pub type Values = BTreeMap<String, String>;

/* Annotation holding a JSON object of values on a ManagedClusterAddOn */
pub const ANNOTATION_VALUES: &str = "addon.open-cluster-management.io/values";

/*
 * A source of template values for a given cluster and addon. Implementations
 * may reach the API server; errors are reported back to the reconciler.
 */
#[async_trait]
pub trait GetValues: Send + Sync {
    async fn get_values(&self, cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Values>;
}

struct FnValues<F>(F);

#[async_trait]
impl<F> GetValues for FnValues<F>
where
    F: Fn(&api::ManagedCluster, &api::ManagedClusterAddOn) -> Result<Values> + Send + Sync,
{
    async fn get_values(&self, cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Values> {
	(self.0)(cluster, addon)
    }
}

/*
 * Wraps a plain function into a GetValues provider.
 */
pub fn values_fn<F>(f: F) -> Box<dyn GetValues>
where
    F: Fn(&api::ManagedCluster, &api::ManagedClusterAddOn) -> Result<Values> + Send + Sync + 'static,
{
    Box::new(FnValues(f))
}

/*
 * Folds several layers of values into one, later layers overriding the keys
 * of earlier ones.
 */
pub fn merge_values<I>(layers: I) -> Values
where
    I: IntoIterator<Item = Values>,
{
    layers.into_iter().fold(Values::new(), |mut merged, layer| {
	merged.extend(layer);
	merged
    })
}

fn invalid_annotation(reason: String) -> Error {
    Error::Annotation{
	key: ANNOTATION_VALUES.to_string(),
	reason: reason,
    }
}

/*
 * Reads values from the `addon.open-cluster-management.io/values` annotation
 * of the addon, for example:
 *
 *   metadata:
 *     annotations:
 *       addon.open-cluster-management.io/values: '{"LogLevel": "4"}'
 *
 * String members are taken as is, anything else as its JSON text.
 */
pub fn get_values_from_addon_annotation(_cluster: &api::ManagedCluster, addon: &api::ManagedClusterAddOn) -> Result<Values> {
    let raw = match addon.annotations().get(ANNOTATION_VALUES) {
	Some(raw) if !raw.trim().is_empty() => raw,
	_ => return Ok(Values::new()),
    };

    let parsed: serde_json::Value = serde_json::from_str(raw).map_err(|err| invalid_annotation(err.to_string()))?;
    let object = match parsed {
	serde_json::Value::Object(object) => object,
	other => return Err(invalid_annotation(format!("expected a JSON object, got: {}", other))),
    };

    let mut values = Values::new();
    for (key, value) in object {
	let value = match value {
	    serde_json::Value::String(s) => s,
	    other => other.to_string(),
	};
	values.insert(key, value);
    }

    Ok(values)
}
