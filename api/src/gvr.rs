use std::fmt;

/*
 * A GroupVersionResource triple identifying an API resource kind.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gvr {
    pub group: &'static str,
    pub version: &'static str,
    pub resource: &'static str,
}

pub const ADDON_GROUP: &str = "addon.open-cluster-management.io";

/* AddOnDeploymentConfig, the configuration object accepted by most addons */
pub const ADDON_DEPLOYMENT_CONFIG_GVR: Gvr = Gvr{
    group: ADDON_GROUP,
    version: "v1alpha1",
    resource: "addondeploymentconfigs",
};

impl Gvr {

    /*
     * Whether a group/resource pair (as found in config references, which
     * carry no version) designates this resource.
     */
    pub fn matches(&self, group: &str, resource: &str) -> bool {
	self.group == group && self.resource == resource
    }
}

impl fmt::Display for Gvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	write!(f, "{}/{}, Resource={}", self.group, self.version, self.resource)
    }
}
