/*
 * olm-addon/api - typed definitions of the open-cluster-management resources
 * read and written by the olm-addon hub controller
 */

pub mod gvr;
pub use gvr::Gvr;

pub mod managedcluster;
pub use managedcluster::ManagedCluster;

pub mod addon;
pub use addon::AddOnConfig;
pub use addon::new_condition;
pub use addon::ManagedClusterAddOn;
pub use addon::ManagedClusterAddOnStatus;

pub mod deploymentconfig;
pub use deploymentconfig::AddOnDeploymentConfig;
pub use deploymentconfig::CustomizedVariable;
pub use deploymentconfig::NodePlacement;
pub use deploymentconfig::ProxyConfig;

pub mod manifestwork;
pub use manifestwork::ManifestWork;
