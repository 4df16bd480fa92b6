/*
 * addonfw - a small addon framework for open-cluster-management hubs.
 *
 * An addon is described by an AgentAddon: a name, an install strategy telling
 * which managed clusters get a ManagedClusterAddOn, and a way to compute the
 * manifests deployed on each of them. The AddonManager runs the controllers
 * turning those descriptions into ManagedClusterAddOn and ManifestWork
 * objects on the hub.
 */

pub mod errors;
pub use errors::Error;
pub use errors::Result;

pub mod client;
pub use client::HubClient;

pub mod values;
pub use values::GetValues;
pub use values::Values;

pub mod deploymentconfig;
pub use deploymentconfig::AddOnDeploymentConfigGetter;

pub mod strategy;
pub use strategy::InstallStrategy;

pub mod template;
pub use template::TemplateStore;

pub mod agent;
pub use agent::AgentAddon;
pub use agent::AgentAddonFactory;
pub use agent::TemplateAgentAddon;

pub mod manifestwork;

mod install;
mod deploy;

pub mod manager;
pub use manager::AddonManager;
