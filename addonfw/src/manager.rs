use crate::agent::AgentAddon;
use crate::client::{HubClient, KubeHubClient};
use crate::deploy;
use crate::errors::{Error, Result};
use crate::install;

use kube::Client as KubeClient;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

struct Running {
    ctx: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

/*
 * AddonManager runs the hub side controllers for a set of registered agent
 * addons. Registration happens before `start()`; the controllers then run
 * in a background task until the context is cancelled or `stop()` is called.
 */
pub struct AddonManager {
    kube_client: KubeClient,
    agents: Vec<Arc<dyn AgentAddon>>,
    resync_interval: Duration,
    running: Option<Running>,
}

/*
 * Drives both controllers until `ctx` is cancelled. Either controller
 * finishing on its own is a failure of the whole manager.
 */
async fn supervise<I, D>(ctx: CancellationToken, install: I, deploy: D) -> Result<()>
where
    I: Future<Output = ()>,
    D: Future<Output = ()>,
{
    tokio::select! {
	_ = ctx.cancelled() => {
	    log::info!("Addon manager stopping");
	    Ok(())
	},
	_ = install => {
	    log::error!("Install controller stopped unexpectedly");
	    Err(Error::Manager(String::from("install controller stopped unexpectedly")))
	},
	_ = deploy => {
	    log::error!("Deploy controller stopped unexpectedly");
	    Err(Error::Manager(String::from("deploy controller stopped unexpectedly")))
	},
    }
}

async fn run(kube_client: KubeClient, agents: Arc<Vec<Arc<dyn AgentAddon>>>, resync_interval: Duration, ctx: CancellationToken) -> Result<()> {
    let hub: Arc<dyn HubClient> = Arc::new(KubeHubClient::new(kube_client.clone()));

    let install = install::controller(kube_client.clone(), Arc::new(install::InstallCtx{
	hub: hub.clone(),
	agents: agents.clone(),
	resync_interval: resync_interval,
    }));
    let deploy = deploy::controller(kube_client, Arc::new(deploy::DeployCtx{
	hub: hub,
	agents: agents,
	resync_interval: resync_interval,
    }));

    supervise(ctx, install, deploy).await
}

impl AddonManager {

    pub fn new(kube_client: KubeClient) -> Self {
	Self{
	    kube_client: kube_client,
	    agents: vec![],
	    resync_interval: DEFAULT_RESYNC_INTERVAL,
	    running: None,
	}
    }

    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
	self.resync_interval = interval;
	self
    }

    /*
     * Registers an agent addon. Names must be unique within a manager.
     */
    pub fn add_agent<A: AgentAddon + 'static>(&mut self, agent: A) -> Result<()> {
	if self.agents.iter().any(|known| known.name() == agent.name()) {
	    let errmsg = format!("an agent addon named {} is already registered", agent.name());
	    return Err(Error::InvalidAgent(errmsg));
	}

	log::debug!("Registered agent addon {}", agent.name());
	self.agents.push(Arc::new(agent));
	Ok(())
    }

    pub fn agent_names(&self) -> Vec<&str> {
	self.agents.iter().map(|agent| agent.name()).collect()
    }

    pub fn is_started(&self) -> bool {
	self.running.is_some()
    }

    /*
     * Spawns the controllers. Cancelling `ctx` stops them.
     */
    pub fn start(&mut self, ctx: CancellationToken) -> Result<()> {
	if self.running.is_some() {
	    return Err(Error::Manager(String::from("already started")));
	}
	if self.agents.is_empty() {
	    return Err(Error::Manager(String::from("no agent addon registered")));
	}

	log::info!("Starting addon manager for {:?}", self.agent_names());
	let handle = tokio::spawn(run(
	    self.kube_client.clone(),
	    Arc::new(self.agents.clone()),
	    self.resync_interval,
	    ctx.clone(),
	));

	self.running = Some(Running{
	    ctx: ctx,
	    handle: handle,
	});
	Ok(())
    }

    /*
     * Waits for the controllers to finish. Returns an error when they ended
     * on their own rather than through cancellation. Cancel safe.
     */
    pub async fn wait(&mut self) -> Result<()> {
	let running = match self.running.as_mut() {
	    Some(running) => running,
	    None => return Ok(()),
	};

	let joined = (&mut running.handle).await;
	self.running = None;

	match joined {
	    Ok(result) => result,
	    Err(err) => Err(Error::Manager(format!("control loop aborted: {}", err))),
	}
    }

    /*
     * Cancels the controllers and waits for them to finish.
     */
    pub async fn stop(&mut self) -> Result<()> {
	if let Some(running) = &self.running {
	    running.ctx.cancel();
	}
	self.wait().await
    }
}
