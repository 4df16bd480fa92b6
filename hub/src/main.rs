mod errors;
mod hub;
mod manifests;
use errors::Error;

use addonfw::AddonManager;
use addonfw::TemplateAgentAddon;
use clap::Parser;
use kube::Client as KubeClient;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use log;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Deploys OLM on the managed clusters labelled for it.
#[derive(Parser, Debug)]
#[command(name = "olm-addon", version)]
struct Options {

    /// kubeconfig file to reach the hub with, the in-cluster configuration is used when unset
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// seconds between two reconciliations of the same object
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    resync_seconds: u64,
}

async fn load_kubeconfig(path: Option<&Path>) -> Result<kube::Config, Error> {
    let path = match path {
	Some(path) => path,
	None => return kube::Config::incluster().map_err(|err| Error::Kubeconfig(format!("in cluster: {}", err))),
    };

    let kubeconfig = Kubeconfig::read_from(path)
	.map_err(|err| Error::Kubeconfig(format!("{}: {}", path.display(), err)))?;

    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
	.await
	.map_err(|err| Error::Kubeconfig(format!("{}: {}", path.display(), err)))
}

/*
 * Builds the addon manager and registers the agent produced by
 * `build_agent`. Nothing is started yet.
 */
fn setup<F>(kubeconfig: &kube::Config, resync_interval: Duration, build_agent: F) -> Result<AddonManager, Error>
where
    F: FnOnce(&kube::Config) -> Result<TemplateAgentAddon, addonfw::Error>,
{
    let kube_client = KubeClient::try_from(kubeconfig.clone())
	.map_err(|err| Error::Manager(addonfw::Error::ClientSetup(err)))?;
    let mut addon_mgr = AddonManager::new(kube_client).with_resync_interval(resync_interval);

    let agent = build_agent(kubeconfig).map_err(Error::Agent)?;
    addon_mgr.add_agent(agent).map_err(Error::Register)?;

    Ok(addon_mgr)
}

async fn shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
	Ok(terminate) => terminate,
	Err(err) => {
	    log::warn!("Unable to listen for SIGTERM: {}", err);
	    let _ = tokio::signal::ctrl_c().await;
	    return;
	}
    };

    tokio::select! {
	// handle CTRL^C as gracefully as we can.
	_ = tokio::signal::ctrl_c() => {},
	_ = terminate.recv() => {},
    }
}

async fn run(opts: Options) -> Result<(), Error> {
    let kubeconfig = load_kubeconfig(opts.kubeconfig.as_deref()).await?;
    let resync_interval = Duration::from_secs(opts.resync_seconds);

    let mut addon_mgr = setup(&kubeconfig, resync_interval, |kubeconfig| {
	hub::new_agent(kubeconfig, manifests::store())
    })?;

    log::info!("starting olm-addon");
    addon_mgr.start(CancellationToken::new()).map_err(Error::Run)?;

    let stopped = tokio::select! {
	res = addon_mgr.wait() => Some(res),
	_ = shutdown_signal() => None,
    };

    match stopped {
	Some(res) => res.map_err(Error::Run),
	None => {
	    log::info!("shutting down olm-addon");
	    addon_mgr.stop().await.map_err(Error::Run)
	}
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let opts = Options::parse();
    match run(opts).await {
	Ok(()) => ExitCode::SUCCESS,
	Err(err) => {
	    log::error!("{}", err);
	    ExitCode::FAILURE
	}
    }
}
