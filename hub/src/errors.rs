use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {

    #[error("unable to get kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("unable to setup addon manager: {0}")]
    Manager(#[source] addonfw::Error),

    #[error("unable to build addon agent: {0}")]
    Agent(#[source] addonfw::Error),

    #[error("unable to add addon agent to manager: {0}")]
    Register(#[source] addonfw::Error),

    #[error("addon manager failed: {0}")]
    Run(#[source] addonfw::Error),
}
