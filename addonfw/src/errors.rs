use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {

    /* encapsulate a kube-rust error */
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),

    #[error("unable to setup addon client: {0}")]
    ClientSetup(#[source] kube::Error),

    #[error("invalid annotation {key}: {reason}")]
    Annotation { key: String, reason: String },

    #[error("addon deployment config {namespace}/{name} not found")]
    ConfigNotFound { namespace: String, name: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("invalid manifest in {template}: {reason}")]
    Manifest { template: String, reason: String },

    #[error("invalid agent addon: {0}")]
    InvalidAgent(String),

    #[error("addon manager: {0}")]
    Manager(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
