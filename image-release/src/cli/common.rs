use std::path::PathBuf;

use log::warn;

use crate::{
    engine::{Credentials, DockerEngine},
    pipeline::{Pipeline, Settings},
    Result,
};

pub const REGISTRY_USER: &str = "DHUBU";
pub const REGISTRY_PASSWORD: &str = "DHUBP";

fn env_or_empty(name: &str) -> String {
    std::env::var(name)
        .inspect_err(|error| {
            warn!("Unable to read ${name}: {error}");
        })
        .unwrap_or_default()
}

/// Reads the registry credentials from the environment. Missing values are passed on as empty
/// strings and left for the registry to reject.
pub fn registry_credentials() -> Credentials {
    Credentials {
        username: env_or_empty(REGISTRY_USER),
        password: env_or_empty(REGISTRY_PASSWORD),
    }
}

pub fn settings(repository: String, postgres_version: String, context: PathBuf) -> Settings {
    Settings {
        repository,
        postgres_version,
        context,
        credentials: registry_credentials(),
    }
}

/// Connects to `docker_host`, or to the local docker socket when it is not set.
pub fn pipeline(docker_host: Option<&str>, settings: Settings) -> Result<Pipeline<DockerEngine>> {
    Ok(Pipeline::new(DockerEngine::connect(docker_host)?, settings))
}
