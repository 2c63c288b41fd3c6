use std::{collections::HashMap, pin::Pin};

use bollard::{auth::DockerCredentials, errors::Error as DockerError, Docker, API_DEFAULT_VERSION};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http_body_util::{Either, Full};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use super::{context, BuildArgs, Credentials, Engine, Error, ErrorKind, Records, Result};
use crate::image::ImageRef;

/// Seconds to wait for the engine to answer a request. Streaming bodies are not bounded.
const TIMEOUT: u64 = 120;

/// A Docker daemon reached through `bollard`. The async client is driven to completion on a
/// private single-threaded runtime so the pipeline stays synchronous.
pub struct DockerEngine {
    docker: Docker,
    runtime: Runtime,
    /// Set by [`Engine::login`].
    credentials: Option<DockerCredentials>,
}

impl DockerEngine {
    /// Connects to `host`, or to the platform's default socket when there is none.
    pub fn connect(host: Option<&str>) -> Result<Self> {
        let operation = "connect to the docker engine";
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| Error::new(operation, ErrorKind::Runtime(error)))?;

        let docker = {
            let _guard = runtime.enter();
            match host {
                Some(host) => connect_with_host(host),
                None => {
                    debug!("docker engine at the local default socket");
                    Docker::connect_with_local_defaults()
                        .map_err(|error| Error::new(operation, ErrorKind::Docker(error)))
                }
            }?
        };

        Ok(DockerEngine {
            docker,
            runtime,
            credentials: None,
        })
    }

    fn records<'a, S, T>(&'a self, operation: String, stream: S) -> Records<'a>
    where
        S: Stream<Item = Result<T, DockerError>> + 'a,
        T: Serialize,
    {
        Box::new(BlockingRecords {
            runtime: &self.runtime,
            operation,
            stream: Box::pin(stream),
        })
    }
}

fn connect_with_host(host: &str) -> Result<Docker> {
    let operation = "connect to the docker engine";
    debug!("docker engine at {host}");

    let connected = if host.starts_with("unix://") {
        Docker::connect_with_unix(host, TIMEOUT, API_DEFAULT_VERSION)
    } else if let Some(address) = host.strip_prefix("tcp://") {
        Docker::connect_with_http(&format!("http://{address}"), TIMEOUT, API_DEFAULT_VERSION)
    } else if host.starts_with("http://") {
        Docker::connect_with_http(host, TIMEOUT, API_DEFAULT_VERSION)
    } else {
        return Err(Error::new(
            operation,
            ErrorKind::UnsupportedHost(host.to_owned()),
        ));
    };

    connected.map_err(|error| Error::new(operation, ErrorKind::Docker(error)))
}

/// Waits for the items of an engine stream one at a time, so every record can be printed as
/// soon as the engine sends it.
struct BlockingRecords<'a, S> {
    runtime: &'a Runtime,
    operation: String,
    stream: Pin<Box<S>>,
}

impl<S, T> Iterator for BlockingRecords<'_, S>
where
    S: Stream<Item = Result<T, DockerError>>,
    T: Serialize,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.runtime.block_on(self.stream.next())?;
        Some(record(&self.operation, item))
    }
}

/// Turns a typed stream item back into the record the engine sent. A line that does not decode
/// is passed on as a raw string record and the stream continues.
fn record<T: Serialize>(operation: &str, item: Result<T, DockerError>) -> Result<Value> {
    match item {
        Ok(info) => serde_json::to_value(info)
            .map_err(|error| Error::new(operation, ErrorKind::Decode(error))),
        Err(DockerError::JsonDataError {
            message, contents, ..
        }) => {
            debug!("undecodable record from {operation}: {message}");
            Ok(Value::String(contents))
        }
        Err(error) => Err(Error::new(operation, ErrorKind::Docker(error))),
    }
}

impl Engine for DockerEngine {
    fn pull(&self, image: &ImageRef) -> Result<Records<'_>> {
        debug!("POST /images/create {image}");

        #[allow(deprecated)]
        let options = bollard::image::CreateImageOptions::<String> {
            from_image: image.repository.clone(),
            tag: image.tag.clone(),
            ..Default::default()
        };

        let stream = self
            .docker
            .create_image(Some(options), None, self.credentials.clone());
        Ok(self.records(format!("pull `{image}`"), stream))
    }

    fn build(&self, args: BuildArgs) -> Result<Records<'_>> {
        let BuildArgs {
            image,
            context,
            build_args,
        } = args;
        let operation = format!("build `{image}`");
        debug!("POST /build {image}");

        let archive = context::archive(context)
            .map_err(|error| Error::new(operation.as_str(), ErrorKind::Context(error)))?;

        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions::<String> {
            dockerfile: "Dockerfile".to_owned(),
            t: image.to_string(),
            buildargs: build_args
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<HashMap<_, _>>(),
            rm: true,
            ..Default::default()
        };

        let body = Full::new(Bytes::from(archive));
        let stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));
        Ok(self.records(operation, stream))
    }

    fn login(&mut self, credentials: &Credentials) -> Result<()> {
        info!(
            "using registry credentials of {username:?}",
            username = credentials.username
        );
        self.credentials = Some(DockerCredentials {
            username: Some(credentials.username.clone()),
            password: Some(credentials.password.clone()),
            ..Default::default()
        });
        Ok(())
    }

    fn push(&self, image: &ImageRef) -> Result<Records<'_>> {
        debug!("POST /images/{}/push {}", image.repository, image.tag);

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: image.tag.clone(),
        };

        #[allow(deprecated)]
        let stream = self.docker.push_image(
            &image.repository,
            Some(options),
            self.credentials.clone(),
        );
        Ok(self.records(format!("push `{image}`"), stream))
    }

    fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        let operation = format!("tag `{source}` as `{target}`");
        debug!("POST /images/{source}/tag {target}");

        #[allow(deprecated)]
        let options = bollard::image::TagImageOptions::<String> {
            repo: target.repository.clone(),
            tag: target.tag.clone(),
        };

        self.runtime
            .block_on(self.docker.tag_image(&source.to_string(), Some(options)))
            .map_err(|error| Error::new(operation, ErrorKind::Docker(error)))
    }
}
