//! The container engine the pipeline drives. [`DockerEngine`] talks to a Docker daemon; tests use
//! a fake.

mod context;
mod docker;
#[cfg(test)]
pub(crate) mod fake;

use std::{collections::BTreeMap, fmt, io, path::Path};

pub use docker::DockerEngine;
use serde_json::Value;

use crate::image::ImageRef;

/// The decoded records of a streaming engine response, in the order the engine sent them.
pub type Records<'a> = Box<dyn Iterator<Item = Result<Value>> + 'a>;

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub struct BuildArgs<'a> {
    pub image: &'a ImageRef,
    pub context: &'a Path,
    pub build_args: &'a BTreeMap<String, String>,
}

pub trait Engine {
    fn pull(&self, image: &ImageRef) -> Result<Records<'_>>;

    fn build(&self, args: BuildArgs) -> Result<Records<'_>>;

    /// Sets the registry credentials later pulls and pushes authenticate with.
    fn login(&mut self, credentials: &Credentials) -> Result<()>;

    fn push(&self, image: &ImageRef) -> Result<Records<'_>>;

    fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()>;
}

#[derive(Debug)]
pub enum ErrorKind {
    UnsupportedHost(String),
    Runtime(io::Error),
    Docker(bollard::errors::Error),
    Decode(serde_json::Error),
    Context(io::Error),
}

#[derive(Debug)]
pub struct Error {
    pub operation: String,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(operation: impl Into<String>, kind: ErrorKind) -> Self {
        Error {
            operation: operation.into(),
            kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {operation}: ", operation = self.operation)?;
        match &self.kind {
            ErrorKind::UnsupportedHost(host) => write!(
                f,
                "unsupported docker host `{host}`, expected a `unix://`, `tcp://` or `http://` address"
            ),
            ErrorKind::Runtime(error) => write!(f, "unable to start the async runtime: {error}"),
            ErrorKind::Docker(error) => write!(f, "{error}"),
            ErrorKind::Decode(error) => write!(f, "malformed record: {error}"),
            ErrorKind::Context(error) => write!(f, "unable to archive the build context: {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Runtime(error) | ErrorKind::Context(error) => Some(error),
            ErrorKind::Docker(error) => Some(error),
            ErrorKind::Decode(error) => Some(error),
            ErrorKind::UnsupportedHost(_) => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
