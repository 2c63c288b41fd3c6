use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    path::PathBuf,
};

use serde_json::Value;

use super::{BuildArgs, Credentials, Engine, Error, ErrorKind, Records, Result};
use crate::image::ImageRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Pull(String),
    Build {
        image: String,
        context: PathBuf,
        build_args: BTreeMap<String, String>,
    },
    Login(String),
    Push(String),
    Tag(String, String),
}

/// Records every call and replays canned streams in the order the streaming calls are made.
/// Streaming calls without a canned stream yield no records.
#[derive(Default)]
pub struct FakeEngine {
    calls: RefCell<Vec<Call>>,
    streams: RefCell<VecDeque<Vec<Result<Value>>>>,
}

impl FakeEngine {
    pub fn with_streams<I: IntoIterator<Item = Vec<Value>>>(streams: I) -> Self {
        FakeEngine {
            calls: RefCell::default(),
            streams: RefCell::new(
                streams
                    .into_iter()
                    .map(|stream| stream.into_iter().map(Ok).collect())
                    .collect(),
            ),
        }
    }

    /// Queues a stream that breaks off with a transport error after the given records.
    pub fn push_broken_stream(&self, records: Vec<Value>) {
        let mut stream: Vec<Result<Value>> = records.into_iter().map(Ok).collect();
        stream.push(Err(Error::new(
            "read the stream",
            ErrorKind::Docker(bollard::errors::Error::DockerResponseServerError {
                status_code: 500,
                message: "connection reset".to_owned(),
            }),
        )));
        self.streams.borrow_mut().push_back(stream);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn stream(&self, call: Call) -> Result<Records<'_>> {
        self.calls.borrow_mut().push(call);
        let stream = self.streams.borrow_mut().pop_front().unwrap_or_default();
        Ok(Box::new(stream.into_iter()))
    }
}

impl Engine for FakeEngine {
    fn pull(&self, image: &ImageRef) -> Result<Records<'_>> {
        self.stream(Call::Pull(image.to_string()))
    }

    fn build(&self, args: BuildArgs) -> Result<Records<'_>> {
        self.stream(Call::Build {
            image: args.image.to_string(),
            context: args.context.to_owned(),
            build_args: args.build_args.clone(),
        })
    }

    fn login(&mut self, credentials: &Credentials) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Login(credentials.username.clone()));
        Ok(())
    }

    fn push(&self, image: &ImageRef) -> Result<Records<'_>> {
        self.stream(Call::Push(image.to_string()))
    }

    fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Tag(source.to_string(), target.to_string()));
        Ok(())
    }
}
