pub(crate) mod engine;
pub(crate) mod error;
pub(crate) mod image;
pub(crate) mod normalize;
pub(crate) mod output;
pub(crate) mod pipeline;
pub(crate) mod record;
pub(crate) mod tag;
pub(crate) mod version;

pub mod ansi;
pub mod cli;

pub(crate) type Result<T, E = Box<dyn std::error::Error + Send + Sync + 'static>> =
    std::result::Result<T, E>;
