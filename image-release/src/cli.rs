mod common;

use clap::{Args, Parser, Subcommand};
use constcat::concat;
use log::info;

use crate::{pipeline::Finalized, Result};

const DEFAULT_IMAGE_NAME: &str = "neonlabsorg/accountsdb";
const DEFAULT_POSTGRES_VERSION: &str = "14-alpine";

#[derive(Debug, Parser)]
#[command(
    version = crate::version::VERSION,
    about,
    after_help = concat!(
        "The registry username and password are read from $",
        common::REGISTRY_USER,
        " and $",
        common::REGISTRY_PASSWORD,
        "."
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The repository images are published to.
    #[arg(long = "image-name", env = "IMAGE_NAME", global = true, default_value = DEFAULT_IMAGE_NAME)]
    image_name: String,

    /// The tag of the `postgres` image the image is built on, passed to the build as
    /// `POSTGRES_IMAGE=postgres:<version>`.
    #[arg(long = "postgres-version", env = "POSTGRES_VERSION", global = true, default_value = DEFAULT_POSTGRES_VERSION)]
    postgres_version: String,

    /// The build context directory.
    #[arg(long = "context", global = true, default_value = "./")]
    context: std::path::PathBuf,

    /// The address of the docker engine, `unix:///path`, `tcp://host:port` or `http://host:port`.
    /// Defaults to the local docker socket.
    #[arg(long = "docker-host", env = "DOCKER_HOST", global = true)]
    docker_host: Option<String>,
}

#[derive(Debug, Args)]
struct CommitArgs {
    /// The commit the image is built from, used as its tag.
    #[arg(long = "github_sha")]
    github_sha: String,
}

#[derive(Debug, Args)]
struct FinalizeArgs {
    /// The branch the workflow ran for, possibly prefixed by a fork, e.g. `someone:feature/xyz`.
    #[arg(long = "head_ref_branch")]
    head_ref_branch: String,

    /// The ref that triggered the workflow, e.g. `refs/heads/main` or `refs/tags/v1.2.3`.
    #[arg(long = "github_ref")]
    github_ref: String,

    #[arg(long = "github_sha")]
    github_sha: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the image and tag it with the commit hash
    #[command(name = "build_docker_image", arg_required_else_help = true)]
    BuildDockerImage(CommitArgs),

    /// Push the image tagged with the commit hash
    #[command(name = "publish_image", arg_required_else_help = true)]
    PublishImage(CommitArgs),

    /// Promote the image tagged with the commit hash to a tag derived from the git ref
    #[command(name = "finalize_image", arg_required_else_help = true)]
    FinalizeImage(FinalizeArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let Cli {
            command,
            image_name,
            postgres_version,
            context,
            docker_host,
        } = self;

        let settings = common::settings(image_name, postgres_version, context);
        let mut pipeline = common::pipeline(docker_host.as_deref(), settings)?;

        match command {
            Commands::BuildDockerImage(CommitArgs { github_sha }) => {
                pipeline.build(&github_sha)?;
            }
            Commands::PublishImage(CommitArgs { github_sha }) => {
                pipeline.publish(&github_sha)?;
            }
            Commands::FinalizeImage(FinalizeArgs {
                head_ref_branch,
                github_ref,
                github_sha,
            }) => {
                if let Finalized::Promoted(image) =
                    pipeline.finalize(&head_ref_branch, &github_ref, &github_sha)?
                {
                    info!("published {image}");
                }
            }
        }

        Ok(())
    }
}
