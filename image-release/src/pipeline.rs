use std::{collections::BTreeMap, path::PathBuf};

use log::info;

use crate::{
    engine::{BuildArgs, Credentials, Engine, Records},
    error::Error,
    image::ImageRef,
    output, tag,
};

pub struct Settings {
    /// The repository commit and promoted images are published to, e.g. `neonlabsorg/accountsdb`.
    pub repository: String,
    /// The `postgres` image tag the image is built on.
    pub postgres_version: String,
    /// The build context directory.
    pub context: PathBuf,
    pub credentials: Credentials,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Finalized {
    /// The ref is a version branch, nothing was published.
    Skipped,
    Promoted(ImageRef),
}

fn print_line(line: &str) {
    println!("{line}");
}

/// The build, publish and finalize stages of a release. Each stage is meant to run in its own
/// process invocation.
pub struct Pipeline<E> {
    engine: E,
    settings: Settings,
    echo: fn(&str),
}

impl<E: Engine> Pipeline<E> {
    pub fn new(engine: E, settings: Settings) -> Self {
        Pipeline {
            engine,
            settings,
            echo: print_line,
        }
    }

    fn commit_image(&self, github_sha: &str) -> ImageRef {
        ImageRef::new(self.settings.repository.as_str(), github_sha)
    }

    fn process(&self, records: Records<'_>) -> Result<Vec<String>, Error> {
        output::process(records, self.echo)
    }

    /// Builds `<repository>:<github_sha>` on top of the postgres base image.
    pub fn build(&self, github_sha: &str) -> Result<Vec<String>, Error> {
        let base_image = ImageRef::new("postgres", self.settings.postgres_version.as_str());
        info!("pulling {base_image}");
        let mut lines = self.process(self.engine.pull(&base_image)?)?;

        let build_args = BTreeMap::from([
            ("REVISION".to_owned(), github_sha.to_owned()),
            ("POSTGRES_IMAGE".to_owned(), base_image.to_string()),
        ]);
        let image = self.commit_image(github_sha);

        info!("start build");
        lines.extend(self.process(self.engine.build(BuildArgs {
            image: &image,
            context: &self.settings.context,
            build_args: &build_args,
        })?)?);

        Ok(lines)
    }

    /// Pushes `<repository>:<github_sha>`.
    pub fn publish(&mut self, github_sha: &str) -> Result<Vec<String>, Error> {
        self.engine.login(&self.settings.credentials)?;

        let image = self.commit_image(github_sha);
        info!("pushing {image}");
        self.process(self.engine.push(&image)?)
    }

    /// Re-publishes the commit image under the tag resolved from the refs, unless the ref is a
    /// version branch.
    pub fn finalize(
        &mut self,
        head_ref_branch: &str,
        github_ref: &str,
        github_sha: &str,
    ) -> Result<Finalized, Error> {
        let Some(tag) = tag::resolve(github_ref, head_ref_branch) else {
            info!("The image is not published, please create tag for publishing");
            return Ok(Finalized::Skipped);
        };

        self.engine.login(&self.settings.credentials)?;

        // The commit image may have been built on another runner, pull it rather than trust the
        // local image store.
        let source = self.commit_image(github_sha);
        info!("pulling {source}");
        self.process(self.engine.pull(&source)?)?;

        let target = source.with_tag(tag);
        self.engine.tag(&source, &target)?;

        info!("pushing {target}");
        self.process(self.engine.push(&target)?)?;

        Ok(Finalized::Promoted(target))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::fake::{Call, FakeEngine};

    fn settings() -> Settings {
        Settings {
            repository: "neonlabsorg/accountsdb".to_owned(),
            postgres_version: "14-alpine".to_owned(),
            context: PathBuf::from("./"),
            credentials: Credentials {
                username: "ci".to_owned(),
                password: "secret".to_owned(),
            },
        }
    }

    fn pipeline(engine: FakeEngine) -> Pipeline<FakeEngine> {
        Pipeline {
            engine,
            settings: settings(),
            echo: |_| {},
        }
    }

    const SHA: &str = "3f786850e387550fdab836ed7e6dc881de23001b";

    #[test]
    fn test_build() {
        let pipeline = pipeline(FakeEngine::with_streams([
            vec![json!({"status": "Pulling from library/postgres"})],
            vec![
                json!({"stream": "\nStep 1/1 : FROM postgres:14-alpine\n"}),
                json!({"aux": {"ID": "sha256:def"}}),
            ],
        ]));

        let lines = pipeline.build(SHA).unwrap();
        assert_eq!(
            lines,
            [
                "Pulling from library/postgres",
                "Step 1/1 : FROM postgres:14-alpine",
                "ID: sha256:def"
            ]
        );
        assert_eq!(
            pipeline.engine.calls(),
            [
                Call::Pull("postgres:14-alpine".to_owned()),
                Call::Build {
                    image: format!("neonlabsorg/accountsdb:{SHA}"),
                    context: PathBuf::from("./"),
                    build_args: BTreeMap::from([
                        ("POSTGRES_IMAGE".to_owned(), "postgres:14-alpine".to_owned()),
                        ("REVISION".to_owned(), SHA.to_owned()),
                    ]),
                },
            ]
        );
    }

    #[test]
    fn test_build_failure() {
        let pipeline = pipeline(FakeEngine::with_streams([
            vec![],
            vec![
                json!({"stream": "Step 1/1 : RUN false\n"}),
                json!({"errorDetail": {"message": "returned a non-zero code: 1", "code": 1}, "code": 1}),
            ],
        ]));

        let error = pipeline.build(SHA).unwrap_err();
        assert_eq!(
            error.to_string(),
            "problem executing Docker: returned a non-zero code: 1. Error code: 1"
        );
    }

    #[test]
    fn test_build_stops_when_base_image_pull_fails() {
        let pipeline = pipeline(FakeEngine::with_streams([vec![
            json!({"error": "manifest unknown"}),
        ]]));

        assert!(matches!(pipeline.build(SHA), Err(Error::Stream(_))));
        assert_eq!(
            pipeline.engine.calls(),
            [Call::Pull("postgres:14-alpine".to_owned())]
        );
    }

    #[test]
    fn test_publish() {
        let mut pipeline = pipeline(FakeEngine::with_streams([vec![
            json!({"status": "The push refers to repository [docker.io/neonlabsorg/accountsdb]"}),
            json!({"status": "Pushed", "progressDetail": {}, "id": "a1b2"}),
            json!({"aux": {"Tag": SHA, "Digest": "sha256:abc", "Size": 1}}),
        ]]));

        let lines = pipeline.publish(SHA).unwrap();
        assert_eq!(lines.last().map(String::as_str), Some("digest: sha256:abc"));
        assert_eq!(
            pipeline.engine.calls(),
            [
                Call::Login("ci".to_owned()),
                Call::Push(format!("neonlabsorg/accountsdb:{SHA}")),
            ]
        );
    }

    #[test]
    fn test_finalize_promotes() {
        let mut pipeline = pipeline(FakeEngine::default());

        let finalized = pipeline
            .finalize("main", "refs/heads/main", SHA)
            .unwrap();
        assert_eq!(
            finalized,
            Finalized::Promoted(ImageRef::new("neonlabsorg/accountsdb", "stable"))
        );
        assert_eq!(
            pipeline.engine.calls(),
            [
                Call::Login("ci".to_owned()),
                Call::Pull(format!("neonlabsorg/accountsdb:{SHA}")),
                Call::Tag(
                    format!("neonlabsorg/accountsdb:{SHA}"),
                    "neonlabsorg/accountsdb:stable".to_owned()
                ),
                Call::Push("neonlabsorg/accountsdb:stable".to_owned()),
            ]
        );
    }

    #[test]
    fn test_finalize_skips_version_branch() {
        let mut pipeline = pipeline(FakeEngine::default());

        let finalized = pipeline
            .finalize("v2.3.x-hotfix", "refs/heads/v2.3.x-hotfix", SHA)
            .unwrap();
        assert_eq!(finalized, Finalized::Skipped);
        assert!(pipeline.engine.calls().is_empty());
    }

    #[test]
    fn test_finalize_stops_when_pull_fails() {
        let mut pipeline = pipeline(FakeEngine::with_streams([vec![
            json!({"error": "manifest unknown"}),
        ]]));

        let error = pipeline
            .finalize("someone:feature/xyz", "refs/heads/feature/xyz", SHA)
            .unwrap_err();
        assert_eq!(error.to_string(), "problem executing Docker: manifest unknown");
        assert_eq!(
            pipeline.engine.calls(),
            [
                Call::Login("ci".to_owned()),
                Call::Pull(format!("neonlabsorg/accountsdb:{SHA}")),
            ]
        );
    }

    #[test]
    fn test_finalize_push_failure() {
        let engine = FakeEngine::with_streams([vec![json!({"status": "Downloaded newer image"})]]);
        engine.push_broken_stream(vec![json!({"status": "Preparing"})]);
        let mut pipeline = pipeline(engine);

        let error = pipeline
            .finalize("v1.2.3", "refs/tags/v1.2.3", SHA)
            .unwrap_err();
        assert!(matches!(error, Error::Engine(_)));
        assert_eq!(
            pipeline.engine.calls().last(),
            Some(&Call::Push("neonlabsorg/accountsdb:v1.2.3".to_owned()))
        );
    }
}
