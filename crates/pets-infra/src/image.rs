use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::ImageError;
use crate::runner::Tools;

/// A container image built from a local Dockerfile and pushed to a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuild {
    context: PathBuf,
    dockerfile: PathBuf,
    tag: String,
}

impl ImageBuild {
    pub fn new(context: impl Into<PathBuf>, dockerfile: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            dockerfile: dockerfile.into(),
            tag: tag.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn dockerfile(&self) -> &Path {
        &self.dockerfile
    }

    /// `docker build` then `docker push`.
    ///
    /// A missing Dockerfile is reported before docker is invoked.
    #[instrument(skip(self, tools), fields(tag = %self.tag))]
    pub fn build_and_push(&self, tools: &Tools<'_>) -> Result<(), ImageError> {
        if !self.dockerfile.is_file() {
            return Err(ImageError::DockerfileNotFound(self.dockerfile.clone()));
        }

        tools
            .docker([
                "build".to_string(),
                self.context.display().to_string(),
                "-f".to_string(),
                self.dockerfile.display().to_string(),
                "-t".to_string(),
                self.tag.clone(),
            ])
            .into_result()
            .map_err(|err| ImageError::Build {
                tag: self.tag.clone(),
                err,
            })?;
        info!("image built");

        tools
            .docker(["push", self.tag.as_str()])
            .into_result()
            .map_err(|err| ImageError::Push {
                tag: self.tag.clone(),
                err,
            })?;
        info!("image pushed");
        Ok(())
    }
}
