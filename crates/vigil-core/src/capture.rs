//! Still image capture via an external camera command.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::AlertConfig;
use crate::error::CaptureFault;
use crate::traits::{Camera, ImageHandle};

/// Camera backed by an external capture command such as `libcamera-still`.
///
/// The command is invoked as `<command> -o <image_path>` and must leave an
/// image at the configured path on success.
#[derive(Debug, Clone)]
pub struct StillCamera {
    command: String,
    image_path: PathBuf,
}

impl StillCamera {
    pub fn new(command: impl Into<String>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            image_path: image_path.into(),
        }
    }

    pub fn from_config(alert: &AlertConfig) -> Self {
        Self::new(alert.capture_command.clone(), alert.image_path.clone())
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn capture_still(&self) -> Result<ImageHandle, CaptureFault> {
        debug!(
            command = %self.command,
            path = %self.image_path.display(),
            "capturing still image"
        );
        let status = Command::new(&self.command)
            .arg("-o")
            .arg(&self.image_path)
            .status()
            .await
            .map_err(|source| CaptureFault::Spawn {
                command: self.command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(CaptureFault::CommandFailed { status });
        }
        if !tokio::fs::try_exists(&self.image_path).await.unwrap_or(false) {
            return Err(CaptureFault::MissingImage {
                path: self.image_path.clone(),
            });
        }
        Ok(ImageHandle {
            path: self.image_path.clone(),
        })
    }
}
