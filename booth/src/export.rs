use crate::compositor::{ComposeError, StillImage};
use lovelens_common::config::ExportConfig;
use lovelens_common::frame::{export_file_name, now_ms};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write still image: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to encode still image: {0}")]
    Encode(#[from] ComposeError),
    #[error("sharing is not supported on this deployment")]
    ShareUnsupported,
    #[error("share command exited with status {0}")]
    ShareFailed(std::process::ExitStatus),
}

/// Write the still as `lovelens-<unix-epoch-ms>.png` under the export
/// directory, creating the directory if needed.
pub async fn save_still(still: &StillImage, config: &ExportConfig) -> Result<PathBuf, ExportError> {
    let png = still.encode_png()?;
    tokio::fs::create_dir_all(&config.dir).await?;
    let path = Path::new(&config.dir).join(export_file_name(now_ms()));
    tokio::fs::write(&path, png).await?;
    info!(path = %path.display(), "still image exported");
    Ok(path)
}

/// Hand an exported file to the configured share command. Feature-detected:
/// with no command configured this reports `ShareUnsupported`, which callers
/// surface as a notification rather than an error.
pub async fn share(path: &Path, config: &ExportConfig) -> Result<(), ExportError> {
    let Some(command) = config
        .share_command
        .as_deref()
        .filter(|c| !c.is_empty())
    else {
        return Err(ExportError::ShareUnsupported);
    };

    let status = Command::new(command).arg(path).status().await?;
    if status.success() {
        info!(command, path = %path.display(), "still image shared");
        Ok(())
    } else {
        Err(ExportError::ShareFailed(status))
    }
}
