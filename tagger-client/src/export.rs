//! Export trigger
//!
//! Requests an artifact from the backend and saves it into the download
//! directory. The file is written to a temporary name and renamed into
//! place, so a failed download never leaves a truncated file behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tagger_common::model::ExportKind;
use tagger_common::SessionId;
use tokio::sync::watch;
use tracing::{error, info};

use crate::api::TaggerApi;
use crate::{Error, Result};

pub struct ExportTrigger {
    api: Arc<dyn TaggerApi>,
    session: watch::Receiver<SessionId>,
    download_dir: PathBuf,
}

impl ExportTrigger {
    pub fn new(
        api: Arc<dyn TaggerApi>,
        session: watch::Receiver<SessionId>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            session,
            download_dir,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download `kind` and save it; returns the written path
    ///
    /// An explicit filename must be non-blank and a bare file name. No retry
    /// on failure.
    pub async fn export_artifact(&self, kind: ExportKind, filename: Option<&str>) -> Result<PathBuf> {
        let filename = filename.map(str::trim);
        if let Some(name) = filename {
            validate_filename(name)?;
        }

        let session = self.session.borrow().clone();
        let bytes = match self.api.export(&session, kind, filename).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(session = %session, kind = %kind, "Export failed: {}", e);
                return Err(e);
            }
        };

        let target = self.download_dir.join(kind.download_name(filename));
        write_atomic(&target, &bytes).await?;

        info!(session = %session, kind = %kind, path = %target.display(), size = bytes.len(), "Export saved");
        Ok(target)
    }
}

fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("Please enter a filename".to_string()));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!(
            "Filename must not contain a path: {}",
            name
        )));
    }
    Ok(())
}

async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut temp = target.as_os_str().to_owned();
    temp.push(".part");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&temp, target).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}
