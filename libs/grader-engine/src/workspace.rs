/// Workspace Manager
///
/// A workspace is the paired local/remote footprint of one submission:
/// `<staging_dir>/<run_id>.<ext>` locally, `<remote_base>/<run_id>/` on
/// the host with the uploaded source and the compiled executable inside.
///
/// Teardown is explicit (`destroy`) because removal is async. If a
/// workspace is dropped without it (panic, cancelled future) the `Drop`
/// impl removes the local file and schedules the remote removal.
use crate::error::{CleanupError, GradeError};
use crate::transport::Transport;
use grader_common::config::GraderConfig;
use grader_common::types::RunId;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Where workspaces live; derived once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub staging_dir: PathBuf,
    pub remote_base_dir: String,
    pub source_extension: String,
}

impl WorkspaceLayout {
    pub fn from_config(config: &GraderConfig) -> Self {
        Self {
            staging_dir: config.staging_dir.clone(),
            remote_base_dir: config.remote_base_dir(),
            source_extension: config.source_extension.clone(),
        }
    }

    /// Create the local staging directory if absent. Done once by the
    /// process entry point, not per submission.
    pub async fn prepare_staging_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.staging_dir).await
    }
}

pub struct Workspace {
    run_id: RunId,
    local_source_path: PathBuf,
    remote_directory: String,
    remote_source_path: String,
    remote_executable_path: String,
    transport: Arc<dyn Transport>,
    torn_down: bool,
}

impl Workspace {
    fn new(transport: Arc<dyn Transport>, layout: &WorkspaceLayout, run_id: RunId) -> Self {
        let source_name = format!("{}.{}", run_id, layout.source_extension);
        let remote_directory = format!("{}/{}", layout.remote_base_dir, run_id);

        Self {
            local_source_path: layout.staging_dir.join(&source_name),
            remote_source_path: format!("{}/{}", remote_directory, source_name),
            remote_executable_path: format!("{}/{}", remote_directory, run_id),
            remote_directory,
            run_id,
            transport,
            torn_down: false,
        }
    }

    /// Write `code` locally, create the remote run directory and upload the
    /// source into it. On failure everything created so far is removed
    /// before the error is returned.
    pub async fn create(
        transport: Arc<dyn Transport>,
        layout: &WorkspaceLayout,
        run_id: RunId,
        code: &str,
    ) -> Result<Self, GradeError> {
        let workspace = Self::new(transport, layout, run_id);

        match workspace.stage(code).await {
            Ok(()) => {
                debug!(
                    run_id = %workspace.run_id,
                    remote_directory = %workspace.remote_directory,
                    "Workspace staged"
                );
                Ok(workspace)
            }
            Err(e) => {
                workspace.destroy().await;
                Err(e)
            }
        }
    }

    async fn stage(&self, code: &str) -> Result<(), GradeError> {
        tokio::fs::write(&self.local_source_path, code)
            .await
            .map_err(GradeError::Staging)?;
        self.transport.make_directory(&self.remote_directory).await?;
        self.transport
            .upload_file(&self.local_source_path, &self.remote_source_path)
            .await?;
        Ok(())
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn local_source_path(&self) -> &Path {
        &self.local_source_path
    }

    pub fn remote_directory(&self) -> &str {
        &self.remote_directory
    }

    pub fn remote_source_path(&self) -> &str {
        &self.remote_source_path
    }

    pub fn remote_executable_path(&self) -> &str {
        &self.remote_executable_path
    }

    /// Remove the remote directory and the local source file.
    ///
    /// Both removals are attempted even if one fails. Failures are logged
    /// and handed back for inspection; they never replace the submission's
    /// own result.
    pub async fn destroy(mut self) -> Vec<CleanupError> {
        self.torn_down = true;
        let mut failures = Vec::new();

        if let Err(source) = self.transport.remove_directory(&self.remote_directory).await {
            failures.push(CleanupError::Remote {
                path: self.remote_directory.clone(),
                source,
            });
        }

        if let Err(source) = remove_local(&self.local_source_path).await {
            failures.push(CleanupError::Local {
                path: self.local_source_path.clone(),
                source,
            });
        }

        for failure in &failures {
            error!(run_id = %self.run_id, error = %failure, "Workspace cleanup failed");
        }

        failures
    }
}

async fn remove_local(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }

        warn!(run_id = %self.run_id, "Workspace dropped without teardown; cleaning up in background");

        if let Err(e) = std::fs::remove_file(&self.local_source_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.local_source_path.display(), error = %e, "Failed to remove local source");
            }
        }

        // Cannot await in Drop; hand the remote removal to the runtime if one is running
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(remote_directory = %self.remote_directory, "No runtime available; remote directory left behind");
            return;
        };
        let transport = self.transport.clone();
        let remote_directory = self.remote_directory.clone();
        handle.spawn(async move {
            if let Err(e) = transport.remove_directory(&remote_directory).await {
                warn!(remote_directory = %remote_directory, error = %e, "Background remote cleanup failed");
            }
        });
    }
}
