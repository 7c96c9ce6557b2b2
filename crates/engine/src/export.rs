use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{ExportJob, ExportSettings, ExportStatus, MediaBackend};
use crate::composition::{Composition, RenderSpec};
use crate::error::{RenderError, Result};
use crate::overlay::OverlayLayer;

const MAX_RESERVATION_ATTEMPTS: usize = 8;

/// Lifecycle of one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportState {
    #[default]
    Idle,
    Exporting,
    Completed,
    Failed,
    Cancelled,
}

/// Drives one backend export into a fresh, uniquely named output file.
///
/// The backend writes to a hidden staging file; the final path only appears
/// once the backend reports completion.
pub struct Exporter<'a, B: MediaBackend + ?Sized> {
    backend: &'a B,
    output_dir: PathBuf,
    settings: ExportSettings,
    state: ExportState,
}

impl<'a, B: MediaBackend + ?Sized> Exporter<'a, B> {
    pub fn new(backend: &'a B, output_dir: impl Into<PathBuf>, settings: ExportSettings) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            settings,
            state: ExportState::Idle,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Encodes the composition with its overlay and returns the final path.
    ///
    /// An exporter runs once; calling this again after a terminal state is an
    /// export error.
    pub async fn export(
        &mut self,
        composition: &Composition,
        render_spec: &RenderSpec,
        overlay: &OverlayLayer,
    ) -> Result<PathBuf> {
        if self.state != ExportState::Idle {
            return Err(RenderError::Export {
                reason: format!("exporter already used (state {:?})", self.state),
            });
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| RenderError::Io {
                context: "create output directory",
                path: self.output_dir.clone(),
                source,
            })?;
        let reservation = OutputReservation::reserve(&self.output_dir)?;

        self.transition(ExportState::Exporting);
        let status = self
            .backend
            .export(ExportJob {
                composition: composition.clone(),
                render_spec: render_spec.clone(),
                overlay: overlay.clone(),
                settings: self.settings.clone(),
                output_path: reservation.staging_path.clone(),
            })
            .await;

        match status {
            ExportStatus::Completed => match reservation.commit().await {
                Ok(path) => {
                    self.transition(ExportState::Completed);
                    info!(output = %path.display(), "export completed");
                    Ok(path)
                }
                Err(err) => {
                    self.transition(ExportState::Failed);
                    Err(err)
                }
            },
            ExportStatus::Failed(reason) => {
                self.transition(ExportState::Failed);
                warn!(reason = %reason, "export failed");
                Err(RenderError::Export { reason })
            }
            ExportStatus::Cancelled => {
                self.transition(ExportState::Cancelled);
                warn!("export cancelled");
                Err(RenderError::ExportCancelled)
            }
        }
    }

    fn transition(&mut self, next: ExportState) {
        debug!(from = ?self.state, to = ?next, "export state changed");
        self.state = next;
    }
}

/// A never-before-used output name plus its staging sibling.
///
/// Dropping an uncommitted reservation removes the staging file.
#[derive(Debug)]
struct OutputReservation {
    final_path: PathBuf,
    staging_path: PathBuf,
    committed: bool,
}

impl OutputReservation {
    fn reserve(dir: &Path) -> Result<Self> {
        for _ in 0..MAX_RESERVATION_ATTEMPTS {
            let id = Uuid::new_v4();
            let final_path = dir.join(format!("{id}.mp4"));
            let staging_path = dir.join(format!(".{id}.mp4.part"));
            if final_path.exists() || staging_path.exists() {
                debug!(path = %final_path.display(), "output name taken, drawing another");
                continue;
            }
            return Ok(Self {
                final_path,
                staging_path,
                committed: false,
            });
        }

        Err(RenderError::Export {
            reason: format!("no free output name in {}", dir.display()),
        })
    }

    /// Publishes the staging file under the final name.
    ///
    /// A hard link fails when the target exists, so a file that appeared at
    /// the final path is never replaced.
    async fn commit(mut self) -> Result<PathBuf> {
        let staged = tokio::fs::try_exists(&self.staging_path)
            .await
            .unwrap_or(false);
        if !staged {
            return Err(RenderError::Export {
                reason: "encoder reported success but wrote no output".to_string(),
            });
        }

        match tokio::fs::hard_link(&self.staging_path, &self.final_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(RenderError::Export {
                    reason: format!(
                        "output path appeared during export: {}",
                        self.final_path.display()
                    ),
                });
            }
            Err(source) => {
                return Err(RenderError::Io {
                    context: "publish export output",
                    path: self.final_path.clone(),
                    source,
                });
            }
        }
        self.committed = true;

        if let Err(err) = tokio::fs::remove_file(&self.staging_path).await {
            warn!(
                path = %self.staging_path.display(),
                error = %err,
                "failed to remove staging file after publish"
            );
        }
        Ok(self.final_path.clone())
    }
}

impl Drop for OutputReservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.staging_path) {
            Ok(()) => debug!(path = %self.staging_path.display(), "staging file removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.staging_path.display(),
                error = %err,
                "failed to remove staging file"
            ),
        }
    }
}
