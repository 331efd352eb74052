//! Pet picture uploads.
//!
//! Pictures are written to the configured images directory and served from
//! `/images/`. Only the sanitised file name is stored on the pet.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::instrument;

use orange_collar_core::PetId;

/// Extensions accepted for pet pictures (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Errors from saving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The form had no file part, or it was empty.
    #[error("no file uploaded")]
    MissingFile,

    /// Extension not in [`ALLOWED_EXTENSIONS`].
    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),

    /// Nothing usable remained after sanitising the name.
    #[error("invalid file name")]
    InvalidFileName,

    /// Writing the file failed.
    #[error("failed to save upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// The flash message shown to the uploader, or `None` for internal errors.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::MissingFile => Some("Please choose a file to upload.".to_owned()),
            Self::DisallowedExtension(_) => Some(format!(
                "Pictures must be one of: {}.",
                ALLOWED_EXTENSIONS.join(", ")
            )),
            Self::InvalidFileName => Some("That file name can't be used.".to_owned()),
            Self::Io(_) => None,
        }
    }
}

/// Whether `file_name` has an allowed picture extension.
#[must_use]
pub fn allowed_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Reduce a client-supplied file name to a safe, flat ASCII name.
///
/// Directory components are dropped, whitespace becomes `_`, and anything
/// other than ASCII alphanumerics, `.`, `_` and `-` is removed. Leading dots
/// and underscores are stripped so the result is never hidden or relative.
#[must_use]
pub fn sanitize_filename(file_name: &str) -> Option<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Writes pet pictures to disk.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Store pictures under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The images directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and save a picture for `pet_id`, returning the stored name.
    ///
    /// The stored name is prefixed with the pet id so owners cannot
    /// overwrite each other's pictures. Existing files for the same pet and
    /// name are replaced.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the file is empty, has a disallowed
    /// extension, has an unusable name, or cannot be written.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        pet_id: PetId,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        if original_name.trim().is_empty() || bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }

        let clean = sanitize_filename(original_name).ok_or(UploadError::InvalidFileName)?;
        if !allowed_file(&clean) {
            return Err(UploadError::DisallowedExtension(clean));
        }

        let stored = format!("pet{pet_id}-{clean}");
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&stored), bytes).await?;

        tracing::info!(file = %stored, "pet picture saved");
        Ok(stored)
    }

    /// Delete a stored picture. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidFileName` if `stored` is not a plain file
    /// name, or `UploadError::Io` if the file cannot be removed.
    pub async fn remove(&self, stored: &str) -> Result<(), UploadError> {
        if stored.is_empty() || stored.starts_with('.') || stored.contains(['/', '\\']) {
            return Err(UploadError::InvalidFileName);
        }

        match tokio::fs::remove_file(self.dir.join(stored)).await {
            Ok(()) => {
                tracing::info!(file = %stored, "pet picture removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Make a saved picture current by running `attach`, then drop the loser.
    ///
    /// If `attach` fails, `stored` is deleted and the error returned.
    /// Otherwise `previous` is deleted unless it names the same file.
    /// Failed deletions are logged and never returned.
    ///
    /// # Errors
    ///
    /// Returns whatever `attach` returns.
    pub async fn replace<E>(
        &self,
        stored: &str,
        previous: Option<&str>,
        attach: impl Future<Output = Result<(), E>>,
    ) -> Result<(), E> {
        if let Err(e) = attach.await {
            self.discard(stored).await;
            return Err(e);
        }
        if let Some(old) = previous.filter(|old| *old != stored) {
            self.discard(old).await;
        }
        Ok(())
    }

    async fn discard(&self, stored: &str) {
        if let Err(e) = self.remove(stored).await {
            tracing::warn!(file = %stored, error = %e, "failed to remove pet picture");
        }
    }
}
