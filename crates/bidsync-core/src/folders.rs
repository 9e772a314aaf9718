//! Upload folder tree for newly inserted projects.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;
use crate::mapper::ProjectNumber;
use crate::traits::FolderProvisioner;

/// Subfolders created under every project folder.
pub const PROJECT_SUBFOLDERS: [&str; 6] = ["Uploads", "Addenda", "Bid Results", "PHL", "Plans", "Specs"];

/// Creates `<root>/<year>/<month>/<number>/<subfolder>` on the local filesystem.
#[derive(Debug, Clone)]
pub struct UploadFolders {
    root: PathBuf,
}

impl UploadFolders {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding every upload of one project.
    pub fn project_dir(&self, number: &ProjectNumber) -> PathBuf {
        self.root
            .join(&number.year)
            .join(&number.month)
            .join(&number.number)
    }
}

impl FolderProvisioner for UploadFolders {
    async fn provision(&self, number: &ProjectNumber) -> Result<(), AppError> {
        let base = self.project_dir(number);
        for sub in PROJECT_SUBFOLDERS {
            let dir = base.join(sub);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| AppError::FolderError(format!("{}: {}", dir.display(), e)))?;
        }
        debug!(path = %base.display(), "Provisioned project folders");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> ProjectNumber {
        ProjectNumber::from_explicit("24040007").unwrap()
    }

    #[test]
    fn test_project_dir_layout() {
        let folders = UploadFolders::new("/srv/uploads");
        assert_eq!(
            folders.project_dir(&number()),
            PathBuf::from("/srv/uploads/2024/04/24040007")
        );
    }

    #[tokio::test]
    async fn test_provision_creates_all_subfolders() {
        let tmp = tempfile::tempdir().unwrap();
        let folders = UploadFolders::new(tmp.path());

        folders.provision(&number()).await.unwrap();
        // Idempotent
        folders.provision(&number()).await.unwrap();

        let base = tmp.path().join("2024").join("04").join("24040007");
        for sub in PROJECT_SUBFOLDERS {
            assert!(base.join(sub).is_dir(), "missing {}", sub);
        }
    }

    #[tokio::test]
    async fn test_provision_reports_folder_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let folders = UploadFolders::new(&blocker);
        let err = folders.provision(&number()).await.unwrap_err();
        assert!(matches!(err, AppError::FolderError(_)));
    }
}
