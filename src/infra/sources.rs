//! Source staging
//!
//! Collects one package's sources into `<work_dir>/sources/<name>/`: local
//! files and directories are copied, remote archives are downloaded into a
//! shared download cache (`<work_dir>/downloads/`), verified, and copied
//! in. Dependency sources are never fetched.

use std::path::{Path, PathBuf};

use crate::core::package::{Package, SourceSpec};
use crate::error::{FilesystemError, SourceError};
use crate::infra::download::DownloadManager;
use crate::infra::filesystem;

/// Sources staged for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSources {
    /// Staging directory
    pub dir: PathBuf,
    /// Staged files, relative to `dir`, sorted
    pub files: Vec<PathBuf>,
}

/// Stages package sources into the work directory
#[derive(Debug, Clone)]
pub struct SourceStager {
    work_dir: PathBuf,
    downloads: DownloadManager,
}

impl SourceStager {
    /// Create a stager rooted at `work_dir`
    pub fn new(work_dir: PathBuf) -> Self {
        Self::with_downloads(work_dir, DownloadManager::new())
    }

    /// Create a stager with a custom download manager
    pub fn with_downloads(work_dir: PathBuf, downloads: DownloadManager) -> Self {
        Self {
            work_dir,
            downloads,
        }
    }

    /// Staging directory for a package
    pub fn staging_dir(&self, package: &str) -> PathBuf {
        self.work_dir.join("sources").join(package)
    }

    /// Download cache directory
    pub fn download_dir(&self) -> PathBuf {
        self.work_dir.join("downloads")
    }

    /// Stage all sources of `package`, replacing any earlier staging
    pub async fn stage(&self, package: &Package) -> Result<StagedSources, SourceError> {
        let dir = self.staging_dir(&package.name);
        filesystem::recreate_dir(&dir).map_err(source_io)?;

        for spec in &package.source.sources {
            match spec {
                SourceSpec::Local { path } => {
                    let from = package.source.resolve(path);
                    if !from.exists() {
                        return Err(SourceError::Io {
                            path: from,
                            error: "source path does not exist".to_string(),
                        });
                    }
                    let to = if from.is_file() {
                        dir.join(file_name(&from))
                    } else {
                        dir.clone()
                    };
                    filesystem::copy_tree(&from, &to).map_err(source_io)?;
                }
                SourceSpec::Url { url, sha256 } => {
                    let name = url_file_name(url);
                    let cached = self.download_dir().join(&name);
                    self.downloads.fetch_verified(url, &cached, sha256).await?;
                    filesystem::copy_file(&cached, &dir.join(&name)).map_err(source_io)?;
                }
            }
        }

        let files = list_files(&dir)?;
        tracing::debug!("{}: staged {} source files", package.name, files.len());
        Ok(StagedSources { dir, files })
    }
}

fn file_name(path: &Path) -> PathBuf {
    path.file_name().map_or_else(|| path.to_path_buf(), PathBuf::from)
}

/// Last path segment of a URL, without query
fn url_file_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| crate::infra::download::compute_checksum(url.as_bytes()))
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SourceError::Io {
            path: dir.to_path_buf(),
            error: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

fn source_io(e: FilesystemError) -> SourceError {
    let path = match &e {
        FilesystemError::CreateDir { path, .. }
        | FilesystemError::RemoveDir { path, .. }
        | FilesystemError::WriteFile { path, .. }
        | FilesystemError::ReadFile { path, .. }
        | FilesystemError::Copy { from: path, .. } => path.clone(),
    };
    SourceError::Io {
        path,
        error: e.to_string(),
    }
}
